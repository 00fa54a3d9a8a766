//! Graph algorithms over a build: cycle detection and listings
//!
//! All walks use an explicit stack so very deep dependency chains do not
//! overflow the call stack.

use crate::core::build::{Build, StandardStep};
use crate::core::step::StepId;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Find a dependency cycle, returned as the path `a, b, ..., a`
///
/// Three-color depth-first search: every step and edge is visited once, so
/// shared dependencies (diamonds) cost nothing extra.
pub fn find_cycle(build: &Build) -> Option<Vec<StepId>> {
    let mut color = vec![Color::White; build.len()];
    let mut stack: Vec<(StepId, usize)> = Vec::new();

    for (root, _) in build.iter() {
        if color[root.0] != Color::White {
            continue;
        }
        color[root.0] = Color::Gray;
        stack.push((root, 0));

        while let Some(top) = stack.len().checked_sub(1) {
            let (node, next) = stack[top];
            let deps = build.get(node).dependencies();

            if next == deps.len() {
                color[node.0] = Color::Black;
                stack.pop();
                continue;
            }

            stack[top].1 += 1;
            let dep = deps[next];
            match color[dep.0] {
                Color::White => {
                    color[dep.0] = Color::Gray;
                    stack.push((dep, 0));
                }
                Color::Gray => {
                    let start = stack
                        .iter()
                        .position(|(id, _)| *id == dep)
                        .unwrap_or(0);
                    let mut path: Vec<StepId> = stack[start..].iter().map(|(id, _)| *id).collect();
                    path.push(dep);
                    return Some(path);
                }
                Color::Black => {}
            }
        }
    }

    None
}

/// For every step: does it, or anything it depends on, have work to do
pub fn operation_map(build: &Build) -> Vec<bool> {
    let mut memo: Vec<Option<bool>> = vec![None; build.len()];
    let mut on_stack = vec![false; build.len()];
    let mut stack: Vec<(StepId, usize)> = Vec::new();

    for (root, _) in build.iter() {
        if memo[root.0].is_some() {
            continue;
        }
        on_stack[root.0] = true;
        stack.push((root, 0));

        while let Some(top) = stack.len().checked_sub(1) {
            let (node, next) = stack[top];
            let step = build.get(node);

            if let Some(&dep) = step.dependencies().get(next) {
                stack[top].1 += 1;
                if memo[dep.0].is_none() && !on_stack[dep.0] {
                    on_stack[dep.0] = true;
                    stack.push((dep, 0));
                }
                continue;
            }

            let value = step.has_own_work()
                || step
                    .dependencies()
                    .iter()
                    .any(|dep| memo[dep.0] == Some(true));
            memo[node.0] = Some(value);
            on_stack[node.0] = false;
            stack.pop();
        }
    }

    memo.into_iter().map(|v| v.unwrap_or(false)).collect()
}

/// Render the dependency forest as an indented tree
///
/// Roots are the standard steps (latest stage first) followed by custom
/// steps nothing depends on. A step already printed is shown again as a
/// leaf marked "duplicate reference". Without `verbose`, steps with no work
/// anywhere below them are left out.
pub fn render_graph(build: &Build, verbose: bool) -> String {
    let has_work = operation_map(build);
    let visible = |id: StepId| verbose || has_work[id.0];

    // Edges from detached steps do not count; they are never printed
    let mut depended = vec![false; build.len()];
    for (_, step) in build.iter().filter(|(id, _)| build.is_registered(*id)) {
        for dep in step.dependencies() {
            depended[dep.0] = true;
        }
    }

    let mut roots: Vec<StepId> = StandardStep::ALL
        .iter()
        .rev()
        .map(|s| build.standard(*s))
        .collect();
    roots.extend(
        build
            .steps()
            .into_iter()
            .filter(|name| StandardStep::from_name(name).is_none())
            .map(|name| build.step(name))
            .filter(|id| !depended[id.0]),
    );

    let mut visited = vec![false; build.len()];
    let mut out = String::new();

    for root in roots {
        if visited[root.0] || !visible(root) {
            continue;
        }

        // (step, prefix for its children, prefix for its own line)
        let mut stack: Vec<(StepId, String, String)> = vec![(root, String::new(), String::new())];
        while let Some((id, child_prefix, line_prefix)) = stack.pop() {
            let step = build.get(id);
            let _ = write!(out, "{}{} - {}", line_prefix, step.name(), step.description());
            if step.is_skipped() {
                out.push_str(" [skipped]");
            }
            if visited[id.0] {
                out.push_str(" (duplicate reference)\n");
                continue;
            }
            out.push('\n');
            visited[id.0] = true;

            let children: Vec<StepId> = step
                .dependencies()
                .iter()
                .copied()
                .filter(|dep| visible(*dep))
                .collect();
            let last = children.len().saturating_sub(1);
            for (i, child) in children.into_iter().enumerate().rev() {
                let (branch, indent) = if i == last {
                    ("└── ", "    ")
                } else {
                    ("├── ", "│   ")
                };
                stack.push((
                    child,
                    format!("{}{}", child_prefix, indent),
                    format!("{}{}", child_prefix, branch),
                ));
            }
        }
    }

    out
}

/// Render registered steps as a sorted `name  description` list
pub fn render_steps(build: &Build, verbose: bool) -> String {
    let has_work = operation_map(build);
    let rows: Vec<(&str, StepId)> = build
        .steps()
        .into_iter()
        .map(|name| (name, build.step(name)))
        .filter(|(_, id)| verbose || has_work[id.0])
        .collect();

    let width = rows.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    let mut out = String::new();
    for (name, id) in rows {
        let step = build.get(id);
        let _ = write!(out, "{:<width$}  {}", name, step.description(), width = width);
        if step.is_skipped() {
            out.push_str(" [skipped]");
        }
        out.push('\n');
    }
    out
}
