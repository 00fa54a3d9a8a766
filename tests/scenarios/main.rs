//! Scenario-based tests for buildflow

mod helpers;

mod cancellation;
mod failure_handling;
mod standard_pipeline;
mod sub_builds;
