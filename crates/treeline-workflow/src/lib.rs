//! Treeline Workflow - launch client for the external workflow engine
//!
//! The engine owns scheduling, retries, and durability; this crate only
//! implements the `IWorkflowEngine` port: a single launch endpoint with
//! the engine's dedup (409) and throttle (429) responses mapped to
//! [`LaunchOutcome`] variants.
//!
//! [`LaunchOutcome`]: treeline_core::ports::LaunchOutcome

pub mod client;

pub use client::HttpWorkflowEngine;
