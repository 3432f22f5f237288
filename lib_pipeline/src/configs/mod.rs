//! # Pipeline Configuration Module
//!
//! Layered configuration for the synchronization pipeline: built-in
//! defaults, an optional JSON config file, and CLI flags / environment
//! variables on top. The raw mergeable [`config_pipeline::Config`] resolves
//! into an explicit [`config_pipeline::PipelineConfig`] that is passed into
//! every orchestrator and engine call; there is no ambient state.

#![forbid(unsafe_code)]

/// Raw mergeable configuration and the resolved pipeline settings.
pub mod config_pipeline;
