//! Orchestration for the `shard-ring` binary.
//!
//! Wires the mock sources, the cache-shard router and the warehouse into an
//! ETL pipeline, and exposes the ring/modulo comparisons as subcommands.

pub mod commands;
pub mod config;
pub mod pipeline;
pub mod telemetry;

pub use commands::{Command, CommandResult};
pub use config::{CliConfig, Settings};
pub use pipeline::{EtlPipeline, EtlRunResult, PipelineError};
