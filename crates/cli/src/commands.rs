//! Subcommands of the `shard-ring` binary.
//!
//! Every command prints one JSON document on stdout.

use std::fmt;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Subcommand};
use corelib::MembershipChange;
use serde::Serialize;
use serde_json::{json, Value};
use sources::Payload;
use tracing::info;

use crate::config::CliConfig;
use crate::pipeline::EtlPipeline;
use crate::telemetry;

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the ETL pipeline against the seeded sources.
    Run {
        /// Start the run on a background task and wait for it.
        #[arg(long = "async")]
        background: bool,

        /// Number of consecutive runs; later runs only see new rows.
        #[arg(long, default_value_t = 1)]
        runs: usize,
    },

    /// Insert a row into a source, then run the pipeline once.
    Seed {
        source: String,

        /// Payload field as `key=value`; repeatable. Without any, a random
        /// row is inserted.
        #[arg(short = 'f', long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },

    /// Row count per source.
    Sources,

    /// Run the pipeline once, then show the newest warehouse rows.
    Snapshot {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Cache node owning each key.
    Assign {
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Compare ring and modulo distributions of a key batch.
    Shards {
        keys: Vec<String>,

        /// Use `key-0 .. key-N` instead of explicit keys.
        #[arg(long, conflicts_with = "keys")]
        generate: Option<usize>,
    },

    /// How many keys each scheme remaps under a membership change.
    Churn {
        #[command(flatten)]
        change: ChangeArgs,

        /// Number of generated keys to measure over.
        #[arg(long, default_value_t = 10_000)]
        generate: usize,
    },
}

/// Exactly one of `--add` / `--remove`.
#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false)]
pub struct ChangeArgs {
    /// Node to add.
    #[arg(long)]
    pub add: Option<String>,

    /// Node to remove.
    #[arg(long)]
    pub remove: Option<String>,
}

impl ChangeArgs {
    fn to_change(&self) -> anyhow::Result<MembershipChange> {
        match (&self.add, &self.remove) {
            (Some(node), None) => Ok(MembershipChange::Add(node.as_str().into())),
            (None, Some(node)) => Ok(MembershipChange::Remove(node.as_str().into())),
            _ => bail!("pass exactly one of --add or --remove"),
        }
    }
}

/// JSON document produced by a command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult(Value);

impl CommandResult {
    fn from_serialize<T: Serialize>(value: &T) -> anyhow::Result<Self> {
        Ok(Self(serde_json::to_value(value)?))
    }

    pub fn value(&self) -> &Value {
        &self.0
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pretty = serde_json::to_string_pretty(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&pretty)
    }
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn generated_keys(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("key-{i}")).collect()
}

impl Command {
    pub async fn execute(&self, pipeline: &Arc<EtlPipeline>) -> anyhow::Result<CommandResult> {
        match self {
            Command::Run { background, runs } => {
                let mut results = Vec::with_capacity(*runs);
                for _ in 0..*runs {
                    if *background {
                        let outcome =
                            pipeline.schedule().await.context("pipeline task panicked")?;
                        results.push(outcome.context("scheduled run failed")?);
                    } else {
                        results.push(pipeline.run().await?);
                    }
                }
                Ok(CommandResult(json!({
                    "status": if *background { "scheduled" } else { "completed" },
                    "runs": results,
                })))
            }

            Command::Seed { source, fields } => {
                let record = if fields.is_empty() {
                    pipeline.sources().insert_random(source)?
                } else {
                    let payload: Payload = fields.iter().cloned().collect();
                    pipeline.sources().add_to_source(source, payload)?
                };
                info!(source = %source, id = %record.id, "seeded record");
                let run = pipeline.run().await?;
                Ok(CommandResult(json!({
                    "inserted": record,
                    "run": run,
                    "sources": pipeline.sources().stats(),
                })))
            }

            Command::Sources => CommandResult::from_serialize(&pipeline.sources().stats()),

            Command::Snapshot { limit } => {
                pipeline.run().await?;
                let rows = pipeline.warehouse().snapshot(*limit).await?;
                let metrics = pipeline.warehouse().metrics().await?;
                Ok(CommandResult(json!({ "metrics": metrics, "rows": rows })))
            }

            Command::Assign { keys } => {
                let mut owners = serde_json::Map::new();
                for key in keys {
                    let node = pipeline.router().assign(key)?;
                    owners.insert(key.clone(), Value::String(node.to_string()));
                }
                Ok(CommandResult(Value::Object(owners)))
            }

            Command::Shards { keys, generate } => {
                let keys = match generate {
                    Some(n) => generated_keys(*n),
                    None => keys.clone(),
                };
                let comparison = pipeline.sharding_comparison(&keys)?;
                Ok(CommandResult(json!({
                    "keys": keys.len(),
                    "comparison": comparison,
                    "balance": {
                        "consistent_hash": comparison.consistent_hash.balance(),
                        "modulo": comparison.modulo.balance(),
                    },
                })))
            }

            Command::Churn { change, generate } => {
                let change = change.to_change()?;
                let keys = generated_keys(*generate);
                let churn = pipeline.router().churn_comparison(&keys, &change)?;
                Ok(CommandResult(json!({
                    "change": match &change {
                        MembershipChange::Add(node) => json!({ "add": node }),
                        MembershipChange::Remove(node) => json!({ "remove": node }),
                    },
                    "churn": churn,
                })))
            }
        }
    }
}

impl CliConfig {
    /// Resolve settings, initialize logging, execute the subcommand and print
    /// its result.
    pub async fn run(self) -> anyhow::Result<()> {
        let settings = self.settings()?;
        telemetry::init(&settings.log_level);
        info!(
            nodes = ?settings.cache_nodes,
            vnodes = settings.vnodes_per_node(),
            hash = %settings.hash_algorithm,
            backend = %settings.warehouse_backend,
            "starting"
        );

        let pipeline = Arc::new(
            EtlPipeline::from_settings(&settings).context("building pipeline from settings")?,
        );
        let result = self.command.execute(&pipeline).await?;
        println!("{result}");
        Ok(())
    }
}
