use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "lifeline",
    about = "Lifeline: query object lifetimes and snapshots recorded in a trace",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file with a `[finalize]` table
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Summarize ids, lifetimes, snapshots, and trace bounds
    Summary(TraceArgs),
    /// Show the lifetime of an id alive at a timestamp
    InstanceAt(PointArgs),
    /// Show the snapshot of an id in effect at a timestamp
    SnapshotAt(PointArgs),
    /// List lifetimes, optionally only those with a given name
    List(ListArgs),
    /// List every category seen in the trace
    Categories(TraceArgs),
    /// Dump every lifetime followed by its snapshots
    Events(TraceArgs),
}

#[derive(Args)]
pub struct TraceArgs {
    /// Event file: a JSON array or one JSON event per line
    pub trace: PathBuf,
}

#[derive(Args)]
pub struct PointArgs {
    pub trace: PathBuf,
    /// Object id; digits parse as a numeric id
    pub id: String,
    /// Timestamp in milliseconds
    #[arg(allow_negative_numbers = true)]
    pub ts: f64,
}

#[derive(Args)]
pub struct ListArgs {
    pub trace: PathBuf,
    #[arg(short, long)]
    pub name: Option<String>,
}
