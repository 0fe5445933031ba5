use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "govlink",
    about = "govlink: reconcile model evaluation evidence with governance requirement plans",
    version
)]
pub struct Cli {
    /// Path to a govlink TOML config
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the requirements of a plan that apply to an artifact
    Requirements {
        /// Requirement plan JSON path
        #[arg(long)]
        plan: String,

        /// Artifact tag as key=value (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Match exported evidence against a plan
    Check {
        /// Requirement plan JSON path
        #[arg(long)]
        plan: String,

        /// Export file holding the evidence
        #[arg(long)]
        evidence: String,

        /// Artifact tag as key=value (repeatable); overrides the export file's tags
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Re-export evidence normalized against a plan
    Export {
        /// Requirement plan JSON path
        #[arg(long)]
        plan: String,

        /// Export file holding the evidence
        #[arg(long)]
        evidence: String,

        /// Output export file path
        #[arg(long)]
        out: String,

        /// Model name; replaces the export file's artifact
        #[arg(long)]
        model: Option<String>,

        /// Artifact tag as key=value (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Package a {metric: value} JSON map as evidence and export it
    Metrics {
        /// Requirement plan JSON path
        #[arg(long)]
        plan: String,

        /// Metric map JSON path
        #[arg(long)]
        metrics: String,

        /// Model name
        #[arg(long)]
        model: String,

        /// What produced the metrics; stored in evidence metadata
        #[arg(long)]
        source: String,

        /// Output export file path
        #[arg(long)]
        out: String,

        /// Artifact tag as key=value (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Extra evidence label as key=value (repeatable)
        #[arg(long = "label")]
        labels: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
