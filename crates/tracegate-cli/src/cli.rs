use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tracegate",
    about = "Tracegate: classify host callables for tracing graph capture",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Where the host image and policy come from.
#[derive(Args, Debug, Clone)]
pub struct HostArgs {
    /// Path to a host manifest JSON (tracegate.host_manifest.v1)
    #[arg(long, conflicts_with = "toy", required_unless_present = "toy")]
    pub manifest: Option<String>,

    /// Built-in toy host name (mini_torch, cyclic, policy_split)
    #[arg(long)]
    pub toy: Option<String>,

    /// Path to a registry config TOML; defaults to the toy host's policy or
    /// the built-in defaults
    #[arg(long)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify host objects by key
    Classify {
        /// Host object keys to classify
        #[arg(required = true)]
        keys: Vec<String>,

        #[command(flatten)]
        host: HostArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Dump classification set contents and the registry fingerprint
    Dump {
        #[command(flatten)]
        host: HostArgs,

        /// Only dump the set with this label
        #[arg(long)]
        set: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
