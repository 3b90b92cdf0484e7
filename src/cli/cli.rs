use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::application::data::LogLevel;

#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    #[clap(long, short, default_value = "warn", value_enum, global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build a patch from a YAML change list
    Build {
        /// The change list to reconcile
        changes: PathBuf,

        /// Directory holding one snapshot per revision: <root>/<revision>/<path>
        #[clap(long)]
        content_root: PathBuf,

        /// Where to write the patch file; operations are listed on stdout when omitted
        #[clap(long, short)]
        output: Option<PathBuf>,

        /// Abort on the first conflicting change
        #[clap(long)]
        strict: bool,
    },
    /// List the operations stored in a patch file
    Show { patch: PathBuf },
}
