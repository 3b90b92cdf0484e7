use std::path::PathBuf;

use crate::cli::{Cli, Command};

#[derive(Debug, Clone)]
pub enum RuntimeConfig {
    Build {
        changes: PathBuf,
        content_root: PathBuf,
        output: Option<PathBuf>,
        /// Forced by the command line; the change list can still opt in.
        strict: bool,
    },
    Show {
        patch: PathBuf,
    },
}

impl From<Cli> for RuntimeConfig {
    fn from(cli: Cli) -> Self {
        match cli.command {
            Command::Build {
                changes,
                content_root,
                output,
                strict,
            } => Self::Build {
                changes,
                content_root,
                output,
                strict,
            },
            Command::Show { patch } => Self::Show { patch },
        }
    }
}
