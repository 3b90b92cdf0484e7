use std::path::{Path, PathBuf};

use changepatch::config::{ChangeList, ChangeListError};
use changepatch::ext::{AsyncTryInto, BestEffortPathExt};
use changepatch::patch::{
    ConflictPolicy, ListingSink, PatchBuildError, PatchDocument, PatchFileError, PatchFileSink,
    PatchReport, SnapshotDirectoryProvider, build_patch,
};
use snafu::Snafu;
use snafu::prelude::*;
use tracing::{debug, info, warn};

use crate::application::RuntimeConfig;

pub struct Application;

impl Application {
    pub async fn run(app_config: impl Into<RuntimeConfig>) -> Result<(), ApplicationError> {
        match app_config.into() {
            RuntimeConfig::Build {
                changes,
                content_root,
                output,
                strict,
            } => Self::build(&changes, content_root, output, strict).await,
            RuntimeConfig::Show { patch } => Self::show(&patch).await,
        }
    }

    async fn build(
        changes: &Path,
        content_root: PathBuf,
        output: Option<PathBuf>,
        strict: bool,
    ) -> Result<(), ApplicationError> {
        let change_list: ChangeList = changes.async_try_into().await.context(ChangeListSnafu)?;
        let policy = ConflictPolicy::from(strict || change_list.strict);
        debug!("Loaded {} changes, policy {:?}", change_list.changes.len(), policy);

        let mut provider = SnapshotDirectoryProvider::new(content_root);
        let report = match output {
            Some(output) => {
                let mut sink = PatchFileSink::new();
                let report = build_patch(&change_list.changes, policy, &mut provider, &mut sink)
                    .context(PatchBuildSnafu)?;
                let bytes = sink.into_document().encode().context(PatchFileSnafu)?;
                info!(
                    "Writing {} bytes to {}",
                    bytes.len(),
                    output.best_effort_path_display()
                );
                compio::fs::write(&output, bytes).await.0.context(WriteSnafu {
                    file_path: output.best_effort_path_display(),
                })?;
                report
            }
            None => {
                let mut sink = ListingSink::stdout();
                build_patch(&change_list.changes, policy, &mut provider, &mut sink)
                    .context(PatchBuildSnafu)?
            }
        };

        Self::log_report(&report);
        Ok(())
    }

    async fn show(patch: &Path) -> Result<(), ApplicationError> {
        let bytes = compio::fs::read(patch).await.context(ReadSnafu {
            file_path: patch.best_effort_path_display(),
        })?;
        let operations = PatchDocument::decode(&bytes)
            .and_then(|document| document.operations())
            .context(PatchFileSnafu)?;
        debug!("Decoded {} operations", operations.len());

        let mut sink = ListingSink::stdout();
        for operation in &operations {
            operation.replay(&mut sink).context(ListingSnafu)?;
        }
        Ok(())
    }

    fn log_report(report: &PatchReport) {
        info!("Patch built: {}", report.summary);
        if !report.conflicts.is_empty() {
            warn!(
                "{} conflicting changes were skipped; the patch omits them",
                report.conflicts.len()
            );
        }
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered while loading the change list"))]
    ChangeListError { source: ChangeListError },
    #[snafu(display("Critical failure encountered while building the patch"))]
    PatchBuildError { source: PatchBuildError },
    #[snafu(display("Critical failure encountered while handling the patch file"))]
    PatchFileError { source: PatchFileError },
    #[snafu(display("Failed to read {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to write {}", file_path))]
    WriteError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to list patch operations"))]
    ListingError { source: std::io::Error },
}
