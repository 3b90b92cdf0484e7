//! Patch construction from a stream of version-control change events.
//!
//! [`Reconciler`] folds the events into a positive tree (net creations and
//! modifications) and a negative tree (net deletions). Once every event has
//! been applied, [`PatchEmitter`] drains both trees into a [`PatchSink`],
//! fetching file content through a [`ContentProvider`].

mod builder;
mod change;
mod conflict;
mod content;
mod dual_tree;
mod emitter;
mod operation;
mod patch_file;
mod sink;

use snafu::{ResultExt, Snafu};
use tracing::debug;

pub use builder::{ReconcileError, Reconciler, Reconciliation};
pub use change::{ChangeEvent, ChangeKind, Revision};
pub use conflict::{Conflict, ConflictPolicy, ConflictReason};
pub use content::{
    ContentProvider, FileContent, MemoryContentProvider, MissingContentError,
    SnapshotDirectoryProvider, SnapshotError,
};
pub use dual_tree::{DualTree, VersionRegistry};
pub use emitter::{EmitError, PatchEmitter, PatchSummary};
pub use operation::{OperationKind, PatchOperation};
pub use patch_file::{
    FORMAT_VERSION, FileEntry, MAGIC, PatchDocument, PatchEntry, PatchFileError, PatchFileSink,
};
pub use sink::{ListingSink, PatchSink, RecordingSink};

/// Outcome of a successful [`build_patch`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    pub summary: PatchSummary,
    /// Conflicting events skipped in lenient mode.
    pub conflicts: Vec<Conflict>,
}

/// Reconciles `changes` and issues the resulting operations against `sink`.
///
/// No operation reaches the sink before the whole change stream has been
/// reconciled.
pub fn build_patch<P, S>(
    changes: &[ChangeEvent],
    policy: impl Into<ConflictPolicy>,
    provider: &mut P,
    sink: &mut S,
) -> Result<PatchReport, PatchBuildError>
where
    P: ContentProvider,
    S: PatchSink,
{
    let Reconciliation { state, conflicts } = Reconciler::new(policy)
        .reconcile(changes)
        .context(ReconciliationSnafu)?;
    debug!(
        "Tracking {} revisions for emission",
        state.versions.len()
    );

    let summary = PatchEmitter::new(provider, sink)
        .emit(state)
        .context(EmissionSnafu)?;

    Ok(PatchReport { summary, conflicts })
}

#[derive(Debug, Snafu)]
pub enum PatchBuildError {
    #[snafu(display("Failed to reconcile the change set"))]
    ReconciliationError { source: ReconcileError },
    #[snafu(display("Failed to emit the patch"))]
    EmissionError { source: EmitError },
}
