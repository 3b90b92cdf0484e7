use snafu::{ResultExt, Snafu};
use tracing::{debug, info, warn};

use crate::filesystem::{PathError, RelativePath, TreeError};
use crate::patch::{
    ChangeEvent, ChangeKind, Conflict, ConflictPolicy, ConflictReason, DualTree, Revision,
};

/// A change event whose path passed validation.
#[derive(Debug, Clone)]
struct ValidatedChange {
    path: RelativePath,
    kind: ChangeKind,
    revision: Option<Revision>,
}

/// Final state of a reconciliation run, ready to be emitted.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub state: DualTree,
    /// Conflicts that were skipped. Always empty after a strict run.
    pub conflicts: Vec<Conflict>,
}

/// Folds an ordered change stream into a [`DualTree`].
///
/// A run is single-use: every path is validated up front, then events are
/// applied one at a time in input order. Nothing is emitted here, because a
/// later event may still override an earlier conclusion.
pub struct Reconciler {
    policy: ConflictPolicy,
    state: DualTree,
    conflicts: Vec<Conflict>,
}

impl Reconciler {
    pub fn new(policy: impl Into<ConflictPolicy>) -> Self {
        Self {
            policy: policy.into(),
            state: DualTree::new(),
            conflicts: Vec::new(),
        }
    }

    pub fn reconcile(mut self, changes: &[ChangeEvent]) -> Result<Reconciliation, ReconcileError> {
        let changes = Self::validate(changes)?;
        debug!(
            "Reconciling {} changes ({:?} mode)",
            changes.len(),
            self.policy
        );

        for change in &changes {
            self.apply(change)?;
        }

        info!(
            "Reconciled {} changes with {} skipped conflicts",
            changes.len(),
            self.conflicts.len()
        );
        Ok(Reconciliation {
            state: self.state,
            conflicts: self.conflicts,
        })
    }

    /// Rejects the whole stream if any path is malformed or a content change
    /// carries no revision. Runs before the first event is applied.
    fn validate(changes: &[ChangeEvent]) -> Result<Vec<ValidatedChange>, ReconcileError> {
        changes
            .iter()
            .enumerate()
            .map(|(index, change)| {
                let path = RelativePath::parse(&change.path).context(InvalidPathSnafu { index })?;
                if change.kind.needs_revision() && change.after_revision.is_none() {
                    return Err(ReconcileError::MissingRevision {
                        path,
                        kind: change.kind.clone(),
                    });
                }
                Ok(ValidatedChange {
                    path,
                    kind: change.kind.clone(),
                    revision: change.after_revision.clone(),
                })
            })
            .collect()
    }

    fn apply(&mut self, change: &ValidatedChange) -> Result<(), ReconcileError> {
        let path = &change.path;
        debug!("Applying {} to {}", change.kind, path);

        let outcome = match &change.kind {
            ChangeKind::DirectoryChanged | ChangeKind::NotChanged => Ok(()),
            ChangeKind::Unknown(_) => Err(ConflictReason::UnexpectedKind(change.kind.clone())),
            kind if self.state.parent_deleted(path) => {
                Err(ConflictReason::ParentDeleted(kind.clone()))
            }
            ChangeKind::FileAdded => self.add_file(path, change.revision.as_ref()),
            ChangeKind::FileChanged => self.change_file(path, change.revision.as_ref()),
            ChangeKind::FileRemoved => self.remove_file(path),
            ChangeKind::DirectoryAdded => self.add_directory(path),
            ChangeKind::DirectoryRemoved => self.remove_directory(path),
        };

        match outcome {
            Ok(()) => Ok(()),
            Err(reason) => self.report(Conflict::new(path, reason)),
        }
    }

    fn add_file(
        &mut self,
        path: &RelativePath,
        revision: Option<&Revision>,
    ) -> Result<(), ConflictReason> {
        if self.state.negative.contains_file(path) {
            // Deleted earlier in the run: the file exists on the target again,
            // so its content is overwritten rather than created.
            self.state.positive.write_file(path)?;
            self.state.negative.delete_file(path)?;
        } else {
            self.state.positive.create_file(path)?;
        }
        self.record_revision(path, revision);
        Ok(())
    }

    fn change_file(
        &mut self,
        path: &RelativePath,
        revision: Option<&Revision>,
    ) -> Result<(), ConflictReason> {
        if self.state.negative.contains_file(path) {
            return Err(ConflictReason::ModifiesDeletedFile);
        }
        if !self.state.positive.contains_file(path) {
            self.state.positive.write_file(path)?;
        }
        self.record_revision(path, revision);
        Ok(())
    }

    fn remove_file(&mut self, path: &RelativePath) -> Result<(), ConflictReason> {
        if !self.state.positive.contains_new_file(path) {
            self.state.negative.create_file(path).map_err(|error| match error {
                TreeError::NodeExists { .. } => ConflictReason::FileAlreadyDeleted,
                other => other.into(),
            })?;
        }
        if self.state.positive.contains_file(path) {
            self.state.positive.delete_file(path)?;
        }
        self.state.versions.forget(path);
        Ok(())
    }

    fn add_directory(&mut self, path: &RelativePath) -> Result<(), ConflictReason> {
        self.state.positive.create_directory(path)?;
        Ok(())
    }

    fn remove_directory(&mut self, path: &RelativePath) -> Result<(), ConflictReason> {
        if self.state.positive.contains_directory(path) {
            // Only the positive tree knows it: dropping it is the whole net effect.
            self.state.positive.delete_directory(path)?;
            self.state.versions.forget_subtree(path);
            return Ok(());
        }

        if self.state.positive.contains_node(path) {
            // A tracked file sits where the directory was reported.
            self.state.positive.delete_directory(path)?;
            self.state.versions.forget(path);
        } else if self.state.negative.contains_ancestor(path) {
            return Err(ConflictReason::ParentAlreadyDeleted);
        } else if self.state.negative.contains_explicit_directory(path) {
            return Err(ConflictReason::DirectoryAlreadyDeleted);
        }

        // The directory deletion subsumes any file deletions recorded below it.
        if self.state.negative.contains_node(path) {
            self.state.negative.delete_directory(path)?;
        }
        self.state.negative.create_directory(path)?;
        Ok(())
    }

    fn record_revision(&mut self, path: &RelativePath, revision: Option<&Revision>) {
        // Validation guarantees content changes carry a revision.
        if let Some(revision) = revision {
            self.state.versions.record(path, revision.clone());
        }
    }

    /// Every conflict is logged first; only then does the policy decide
    /// whether the run goes on.
    fn report(&mut self, conflict: Conflict) -> Result<(), ReconcileError> {
        warn!("{}", conflict);
        if self.policy.is_strict() {
            return Err(ReconcileError::Conflict { conflict });
        }
        self.conflicts.push(conflict);
        Ok(())
    }
}

impl From<TreeError> for ConflictReason {
    fn from(error: TreeError) -> Self {
        ConflictReason::Structural(error)
    }
}

#[derive(Debug, Snafu)]
pub enum ReconcileError {
    #[snafu(display("Change #{} has an incorrect path", index))]
    InvalidPath { index: usize, source: PathError },
    #[snafu(display("Change '{}' ({}) has no revision to fetch content from", path, kind))]
    MissingRevision { path: RelativePath, kind: ChangeKind },
    #[snafu(display("{}", conflict))]
    Conflict { conflict: Conflict },
}
