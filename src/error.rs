use thiserror::Error;

use crate::version::Version;

/// Why an upgrade run did not finish cleanly.
#[derive(Debug, Error)]
pub enum UpgradeError<E> {
    /// A fatal error occurred while processing `at_version`. Nothing was
    /// committed for that version.
    #[error(
        "upgrade canceled at version {at_version} with {} fatal and {} non-fatal error(s)",
        .fatal_errors.len(),
        .non_fatal_errors.len()
    )]
    Canceled {
        at_version: Version,
        fatal_errors: Vec<E>,
        non_fatal_errors: Vec<E>,
    },

    /// Every version was applied, but some steps reported recoverable errors.
    #[error("upgrade completed with {} non-fatal error(s)", .errors.len())]
    CompletedWithErrors { errors: Vec<E> },

    /// The action for `at_version` asked to jump back to `target`.
    #[error("action for version {at_version} requested a jump back to version {target}")]
    InvalidJump {
        at_version: Version,
        target: Version,
        non_fatal_errors: Vec<E>,
    },

    #[error("failed to load the current version: {reason:#}")]
    Load { reason: anyhow::Error },

    /// The action for `at_version` ran, but saving `version` failed. The two
    /// differ when the action jumped ahead.
    #[error("failed to commit version {version} after running version {at_version}: {reason:#}")]
    Commit {
        at_version: Version,
        version: Version,
        reason: anyhow::Error,
        non_fatal_errors: Vec<E>,
    },
}

impl<E> UpgradeError<E> {
    /// The version whose action was being processed when the run stopped
    /// early.
    pub fn at_version(&self) -> Option<Version> {
        match self {
            UpgradeError::Canceled { at_version, .. }
            | UpgradeError::InvalidJump { at_version, .. }
            | UpgradeError::Commit { at_version, .. } => Some(*at_version),
            UpgradeError::CompletedWithErrors { .. } | UpgradeError::Load { .. } => None,
        }
    }

    /// Non-fatal errors collected before the run ended.
    pub fn non_fatal_errors(&self) -> &[E] {
        match self {
            UpgradeError::Canceled {
                non_fatal_errors, ..
            }
            | UpgradeError::InvalidJump {
                non_fatal_errors, ..
            }
            | UpgradeError::Commit {
                non_fatal_errors, ..
            } => non_fatal_errors,
            UpgradeError::CompletedWithErrors { errors } => errors,
            UpgradeError::Load { .. } => &[],
        }
    }

    /// Whether the run stopped before reaching the latest version.
    pub fn is_canceled(&self) -> bool {
        !matches!(self, UpgradeError::CompletedWithErrors { .. })
    }
}

/// Rejected while building a [`MigrationPlan`](crate::migrator::MigrationPlan).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("the base version is always applied and cannot have a migration step")]
    BaseVersion,
    #[error("duplicate migration step for version {0}")]
    Duplicate(Version),
    #[error("no migration step for version {0}")]
    Gap(Version),
}
