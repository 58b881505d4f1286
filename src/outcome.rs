use crate::version::Version;

/// The result of a single migration step inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome<E> {
    Success,
    NonFatalError(E),
    FatalError(E),
}

/// What a migration action reports back for the version it was run for.
///
/// `Batch` and `JumpTo` only carry [`StepOutcome`]s, so batches cannot nest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome<E> {
    Success,
    /// Recorded, the run continues.
    NonFatalError(E),
    /// Halts the run at the version that produced it.
    FatalError(E),
    /// Several independent steps run for one version.
    Batch(Vec<StepOutcome<E>>),
    /// Same as `Batch`, but `target` is taken as the version reached. Versions
    /// between the current one and `target` are skipped.
    JumpTo {
        outcomes: Vec<StepOutcome<E>>,
        target: Version,
    },
}

impl<E> From<StepOutcome<E>> for MigrationOutcome<E> {
    fn from(outcome: StepOutcome<E>) -> Self {
        match outcome {
            StepOutcome::Success => MigrationOutcome::Success,
            StepOutcome::NonFatalError(e) => MigrationOutcome::NonFatalError(e),
            StepOutcome::FatalError(e) => MigrationOutcome::FatalError(e),
        }
    }
}

impl<E> From<Result<(), E>> for StepOutcome<E> {
    /// An `Err` from a step is treated as non-fatal. Use
    /// [`StepOutcome::FatalError`] explicitly for errors that must halt.
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => StepOutcome::Success,
            Err(e) => StepOutcome::NonFatalError(e),
        }
    }
}

/// Errors of a batch split by severity, each in the order they were reported.
#[derive(Debug, PartialEq, Eq)]
pub struct Classified<E> {
    pub fatal: Vec<E>,
    pub non_fatal: Vec<E>,
}

impl<E> Default for Classified<E> {
    fn default() -> Self {
        Self {
            fatal: Vec::new(),
            non_fatal: Vec::new(),
        }
    }
}

pub fn classify<E>(outcomes: impl IntoIterator<Item = StepOutcome<E>>) -> Classified<E> {
    let mut classified = Classified::default();
    for outcome in outcomes {
        match outcome {
            StepOutcome::Success => {}
            StepOutcome::NonFatalError(e) => classified.non_fatal.push(e),
            StepOutcome::FatalError(e) => classified.fatal.push(e),
        }
    }
    classified
}

/// A flattened [`MigrationOutcome`].
#[derive(Debug, PartialEq, Eq)]
pub struct Resolution<E> {
    pub fatal: Vec<E>,
    pub non_fatal: Vec<E>,
    /// Set when the action asked to jump to a later version.
    pub redirect: Option<Version>,
}

impl<E> Resolution<E> {
    pub fn is_fatal(&self) -> bool {
        !self.fatal.is_empty()
    }
}

impl<E> MigrationOutcome<E> {
    pub fn resolve(self) -> Resolution<E> {
        let (classified, redirect) = match self {
            MigrationOutcome::Success => (Classified::default(), None),
            MigrationOutcome::NonFatalError(e) => (
                Classified {
                    fatal: Vec::new(),
                    non_fatal: vec![e],
                },
                None,
            ),
            MigrationOutcome::FatalError(e) => (
                Classified {
                    fatal: vec![e],
                    non_fatal: Vec::new(),
                },
                None,
            ),
            MigrationOutcome::Batch(outcomes) => (classify(outcomes), None),
            MigrationOutcome::JumpTo { outcomes, target } => (classify(outcomes), Some(target)),
        };

        Resolution {
            fatal: classified.fatal,
            non_fatal: classified.non_fatal,
            redirect,
        }
    }
}
