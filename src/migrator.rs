use std::{collections::BTreeMap, fmt};

use crate::{error::PlanError, outcome::MigrationOutcome, version::Version};

/// Knows which versions exist and how to reach each of them.
pub trait Migrator {
    type Error;

    /// Whether `version` is a known version.
    fn exists(&self, version: Version) -> bool;

    /// Runs the action that brings the stored state up to `version`.
    ///
    /// # Panics
    ///
    /// Implementations panic when `version` does not exist.
    fn migrate(&self, version: Version) -> MigrationOutcome<Self::Error>;
}

impl<M: Migrator + ?Sized> Migrator for &M {
    type Error = M::Error;

    fn exists(&self, version: Version) -> bool {
        (**self).exists(version)
    }

    fn migrate(&self, version: Version) -> MigrationOutcome<Self::Error> {
        (**self).migrate(version)
    }
}

/// A migrator that knows no versions, so every store is up to date.
pub struct NoMigrator;
impl Migrator for NoMigrator {
    type Error = anyhow::Error;

    fn exists(&self, _version: Version) -> bool {
        false
    }

    fn migrate(&self, version: Version) -> MigrationOutcome<Self::Error> {
        unreachable!("NoMigrator has no step for version {version}")
    }
}

type StepFn<E> = Box<dyn Fn() -> MigrationOutcome<E>>;

/// A closed, ordered set of versions, each with the action that reaches it.
pub struct MigrationPlan<E = anyhow::Error> {
    steps: BTreeMap<Version, StepFn<E>>,
}

impl<E> Default for MigrationPlan<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for MigrationPlan<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationPlan")
            .field("versions", &self.steps.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<E> MigrationPlan<E> {
    pub fn new() -> Self {
        Self {
            steps: BTreeMap::new(),
        }
    }

    /// Registers the action that reaches `version`.
    pub fn add_step<F>(&mut self, version: u32, step: F) -> Result<(), PlanError>
    where
        F: Fn() -> MigrationOutcome<E> + 'static,
    {
        let version = Version::new(version);
        if version.is_base() {
            return Err(PlanError::BaseVersion);
        }
        if self.steps.contains_key(&version) {
            return Err(PlanError::Duplicate(version));
        }
        self.steps.insert(version, Box::new(step));
        Ok(())
    }

    pub fn with_step<F>(mut self, version: u32, step: F) -> Result<Self, PlanError>
    where
        F: Fn() -> MigrationOutcome<E> + 'static,
    {
        self.add_step(version, step)?;
        Ok(self)
    }

    /// The newest version this plan can reach, or the base for an empty plan.
    pub fn latest(&self) -> Version {
        self.steps
            .last_key_value()
            .map(|(version, _)| *version)
            .unwrap_or(Version::BASE)
    }

    pub fn versions(&self) -> impl Iterator<Item = Version> + '_ {
        self.steps.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Checks that every version from the base to [`latest`](Self::latest) has
    /// a step. Runs stop at the first missing version, so a gap hides every
    /// step registered after it.
    pub fn validate(&self) -> Result<(), PlanError> {
        let mut expected = Version::BASE.successor();
        for version in self.steps.keys() {
            if *version != expected {
                return Err(PlanError::Gap(expected));
            }
            expected = expected.successor();
        }
        Ok(())
    }
}

impl<E> Migrator for MigrationPlan<E> {
    type Error = E;

    fn exists(&self, version: Version) -> bool {
        self.steps.contains_key(&version)
    }

    fn migrate(&self, version: Version) -> MigrationOutcome<E> {
        let step = self
            .steps
            .get(&version)
            .unwrap_or_else(|| panic!("no migration step registered for version {version}"));
        step()
    }
}

#[cfg(test)]
mod migrator_test {
    use super::*;

    fn plan() -> MigrationPlan<&'static str> {
        MigrationPlan::new()
            .with_step(1, || MigrationOutcome::Success)
            .unwrap()
            .with_step(2, || MigrationOutcome::NonFatalError("two"))
            .unwrap()
    }

    #[test]
    fn test_plan_lookup() {
        let plan = plan();
        assert!(!plan.exists(Version::BASE));
        assert!(plan.exists(Version::new(2)));
        assert!(!plan.exists(Version::new(3)));
        assert_eq!(plan.latest(), Version::new(2));
        assert_eq!(plan.migrate(Version::new(2)), MigrationOutcome::NonFatalError("two"));
        assert_eq!(plan.validate(), Ok(()));
    }

    #[test]
    fn test_plan_rejects_base_and_duplicates() {
        let mut plan = plan();
        assert_eq!(
            plan.add_step(0, || MigrationOutcome::Success),
            Err(PlanError::BaseVersion)
        );
        assert_eq!(
            plan.add_step(2, || MigrationOutcome::Success),
            Err(PlanError::Duplicate(Version::new(2)))
        );
    }

    #[test]
    fn test_plan_gap() {
        let plan = plan().with_step(4, || MigrationOutcome::Success).unwrap();
        assert_eq!(plan.validate(), Err(PlanError::Gap(Version::new(3))));
        assert_eq!(MigrationPlan::<()>::new().latest(), Version::BASE);
    }

    #[test]
    #[should_panic(expected = "no migration step registered for version 3")]
    fn test_missing_step_panics() {
        plan().migrate(Version::new(3));
    }
}
