pub mod config;
pub mod error;
pub mod migrator;
pub mod outcome;
pub mod persistor;
pub mod scope;
pub mod upgrader;
pub mod version;

pub use error::{PlanError, UpgradeError};
pub use migrator::{MigrationPlan, Migrator, NoMigrator};
pub use outcome::{MigrationOutcome, StepOutcome};
pub use persistor::{FilePersistor, MemoryPersistor, NoPersistor, Persistor};
pub use upgrader::Upgrader;
pub use version::Version;
