//! Repository traits for metadata operations.
//!
//! Every method takes `&mut self`: the traits are implemented for a single
//! database connection (typically `&mut *tx` of a caller-owned transaction),
//! so everything an engine does lands in the caller's transaction.

pub mod artifacts;
pub mod locations;
pub mod restores;
pub mod roles;
pub mod schedules;
pub mod settings;

pub use artifacts::ArtifactRepo;
pub use locations::LocationRepo;
pub use restores::RestoreHistoryRepo;
pub use roles::RoleRepo;
pub use schedules::ScheduledTaskRepo;
pub use settings::{DefaultRoleSource, SettingsRepo};

/// Everything location removal reads and writes.
pub trait LocationGraph:
    LocationRepo + ArtifactRepo + RestoreHistoryRepo + ScheduledTaskRepo
{
}

impl<T> LocationGraph for T where
    T: LocationRepo + ArtifactRepo + RestoreHistoryRepo + ScheduledTaskRepo + ?Sized
{
}

/// Everything role removal reads and writes.
pub trait RoleGraph: RoleRepo + DefaultRoleSource {}

impl<T> RoleGraph for T where T: RoleRepo + DefaultRoleSource + ?Sized {}
