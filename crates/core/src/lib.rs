//! Core domain types and shared logic for keepsafe.
//!
//! This crate defines the vocabulary shared by the metadata store and the
//! operator tooling:
//! - Backup, restore and dump lifecycle states
//! - Backup location configuration and its validation
//! - Removal policies for entities with dependents
//! - Configuration types

pub mod config;
pub mod error;
pub mod location;
pub mod removal;
pub mod status;

pub use error::{Error, Result};
pub use location::{
    FilesystemLocationConfig, LocationConfig, LocationType, LocationValidation, S3LocationConfig,
};
pub use removal::RemoveMode;
pub use status::{BackupMode, BackupStatus, DataModel, DumpStatus, RestoreStatus};
