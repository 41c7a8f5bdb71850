//! Backup location constructors.

use super::{new_id, require};
use crate::error::{MetadataError, MetadataResult};
use crate::models::LocationRow;
use crate::repos::LocationRepo;
use keepsafe_core::{LocationConfig, LocationValidation};
use time::OffsetDateTime;

/// Parameters for [`create_location`].
#[derive(Debug, Clone)]
pub struct CreateLocationParams {
    pub name: String,
    pub description: String,
    pub config: LocationConfig,
}

/// Parameters for [`change_location`]. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ChangeLocationParams {
    pub name: Option<String>,
    pub description: Option<String>,
    pub config: Option<LocationConfig>,
}

async fn check_unique_name<T>(tx: &mut T, name: &str) -> MetadataResult<()>
where
    T: LocationRepo + ?Sized,
{
    if tx.find_location_by_name(name).await?.is_some() {
        return Err(MetadataError::AlreadyExists(format!(
            "location with name {name:?}"
        )));
    }
    Ok(())
}

/// Create a backup location after validating its configuration.
pub async fn create_location<T>(
    tx: &mut T,
    params: CreateLocationParams,
) -> MetadataResult<LocationRow>
where
    T: LocationRepo + ?Sized,
{
    require("name", &params.name)?;
    params.config.validate(LocationValidation {
        with_bucket_region: true,
    })?;
    check_unique_name(tx, &params.name).await?;

    let row = LocationRow::new(
        new_id(),
        params.name,
        params.description,
        &params.config,
        OffsetDateTime::now_utc(),
    )?;
    tx.insert_location(&row).await?;

    tracing::debug!(location_id = %row.id, name = %row.name, "Created backup location");
    Ok(row)
}

/// Update an existing location.
pub async fn change_location<T>(
    tx: &mut T,
    location_id: &str,
    params: ChangeLocationParams,
) -> MetadataResult<LocationRow>
where
    T: LocationRepo + ?Sized,
{
    if let Some(config) = &params.config {
        config.validate(LocationValidation {
            with_bucket_region: true,
        })?;
    }

    let mut row = tx
        .find_location(location_id)
        .await?
        .ok_or_else(|| MetadataError::NotFound(format!("backup location with ID {location_id:?}")))?;

    if let Some(name) = params.name
        && name != row.name
    {
        require("name", &name)?;
        check_unique_name(tx, &name).await?;
        row.name = name;
    }
    if let Some(description) = params.description {
        row.description = description;
    }
    if let Some(config) = &params.config {
        row.set_config(config)?;
    }
    row.updated_at = OffsetDateTime::now_utc();

    tx.update_location(&row).await?;
    Ok(row)
}
