//! Runtime settings loaded via OrthoConfig.
//!
//! Values come from `PERSONNEL_*` environment variables (or a config file
//! discovered by OrthoConfig) and fall back to the defaults below.

use std::ffi::OsString;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::attributes::{UniqueAttributeNames, UniquenessValidator};
use crate::domain::Error;

/// Configuration for the personnel backend.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "PERSONNEL")]
pub struct PersonnelSettings {
    /// PostgreSQL connection string. Required for the Diesel store.
    pub database_url: Option<String>,
    /// Maximum pooled connections.
    #[ortho_config(default = 10)]
    pub pool_max_size: u32,
    /// Idle connections kept warm.
    #[ortho_config(default = 2)]
    pub pool_min_idle: u32,
    /// Seconds to wait for a pooled connection.
    #[ortho_config(default = 30)]
    pub connection_timeout_secs: u64,
    /// Comma-separated attribute names whose values must be unique across
    /// employees. Defaults to `email,registration_number`.
    pub unique_attributes: Option<String>,
}

impl PersonnelSettings {
    /// Load from the environment and config files only, ignoring process
    /// arguments (the binary parses its own subcommands).
    pub fn load_from_environment() -> Result<Self, Error> {
        Self::load_from_iter([OsString::from("personnel")])
            .map_err(|err| Error::invalid_request(format!("invalid configuration: {err}")))
    }

    /// Connection string, or an error naming the missing variable.
    pub fn require_database_url(&self) -> Result<&str, Error> {
        self.database_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| Error::invalid_request("PERSONNEL_DATABASE_URL must be set"))
    }

    /// Pool checkout timeout.
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Parsed uniqueness-sensitive attribute names.
    pub fn unique_attribute_names(&self) -> Result<UniqueAttributeNames, Error> {
        match self.unique_attributes.as_deref() {
            None => Ok(UniqueAttributeNames::default()),
            Some(list) => UniqueAttributeNames::parse(list).map_err(|err| {
                Error::invalid_request(format!("PERSONNEL_UNIQUE_ATTRIBUTES: {err}"))
            }),
        }
    }

    /// Validator configured with [`Self::unique_attribute_names`].
    pub fn uniqueness_validator(&self) -> Result<UniquenessValidator, Error> {
        self.unique_attribute_names().map(UniquenessValidator::new)
    }
}
