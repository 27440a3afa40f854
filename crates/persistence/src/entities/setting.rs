//! Setting entities (database row mappings).

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use sqlx::FromRow;

/// Database row mapping for the app_settings table.
#[derive(Debug, Clone, FromRow)]
pub struct AppSettingEntity {
    pub setting_key: String,
    pub setting_value: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

impl AppSettingEntity {
    /// Decodes the stored JSON value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, sqlx::Error> {
        serde_json::from_value(self.setting_value.clone())
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))
    }
}

/// Database row mapping for the site_settings table.
#[derive(Debug, Clone, FromRow)]
pub struct SiteSettingEntity {
    pub setting_type: String,
    pub data: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

impl SiteSettingEntity {
    /// Decodes the stored JSON document.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, sqlx::Error> {
        serde_json::from_value(self.data.clone())
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))
    }
}
