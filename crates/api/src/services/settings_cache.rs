//! In-memory copy of the portal settings.
//!
//! Loaded once at startup. Admin saves write the database first and then
//! replace the cached value, so readers never query the settings tables.

use std::collections::BTreeMap;
use std::sync::Arc;

use domain::models::setting::{
    validate_category_options, validate_union_map, validate_upazila_options,
};
use domain::models::{
    CandidateInfo, SettingKey, SettingsOption, SiteInfo, SiteSettingType, SiteSettings,
    SocialLinks, Taxonomy,
};
use persistence::repositories::SettingRepository;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;
use validator::{Validate, ValidationErrors};

/// Errors from a settings save.
#[derive(Debug, Error)]
pub enum SettingsUpdateError {
    #[error("invalid settings value")]
    Invalid(#[from] ValidationErrors),

    #[error("settings store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("settings encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Default)]
struct Snapshot {
    taxonomy: Taxonomy,
    site: SiteSettings,
}

/// Shared, write-through settings cache.
#[derive(Debug, Clone, Default)]
pub struct SettingsCache {
    inner: Arc<RwLock<Snapshot>>,
}

impl SettingsCache {
    pub fn new(taxonomy: Taxonomy, site: SiteSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Snapshot { taxonomy, site })),
        }
    }

    /// Reads every settings row once.
    pub async fn load(repo: &SettingRepository) -> Result<Self, sqlx::Error> {
        let taxonomy = repo.load_taxonomy().await?;
        let site = repo.load_site_settings().await?;
        info!(
            categories = taxonomy.categories.len(),
            upazilas = taxonomy.upazilas.len(),
            "Settings cache loaded"
        );
        Ok(Self::new(taxonomy, site))
    }

    pub async fn taxonomy(&self) -> Taxonomy {
        self.inner.read().await.taxonomy.clone()
    }

    pub async fn site(&self) -> SiteSettings {
        self.inner.read().await.site.clone()
    }

    pub async fn replace_categories(
        &self,
        repo: &SettingRepository,
        categories: Vec<SettingsOption>,
    ) -> Result<Taxonomy, SettingsUpdateError> {
        validate_category_options(&categories)?;
        let mut snapshot = self.inner.write().await;
        save_app(repo, SettingKey::Categories, &categories).await?;
        snapshot.taxonomy.categories = categories;
        Ok(snapshot.taxonomy.clone())
    }

    pub async fn replace_upazilas(
        &self,
        repo: &SettingRepository,
        upazilas: Vec<SettingsOption>,
    ) -> Result<Taxonomy, SettingsUpdateError> {
        validate_upazila_options(&upazilas)?;
        let mut snapshot = self.inner.write().await;
        save_app(repo, SettingKey::Upazilas, &upazilas).await?;
        snapshot.taxonomy.upazilas = upazilas;
        Ok(snapshot.taxonomy.clone())
    }

    /// Unions must be keyed by upazilas that are configured at save time.
    pub async fn replace_unions(
        &self,
        repo: &SettingRepository,
        unions: BTreeMap<String, Vec<SettingsOption>>,
    ) -> Result<Taxonomy, SettingsUpdateError> {
        let mut snapshot = self.inner.write().await;
        validate_union_map(&unions, &snapshot.taxonomy.upazilas)?;
        save_app(repo, SettingKey::Unions, &unions).await?;
        snapshot.taxonomy.unions = unions;
        Ok(snapshot.taxonomy.clone())
    }

    pub async fn replace_site_info(
        &self,
        repo: &SettingRepository,
        site_info: SiteInfo,
    ) -> Result<SiteSettings, SettingsUpdateError> {
        site_info.validate()?;
        let mut snapshot = self.inner.write().await;
        save_site(repo, SiteSettingType::SiteInfo, &site_info).await?;
        snapshot.site.site_info = site_info;
        Ok(snapshot.site.clone())
    }

    pub async fn replace_candidate_info(
        &self,
        repo: &SettingRepository,
        candidate_info: CandidateInfo,
    ) -> Result<SiteSettings, SettingsUpdateError> {
        candidate_info.validate()?;
        let mut snapshot = self.inner.write().await;
        save_site(repo, SiteSettingType::CandidateInfo, &candidate_info).await?;
        snapshot.site.candidate_info = candidate_info;
        Ok(snapshot.site.clone())
    }

    pub async fn replace_social_links(
        &self,
        repo: &SettingRepository,
        social_links: SocialLinks,
    ) -> Result<SiteSettings, SettingsUpdateError> {
        social_links.validate()?;
        let mut snapshot = self.inner.write().await;
        save_site(repo, SiteSettingType::SocialLinks, &social_links).await?;
        snapshot.site.social_links = social_links;
        Ok(snapshot.site.clone())
    }
}

async fn save_app<T: Serialize>(
    repo: &SettingRepository,
    key: SettingKey,
    value: &T,
) -> Result<(), SettingsUpdateError> {
    let value = serde_json::to_value(value)?;
    repo.replace_app_setting(key, &value).await?;
    info!(setting_key = %key, "App setting replaced");
    Ok(())
}

async fn save_site<T: Serialize>(
    repo: &SettingRepository,
    setting_type: SiteSettingType,
    value: &T,
) -> Result<(), SettingsUpdateError> {
    let value = serde_json::to_value(value)?;
    repo.replace_site_setting(setting_type, &value).await?;
    info!(setting_type = %setting_type, "Site setting replaced");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_return_loaded_values() {
        let site = SiteSettings {
            site_info: SiteInfo {
                site_name: "জনতার কণ্ঠ".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let cache = SettingsCache::new(Taxonomy::default_seed(), site.clone());

        assert_eq!(cache.taxonomy().await, Taxonomy::default_seed());
        assert_eq!(cache.site().await, site);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let cache = SettingsCache::default();
        let clone = cache.clone();
        assert!(clone.taxonomy().await.upazilas.is_empty());
        assert!(Arc::ptr_eq(&cache.inner, &clone.inner));
    }
}
