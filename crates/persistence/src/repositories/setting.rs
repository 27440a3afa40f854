//! Setting repository for the taxonomy and site metadata tables.

use domain::models::{SettingKey, SiteSettingType, SiteSettings, Taxonomy};
use sqlx::PgPool;
use tracing::info;

use crate::entities::{AppSettingEntity, SiteSettingEntity};
use crate::metrics::QueryTimer;

/// Repository for settings database operations.
#[derive(Clone)]
pub struct SettingRepository {
    pool: PgPool,
}

impl SettingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get one app setting row.
    pub async fn get_app_setting(
        &self,
        key: SettingKey,
    ) -> Result<Option<AppSettingEntity>, sqlx::Error> {
        let timer = QueryTimer::new("get_app_setting");
        let result = sqlx::query_as::<_, AppSettingEntity>(
            r#"
            SELECT setting_key, setting_value, updated_at
            FROM app_settings
            WHERE setting_key = $1
            "#,
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    /// Replace an app setting value as a whole.
    pub async fn replace_app_setting(
        &self,
        key: SettingKey,
        value: &serde_json::Value,
    ) -> Result<AppSettingEntity, sqlx::Error> {
        let timer = QueryTimer::new("replace_app_setting");
        let result = sqlx::query_as::<_, AppSettingEntity>(
            r#"
            INSERT INTO app_settings (setting_key, setting_value, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (setting_key)
            DO UPDATE SET setting_value = EXCLUDED.setting_value, updated_at = NOW()
            RETURNING setting_key, setting_value, updated_at
            "#,
        )
        .bind(key.as_str())
        .bind(value)
        .fetch_one(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    /// Get one site setting row.
    pub async fn get_site_setting(
        &self,
        setting_type: SiteSettingType,
    ) -> Result<Option<SiteSettingEntity>, sqlx::Error> {
        let timer = QueryTimer::new("get_site_setting");
        let result = sqlx::query_as::<_, SiteSettingEntity>(
            r#"
            SELECT setting_type, data, updated_at
            FROM site_settings
            WHERE setting_type = $1
            "#,
        )
        .bind(setting_type.as_str())
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    /// Replace a site setting document as a whole.
    pub async fn replace_site_setting(
        &self,
        setting_type: SiteSettingType,
        data: &serde_json::Value,
    ) -> Result<SiteSettingEntity, sqlx::Error> {
        let timer = QueryTimer::new("replace_site_setting");
        let result = sqlx::query_as::<_, SiteSettingEntity>(
            r#"
            INSERT INTO site_settings (setting_type, data, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (setting_type)
            DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
            RETURNING setting_type, data, updated_at
            "#,
        )
        .bind(setting_type.as_str())
        .bind(data)
        .fetch_one(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    /// Load the full taxonomy. Missing rows load as empty.
    pub async fn load_taxonomy(&self) -> Result<Taxonomy, sqlx::Error> {
        let mut taxonomy = Taxonomy::default();
        if let Some(row) = self.get_app_setting(SettingKey::Categories).await? {
            taxonomy.categories = row.decode()?;
        }
        if let Some(row) = self.get_app_setting(SettingKey::Upazilas).await? {
            taxonomy.upazilas = row.decode()?;
        }
        if let Some(row) = self.get_app_setting(SettingKey::Unions).await? {
            taxonomy.unions = row.decode()?;
        }
        Ok(taxonomy)
    }

    /// Load all site settings. Missing rows load as defaults.
    pub async fn load_site_settings(&self) -> Result<SiteSettings, sqlx::Error> {
        let mut settings = SiteSettings::default();
        if let Some(row) = self.get_site_setting(SiteSettingType::SiteInfo).await? {
            settings.site_info = row.decode()?;
        }
        if let Some(row) = self.get_site_setting(SiteSettingType::CandidateInfo).await? {
            settings.candidate_info = row.decode()?;
        }
        if let Some(row) = self.get_site_setting(SiteSettingType::SocialLinks).await? {
            settings.social_links = row.decode()?;
        }
        Ok(settings)
    }

    /// Insert the taxonomy rows that do not exist yet.
    ///
    /// Returns the number of rows inserted.
    pub async fn seed_taxonomy(&self, taxonomy: &Taxonomy) -> Result<u64, sqlx::Error> {
        let values = [
            (SettingKey::Categories, serde_json::to_value(&taxonomy.categories)),
            (SettingKey::Upazilas, serde_json::to_value(&taxonomy.upazilas)),
            (SettingKey::Unions, serde_json::to_value(&taxonomy.unions)),
        ];

        let timer = QueryTimer::new("seed_app_settings");
        let mut inserted = 0;
        for (key, value) in values {
            let value = value.map_err(|e| {
                sqlx::Error::Protocol(format!("invalid seed value for {}: {e}", key.as_str()))
            })?;
            let result = sqlx::query(
                r#"
                INSERT INTO app_settings (setting_key, setting_value)
                VALUES ($1, $2)
                ON CONFLICT (setting_key) DO NOTHING
                "#,
            )
            .bind(key.as_str())
            .bind(&value)
            .execute(&self.pool)
            .await?;
            inserted += result.rows_affected();
        }
        timer.record();

        if inserted > 0 {
            info!(rows = inserted, "Seeded default taxonomy settings");
        }
        Ok(inserted)
    }
}
