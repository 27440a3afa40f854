use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use persistence::repositories::{ProblemRepository, SettingRepository};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, rate_limit_middleware, require_admin,
    security_headers_middleware, trace_id, RateLimiterState,
};
use crate::routes::{admin, assets, engagement, events, health, problems, settings, stats};
use crate::services::{AssetStore, LocalAssetStore, ProblemEventBus, SettingsCache};

/// Room for multipart framing on top of the file size limit.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub problems: ProblemRepository,
    pub setting_repo: SettingRepository,
    pub settings: SettingsCache,
    pub events: ProblemEventBus,
    pub assets: Arc<dyn AssetStore>,
    pub rate_limiter: Option<Arc<RateLimiterState>>,
}

impl AppState {
    pub fn new(config: Config, pool: PgPool, settings: SettingsCache) -> Self {
        let assets: Arc<dyn AssetStore> = Arc::new(LocalAssetStore::new(
            &config.storage.root_dir,
            &config.storage.public_base_url,
            config.limits.max_upload_bytes,
        ));
        Self::with_asset_store(config, pool, settings, assets)
    }

    pub fn with_asset_store(
        config: Config,
        pool: PgPool,
        settings: SettingsCache,
        assets: Arc<dyn AssetStore>,
    ) -> Self {
        let rate_limiter = RateLimiterState::new(config.security.rate_limit_per_minute).map(Arc::new);
        let events = ProblemEventBus::new(config.realtime.channel_capacity);

        Self {
            problems: ProblemRepository::new(pool.clone()),
            setting_repo: SettingRepository::new(pool.clone()),
            pool,
            config: Arc::new(config),
            settings,
            events,
            assets,
            rate_limiter,
        }
    }
}

/// Mount point for locally stored assets.
///
/// Relative public base URLs are served by this process; absolute ones point
/// at an external host, and the files stay reachable under `/uploads`.
pub fn uploads_mount_path(public_base_url: &str) -> String {
    let trimmed = public_base_url.trim_end_matches('/');
    if trimmed.starts_with('/') && trimmed.len() > 1 {
        trimmed.to_string()
    } else {
        "/uploads".to_string()
    }
}

pub fn create_app(config: Config, pool: PgPool, settings: SettingsCache) -> Router {
    create_router(AppState::new(config, pool, settings))
}

pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let upload_limit = config.limits.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    // Public reads
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler))
        .route("/api/v1/problems", get(problems::list_problems))
        .route("/api/v1/problems/recent", get(problems::recent_problems))
        .route("/api/v1/problems/:id", get(problems::get_problem))
        .route("/api/v1/problems/:id/events", get(events::problem_events))
        .route("/api/v1/events", get(events::all_events))
        .route("/api/v1/stats", get(stats::get_stats))
        .route("/api/v1/stats/upazilas", get(stats::get_upazila_stats))
        .route("/api/v1/settings/taxonomy", get(settings::get_taxonomy))
        .route("/api/v1/settings/site", get(settings::get_site_settings));

    // Public writes, limited per client address
    let public_write_routes = Router::new()
        .route("/api/v1/problems", post(problems::create_problem))
        .route("/api/v1/problems/:id/vote", post(engagement::vote))
        .route("/api/v1/problems/:id/view", post(engagement::view))
        .route(
            "/api/v1/assets/problem-images",
            post(assets::upload_problem_image)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    let admin_routes = Router::new()
        .route("/api/v1/admin/problems", get(admin::list_problems))
        .route(
            "/api/v1/admin/problems/:id/status",
            patch(admin::update_problem_status),
        )
        .route("/api/v1/admin/problems/:id", delete(admin::delete_problem))
        .route(
            "/api/v1/admin/settings/categories",
            put(admin::replace_categories),
        )
        .route("/api/v1/admin/settings/upazilas", put(admin::replace_upazilas))
        .route("/api/v1/admin/settings/unions", put(admin::replace_unions))
        .route("/api/v1/admin/settings/site-info", put(admin::replace_site_info))
        .route(
            "/api/v1/admin/settings/candidate-info",
            put(admin::replace_candidate_info),
        )
        .route(
            "/api/v1/admin/settings/social-links",
            put(admin::replace_social_links),
        )
        .route(
            "/api/v1/admin/assets/site-assets",
            post(assets::upload_site_asset)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let uploads = ServeDir::new(&config.storage.root_dir);

    Router::new()
        .merge(public_routes)
        .merge(public_write_routes)
        .merge(admin_routes)
        .nest_service(&uploads_mount_path(&config.storage.public_base_url), uploads)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uploads_mount_path() {
        assert_eq!(uploads_mount_path("/uploads"), "/uploads");
        assert_eq!(uploads_mount_path("/static/files/"), "/static/files");
        assert_eq!(uploads_mount_path("https://cdn.example.com/u"), "/uploads");
        assert_eq!(uploads_mount_path("/"), "/uploads");
    }
}
