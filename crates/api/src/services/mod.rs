//! Application services shared by the route handlers.

pub mod asset_store;
pub mod realtime;
pub mod settings_cache;

pub use asset_store::{
    AssetStore, AssetStoreError, ImageKind, LocalAssetStore, StoredAsset, Upload,
};
pub use realtime::ProblemEventBus;
pub use settings_cache::{SettingsCache, SettingsUpdateError};
