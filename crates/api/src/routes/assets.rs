//! File upload endpoints.

use axum::{
    extract::{multipart::MultipartError, Multipart, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::SiteAssetFolder;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_asset_uploaded;
use crate::services::asset_store::{PROBLEM_IMAGES_BUCKET, SITE_ASSETS_BUCKET};
use crate::services::{StoredAsset, Upload};

/// Multipart field carrying the file.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    pub path: String,
    pub size: usize,
}

impl From<StoredAsset> for UploadResponse {
    fn from(asset: StoredAsset) -> Self {
        Self {
            url: asset.public_url,
            path: asset.path,
            size: asset.size,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SiteAssetQuery {
    pub folder: String,
}

struct ReceivedFile {
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::Validation(err.body_text())
    }
}

/// Reads the `file` field, skipping any other fields.
async fn read_file(mut multipart: Multipart) -> Result<ReceivedFile, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok(ReceivedFile {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(ApiError::Validation(format!(
        "Multipart field '{}' is required",
        FILE_FIELD
    )))
}

async fn store(
    state: &AppState,
    bucket: &'static str,
    folder: Option<&str>,
    file: &ReceivedFile,
) -> Result<UploadResponse, ApiError> {
    let asset = state
        .assets
        .put(
            bucket,
            folder,
            Upload {
                file_name: file.file_name.as_deref(),
                content_type: file.content_type.as_deref(),
                bytes: &file.bytes,
            },
        )
        .await?;
    record_asset_uploaded(bucket);
    Ok(asset.into())
}

/// POST /api/v1/assets/problem-images
///
/// Stores one image and returns its public URL.
pub async fn upload_problem_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let file = read_file(multipart).await?;
    let response = store(&state, PROBLEM_IMAGES_BUCKET, None, &file).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/admin/assets/site-assets?folder=logos|photos|symbols
pub async fn upload_site_asset(
    State(state): State<AppState>,
    Query(query): Query<SiteAssetQuery>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let folder: SiteAssetFolder = query.folder.parse()?;
    let file = read_file(multipart).await?;
    let response = store(&state, SITE_ASSETS_BUCKET, Some(folder.as_str()), &file).await?;
    tracing::info!(folder = folder.as_str(), path = %response.path, "Site asset uploaded");
    Ok((StatusCode::CREATED, Json(response)))
}
