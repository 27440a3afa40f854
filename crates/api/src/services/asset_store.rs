//! Public file storage for problem images and site assets.
//!
//! Files are written under `<root>/<bucket>[/<folder>]/<millis>-<random>.<ext>`
//! and served back under the configured public base URL. Existing files are
//! never overwritten.
//!
//! Only JPEG, PNG, WebP and GIF are accepted. The stored extension always
//! comes from the checked image kind, never from the client's file name.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::info;

/// Bucket for images attached to problems.
pub const PROBLEM_IMAGES_BUCKET: &str = "problem-images";

/// Bucket for logos, candidate photos and symbols.
pub const SITE_ASSETS_BUCKET: &str = "site-assets";

const NAME_ATTEMPTS: usize = 3;

#[derive(Debug, Error)]
pub enum AssetStoreError {
    #[error("empty upload")]
    Empty,

    #[error("upload exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("unsupported content type: {0}")]
    UnsupportedType(String),

    #[error("file content is not a valid {0} image")]
    ContentMismatch(&'static str),

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file accepted by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    /// Path relative to the store root, using `/` separators.
    pub path: String,
    pub public_url: String,
    pub size: usize,
}

/// An upload as received from a client.
#[derive(Debug, Clone, Copy)]
pub struct Upload<'a> {
    pub file_name: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub bytes: &'a [u8],
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn put(
        &self,
        bucket: &str,
        folder: Option<&str>,
        upload: Upload<'_>,
    ) -> Result<StoredAsset, AssetStoreError>;
}

/// Stores assets on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalAssetStore {
    root: PathBuf,
    public_base_url: String,
    max_bytes: usize,
}

impl LocalAssetStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base_url, path)
    }
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    async fn put(
        &self,
        bucket: &str,
        folder: Option<&str>,
        upload: Upload<'_>,
    ) -> Result<StoredAsset, AssetStoreError> {
        if upload.bytes.is_empty() {
            return Err(AssetStoreError::Empty);
        }
        if upload.bytes.len() > self.max_bytes {
            return Err(AssetStoreError::TooLarge {
                limit: self.max_bytes,
            });
        }

        let kind = image_content_type(upload.file_name, upload.content_type)?;
        if ImageKind::sniff(upload.bytes) != Some(kind) {
            return Err(AssetStoreError::ContentMismatch(kind.extension()));
        }

        let prefix = match folder {
            Some(folder) => format!("{}/{}", bucket, folder),
            None => bucket.to_string(),
        };
        let dir = self.root.join(&prefix);
        tokio::fs::create_dir_all(&dir).await?;

        let mut last_err = None;
        for _ in 0..NAME_ATTEMPTS {
            let name = asset_file_name(
                chrono::Utc::now().timestamp_millis(),
                &random_suffix(),
                kind.extension(),
            );
            let target = dir.join(&name);

            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&target)
                .await
            {
                Ok(file) => {
                    write_or_remove(&target, file, upload.bytes).await?;

                    let path = format!("{}/{}", prefix, name);
                    info!(
                        bucket = bucket,
                        path = %path,
                        content_type = kind.content_type(),
                        size = upload.bytes.len(),
                        "Asset stored"
                    );
                    return Ok(StoredAsset {
                        public_url: self.public_url(&path),
                        path,
                        size: upload.bytes.len(),
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => last_err = Some(e),
                Err(e) => return Err(e.into()),
            }
        }

        Err(AssetStoreError::Io(last_err.unwrap_or_else(|| {
            std::io::Error::new(ErrorKind::AlreadyExists, "no free asset name")
        })))
    }
}

/// `<millis>-<random>.<ext>`
pub fn asset_file_name(millis: i64, random: &str, extension: &str) -> String {
    format!("{}-{}.{}", millis, random, extension)
}

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect()
}

/// Writes the whole upload, removing the file again if any write fails.
async fn write_or_remove<W>(path: &Path, mut file: W, bytes: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written = match file.write_all(bytes).await {
        Ok(()) => file.flush().await,
        Err(e) => Err(e),
    };
    if written.is_err() {
        drop(file);
        let _ = tokio::fs::remove_file(path).await;
    }
    written
}

/// Image formats the store accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
    Gif,
}

impl ImageKind {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageKind::Jpeg),
            "image/png" => Some(ImageKind::Png),
            "image/webp" => Some(ImageKind::Webp),
            "image/gif" => Some(ImageKind::Gif),
            _ => None,
        }
    }

    /// Detects the format from the file signature.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]) {
            Some(ImageKind::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageKind::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageKind::Gif)
        } else if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
            Some(ImageKind::Webp)
        } else {
            None
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Webp => "image/webp",
            ImageKind::Gif => "image/gif",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::Webp => "webp",
            ImageKind::Gif => "gif",
        }
    }
}

/// Resolves the upload's declared image kind.
///
/// A declared type wins; otherwise the type is guessed from the file name.
pub fn image_content_type(
    file_name: Option<&str>,
    declared: Option<&str>,
) -> Result<ImageKind, AssetStoreError> {
    let content_type = declared
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase())
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream")
        .or_else(|| {
            file_name
                .and_then(|name| mime_guess::from_path(name).first())
                .map(|mime| mime.essence_str().to_string())
        })
        .unwrap_or_default();

    ImageKind::from_content_type(&content_type).ok_or_else(|| {
        AssetStoreError::UnsupportedType(if content_type.is_empty() {
            "unknown".to_string()
        } else {
            content_type
        })
    })
}
