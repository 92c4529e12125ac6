//! Image storage for uploaded catalog pictures.
//!
//! Files live flat in the upload directory and are served under
//! `/static/images/`. Names are sanitized before use and never overwrite an
//! existing file: a taken `name.ext` becomes `name-1.ext`, `name-2.ext`, ...

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use url::Url;

/// Extensions accepted for uploaded images (lowercase).
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// URL path prefix images are served under.
pub const IMAGES_PATH: &str = "/static/images";

const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Errors that can occur when validating or storing an image.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("image file is empty")]
    EmptyFile,

    #[error("image filename is invalid")]
    InvalidName,

    #[error("image must be one of: png, jpg, jpeg, gif, webp")]
    UnsupportedType,

    #[error("no free filename for '{0}'")]
    NoFreeName(String),

    #[error("failed to write image: {0}")]
    Io(#[from] io::Error),
}

/// Reduce a client-supplied filename to a safe flat name.
///
/// Keeps the final path component, turns whitespace runs into `_`, drops
/// anything outside `[A-Za-z0-9._-]`, and trims leading and trailing `.`
/// and `_`. Returns an empty string when nothing usable is left.
#[must_use]
pub fn sanitize_filename(raw: &str) -> String {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or_default();

    let joined = last.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    kept.trim_matches(['.', '_']).to_owned()
}

/// Lowercase extension of `name`, if it has one.
fn extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Candidate name for the `attempt`-th try: `name.ext`, `name-1.ext`, ...
fn candidate(name: &str, attempt: u32) -> String {
    if attempt == 0 {
        return name.to_owned();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}-{attempt}.{ext}"),
        None => format!("{name}-{attempt}"),
    }
}

/// Public URL of a stored image, relative to `base_url`.
#[must_use]
pub fn image_url(base_url: &Url, name: &str) -> Url {
    let mut url = base_url.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments
            .pop_if_empty()
            .extend(IMAGES_PATH.trim_start_matches('/').split('/'))
            .push(name);
    }
    url
}

/// Flat directory of uploaded images.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory the images are written to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Check an upload without touching the filesystem.
    ///
    /// Returns the sanitized filename to pass to [`ImageStore::store`].
    ///
    /// # Errors
    ///
    /// Returns `UploadError::EmptyFile`, `UploadError::InvalidName`, or
    /// `UploadError::UnsupportedType`.
    pub fn validate(filename: &str, bytes: &[u8]) -> Result<String, UploadError> {
        let name = sanitize_filename(filename);
        if name.is_empty() {
            return Err(UploadError::InvalidName);
        }

        let ext = extension(&name).ok_or(UploadError::UnsupportedType)?;
        if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(UploadError::UnsupportedType);
        }

        if bytes.is_empty() {
            return Err(UploadError::EmptyFile);
        }

        Ok(name)
    }

    /// Write `bytes` under `name`, or the first free uniquified variant.
    ///
    /// `name` must already be sanitized. Returns the name actually used.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::NoFreeName` when every candidate is taken, or
    /// `UploadError::Io` if the directory or file cannot be written.
    pub async fn store(&self, name: &str, bytes: &[u8]) -> Result<String, UploadError> {
        fs::create_dir_all(&self.dir).await?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let stored = candidate(name, attempt);
            let path = self.dir.join(&stored);

            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };

            let written = async {
                file.write_all(bytes).await?;
                file.flush().await
            }
            .await;

            if let Err(e) = written {
                drop(file);
                self.remove(&stored).await;
                return Err(e.into());
            }

            tracing::debug!(image = %stored, bytes = bytes.len(), "image stored");
            return Ok(stored);
        }

        Err(UploadError::NoFreeName(name.to_owned()))
    }

    /// Delete a stored image. Failures are logged, not returned.
    pub async fn remove(&self, name: &str) {
        if let Err(e) = fs::remove_file(self.dir.join(name)).await {
            tracing::warn!(image = %name, error = %e, "failed to remove image");
        }
    }
}
