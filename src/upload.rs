use actix_multipart::form::tempfile::TempFile;
use actix_web::web;
use chrono::Utc;
use rand::Rng;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::api::error::{ApiError, ApiResult};

/// URL prefix under which stored files are served
pub const PUBLIC_PREFIX: &str = "/uploads";

/// What an uploaded file is for; decides the accepted extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    CompanyLogo,
    Resume,
}

impl UploadKind {
    pub fn field(&self) -> &'static str {
        match self {
            UploadKind::CompanyLogo => "companyLogo",
            UploadKind::Resume => "resume",
        }
    }

    fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            UploadKind::CompanyLogo => &["jpg", "jpeg", "png", "gif", "webp", "svg"],
            UploadKind::Resume => &["pdf", "doc", "docx"],
        }
    }
}

/// Validated, lowercased extension of a client-supplied file name
pub fn extension_for(file_name: Option<&str>, kind: UploadKind) -> ApiResult<String> {
    let ext = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| ApiError::invalid(format!("{} must have a file extension", kind.field())))?;

    if kind.allowed_extensions().contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(ApiError::invalid(format!(
            "{} must be one of: {}",
            kind.field(),
            kind.allowed_extensions().join(", ")
        )))
    }
}

/// `<field>-<millis>-<random>.<ext>`
pub fn stored_name(kind: UploadKind, ext: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen();
    format!(
        "{}-{}-{:08x}.{}",
        kind.field(),
        Utc::now().timestamp_millis(),
        suffix,
        ext
    )
}

/// Shared directory holding uploaded logos and resumes
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    max_file_size: usize,
}

impl UploadStore {
    pub fn new(dir: PathBuf, max_file_size: usize) -> Self {
        Self { dir, max_file_size }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)
    }

    /// Move an uploaded temp file into the store, returning its public path
    pub async fn save(&self, file: TempFile, kind: UploadKind) -> ApiResult<String> {
        if file.size > self.max_file_size {
            return Err(ApiError::invalid(format!(
                "{} exceeds the maximum size of {} bytes",
                kind.field(),
                self.max_file_size
            )));
        }

        let ext = extension_for(file.file_name.as_deref(), kind)?;
        let name = stored_name(kind, &ext);
        let dest = self.dir.join(&name);

        debug!("Storing {} upload ({} bytes) as {}", kind.field(), file.size, name);
        let temp = file.file;
        web::block(move || std::fs::copy(temp.path(), &dest)).await??;

        info!("Stored upload {}", name);
        Ok(format!("{}/{}", PUBLIC_PREFIX, name))
    }

    /// Best-effort removal of a previously stored file
    pub async fn remove(&self, public_path: &str) {
        let Some(path) = self.resolve(public_path) else {
            debug!("Not removing {}: outside upload store", public_path);
            return;
        };

        match web::block(move || std::fs::remove_file(path)).await {
            Ok(Ok(())) => info!("Removed upload {}", public_path),
            Ok(Err(e)) => warn!("Failed to remove upload {}: {}", public_path, e),
            Err(e) => warn!("Failed to remove upload {}: {}", public_path, e),
        }
    }

    fn resolve(&self, public_path: &str) -> Option<PathBuf> {
        let name = public_path.strip_prefix(PUBLIC_PREFIX)?.strip_prefix('/')?;
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
            return None;
        }
        Some(self.dir.join(name))
    }
}
