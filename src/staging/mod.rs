//! Staging area
//!
//! Files and links the signed-in user has staged. Nothing here is
//! transferred or persisted: a staged file is its name and size, and the
//! lists live only as long as the process.

mod catalog;

pub use catalog::{SAMPLE_DOWNLOADS, SampleDownload};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::error::AppError;
use crate::metrics::STAGED_ITEMS;

/// File extensions offered by the file picker
pub const ACCEPTED_EXTENSIONS: &[&str] = &[".zip", ".rar", ".7z", ".tar", ".gz"];

/// Staged local file
#[derive(Debug, Clone, PartialEq)]
pub struct StagedFile {
    pub id: Ulid,
    pub name: String,
    pub size_bytes: u64,
    pub added_at: DateTime<Utc>,
}

/// Staged link
#[derive(Debug, Clone, PartialEq)]
pub struct StagedLink {
    pub id: Ulid,
    pub url: String,
    pub added_at: DateTime<Utc>,
}

/// Whether the picker would offer a file with this name
pub fn is_accepted_file_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    ACCEPTED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Normalize and check a submitted link
///
/// # Returns
/// The trimmed link as submitted
///
/// # Errors
/// Blank input, or anything that is not an absolute http(s) URL
pub fn validate_link(input: &str) -> Result<String, AppError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Link must not be empty".to_string()));
    }

    let parsed = url::Url::parse(trimmed)
        .map_err(|e| AppError::Validation(format!("Invalid link: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::Validation(format!(
            "Unsupported link scheme: {}",
            parsed.scheme()
        )));
    }

    Ok(trimmed.to_string())
}

/// In-memory staged files and links, in insertion order
#[derive(Default)]
pub struct StagingArea {
    files: RwLock<Vec<StagedFile>>,
    links: RwLock<Vec<StagedLink>>,
}

impl StagingArea {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn files(&self) -> Vec<StagedFile> {
        self.files.read().await.clone()
    }

    pub async fn links(&self) -> Vec<StagedLink> {
        self.links.read().await.clone()
    }

    /// Append files in the given order
    pub async fn add_files(
        &self,
        files: impl IntoIterator<Item = (String, u64)>,
    ) -> Vec<StagedFile> {
        let now = Utc::now();
        let added: Vec<StagedFile> = files
            .into_iter()
            .map(|(name, size_bytes)| StagedFile {
                id: Ulid::new(),
                name,
                size_bytes,
                added_at: now,
            })
            .collect();

        let mut files = self.files.write().await;
        files.extend(added.iter().cloned());
        STAGED_ITEMS
            .with_label_values(&["file"])
            .set(files.len() as i64);

        added
    }

    /// Remove a staged file; unknown ids are ignored
    pub async fn remove_file(&self, id: Ulid) -> Option<StagedFile> {
        let mut files = self.files.write().await;
        let removed = files
            .iter()
            .position(|f| f.id == id)
            .map(|index| files.remove(index));
        STAGED_ITEMS
            .with_label_values(&["file"])
            .set(files.len() as i64);
        removed
    }

    /// Validate and append a link
    pub async fn add_link(&self, input: &str) -> Result<StagedLink, AppError> {
        let url = validate_link(input)?;
        let link = StagedLink {
            id: Ulid::new(),
            url,
            added_at: Utc::now(),
        };

        let mut links = self.links.write().await;
        links.push(link.clone());
        STAGED_ITEMS
            .with_label_values(&["link"])
            .set(links.len() as i64);

        Ok(link)
    }

    /// Remove a staged link; unknown ids are ignored
    pub async fn remove_link(&self, id: Ulid) -> Option<StagedLink> {
        let mut links = self.links.write().await;
        let removed = links
            .iter()
            .position(|l| l.id == id)
            .map(|index| links.remove(index));
        STAGED_ITEMS
            .with_label_values(&["link"])
            .set(links.len() as i64);
        removed
    }
}
