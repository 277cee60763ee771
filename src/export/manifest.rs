//! The list of files that make up an exported image.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::home::{CONFIG_FILENAME, NVRAM_FILENAME};

use super::disk::{find_parts, DiskImage};

/// Media type of a manifest entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MediaType {
    /// Disk image or disk chunk.
    #[serde(rename = "application/vnd.oci.image.layer.v1.tar")]
    ImageLayer,
    /// VM `config.json`.
    #[serde(rename = "application/vnd.oci.image.config.v1+json")]
    ImageConfig,
    /// Opaque binary (`nvram.bin`).
    #[serde(rename = "application/octet-stream")]
    OctetStream,
}

impl MediaType {
    /// The media type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::ImageLayer => "application/vnd.oci.image.layer.v1.tar",
            MediaType::ImageConfig => "application/vnd.oci.image.config.v1+json",
            MediaType::OctetStream => "application/octet-stream",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a chunk within a split disk image (1-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Part {
    /// Chunk number, starting at 1.
    pub number: usize,
    /// Number of chunks.
    pub total: usize,
}

/// One file of the exported image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    /// File name within the export work directory.
    pub path: String,
    /// Media type annotation.
    pub media_type: MediaType,
    /// Chunk position, for split disk images.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part: Option<Part>,
}

impl ManifestEntry {
    /// An entry for a whole file.
    pub fn new(path: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            path: path.into(),
            media_type,
            part: None,
        }
    }

    /// An entry for one disk chunk.
    pub fn chunk(path: impl Into<String>, number: usize, total: usize) -> Self {
        Self {
            path: path.into(),
            media_type: MediaType::ImageLayer,
            part: Some(Part { number, total }),
        }
    }
}

/// `<path>:<media-type>[;part.number=<n>;part.total=<m>]`
impl fmt::Display for ManifestEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.media_type)?;
        if let Some(part) = &self.part {
            write!(f, ";part.number={};part.total={}", part.number, part.total)?;
        }
        Ok(())
    }
}

/// The exported image: its tag and files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest {
    /// Image tag.
    pub tag: String,
    /// Files, disk first, then `config.json` and `nvram.bin`.
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Manifest lines in display form.
    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(ToString::to_string).collect()
    }

    /// Pretty-printed JSON form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Describe the contents of `work_dir` after the disk was processed.
pub fn build_manifest(work_dir: &Path, disk: &DiskImage, tag: &str) -> Result<Manifest> {
    let mut entries = Vec::new();

    match disk {
        DiskImage::Whole(path) => {
            entries.push(ManifestEntry::new(file_name(path), MediaType::ImageLayer));
        }
        DiskImage::Split => {
            let parts = find_parts(work_dir)?;
            let total = parts.len();
            for (index, part) in parts.iter().enumerate() {
                entries.push(ManifestEntry::chunk(file_name(part), index + 1, total));
            }
        }
        DiskImage::Missing => {}
    }

    if work_dir.join(CONFIG_FILENAME).is_file() {
        entries.push(ManifestEntry::new(CONFIG_FILENAME, MediaType::ImageConfig));
    }
    if work_dir.join(NVRAM_FILENAME).is_file() {
        entries.push(ManifestEntry::new(NVRAM_FILENAME, MediaType::OctetStream));
    }

    Ok(Manifest {
        tag: tag.to_string(),
        entries,
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
