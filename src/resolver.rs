// Attachment resolution: decides how a material is fetched and writes Drive
// downloads to disk.

use crate::api::DriveService;
use crate::error::{Error, Result};
use crate::models::Material;
use std::ffi::OsString;
use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// How a Drive-native format is converted before download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportRule {
    pub source: &'static str,
    pub target: &'static str,
    pub extension: &'static str,
}

pub static EXPORT_RULES: [ExportRule; 4] = [
    ExportRule {
        source: "application/vnd.google-apps.document",
        target: "application/rtf",
        extension: ".rtf",
    },
    ExportRule {
        source: "application/vnd.google-apps.spreadsheet",
        target: "text/csv",
        extension: ".csv",
    },
    ExportRule {
        source: "application/vnd.google-apps.presentation",
        target: "application/vnd.oasis.opendocument.presentation",
        extension: ".odp",
    },
    ExportRule {
        source: "application/vnd.google-apps.drawing",
        target: "image/png",
        extension: ".png",
    },
];

pub fn export_rule(source_mime: &str) -> Option<&'static ExportRule> {
    EXPORT_RULES.iter().find(|rule| rule.source == source_mime)
}

/// How the bytes of a Drive file are obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchPlan {
    /// Convert a Drive-native document to `target_mime`.
    Export {
        file_id: String,
        target_mime: &'static str,
        extension: &'static str,
    },
    /// Download the stored bytes unchanged.
    Raw { file_id: String },
}

impl FetchPlan {
    pub fn for_mime(file_id: &str, source_mime: &str) -> Self {
        match export_rule(source_mime) {
            Some(rule) => FetchPlan::Export {
                file_id: file_id.to_string(),
                target_mime: rule.target,
                extension: rule.extension,
            },
            None => FetchPlan::Raw {
                file_id: file_id.to_string(),
            },
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FetchPlan::Export { extension, .. } => *extension,
            FetchPlan::Raw { .. } => "",
        }
    }
}

/// What to do with a selected material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadPlan {
    Drive(FetchPlan),
    /// Hand the video id to the external video pipeline.
    Video { id: String },
    /// Hand the URL to the external browser.
    Browse { url: String },
}

/// A file written by [`AttachmentResolver::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalArtifact {
    pub path: PathBuf,
    pub bytes: u64,
}

pub struct AttachmentResolver<D> {
    drive: D,
}

impl<D: DriveService> AttachmentResolver<D> {
    pub fn new(drive: D) -> Self {
        Self { drive }
    }

    /// Pick the retrieval strategy for `material`. Drive files cost one
    /// metadata request; videos and links are decided locally.
    pub fn resolve(&self, material: &Material) -> Result<DownloadPlan> {
        let plan = match material {
            Material::DriveFile { id, .. } => {
                let mime = self.drive.file_mime_type(id)?;
                let plan = FetchPlan::for_mime(id, &mime);
                debug!(file_id = %id, %mime, ?plan, "resolved drive file");
                DownloadPlan::Drive(plan)
            }
            Material::YoutubeVideo { id, .. } => DownloadPlan::Video { id: id.clone() },
            Material::Link { url, .. } => DownloadPlan::Browse { url: url.clone() },
        };
        Ok(plan)
    }

    /// Fetch the file described by `plan` into `destination_base` plus the
    /// plan's extension. The transfer is requested before anything is
    /// created. Bytes land in a `.part` file that is renamed into place only
    /// once the transfer completes and is removed if it breaks midway.
    pub fn execute(&self, plan: &FetchPlan, destination_base: &Path) -> Result<LocalArtifact> {
        let mut body = match plan {
            FetchPlan::Export {
                file_id,
                target_mime,
                ..
            } => self.drive.export(file_id, target_mime)?,
            FetchPlan::Raw { file_id } => self.drive.media(file_id)?,
        };

        let path = append_extension(destination_base, plan.extension());
        let partial = append_extension(&path, ".part");
        let drained = File::create(&partial)
            .map_err(|source| Error::LocalIo {
                path: partial.clone(),
                source,
            })
            .and_then(|mut file| drain(&mut *body, &mut file, &partial));
        let bytes = match drained {
            Ok(bytes) => bytes,
            Err(err) => {
                if let Err(e) = std::fs::remove_file(&partial) {
                    debug!(path = %partial.display(), error = %e, "no partial file to remove");
                }
                return Err(err);
            }
        };
        std::fs::rename(&partial, &path).map_err(|source| Error::LocalIo {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), bytes, "download complete");
        Ok(LocalArtifact { path, bytes })
    }
}

fn drain(body: &mut dyn Read, file: &mut File, path: &Path) -> Result<u64> {
    let mut buf = vec![0u8; 64 * 1024];
    let mut total = 0u64;
    loop {
        let n = match body.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::remote("download file", e)),
        };
        file.write_all(&buf[..n]).map_err(|source| Error::LocalIo {
            path: path.to_path_buf(),
            source,
        })?;
        total += n as u64;
    }
    file.flush().map_err(|source| Error::LocalIo {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(total)
}

fn append_extension(base: &Path, extension: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(extension);
    PathBuf::from(name)
}

/// Where a material named `name` is saved inside `dir`. Titles are used as
/// file names, so separators and control characters are replaced.
pub fn destination_base(dir: &Path, name: &str) -> PathBuf {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let file_name = match cleaned.as_str() {
        "" | "." | ".." => "download".to_string(),
        _ => cleaned,
    };
    dir.join(file_name)
}
