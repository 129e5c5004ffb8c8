//! Copy or link build outputs into the installation prefix.
//!
//! Each [`InstallMapping`] is installed independently. A failing mapping does
//! not stop the others and nothing already installed is rolled back; the first
//! failure is reported once every mapping has been attempted.

use crate::error::{BuildError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
#[cfg(unix)]
use std::os::unix::fs as unix_fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingKind {
    File,
    Directory,
    /// Create a symlink at the destination pointing at the source
    SymlinkHint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallMapping {
    /// For symlinks, a relative source is resolved against the link's parent
    pub source: PathBuf,
    /// Relative to the prefix
    pub destination: PathBuf,
    pub kind: MappingKind,
}

impl InstallMapping {
    pub fn file(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            kind: MappingKind::File,
        }
    }

    pub fn directory(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            kind: MappingKind::Directory,
        }
    }

    pub fn symlink(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            kind: MappingKind::SymlinkHint,
        }
    }
}

impl fmt::Display for InstallMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrow = match self.kind {
            MappingKind::File | MappingKind::Directory => "->",
            MappingKind::SymlinkHint => "=>",
        };
        write!(
            f,
            "{} {} {}",
            self.source.display(),
            arrow,
            self.destination.display()
        )
    }
}

/// What an install run produced
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Absolute paths created under the prefix, in mapping order
    pub installed: Vec<PathBuf>,
}

/// Install every mapping under `prefix`.
///
/// All mappings are attempted. If any failed, the first failure is returned as
/// [`BuildError::Install`]; files installed by the other mappings stay in place.
pub fn install(mappings: &[InstallMapping], prefix: &Path) -> Result<InstallReport> {
    let mut report = InstallReport::default();
    let mut first_failure: Option<BuildError> = None;

    for mapping in mappings {
        let destination = prefix.join(&mapping.destination);
        debug!(mapping = %mapping, "installing");

        match install_one(mapping, &destination) {
            Ok(()) => report.installed.push(destination),
            Err(cause) => {
                warn!(mapping = %mapping, error = %cause, "install mapping failed");
                if first_failure.is_none() {
                    first_failure = Some(BuildError::Install {
                        mapping: Box::new(mapping.clone()),
                        cause,
                    });
                }
            }
        }
    }

    match first_failure {
        Some(err) => Err(err),
        None => Ok(report),
    }
}

fn install_one(mapping: &InstallMapping, destination: &Path) -> io::Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }

    match mapping.kind {
        MappingKind::File => {
            if !mapping.source.is_file() {
                return Err(missing_source(&mapping.source));
            }
            copy_file(&mapping.source, destination)?;
        }
        MappingKind::Directory => {
            if !mapping.source.is_dir() {
                return Err(missing_source(&mapping.source));
            }
            copy_tree(&mapping.source, destination)?;
        }
        MappingKind::SymlinkHint => link(&mapping.source, destination)?,
    }

    Ok(())
}

fn missing_source(source: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("source does not exist: {}", source.display()),
    )
}

fn copy_tree(source: &Path, destination: &Path) -> io::Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(io::Error::other)?;
        let target = destination.join(relative);

        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            let link_target = fs::read_link(entry.path())?;
            replace_symlink(&link_target, &target)?;
        } else {
            copy_file(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Copy a regular file, unlinking a symlink at `destination` first
fn copy_file(source: &Path, destination: &Path) -> io::Result<()> {
    if let Ok(meta) = destination.symlink_metadata() {
        if meta.file_type().is_symlink() {
            fs::remove_file(destination)?;
        }
    }
    fs::copy(source, destination)?;
    Ok(())
}

fn link(source: &Path, destination: &Path) -> io::Result<()> {
    let resolved = if source.is_relative() {
        destination
            .parent()
            .map(|parent| parent.join(source))
            .unwrap_or_else(|| source.to_path_buf())
    } else {
        source.to_path_buf()
    };

    if resolved.symlink_metadata().is_err() {
        return Err(missing_source(&resolved));
    }

    replace_symlink(source, destination)
}

/// Point `destination` at `target`, replacing a previous symlink but never a
/// real file
fn replace_symlink(target: &Path, destination: &Path) -> io::Result<()> {
    if let Ok(meta) = destination.symlink_metadata() {
        if meta.file_type().is_symlink() {
            if fs::read_link(destination)? == target {
                return Ok(());
            }
            fs::remove_file(destination)?;
        } else {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("refusing to replace {} with a symlink", destination.display()),
            ));
        }
    }

    #[cfg(unix)]
    {
        unix_fs::symlink(target, destination)
    }

    #[cfg(not(unix))]
    {
        let _ = target;
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "symlinks are only supported on unix",
        ))
    }
}
