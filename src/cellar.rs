//! Cellar layout - where kegs live under a prefix

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// One installed version of a formula
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keg {
    pub name: String,
    pub version: String,
    pub path: PathBuf,
}

/// Path of the keg a build of `name` at `version` installs into
pub fn keg_path(cellar: &Path, name: &str, version: &str) -> PathBuf {
    cellar.join(name).join(version)
}

/// All installed versions of `name`, newest first
pub fn installed_versions(cellar: &Path, name: &str) -> Result<Vec<Keg>> {
    let formula_path = cellar.join(name);

    if !formula_path.exists() {
        return Ok(vec![]);
    }

    let mut kegs = Vec::new();

    for entry in fs::read_dir(&formula_path)
        .with_context(|| format!("Failed to read Cellar entry: {}", formula_path.display()))?
    {
        let entry = entry?;
        let version = entry.file_name().to_string_lossy().to_string();

        if version.starts_with('.') || !entry.path().is_dir() {
            continue;
        }

        kegs.push(Keg {
            name: name.to_string(),
            version,
            path: entry.path(),
        });
    }

    kegs.sort_by(|a, b| compare_versions(&b.version, &a.version));

    Ok(kegs)
}

/// Compare dotted version strings numerically, falling back to lexicographic
fn compare_versions(a: &str, b: &str) -> std::cmp::Ordering {
    let a_parts: Vec<u32> = a.split('.').filter_map(|s| s.parse::<u32>().ok()).collect();
    let b_parts: Vec<u32> = b.split('.').filter_map(|s| s.parse::<u32>().ok()).collect();

    for i in 0..a_parts.len().max(b_parts.len()) {
        let a_part = a_parts.get(i).unwrap_or(&0);
        let b_part = b_parts.get(i).unwrap_or(&0);
        match a_part.cmp(b_part) {
            std::cmp::Ordering::Equal => continue,
            other => return other,
        }
    }

    a.cmp(b)
}
