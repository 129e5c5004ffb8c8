//! Install receipts for source builds.
//!
//! Every keg a build installs gets an `INSTALL_RECEIPT.json` in the layout
//! Homebrew uses, so `brew` itself can read what was built and how:
//!
//! ```text
//! /opt/homebrew/Cellar/rdkit/2015.09.2/
//!   INSTALL_RECEIPT.json     # options, build mode, runtime dependencies
//!   bin/
//!   lib/
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use chembrew::receipt::InstallReceipt;
//! use std::path::Path;
//!
//! fn main() -> chembrew::error::Result<()> {
//!     let keg = Path::new("/opt/homebrew/Cellar/rdkit/2015.09.2");
//!     let receipt = InstallReceipt::read(keg)?;
//!
//!     println!("Built from: {}", receipt.source.spec);
//!     println!("Options: {}", receipt.used_options.join(" "));
//!     Ok(())
//! }
//! ```

use crate::error::Result;
use crate::formula::{BuildMode, Formula};
use crate::options::OptionSelection;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const RECEIPT_FILE: &str = "INSTALL_RECEIPT.json";

/// Install receipt compatible with Homebrew
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallReceipt {
    pub homebrew_version: String,
    #[serde(default)]
    pub used_options: Vec<String>,
    #[serde(default)]
    pub unused_options: Vec<String>,
    pub built_as_bottle: bool,
    pub poured_from_bottle: bool,
    pub installed_as_dependency: bool,
    pub installed_on_request: bool,
    pub time: i64,
    #[serde(default)]
    pub runtime_dependencies: Vec<RuntimeDependency>,
    pub source: SourceInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeDependency {
    pub full_name: String,
    pub version: String,
    #[serde(default)]
    pub declared_directly: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub tap: String,
    /// `stable`, `devel` or `head`
    pub spec: String,
    pub versions: SourceVersions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceVersions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stable: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub devel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<String>,
    #[serde(default)]
    pub version_scheme: u32,
}

impl InstallReceipt {
    /// Receipt for a build of `formula` from source
    pub fn new(
        formula: &Formula,
        mode: BuildMode,
        selection: &OptionSelection,
        runtime_dependencies: Vec<RuntimeDependency>,
    ) -> Self {
        Self {
            homebrew_version: format!("chembrew/{}", env!("CARGO_PKG_VERSION")),
            used_options: selection.used_flags(),
            unused_options: selection.unused_flags(),
            built_as_bottle: false,
            poured_from_bottle: false,
            installed_as_dependency: false,
            installed_on_request: true,
            time: chrono::Utc::now().timestamp(),
            runtime_dependencies,
            source: SourceInfo {
                tap: "mcs07/cheminformatics".to_string(),
                spec: mode.as_str().to_string(),
                versions: SourceVersions {
                    stable: Some(formula.stable.version.clone()),
                    devel: formula.devel.as_ref().map(|s| s.version.clone()),
                    head: formula.head.as_ref().map(|s| s.version.clone()),
                    version_scheme: 0,
                },
            },
            arch: Some(homebrew_arch().to_string()),
        }
    }

    /// Read `INSTALL_RECEIPT.json` from a keg
    pub fn read(keg: &Path) -> Result<Self> {
        let receipt_path = keg.join(RECEIPT_FILE);
        let contents = fs::read_to_string(&receipt_path)
            .with_context(|| format!("Failed to read receipt: {}", receipt_path.display()))?;

        Ok(serde_json::from_str(&contents)?)
    }

    /// Write `INSTALL_RECEIPT.json` into a keg
    pub fn write(&self, keg: &Path) -> Result<()> {
        let receipt_path = keg.join(RECEIPT_FILE);
        let json = serde_json::to_string_pretty(self)?;

        fs::create_dir_all(keg)?;
        fs::write(&receipt_path, json)
            .with_context(|| format!("Failed to write receipt: {}", receipt_path.display()))?;

        Ok(())
    }
}

/// Homebrew says "arm64" where Rust says "aarch64"
fn homebrew_arch() -> &'static str {
    match std::env::consts::ARCH {
        "aarch64" => "arm64",
        arch => arch,
    }
}
