//! Formula dependencies and the registry that knows which ones are installed.

use crate::cellar;
use crate::options::OptionSelection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Build,
    Runtime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Requirement {
    Required,
    /// Present unless the user passes `--without-<name>`
    Recommended,
    /// Absent unless the user passes `--with-<name>`
    Optional,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub kind: DependencyKind,
    pub requirement: Requirement,
}

impl Dependency {
    pub fn new(name: impl Into<String>, kind: DependencyKind, requirement: Requirement) -> Self {
        Self {
            name: name.into(),
            kind,
            requirement,
        }
    }

    pub fn runtime(name: impl Into<String>) -> Self {
        Self::new(name, DependencyKind::Runtime, Requirement::Required)
    }

    pub fn build(name: impl Into<String>) -> Self {
        Self::new(name, DependencyKind::Build, Requirement::Required)
    }

    pub fn recommended(name: impl Into<String>) -> Self {
        Self::new(name, DependencyKind::Runtime, Requirement::Recommended)
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self::new(name, DependencyKind::Runtime, Requirement::Optional)
    }

    /// Short name used for the implicit option and the Cellar directory.
    ///
    /// Tap-qualified names (`user/tap/formula`) drop the tap part.
    pub fn short_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Default value of the option implied by a Recommended/Optional dependency
    pub fn implied_option_default(&self) -> Option<bool> {
        match self.requirement {
            Requirement::Required => None,
            Requirement::Recommended => Some(true),
            Requirement::Optional => Some(false),
        }
    }

    /// Whether this dependency takes part in the build for `selection`
    pub fn is_enabled(&self, selection: &OptionSelection) -> bool {
        match self.requirement {
            Requirement::Required => true,
            Requirement::Recommended => selection.get(self.short_name()).unwrap_or(true),
            Requirement::Optional => selection.get(self.short_name()).unwrap_or(false),
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        let mut tags = Vec::new();
        if self.kind == DependencyKind::Build {
            tags.push("build");
        }
        match self.requirement {
            Requirement::Required => {}
            Requirement::Recommended => tags.push("recommended"),
            Requirement::Optional => tags.push("optional"),
        }
        if !tags.is_empty() {
            write!(f, " ({})", tags.join(", "))?;
        }
        Ok(())
    }
}

/// Answers which dependencies are installed on this host
pub trait DependencyRegistry {
    fn is_installed(&self, name: &str) -> bool;

    fn install_path(&self, name: &str) -> Option<PathBuf>;

    /// Filter `declared` down to the dependencies this registry has installed
    fn available(&self, declared: &[Dependency]) -> Vec<Dependency> {
        declared
            .iter()
            .filter(|dep| self.is_installed(&dep.name))
            .cloned()
            .collect()
    }
}

/// Registry backed by a Homebrew prefix: `<prefix>/opt/<name>` or a version
/// directory under `<prefix>/Cellar/<name>` marks a dependency as installed.
#[derive(Debug, Clone)]
pub struct CellarRegistry {
    prefix: PathBuf,
}

impl CellarRegistry {
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }
}

fn short(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

impl DependencyRegistry for CellarRegistry {
    fn is_installed(&self, name: &str) -> bool {
        let name = short(name);
        if self.prefix.join("opt").join(name).exists() {
            return true;
        }
        cellar::installed_versions(&self.prefix.join("Cellar"), name)
            .map(|versions| !versions.is_empty())
            .unwrap_or(false)
    }

    fn install_path(&self, name: &str) -> Option<PathBuf> {
        let name = short(name);
        let opt = self.prefix.join("opt").join(name);
        if opt.exists() {
            return Some(opt);
        }
        cellar::installed_versions(&self.prefix.join("Cellar"), name)
            .ok()
            .and_then(|versions| versions.into_iter().next())
            .map(|keg| keg.path)
    }
}

/// In-memory registry, for callers that already know what is installed
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    installed: BTreeMap<String, PathBuf>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.installed.insert(name.into(), path.into());
        self
    }
}

impl DependencyRegistry for StaticRegistry {
    fn is_installed(&self, name: &str) -> bool {
        self.installed.contains_key(name) || self.installed.contains_key(short(name))
    }

    fn install_path(&self, name: &str) -> Option<PathBuf> {
        self.installed
            .get(name)
            .or_else(|| self.installed.get(short(name)))
            .cloned()
    }
}
