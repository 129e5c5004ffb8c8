//! Formula definitions: sources, options, dependencies, build rules and
//! install staging for one package.

use crate::dependency::Dependency;
use crate::error::{BuildError, Result};
use crate::installer::InstallMapping;
use crate::options::{OptionSelection, OptionSpec, resolve_selection};
use crate::platform::PlatformContext;
use crate::resolver::Rule;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which source variant is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    #[default]
    Stable,
    #[serde(rename = "devel")]
    Development,
    #[serde(rename = "head")]
    HeadOfSourceControl,
}

impl BuildMode {
    /// Name recorded in receipts (`stable`, `devel`, `head`)
    pub fn as_str(self) -> &'static str {
        match self {
            BuildMode::Stable => "stable",
            BuildMode::Development => "devel",
            BuildMode::HeadOfSourceControl => "head",
        }
    }

    pub fn is_head(self) -> bool {
        self == BuildMode::HeadOfSourceControl
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stable" => Ok(BuildMode::Stable),
            "devel" | "development" => Ok(BuildMode::Development),
            "head" => Ok(BuildMode::HeadOfSourceControl),
            other => Err(format!("unknown build mode: {}", other)),
        }
    }
}

/// Version control system a head source is checked out with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vcs {
    Git,
    Mercurial,
}

/// Where one build mode's sources come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub url: String,
    /// Absent for version-control checkouts
    pub sha256: Option<String>,
    pub version: String,
    pub vcs: Option<Vcs>,
}

impl SourceSpec {
    pub fn archive(url: &str, sha256: &str, version: &str) -> Self {
        Self {
            url: url.to_string(),
            sha256: Some(sha256.to_string()),
            version: version.to_string(),
            vcs: None,
        }
    }

    pub fn checkout(url: &str, vcs: Vcs) -> Self {
        Self {
            url: url.to_string(),
            sha256: None,
            version: "HEAD".to_string(),
            vcs: Some(vcs),
        }
    }

    /// Last path segment of the URL
    pub fn file_name(&self) -> &str {
        self.url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("source")
    }
}

/// Predicate over the build mode and option selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Always,
    With(&'static str),
    Without(&'static str),
    Mode(BuildMode),
    NotMode(BuildMode),
    All(Vec<Condition>),
}

impl Condition {
    pub fn holds(&self, mode: BuildMode, selection: &OptionSelection) -> bool {
        match self {
            Condition::Always => true,
            Condition::With(name) => selection.with(name),
            Condition::Without(name) => selection.without(name),
            Condition::Mode(m) => mode == *m,
            Condition::NotMode(m) => mode != *m,
            Condition::All(conditions) => conditions.iter().all(|c| c.holds(mode, selection)),
        }
    }
}

/// A dependency that only applies under some condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
    pub dependency: Dependency,
    pub when: Condition,
}

/// Inputs to a formula's staging function
pub struct StageContext<'a> {
    pub mode: BuildMode,
    pub selection: &'a OptionSelection,
    pub layout: &'a BuildLayout,
    pub platform: &'a dyn PlatformContext,
}

pub type StageFn = fn(&StageContext<'_>) -> Result<Vec<InstallMapping>>;

/// Directories a build works in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildLayout {
    /// Fetched source tree, the working directory of most steps
    pub buildpath: PathBuf,
    /// Keg the package installs into
    pub prefix: PathBuf,
}

impl BuildLayout {
    pub fn new(buildpath: impl Into<PathBuf>, prefix: impl Into<PathBuf>) -> Self {
        Self {
            buildpath: buildpath.into(),
            prefix: prefix.into(),
        }
    }

    pub fn bin(&self) -> PathBuf {
        self.prefix.join("bin")
    }

    pub fn lib(&self) -> PathBuf {
        self.prefix.join("lib")
    }

    pub fn include(&self) -> PathBuf {
        self.prefix.join("include")
    }

    pub fn libexec(&self) -> PathBuf {
        self.prefix.join("libexec")
    }

    pub fn share(&self) -> PathBuf {
        self.prefix.join("share")
    }

    pub fn build_file(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.buildpath.join(relative)
    }
}

pub struct Formula {
    pub name: &'static str,
    pub desc: &'static str,
    pub homepage: &'static str,
    pub stable: SourceSpec,
    pub devel: Option<SourceSpec>,
    pub head: Option<SourceSpec>,
    pub options: Vec<OptionSpec>,
    pub dependencies: Vec<DependencySpec>,
    pub rules: Vec<Rule>,
    pub stage: StageFn,
}

impl fmt::Debug for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formula")
            .field("name", &self.name)
            .field("stable", &self.stable.version)
            .field("options", &self.options.len())
            .field("dependencies", &self.dependencies.len())
            .field("rules", &self.rules.len())
            .finish()
    }
}

impl Formula {
    /// Source for `mode`, if the formula has one
    pub fn source(&self, mode: BuildMode) -> Result<&SourceSpec> {
        let source = match mode {
            BuildMode::Stable => Some(&self.stable),
            BuildMode::Development => self.devel.as_ref(),
            BuildMode::HeadOfSourceControl => self.head.as_ref(),
        };
        source.ok_or_else(|| BuildError::UnsupportedMode {
            formula: self.name.to_string(),
            mode: mode.to_string(),
        })
    }

    pub fn version(&self, mode: BuildMode) -> Result<&str> {
        self.source(mode).map(|s| s.version.as_str())
    }

    /// Declared options plus the ones implied by Recommended/Optional
    /// dependencies, sorted by name
    pub fn all_options(&self) -> Vec<OptionSpec> {
        let mut options: BTreeMap<String, OptionSpec> = self
            .options
            .iter()
            .map(|o| (o.name.clone(), o.clone()))
            .collect();

        for spec in &self.dependencies {
            let dep = &spec.dependency;
            if let Some(default) = dep.implied_option_default() {
                let name = dep.short_name().to_string();
                options.entry(name.clone()).or_insert_with(|| {
                    let verb = if default { "without" } else { "with" };
                    OptionSpec::new(name, format!("Build {} {} support", verb, dep.short_name()), default)
                });
            }
        }

        options.into_values().collect()
    }

    pub fn resolve_options(&self, overrides: &BTreeMap<String, bool>) -> Result<OptionSelection> {
        resolve_selection(self.name, &self.all_options(), overrides)
    }

    /// Dependencies whose condition holds for this build, in declaration order
    pub fn dependencies_for(&self, mode: BuildMode, selection: &OptionSelection) -> Vec<Dependency> {
        self.dependencies
            .iter()
            .filter(|spec| spec.when.holds(mode, selection))
            .map(|spec| spec.dependency.clone())
            .collect()
    }

    /// Dependencies that take part in the build: applicable and enabled
    pub fn enabled_dependencies(
        &self,
        mode: BuildMode,
        selection: &OptionSelection,
    ) -> Vec<Dependency> {
        self.dependencies_for(mode, selection)
            .into_iter()
            .filter(|dep| dep.is_enabled(selection))
            .collect()
    }

    /// Install mappings for a finished build
    pub fn stage(&self, ctx: &StageContext<'_>) -> Result<Vec<InstallMapping>> {
        (self.stage)(ctx)
    }
}
