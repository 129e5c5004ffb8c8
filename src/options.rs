//! Build options a formula exposes and the selection made for one build.
//!
//! Options follow Homebrew's naming: an option that is off by default is
//! turned on with `--with-<name>`, one that is on by default is turned off with
//! `--without-<name>`.
//!
//! # Examples
//!
//! ```
//! use chembrew::options::{OptionSpec, parse_flag, resolve_selection};
//! use std::collections::BTreeMap;
//!
//! let specs = vec![
//!     OptionSpec::new("java", "Build with Java language bindings", false),
//!     OptionSpec::new("inchi", "Build with InChI support", true),
//! ];
//!
//! let (name, enabled) = parse_flag("--with-java").unwrap();
//! let overrides = BTreeMap::from([(name, enabled)]);
//! let selection = resolve_selection("rdkit", &specs, &overrides).unwrap();
//!
//! assert!(selection.with("java"));
//! assert!(selection.with("inchi"));
//! ```

use crate::error::{BuildError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One togglable feature of a formula
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSpec {
    pub name: String,
    pub description: String,
    pub default: bool,
}

impl OptionSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, default: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            default,
        }
    }

    /// The flag that changes this option away from its default
    pub fn flag(&self) -> String {
        if self.default {
            format!("--without-{}", self.name)
        } else {
            format!("--with-{}", self.name)
        }
    }
}

impl fmt::Display for OptionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.flag())
    }
}

/// Selected value for every declared option of a formula.
///
/// Only [`resolve_selection`] builds one, so every key is a declared option
/// and every declared option has a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionSelection {
    values: BTreeMap<String, bool>,
    #[serde(skip)]
    defaults: BTreeMap<String, bool>,
}

impl OptionSelection {
    /// Whether the option is enabled. Undeclared names are treated as disabled.
    pub fn with(&self, name: &str) -> bool {
        self.values.get(name).copied().unwrap_or(false)
    }

    pub fn without(&self, name: &str) -> bool {
        !self.with(name)
    }

    pub fn get(&self, name: &str) -> Option<bool> {
        self.values.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Flags for options whose value differs from the default
    pub fn used_flags(&self) -> Vec<String> {
        self.values
            .iter()
            .filter(|(name, value)| self.defaults.get(*name) != Some(*value))
            .map(|(name, value)| render_flag(name, *value))
            .collect()
    }

    /// Flags that were available but not passed
    pub fn unused_flags(&self) -> Vec<String> {
        self.values
            .iter()
            .filter(|(name, value)| self.defaults.get(*name) == Some(*value))
            .map(|(name, value)| render_flag(name, !*value))
            .collect()
    }
}

fn render_flag(name: &str, enabled: bool) -> String {
    if enabled {
        format!("--with-{}", name)
    } else {
        format!("--without-{}", name)
    }
}

/// Apply overrides on top of the declared defaults.
///
/// Fails with [`BuildError::UnknownOption`] if any override names an option the
/// formula does not declare. Nothing is returned in that case, not even the
/// valid part of the selection.
pub fn resolve_selection(
    formula: &str,
    specs: &[OptionSpec],
    overrides: &BTreeMap<String, bool>,
) -> Result<OptionSelection> {
    if let Some(unknown) = overrides
        .keys()
        .find(|key| !specs.iter().any(|spec| &spec.name == *key))
    {
        return Err(BuildError::UnknownOption {
            formula: formula.to_string(),
            option: unknown.clone(),
        });
    }

    let defaults: BTreeMap<String, bool> = specs
        .iter()
        .map(|spec| (spec.name.clone(), spec.default))
        .collect();

    let mut values = defaults.clone();
    for (name, value) in overrides {
        values.insert(name.clone(), *value);
    }

    Ok(OptionSelection { values, defaults })
}

/// Parse a Homebrew-style option flag into `(name, enabled)`.
///
/// Leading dashes are optional, so `--with-java` and `with-java` are the same.
pub fn parse_flag(flag: &str) -> Result<(String, bool)> {
    let trimmed = flag.trim_start_matches('-');

    let parsed = if let Some(name) = trimmed.strip_prefix("without-") {
        Some((name, false))
    } else {
        trimmed.strip_prefix("with-").map(|name| (name, true))
    };

    match parsed {
        Some((name, enabled)) if !name.is_empty() => Ok((name.to_string(), enabled)),
        _ => Err(BuildError::InvalidOptionFlag(flag.to_string())),
    }
}

/// Parse several flags, later flags overriding earlier ones
pub fn parse_flags<S: AsRef<str>>(flags: &[S]) -> Result<BTreeMap<String, bool>> {
    let mut overrides = BTreeMap::new();
    for flag in flags {
        let (name, enabled) = parse_flag(flag.as_ref())?;
        overrides.insert(name, enabled);
    }
    Ok(overrides)
}
