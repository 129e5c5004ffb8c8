//! Where builds happen and where they install to

use crate::cellar;
use std::path::{Path, PathBuf};

/// Paths and limits for one run, read from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `HOMEBREW_PREFIX`
    pub prefix: PathBuf,
    /// Downloaded sources, `CHEMBREW_CACHE`
    pub cache_dir: PathBuf,
    /// Unpacked build trees, `CHEMBREW_BUILD_ROOT`
    pub build_root: PathBuf,
    /// `HOMEBREW_MAKE_JOBS`
    pub jobs: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
    }

    /// Build a config from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let prefix = lookup("HOMEBREW_PREFIX")
            .map(PathBuf::from)
            .unwrap_or_else(default_prefix);

        let cache_dir = lookup("CHEMBREW_CACHE")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                let home = lookup("HOME").unwrap_or_else(|| ".".to_string());
                PathBuf::from(home).join(".cache/chembrew/downloads")
            });

        let build_root = lookup("CHEMBREW_BUILD_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| match cache_dir.parent() {
                Some(parent) => parent.join("build"),
                None => cache_dir.join("build"),
            });

        let jobs = lookup("HOMEBREW_MAKE_JOBS")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            });

        Self {
            prefix,
            cache_dir,
            build_root,
            jobs,
        }
    }

    pub fn cellar(&self) -> PathBuf {
        self.prefix.join("Cellar")
    }

    /// `<prefix>/Cellar/<name>/<version>`
    pub fn keg_path(&self, name: &str, version: &str) -> PathBuf {
        cellar::keg_path(&self.cellar(), name, version)
    }

    /// Fresh directory name for building `name` at `version`
    pub fn build_dir(&self, name: &str, version: &str) -> PathBuf {
        self.build_root.join(format!("{}-{}", name, version))
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }
}

/// Default Homebrew prefix for this architecture
fn default_prefix() -> PathBuf {
    #[cfg(target_arch = "aarch64")]
    {
        PathBuf::from("/opt/homebrew")
    }
    #[cfg(not(target_arch = "aarch64"))]
    {
        PathBuf::from("/usr/local")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_explicit_values() {
        let config = config(&[
            ("HOMEBREW_PREFIX", "/tmp/brew"),
            ("CHEMBREW_CACHE", "/tmp/cache/downloads"),
            ("HOMEBREW_MAKE_JOBS", "3"),
        ]);
        assert_eq!(config.prefix, PathBuf::from("/tmp/brew"));
        assert_eq!(config.build_root, PathBuf::from("/tmp/cache/build"));
        assert_eq!(config.jobs, 3);
        assert_eq!(
            config.keg_path("rdkit", "2015.09.2"),
            PathBuf::from("/tmp/brew/Cellar/rdkit/2015.09.2")
        );
    }

    #[test]
    fn test_defaults() {
        let config = config(&[("HOME", "/home/chemist"), ("HOMEBREW_MAKE_JOBS", "zero")]);
        assert_eq!(
            config.cache_dir,
            PathBuf::from("/home/chemist/.cache/chembrew/downloads")
        );
        assert!(config.jobs >= 1);
        assert!(config.prefix == Path::new("/opt/homebrew") || config.prefix == Path::new("/usr/local"));
    }

    #[test]
    fn test_build_dir() {
        let config = config(&[("CHEMBREW_BUILD_ROOT", "/tmp/builds")]);
        assert_eq!(
            config.build_dir("opsin", "2.0.0"),
            PathBuf::from("/tmp/builds/opsin-2.0.0")
        );
    }
}
