//! Host platform facts that recipes depend on.
//!
//! Recipes never shell out themselves. Everything they need to know about the
//! machine (where the python interpreter lives, which shared library suffix the
//! linker produces, how many make jobs to run) comes through [`PlatformContext`].
//! [`HostPlatform`] answers by probing the running system; [`StaticPlatform`]
//! answers from fixed values and is what tests use.
//!
//! # Platform Tags
//!
//! Tags follow Homebrew's bottle naming, `<arch>_<os>`:
//! - `arm64_sonoma` - Apple Silicon on macOS 14
//! - `x86_64_linux` - x86_64 Linux

use crate::error::{BuildError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    MacOs,
    Linux,
}

impl Os {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Os::MacOs
        } else {
            Os::Linux
        }
    }

    /// Suffix of shared libraries the toolchain produces
    pub fn dylib_extension(self) -> &'static str {
        match self {
            Os::MacOs => "dylib",
            Os::Linux => "so",
        }
    }

    /// Suffix SWIG gives JNI libraries
    pub fn jni_extension(self) -> &'static str {
        match self {
            Os::MacOs => "jnilib",
            Os::Linux => "so",
        }
    }
}

/// Which python a formula builds its bindings against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PythonFlavor {
    Python2,
    Python3,
}

impl PythonFlavor {
    pub fn executable_name(self) -> &'static str {
        match self {
            PythonFlavor::Python2 => "python",
            PythonFlavor::Python3 => "python3",
        }
    }
}

/// Locations of a python installation, as CMake's FindPython wants them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PythonInfo {
    pub executable: PathBuf,
    pub prefix: PathBuf,
    pub include_dir: PathBuf,
    pub library: PathBuf,
    /// `X.Y`
    pub version: String,
    pub numpy_include_dir: Option<PathBuf>,
}

pub trait PlatformContext {
    fn os(&self) -> Os;

    /// Bottle-style tag, e.g. `arm64_sonoma`
    fn platform_tag(&self) -> &str;

    /// Root of the package manager installation (`HOMEBREW_PREFIX`)
    fn homebrew_prefix(&self) -> &Path;

    /// Parallelism to hand to make
    fn make_jobs(&self) -> usize;

    fn python(&self, flavor: PythonFlavor) -> Result<PythonInfo>;
}

/// Platform answers from the running host
pub struct HostPlatform {
    tag: String,
    prefix: PathBuf,
    jobs: usize,
    python2: OnceLock<std::result::Result<PythonInfo, String>>,
    python3: OnceLock<std::result::Result<PythonInfo, String>>,
}

impl HostPlatform {
    pub fn new(prefix: impl Into<PathBuf>, jobs: usize) -> Result<Self> {
        Ok(Self {
            tag: detect_platform_tag()?,
            prefix: prefix.into(),
            jobs: jobs.max(1),
            python2: OnceLock::new(),
            python3: OnceLock::new(),
        })
    }
}

impl PlatformContext for HostPlatform {
    fn os(&self) -> Os {
        Os::current()
    }

    fn platform_tag(&self) -> &str {
        &self.tag
    }

    fn homebrew_prefix(&self) -> &Path {
        &self.prefix
    }

    fn make_jobs(&self) -> usize {
        self.jobs
    }

    fn python(&self, flavor: PythonFlavor) -> Result<PythonInfo> {
        let cell = match flavor {
            PythonFlavor::Python2 => &self.python2,
            PythonFlavor::Python3 => &self.python3,
        };
        cell.get_or_init(|| probe_python(flavor).map_err(|e| e.to_string()))
            .clone()
            .map_err(BuildError::Platform)
    }
}

/// Ask the interpreter where it keeps its headers and library
fn probe_python(flavor: PythonFlavor) -> Result<PythonInfo> {
    let executable = which::which(flavor.executable_name()).map_err(|e| {
        BuildError::Platform(format!("{} not found: {}", flavor.executable_name(), e))
    })?;
    debug!(python = %executable.display(), "probing interpreter");

    let prefix = PathBuf::from(python_eval(&executable, "import sys;print(sys.prefix)")?);
    let include_dir = PathBuf::from(python_eval(
        &executable,
        "import sysconfig;print(sysconfig.get_paths()['include'])",
    )?);
    let version = python_eval(
        &executable,
        "import sys;print('%d.%d' % sys.version_info[:2])",
    )?;
    let numpy_include_dir = python_eval(&executable, "import numpy;print(numpy.get_include())")
        .ok()
        .map(PathBuf::from);
    let library = python_library(&prefix, &version, Os::current());

    Ok(PythonInfo {
        executable,
        prefix,
        include_dir,
        library,
        version,
        numpy_include_dir,
    })
}

fn python_eval(executable: &Path, code: &str) -> Result<String> {
    let output = Command::new(executable)
        .arg("-c")
        .arg(code)
        .output()
        .map_err(|e| BuildError::Platform(format!("failed to run {}: {}", executable.display(), e)))?;

    if !output.status.success() {
        return Err(BuildError::Platform(format!(
            "`{} -c \"{}\"` failed: {}",
            executable.display(),
            code,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Pick the library to link against: a framework binary, then a static
/// archive, then the shared library.
fn python_library(prefix: &Path, version: &str, os: Os) -> PathBuf {
    let framework = prefix.join("Python");
    if framework.exists() {
        return framework;
    }
    let lib_name = format!("libpython{}", version);
    let archive = prefix.join("lib").join(format!("{}.a", lib_name));
    if archive.exists() {
        return archive;
    }
    prefix
        .join("lib")
        .join(format!("{}.{}", lib_name, os.dylib_extension()))
}

/// Detect the current system's platform tag
pub fn detect_platform_tag() -> Result<String> {
    // Homebrew uses "arm64" not "aarch64"
    let arch = match std::env::consts::ARCH {
        "aarch64" => "arm64",
        other => other,
    };

    #[cfg(target_os = "macos")]
    {
        let os_version = macos_version()?;
        Ok(format!("{}_{}", arch, macos_name(&os_version)))
    }

    #[cfg(target_os = "linux")]
    {
        Ok(format!("{}_linux", arch))
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        let _ = arch;
        Err(BuildError::Platform("unsupported platform".to_string()))
    }
}

#[cfg(target_os = "macos")]
fn macos_version() -> Result<String> {
    let output = Command::new("sw_vers")
        .arg("-productVersion")
        .output()
        .map_err(|e| BuildError::Platform(format!("failed to run sw_vers: {}", e)))?;

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn macos_name(version: &str) -> &'static str {
    let major: u32 = version
        .split('.')
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    match major {
        26 | 16 => "tahoe",
        15 => "sequoia",
        14 => "sonoma",
        13 => "ventura",
        12 => "monterey",
        11 => "big_sur",
        10 => "catalina",
        _ => "sonoma",
    }
}

/// Fixed platform answers
#[derive(Debug, Clone)]
pub struct StaticPlatform {
    pub os: Os,
    pub tag: String,
    pub prefix: PathBuf,
    pub jobs: usize,
    pub python2: Option<PythonInfo>,
    pub python3: Option<PythonInfo>,
}

impl StaticPlatform {
    /// A macOS host with both pythons installed under `prefix`
    pub fn macos(prefix: impl Into<PathBuf>) -> Self {
        let prefix = prefix.into();
        Self {
            os: Os::MacOs,
            tag: "arm64_sonoma".to_string(),
            python2: Some(sample_python(&prefix, "python", "2.7")),
            python3: Some(sample_python(&prefix, "python3", "3.11")),
            prefix,
            jobs: 4,
        }
    }

    /// A Linux host with both pythons installed under `prefix`
    pub fn linux(prefix: impl Into<PathBuf>) -> Self {
        Self {
            os: Os::Linux,
            tag: "x86_64_linux".to_string(),
            ..Self::macos(prefix)
        }
    }
}

fn sample_python(prefix: &Path, exe: &str, version: &str) -> PythonInfo {
    let framework = prefix
        .join("Frameworks/Python.framework/Versions")
        .join(version);
    PythonInfo {
        executable: prefix.join("bin").join(exe),
        include_dir: framework.join("include").join(format!("python{}", version)),
        library: framework.join("Python"),
        numpy_include_dir: Some(
            framework
                .join("lib")
                .join(format!("python{}", version))
                .join("site-packages/numpy/core/include"),
        ),
        prefix: framework,
        version: version.to_string(),
    }
}

impl PlatformContext for StaticPlatform {
    fn os(&self) -> Os {
        self.os
    }

    fn platform_tag(&self) -> &str {
        &self.tag
    }

    fn homebrew_prefix(&self) -> &Path {
        &self.prefix
    }

    fn make_jobs(&self) -> usize {
        self.jobs
    }

    fn python(&self, flavor: PythonFlavor) -> Result<PythonInfo> {
        let info = match flavor {
            PythonFlavor::Python2 => &self.python2,
            PythonFlavor::Python3 => &self.python3,
        };
        info.clone().ok_or_else(|| {
            BuildError::Platform(format!("{} not available", flavor.executable_name()))
        })
    }
}
