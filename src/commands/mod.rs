//! Command implementations for the chembrew CLI
//!
//! - **query**: formula listing, options, dependencies and build plans
//! - **install**: fetch, build and install a formula into the Cellar

pub mod install;
pub mod query;

pub use install::install;
pub use query::{deps, list, options, plan};

use anyhow::{Context, Result};
use chembrew::config::Config;
use chembrew::dependency::{Dependency, DependencyRegistry};
use chembrew::formula::{BuildLayout, BuildMode, Formula};
use chembrew::formulae;
use chembrew::options::{self, OptionSelection};
use chembrew::platform::PlatformContext;
use chembrew::resolver::{self, BuildStep};
use clap::Args;

/// Which source to build and with what options
#[derive(Debug, Clone, Default, Args)]
pub struct BuildArgs {
    /// Build the development release
    #[arg(long, conflicts_with = "head")]
    pub devel: bool,

    /// Build from the tip of version control
    #[arg(long = "HEAD")]
    pub head: bool,

    /// Option flags such as --with-java or --without-inchi (must come last)
    #[arg(value_name = "OPTIONS", allow_hyphen_values = true)]
    pub flags: Vec<String>,
}

const MODE_FLAGS: [&str; 2] = ["--HEAD", "--devel"];

impl BuildArgs {
    /// `--HEAD` and `--devel` are also honoured among the trailing option flags
    pub fn mode(&self) -> BuildMode {
        let trailing = |flag: &str| self.flags.iter().any(|f| f == flag);
        if self.head || trailing("--HEAD") {
            BuildMode::HeadOfSourceControl
        } else if self.devel || trailing("--devel") {
            BuildMode::Development
        } else {
            BuildMode::Stable
        }
    }

    pub fn option_flags(&self) -> Vec<&str> {
        self.flags
            .iter()
            .map(String::as_str)
            .filter(|f| !MODE_FLAGS.contains(f))
            .collect()
    }
}

/// A resolved build, before anything has been fetched or run
pub struct Plan {
    pub formula: Formula,
    pub mode: BuildMode,
    pub version: String,
    pub selection: OptionSelection,
    pub dependencies: Vec<Dependency>,
    pub available: Vec<Dependency>,
    pub layout: BuildLayout,
    pub steps: Vec<BuildStep>,
}

/// Resolve `name` into build steps for this host.
///
/// With `assume_installed`, every enabled dependency counts as present.
pub fn resolve_plan(
    config: &Config,
    name: &str,
    args: &BuildArgs,
    platform: &dyn PlatformContext,
    registry: &dyn DependencyRegistry,
    assume_installed: bool,
) -> Result<Plan> {
    let formula = formulae::find(name)?;
    let mode = args.mode();
    let overrides = options::parse_flags(&args.option_flags())?;
    let selection = formula.resolve_options(&overrides)?;
    let version = formula.version(mode)?.to_string();

    let dependencies = formula.enabled_dependencies(mode, &selection);
    let available = if assume_installed {
        dependencies.clone()
    } else {
        registry.available(&dependencies)
    };

    let layout = BuildLayout::new(
        config.build_dir(formula.name, &version),
        config.keg_path(formula.name, &version),
    );

    let steps = resolver::build_steps(&formula, mode, &selection, &available, &layout, platform)
        .with_context(|| format!("Failed to resolve build of {}", formula.name))?;

    Ok(Plan {
        formula,
        mode,
        version,
        selection,
        dependencies,
        available,
        layout,
        steps,
    })
}
