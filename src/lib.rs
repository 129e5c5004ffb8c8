//! Library interface for chembrew
//!
//! Resolves Homebrew-style formulae (options, dependencies, conditional build
//! rules) into ordered build steps, runs them, and installs the results into a
//! Cellar keg.
//!
//! ```text
//! options --> resolver --> executor --> formula staging --> installer --> receipt
//! ```

pub mod cellar;
pub mod config;
pub mod dependency;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod formula;
pub mod formulae;
pub mod installer;
pub mod options;
pub mod platform;
pub mod receipt;
pub mod resolver;

// Re-export commonly used items
pub use error::{BuildError, Result};
pub use executor::{CancellationToken, Executor};
pub use formula::{BuildMode, Formula};
pub use installer::{InstallMapping, install};
pub use resolver::{BuildStep, build_steps};
