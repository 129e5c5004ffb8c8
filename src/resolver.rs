//! Turn a formula, an option selection and a build mode into build steps.
//!
//! A formula's install logic is an ordered list of [`Rule`]s. Each rule has a
//! [`Condition`] over the build mode and option selection and an emit function
//! that appends to a [`RecipeBuilder`]: either a configure flag, which is held
//! until a build tool is invoked, or a whole step.
//!
//! ```text
//! rule: std cmake args     -> flag -DCMAKE_INSTALL_PREFIX=...
//! rule: with java          -> flag -DRDK_BUILD_SWIG_WRAPPERS=ON
//! rule: with avalon        -> step curl ..., step tar ..., flag -DAVALONTOOLS_DIR=...
//! rule: configure          -> step cmake <all pending flags> .
//! rule: compile            -> step make
//! ```
//!
//! Resolution is a pure function of its inputs: nothing here touches the
//! filesystem or spawns processes.

use crate::dependency::{Dependency, Requirement};
use crate::error::{BuildError, Result};
use crate::formula::{BuildLayout, BuildMode, Condition, Formula};
use crate::options::OptionSelection;
use crate::platform::PlatformContext;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One external build-tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStep {
    pub command: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    #[serde(default)]
    pub allow_failure: bool,
    /// Variables set for this step only, on top of the inherited environment
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl BuildStep {
    pub fn new<I, S>(command: impl Into<String>, args: I, working_dir: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            working_dir: working_dir.into(),
            allow_failure: false,
            env: BTreeMap::new(),
        }
    }

    pub fn allow_failure(mut self) -> Self {
        self.allow_failure = true;
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Shell-like rendering for logs and error messages
    pub fn command_line(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote_arg)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote_arg(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_=./:@+,%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.env {
            write!(f, "{}={} ", key, quote_arg(value))?;
        }
        write!(f, "{}", self.command_line())
    }
}

/// Accumulates flags and steps while rules run
#[derive(Debug, Default)]
pub struct RecipeBuilder {
    steps: Vec<BuildStep>,
    flags: Vec<String>,
}

impl RecipeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a flag for the next [`invoke_with_flags`](Self::invoke_with_flags)
    pub fn flag(&mut self, flag: impl Into<String>) -> &mut Self {
        self.flags.push(flag.into());
        self
    }

    pub fn step(&mut self, step: BuildStep) -> &mut Self {
        self.steps.push(step);
        self
    }

    /// Append `command <pending flags> <trailing>` and clear the pending flags
    pub fn invoke_with_flags<I, S>(
        &mut self,
        command: &str,
        trailing: I,
        working_dir: &Path,
    ) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = std::mem::take(&mut self.flags);
        args.extend(trailing.into_iter().map(Into::into));
        self.steps.push(BuildStep::new(command, args, working_dir));
        self
    }

    pub fn pending_flags(&self) -> &[String] {
        &self.flags
    }

    pub fn steps(&self) -> &[BuildStep] {
        &self.steps
    }

    /// Finished step list; flags never handed to a build tool are an error
    pub fn finish(self) -> Result<Vec<BuildStep>> {
        if !self.flags.is_empty() {
            return Err(BuildError::Recipe(format!(
                "flags collected but never passed to a build tool: {}",
                self.flags.join(" ")
            )));
        }
        Ok(self.steps)
    }
}

/// Everything a rule may look at
pub struct RuleContext<'a> {
    pub mode: BuildMode,
    pub selection: &'a OptionSelection,
    pub available: &'a [Dependency],
    pub layout: &'a BuildLayout,
    pub platform: &'a dyn PlatformContext,
}

impl RuleContext<'_> {
    pub fn has_dependency(&self, name: &str) -> bool {
        self.available.iter().any(|dep| dep.name == name)
    }
}

pub type EmitFn = fn(&RuleContext<'_>, &mut RecipeBuilder) -> Result<()>;

/// One conditional branch of a formula's install logic
#[derive(Clone)]
pub struct Rule {
    pub name: &'static str,
    pub when: Condition,
    pub emit: EmitFn,
}

impl Rule {
    pub fn new(name: &'static str, when: Condition, emit: EmitFn) -> Self {
        Self { name, when, emit }
    }

    pub fn always(name: &'static str, emit: EmitFn) -> Self {
        Self::new(name, Condition::Always, emit)
    }

    pub fn applies(&self, ctx: &RuleContext<'_>) -> bool {
        self.when.holds(ctx.mode, ctx.selection)
    }

    /// Run this rule alone; appends nothing if the condition does not hold
    pub fn apply(&self, ctx: &RuleContext<'_>, builder: &mut RecipeBuilder) -> Result<()> {
        if !self.applies(ctx) {
            return Ok(());
        }
        debug!(rule = self.name, "applying rule");
        (self.emit)(ctx, builder)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("when", &self.when)
            .finish()
    }
}

/// Resolve the ordered build steps for one build.
///
/// `available` lists the dependencies installed on this host. Every Required
/// dependency that applies to this build must be among them, otherwise this
/// fails with [`BuildError::MissingDependency`] before any rule runs.
pub fn build_steps(
    formula: &Formula,
    mode: BuildMode,
    selection: &OptionSelection,
    available: &[Dependency],
    layout: &BuildLayout,
    platform: &dyn PlatformContext,
) -> Result<Vec<BuildStep>> {
    formula.source(mode)?;
    check_dependencies(formula, mode, selection, available)?;

    let ctx = RuleContext {
        mode,
        selection,
        available,
        layout,
        platform,
    };

    let mut builder = RecipeBuilder::new();
    for rule in &formula.rules {
        rule.apply(&ctx, &mut builder)?;
    }

    let steps = builder.finish()?;
    debug!(formula = formula.name, %mode, steps = steps.len(), "resolved build steps");
    Ok(steps)
}

fn check_dependencies(
    formula: &Formula,
    mode: BuildMode,
    selection: &OptionSelection,
    available: &[Dependency],
) -> Result<()> {
    let present = |dep: &Dependency| available.iter().any(|a| a.name == dep.name);

    for dep in formula.enabled_dependencies(mode, selection) {
        if present(&dep) {
            continue;
        }
        if dep.requirement == Requirement::Required {
            return Err(BuildError::MissingDependency(dep.name));
        }
        warn!(
            formula = formula.name,
            dependency = %dep.name,
            "enabled dependency is not installed"
        );
    }
    Ok(())
}
