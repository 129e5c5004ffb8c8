use super::{BuildArgs, resolve_plan};
use crate::colors::is_tty;
use anyhow::Result;
use chembrew::config::Config;
use chembrew::dependency::{CellarRegistry, DependencyKind, DependencyRegistry};
use chembrew::formula::BuildMode;
use chembrew::formulae;
use chembrew::options::OptionSelection;
use chembrew::platform::HostPlatform;
use chembrew::resolver::BuildStep;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

pub fn list() -> Result<()> {
    let tty = is_tty();
    for formula in formulae::all() {
        if tty {
            println!(
                "{} {} - {}",
                formula.name.bold(),
                formula.stable.version.dimmed(),
                formula.desc
            );
        } else {
            println!("{}", formula.name);
        }
    }
    Ok(())
}

pub fn options(name: &str) -> Result<()> {
    let formula = formulae::find(name)?;
    let options = formula.all_options();

    if options.is_empty() {
        println!("No options available");
        return Ok(());
    }

    for option in options {
        println!("{}", option.flag().cyan());
        println!("\t{}", option.description);
    }

    let mut modes = Vec::new();
    if formula.devel.is_some() {
        modes.push(("--devel", "Install development version"));
    }
    if formula.head.is_some() {
        modes.push(("--HEAD", "Install HEAD version"));
    }
    for (flag, description) in modes {
        println!("{}", flag.cyan());
        println!("\t{}", description);
    }

    Ok(())
}

pub fn deps(config: &Config, name: &str, args: &BuildArgs) -> Result<()> {
    let formula = formulae::find(name)?;
    let mode = args.mode();
    let overrides = chembrew::options::parse_flags(&args.option_flags())?;
    let selection = formula.resolve_options(&overrides)?;
    let registry = CellarRegistry::new(&config.prefix);
    let tty = is_tty();

    let dependencies = formula.enabled_dependencies(mode, &selection);
    if dependencies.is_empty() {
        if tty {
            println!("{} No dependencies", "✓".green());
        }
        return Ok(());
    }

    for (kind, heading) in [
        (DependencyKind::Build, "Build dependencies:"),
        (DependencyKind::Runtime, "Runtime dependencies:"),
    ] {
        let group: Vec<_> = dependencies.iter().filter(|d| d.kind == kind).collect();
        if group.is_empty() {
            continue;
        }
        if tty {
            println!("{}", heading.bold().green());
        }
        for dep in group {
            if !tty {
                println!("{}", dep.name);
            } else if registry.is_installed(&dep.name) {
                println!("  {} {}", "✓".green(), dep.to_string().cyan());
            } else {
                println!("  {} {}", "✗".red(), dep);
            }
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct PlanOutput<'a> {
    formula: &'a str,
    version: &'a str,
    mode: BuildMode,
    options: &'a OptionSelection,
    missing: Vec<&'a str>,
    keg: &'a PathBuf,
    steps: &'a [BuildStep],
}

pub fn plan(config: &Config, name: &str, args: &BuildArgs, assume_installed: bool, json: bool) -> Result<()> {
    let platform = HostPlatform::new(&config.prefix, config.jobs)?;
    let registry = CellarRegistry::new(&config.prefix);
    let plan = resolve_plan(config, name, args, &platform, &registry, assume_installed)?;

    let missing: Vec<&str> = plan
        .dependencies
        .iter()
        .filter(|dep| !plan.available.contains(dep))
        .map(|dep| dep.name.as_str())
        .collect();

    if json {
        let output = PlanOutput {
            formula: plan.formula.name,
            version: &plan.version,
            mode: plan.mode,
            options: &plan.selection,
            missing,
            keg: &plan.layout.prefix,
            steps: &plan.steps,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "{}",
        format!("==> {} {} ({})", plan.formula.name, plan.version, plan.mode)
            .bold()
            .green()
    );
    let used = plan.selection.used_flags();
    if !used.is_empty() {
        println!("Options: {}", used.join(" "));
    }
    for name in &missing {
        println!("{} {} is not installed", "⚠".yellow(), name);
    }
    println!("Keg: {}", plan.layout.prefix.display());
    println!();

    for (i, step) in plan.steps.iter().enumerate() {
        println!("{} {}", format!("{:>3}.", i + 1).dimmed(), step);
        if step.working_dir != plan.layout.buildpath {
            println!("     {}", format!("in {}", step.working_dir.display()).dimmed());
        }
        if step.allow_failure {
            println!("     {}", "(failure tolerated)".dimmed());
        }
    }

    Ok(())
}
