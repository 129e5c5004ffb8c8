use super::{BuildArgs, resolve_plan};
use crate::colors::is_tty;
use anyhow::{Context, Result};
use chembrew::cellar;
use chembrew::config::Config;
use chembrew::dependency::{CellarRegistry, DependencyKind};
use chembrew::executor::{CancellationToken, Executor};
use chembrew::fetch;
use chembrew::formula::StageContext;
use chembrew::installer;
use chembrew::platform::HostPlatform;
use chembrew::receipt::{InstallReceipt, RuntimeDependency};
use colored::Colorize;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

pub async fn install(config: &Config, name: &str, args: &BuildArgs, keep_build: bool) -> Result<()> {
    let start = Instant::now();
    let platform = HostPlatform::new(&config.prefix, config.jobs)?;
    let registry = CellarRegistry::new(&config.prefix);
    let plan = resolve_plan(config, name, args, &platform, &registry, false)?;
    let formula = &plan.formula;
    let keg = plan.layout.prefix.clone();

    println!(
        "{}",
        format!("==> Installing {} {} ({})", formula.name, plan.version, plan.mode)
            .bold()
            .green()
    );

    let source = formula.source(plan.mode)?;
    info!(formula = formula.name, "fetching source");
    fetch::fetch(
        formula.name,
        source,
        &config.cache_dir,
        &plan.layout.buildpath,
        is_tty(),
    )
    .await
    .with_context(|| format!("Failed to fetch {}", formula.name))?;

    let token = CancellationToken::new();
    let ctrl_c = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("{} Cancelling after the current step...", "⚠".yellow());
                token.cancel();
            }
        })
    };

    println!("==> Building ({} steps)", plan.steps.len());
    let steps = plan.steps.clone();
    let report = tokio::task::spawn_blocking(move || {
        Executor::host().with_cancellation(token).execute(steps)
    })
    .await
    .context("Build task failed")?;
    ctrl_c.abort();
    let report = report?;

    for index in &report.tolerated_failures {
        println!(
            "  {} step {} failed (ignored): {}",
            "⚠".yellow(),
            index + 1,
            plan.steps[*index]
        );
    }

    let mappings = formula.stage(&StageContext {
        mode: plan.mode,
        selection: &plan.selection,
        layout: &plan.layout,
        platform: &platform,
    })?;
    debug!(count = mappings.len(), "staged install mappings");

    let installed = installer::install(&mappings, &keg)?;
    for path in &installed.installed {
        debug!(path = %path.display(), "installed");
    }

    let runtime_deps = plan
        .available
        .iter()
        .filter(|dep| dep.kind == DependencyKind::Runtime)
        .map(|dep| {
            let version = cellar::installed_versions(&config.cellar(), dep.short_name())
                .ok()
                .and_then(|kegs| kegs.into_iter().next())
                .map(|keg| keg.version)
                .unwrap_or_default();
            RuntimeDependency {
                full_name: dep.name.clone(),
                version,
                declared_directly: true,
            }
        })
        .collect();

    InstallReceipt::new(formula, plan.mode, &plan.selection, runtime_deps).write(&keg)?;

    if !keep_build {
        remove_build_dir(&plan.layout.buildpath);
    }

    println!(
        "{} {} installed to {} in {:.1}s",
        "✓".green(),
        formula.name.bold(),
        keg.display(),
        start.elapsed().as_secs_f64()
    );

    Ok(())
}

/// Remove a finished build directory, reporting whether it is gone
fn remove_build_dir(path: &Path) -> bool {
    match fs::remove_dir_all(path) {
        Ok(()) => true,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to remove build directory");
            false
        }
    }
}
