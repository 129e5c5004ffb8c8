// Resolve -> execute -> stage -> install -> receipt, with build tools faked


use anyhow::Result;
use chembrew::dependency::DependencyRegistry;
use chembrew::executor::{Executor, StepOutput, StepRunner};
use chembrew::formula::{BuildLayout, BuildMode, StageContext};
use chembrew::formulae;
use chembrew::installer::install;
use chembrew::platform::StaticPlatform;
use chembrew::receipt::InstallReceipt;
use chembrew::resolver::{BuildStep, build_steps};
use std::fs;
use test_helpers::{TestEnvironment, overrides};

/// Stands in for maven: drops the assembled jars where `mvn package` would
#[derive(Default)]
struct FakeMaven {
    invocations: Vec<String>,
}

impl StepRunner for FakeMaven {
    fn run(&mut self, step: &BuildStep) -> StepOutput {
        self.invocations.push(step.command_line());
        let target = step.working_dir.join("target");
        let written = fs::create_dir_all(&target)
            .and_then(|_| fs::write(target.join("opsin-2.1.0.jar"), "thin"))
            .and_then(|_| {
                fs::write(
                    target.join("opsin-2.1.0-jar-with-dependencies.jar"),
                    "fat",
                )
            });
        match written {
            Ok(()) => StepOutput::succeeded("BUILD SUCCESS"),
            Err(e) => StepOutput::failed(Some(1), e.to_string()),
        }
    }
}

#[test]
fn test_opsin_head_pipeline() -> Result<()> {
    let env = TestEnvironment::new();
    env.install_dependency("maven", "3.3.9");
    let config = env.config();

    let formula = formulae::find("opsin")?;
    let mode = BuildMode::HeadOfSourceControl;
    let selection = formula.resolve_options(&overrides(&[]))?;
    let version = formula.version(mode)?;
    let layout = BuildLayout::new(
        config.build_dir(formula.name, version),
        config.keg_path(formula.name, version),
    );
    fs::create_dir_all(&layout.buildpath)?;
    let platform = StaticPlatform::linux(&env.prefix);

    let declared = formula.enabled_dependencies(mode, &selection);
    let available = env.registry().available(&declared);
    let steps = build_steps(&formula, mode, &selection, &available, &layout, &platform)?;

    let mut executor = Executor::new(FakeMaven::default());
    executor.execute(steps)?;
    assert_eq!(
        executor.runner().invocations,
        vec!["mvn package assembly:assembly -DskipTests"]
    );

    let mappings = formula.stage(&StageContext {
        mode,
        selection: &selection,
        layout: &layout,
        platform: &platform,
    })?;
    install(&mappings, &layout.prefix)?;

    let keg = &layout.prefix;
    assert_eq!(fs::read_to_string(keg.join("libexec/opsin.jar"))?, "fat");
    let launcher = fs::read_to_string(keg.join("bin/opsin"))?;
    assert!(launcher.contains(&keg.join("libexec/opsin.jar").display().to_string()));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(keg.join("bin/opsin"))?.permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    InstallReceipt::new(&formula, mode, &selection, vec![]).write(keg)?;
    let receipt = InstallReceipt::read(keg)?;
    assert_eq!(receipt.source.spec, "head");
    assert!(receipt.used_options.is_empty());
    Ok(())
}

#[test]
fn test_rdkit_java_staging() -> Result<()> {
    let env = TestEnvironment::new();
    let config = env.config();

    let formula = formulae::find("rdkit")?;
    let mode = BuildMode::Stable;
    let selection = formula.resolve_options(&overrides(&[("java", true)]))?;
    let version = formula.version(mode)?;
    let layout = BuildLayout::new(
        config.build_dir(formula.name, version),
        config.keg_path(formula.name, version),
    );
    let platform = StaticPlatform::linux(&env.prefix);

    // what `make install` leaves behind for the java wrappers
    let wrappers = layout.build_file("Code/JavaWrappers/gmwrapper");
    fs::create_dir_all(&wrappers)?;
    for file in ["org.RDKit.jar", "org.RDKitDoc.jar", "libGraphMolWrap.so"] {
        fs::write(wrappers.join(file), file)?;
    }

    let mappings = formula.stage(&StageContext {
        mode,
        selection: &selection,
        layout: &layout,
        platform: &platform,
    })?;
    let report = install(&mappings, &layout.prefix)?;

    assert_eq!(report.installed.len(), 3);
    assert!(layout.prefix.join("libexec/org.RDKit.jar").exists());
    assert!(layout.prefix.join("libexec/org.RDKitDoc.jar").exists());
    assert!(layout.prefix.join("lib/libGraphMolWrap.so").exists());

    let receipt = InstallReceipt::new(&formula, mode, &selection, vec![]);
    assert_eq!(receipt.used_options, vec!["--with-java"]);
    assert!(receipt.unused_options.contains(&"--without-inchi".to_string()));
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_rdkit_keeps_bundled_junit() -> Result<()> {
    let env = TestEnvironment::new();
    let config = env.config();

    let formula = formulae::find("rdkit")?;
    let mode = BuildMode::Stable;
    let selection = formula.resolve_options(&overrides(&[("java", true)]))?;
    env.install_all(&formula, mode, &selection);
    let version = formula.version(mode)?;
    let layout = BuildLayout::new(
        config.build_dir(formula.name, version),
        config.keg_path(formula.name, version),
    );
    let bundled = layout.build_file("External/java_lib/junit.jar");
    fs::create_dir_all(bundled.parent().unwrap())?;
    fs::write(&bundled, "bundled")?;

    let platform = StaticPlatform::linux(&env.prefix);
    let declared = formula.enabled_dependencies(mode, &selection);
    let available = env.registry().available(&declared);
    let steps = build_steps(&formula, mode, &selection, &available, &layout, &platform)?;

    // only the junit fetch; cmake and make are not available here
    let fetch: Vec<BuildStep> = steps
        .into_iter()
        .take_while(|step| step.command != "cmake")
        .collect();
    assert_eq!(fetch.len(), 2);

    let report = Executor::host().execute(fetch)?;
    assert_eq!(report.completed, 2);
    assert_eq!(fs::read_to_string(&bundled)?, "bundled");
    Ok(())
}
