// Resolution tests for the built-in formulae
// Run against a static platform and an isolated Cellar; nothing is executed


use anyhow::Result;
use chembrew::BuildError;
use chembrew::dependency::DependencyRegistry;
use chembrew::formula::{BuildLayout, BuildMode, Formula};
use chembrew::formulae;
use chembrew::options::OptionSelection;
use chembrew::platform::StaticPlatform;
use chembrew::resolver::{BuildStep, build_steps};
use test_helpers::{TestEnvironment, names, overrides};

struct Scenario {
    env: TestEnvironment,
    formula: Formula,
    selection: OptionSelection,
    mode: BuildMode,
}

impl Scenario {
    fn new(name: &str, mode: BuildMode, pairs: &[(&str, bool)]) -> Result<Self> {
        let formula = formulae::find(name)?;
        let selection = formula.resolve_options(&overrides(pairs))?;
        Ok(Self {
            env: TestEnvironment::new(),
            formula,
            selection,
            mode,
        })
    }

    fn install_all(&self) {
        self.env.install_all(&self.formula, self.mode, &self.selection);
    }

    fn resolve(&self) -> chembrew::Result<Vec<BuildStep>> {
        let config = self.env.config();
        let version = self.formula.version(self.mode)?;
        let layout = BuildLayout::new(
            config.build_dir(self.formula.name, version),
            config.keg_path(self.formula.name, version),
        );
        let platform = StaticPlatform::macos(&self.env.prefix);
        let declared = self.formula.enabled_dependencies(self.mode, &self.selection);
        let available = self.env.registry().available(&declared);

        build_steps(
            &self.formula,
            self.mode,
            &self.selection,
            &available,
            &layout,
            &platform,
        )
    }
}

fn cmake_args(steps: &[BuildStep]) -> &[String] {
    &steps
        .iter()
        .find(|s| s.command == "cmake")
        .expect("no cmake step")
        .args
}

#[test]
fn test_resolution_is_deterministic() -> Result<()> {
    let scenario = Scenario::new(
        "rdkit",
        BuildMode::Stable,
        &[("java", true), ("avalon", true), ("postgresql", true)],
    )?;
    scenario.install_all();

    let first = scenario.resolve()?;
    let second = scenario.resolve()?;
    assert_eq!(first, second);
    assert!(!first.is_empty());
    Ok(())
}

#[test]
fn test_inchi_without_java() -> Result<()> {
    let scenario = Scenario::new("rdkit", BuildMode::Stable, &[("java", false), ("inchi", true)])?;
    scenario.install_all();

    let steps = scenario.resolve()?;
    let args = cmake_args(&steps);
    assert!(args.contains(&"-DRDK_BUILD_INCHI_SUPPORT=ON".to_string()));
    assert!(!args.contains(&"-DRDK_BUILD_SWIG_WRAPPERS=ON".to_string()));
    assert_eq!(args.last().map(String::as_str), Some("."));
    assert!(!steps.iter().any(|s| s.command == "curl"));
    Ok(())
}

#[test]
fn test_missing_required_dependency() -> Result<()> {
    let scenario = Scenario::new("rdkit", BuildMode::Stable, &[])?;
    for dep in scenario
        .formula
        .enabled_dependencies(scenario.mode, &scenario.selection)
    {
        if dep.name != "boost" {
            scenario.env.install_dependency(&dep.name, "1.0");
        }
    }

    match scenario.resolve() {
        Err(BuildError::MissingDependency(name)) => assert_eq!(name, "boost"),
        other => panic!("expected MissingDependency, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_missing_recommended_dependency_only_warns() -> Result<()> {
    let scenario = Scenario::new("rdkit", BuildMode::Stable, &[])?;
    for dep in scenario
        .formula
        .enabled_dependencies(scenario.mode, &scenario.selection)
    {
        if !dep.name.ends_with("inchi") {
            scenario.env.install_dependency(&dep.name, "1.0");
        }
    }

    let steps = scenario.resolve()?;
    assert!(cmake_args(&steps).contains(&"-DRDK_BUILD_INCHI_SUPPORT=ON".to_string()));
    Ok(())
}

#[test]
fn test_java_stable_downloads_junit() -> Result<()> {
    let scenario = Scenario::new("rdkit", BuildMode::Stable, &[("java", true)])?;
    scenario.install_all();

    let steps = scenario.resolve()?;
    let commands: Vec<&str> = steps.iter().map(|s| s.command.as_str()).collect();
    assert_eq!(
        commands,
        vec!["mkdir", "sh", "cmake", "make", "make", "find"]
    );
    assert!(cmake_args(&steps).contains(&"-DRDK_BUILD_SWIG_WRAPPERS=ON".to_string()));
    assert!(steps.last().is_some_and(|s| s.allow_failure));
    Ok(())
}

#[test]
fn test_head_skips_downloads_and_adds_pgsql_flag() -> Result<()> {
    let scenario = Scenario::new(
        "rdkit",
        BuildMode::HeadOfSourceControl,
        &[("java", true), ("avalon", true), ("postgresql", true)],
    )?;
    scenario.install_all();

    let steps = scenario.resolve()?;
    assert!(!steps.iter().any(|s| s.command == "curl" || s.command == "sh"));
    let args = cmake_args(&steps);
    assert!(args.contains(&"-DRDK_BUILD_PGSQL=ON".to_string()));
    assert!(args.contains(&"-DRDK_BUILD_AVALON_SUPPORT=ON".to_string()));
    assert!(!args.iter().any(|a| a.starts_with("-DAVALONTOOLS_DIR=")));
    assert!(!steps.iter().any(|s| s.env.contains_key("RDBASE")));
    Ok(())
}

#[test]
fn test_stable_postgresql_builds_cartridge() -> Result<()> {
    let scenario = Scenario::new("rdkit", BuildMode::Stable, &[("postgresql", true)])?;
    scenario.install_all();

    let steps = scenario.resolve()?;
    let cartridge: Vec<&BuildStep> = steps
        .iter()
        .filter(|s| s.working_dir.ends_with("Code/PgSQL/rdkit"))
        .collect();
    assert_eq!(cartridge.len(), 2);
    assert!(cartridge.iter().all(|s| s.env.contains_key("RDBASE")));
    assert!(!cmake_args(&steps).contains(&"-DRDK_BUILD_PGSQL=ON".to_string()));
    Ok(())
}

#[test]
fn test_python3_flavour_dependencies() -> Result<()> {
    let formula = formulae::find("rdkit")?;
    let py3 = formula.resolve_options(&overrides(&[("python3", true), ("pycairo", true)]))?;
    let deps = formula.enabled_dependencies(BuildMode::Stable, &py3);
    let deps = names(&deps);
    assert!(deps.contains(&"python3"));
    assert!(deps.contains(&"py3cairo"));
    assert!(!deps.contains(&"numpy"));
    assert!(!deps.contains(&"py2cairo"));

    let py2 = formula.resolve_options(&overrides(&[("pycairo", true)]))?;
    let deps = formula.enabled_dependencies(BuildMode::Stable, &py2);
    let deps = names(&deps);
    assert!(deps.contains(&"numpy"));
    assert!(deps.contains(&"py2cairo"));
    assert!(!deps.contains(&"python3"));
    Ok(())
}

#[test]
fn test_unknown_option_rejected() -> Result<()> {
    let formula = formulae::find("rdkit")?;
    let err = formula
        .resolve_options(&overrides(&[("java", true), ("fortran", true)]))
        .unwrap_err();
    assert!(matches!(err, BuildError::UnknownOption { ref option, .. } if option == "fortran"));
    Ok(())
}

#[test]
fn test_opsin_modes() -> Result<()> {
    let stable = Scenario::new("opsin", BuildMode::Stable, &[])?;
    assert!(stable.resolve()?.is_empty());

    let head = Scenario::new("opsin", BuildMode::HeadOfSourceControl, &[])?;
    assert!(matches!(
        head.resolve(),
        Err(BuildError::MissingDependency(ref name)) if name == "maven"
    ));

    head.install_all();
    let steps = head.resolve()?;
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].command_line(), "mvn package assembly:assembly -DskipTests");

    let devel = Scenario::new("opsin", BuildMode::Development, &[])?;
    assert!(matches!(devel.resolve(), Err(BuildError::UnsupportedMode { .. })));
    Ok(())
}
