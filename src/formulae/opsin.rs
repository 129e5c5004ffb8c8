//! OPSIN: chemical name to structure parser, distributed as a jar

use crate::dependency::Dependency;
use crate::error::{BuildError, Result};
use crate::formula::BuildMode::HeadOfSourceControl as Head;
use crate::formula::{Condition, DependencySpec, Formula, SourceSpec, StageContext, Vcs};
use crate::installer::InstallMapping;
use crate::resolver::{BuildStep, Rule};
use std::fs;
use std::path::{Path, PathBuf};

pub fn formula() -> Formula {
    Formula {
        name: "opsin",
        desc: "Open Parser for Systematic IUPAC nomenclature",
        homepage: "https://bitbucket.org/dan2097/opsin",
        stable: SourceSpec::archive(
            "https://bitbucket.org/dan2097/opsin/downloads/opsin-2.0.0-jar-with-dependencies.jar",
            "16cab943f1934dc80fc0c30715ded7c2e1f66c621f6a9c2fc10648dd3c777edb",
            "2.0.0",
        ),
        devel: None,
        head: Some(SourceSpec::checkout(
            "https://bitbucket.org/dan2097/opsin",
            Vcs::Mercurial,
        )),
        options: vec![],
        dependencies: vec![DependencySpec {
            dependency: Dependency::build("maven"),
            when: Condition::Mode(Head),
        }],
        rules: vec![Rule::new("maven-package", Condition::Mode(Head), |ctx, b| {
            b.step(BuildStep::new(
                "mvn",
                ["package", "assembly:assembly", "-DskipTests"],
                &ctx.layout.buildpath,
            ));
            Ok(())
        })],
        stage,
    }
}

fn stage(ctx: &StageContext<'_>) -> Result<Vec<InstallMapping>> {
    let search_dir = if ctx.mode.is_head() {
        ctx.layout.build_file("target")
    } else {
        ctx.layout.buildpath.clone()
    };
    let jar = find_jar(&search_dir)?;

    let launcher = ctx.layout.build_file(".chembrew/opsin");
    write_jar_script(&launcher, &ctx.layout.libexec().join("opsin.jar"))?;

    Ok(vec![
        InstallMapping::file(jar, "libexec/opsin.jar"),
        InstallMapping::file(launcher, "bin/opsin"),
    ])
}

/// The assembled jar: prefer the one bundling dependencies
fn find_jar(dir: &Path) -> Result<PathBuf> {
    let pattern = dir.join("*.jar");
    let mut jars: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())
        .map_err(|e| BuildError::Recipe(format!("bad jar pattern: {}", e)))?
        .filter_map(|entry| entry.ok())
        .collect();
    jars.sort();

    if jars.is_empty() {
        return Err(BuildError::Recipe(format!(
            "no jar found in {}",
            dir.display()
        )));
    }

    let preferred = jars
        .iter()
        .position(|jar| jar.to_string_lossy().contains("jar-with-dependencies"))
        .unwrap_or(0);
    Ok(jars.swap_remove(preferred))
}

/// Shell launcher that runs `jar` with java
fn write_jar_script(script: &Path, jar: &Path) -> Result<()> {
    if let Some(parent) = script.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(
        script,
        format!(
            "#!/bin/bash\nexec java -jar \"{}\" \"$@\"\n",
            jar.display()
        ),
    )?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(script, fs::Permissions::from_mode(0o755))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::{BuildLayout, BuildMode};
    use crate::platform::StaticPlatform;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_find_jar_prefers_bundle() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("opsin-2.1.0.jar"), "").unwrap();
        fs::write(
            temp.path().join("opsin-2.1.0-jar-with-dependencies.jar"),
            "",
        )
        .unwrap();
        let jar = find_jar(temp.path()).unwrap();
        assert!(jar.ends_with("opsin-2.1.0-jar-with-dependencies.jar"));
    }

    #[test]
    fn test_find_jar_missing() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(find_jar(temp.path()), Err(BuildError::Recipe(_))));
    }

    #[test]
    fn test_stage_writes_launcher() {
        let temp = TempDir::new().unwrap();
        let buildpath = temp.path().join("src");
        fs::create_dir_all(buildpath.join("target")).unwrap();
        fs::write(buildpath.join("target/opsin-2.1.0-jar-with-dependencies.jar"), "jar").unwrap();

        let layout = BuildLayout::new(&buildpath, temp.path().join("keg"));
        let platform = StaticPlatform::linux("/usr/local");
        let formula = formula();
        let selection = formula.resolve_options(&BTreeMap::new()).unwrap();
        let ctx = StageContext {
            mode: BuildMode::HeadOfSourceControl,
            selection: &selection,
            layout: &layout,
            platform: &platform,
        };

        let mappings = formula.stage(&ctx).unwrap();
        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[1].destination, PathBuf::from("bin/opsin"));

        let script = fs::read_to_string(&mappings[1].source).unwrap();
        assert!(script.starts_with("#!/bin/bash"));
        assert!(script.contains("keg/libexec/opsin.jar"));
    }
}
