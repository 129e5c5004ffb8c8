// Artifact installation into a keg

use anyhow::Result;
use chembrew::BuildError;
use chembrew::installer::{InstallMapping, install};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn build_tree(root: &Path) -> Result<PathBuf> {
    let build = root.join("build");
    fs::create_dir_all(build.join("Code/JavaWrappers/gmwrapper"))?;
    fs::write(build.join("Code/JavaWrappers/gmwrapper/org.RDKit.jar"), "jar")?;
    fs::create_dir_all(build.join("docs/html/api"))?;
    fs::write(build.join("docs/html/index.html"), "<html/>")?;
    fs::write(build.join("docs/html/api/GraphMol.html"), "<html/>")?;
    Ok(build)
}

#[test]
fn test_installs_files_and_directories() -> Result<()> {
    let temp = TempDir::new()?;
    let build = build_tree(temp.path())?;
    let keg = temp.path().join("Cellar/rdkit/2015.09.2");

    let mappings = vec![
        InstallMapping::file(
            build.join("Code/JavaWrappers/gmwrapper/org.RDKit.jar"),
            "libexec/org.RDKit.jar",
        ),
        InstallMapping::directory(build.join("docs/html"), "share/doc/rdkit"),
    ];
    let report = install(&mappings, &keg)?;

    assert_eq!(report.installed.len(), 2);
    assert_eq!(fs::read_to_string(keg.join("libexec/org.RDKit.jar"))?, "jar");
    assert!(keg.join("share/doc/rdkit/index.html").exists());
    assert!(keg.join("share/doc/rdkit/api/GraphMol.html").exists());
    Ok(())
}

#[test]
fn test_missing_source_does_not_stop_other_mappings() -> Result<()> {
    let temp = TempDir::new()?;
    let build = build_tree(temp.path())?;
    let keg = temp.path().join("keg");

    let missing = InstallMapping::file(build.join("rdkit.so"), "lib/postgresql/rdkit.so");
    let mappings = vec![
        missing.clone(),
        InstallMapping::file(
            build.join("Code/JavaWrappers/gmwrapper/org.RDKit.jar"),
            "libexec/org.RDKit.jar",
        ),
        InstallMapping::file(build.join("also-missing.jar"), "libexec/also-missing.jar"),
    ];

    match install(&mappings, &keg) {
        Err(BuildError::Install { mapping, cause }) => {
            assert_eq!(*mapping, missing);
            assert_eq!(cause.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("expected Install error, got {:?}", other),
    }

    // no rollback: the good mapping stays installed
    assert!(keg.join("libexec/org.RDKit.jar").exists());
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_symlink_mapping() -> Result<()> {
    let temp = TempDir::new()?;
    let keg = temp.path().join("keg");
    fs::create_dir_all(keg.join("libexec"))?;
    fs::write(keg.join("libexec/opsin.jar"), "jar")?;

    let mappings = vec![InstallMapping::symlink("../libexec/opsin.jar", "bin/opsin.jar")];
    install(&mappings, &keg)?;

    let link = keg.join("bin/opsin.jar");
    assert!(link.symlink_metadata()?.file_type().is_symlink());
    assert_eq!(fs::read_link(&link)?, PathBuf::from("../libexec/opsin.jar"));
    assert_eq!(fs::read_to_string(&link)?, "jar");

    // installing again is a no-op
    install(&mappings, &keg)?;
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_symlink_never_replaces_real_file() -> Result<()> {
    let temp = TempDir::new()?;
    let keg = temp.path().join("keg");
    fs::create_dir_all(keg.join("bin"))?;
    fs::create_dir_all(keg.join("libexec"))?;
    fs::write(keg.join("libexec/opsin.jar"), "jar")?;
    fs::write(keg.join("bin/opsin.jar"), "user file")?;

    let mappings = vec![InstallMapping::symlink("../libexec/opsin.jar", "bin/opsin.jar")];
    assert!(matches!(
        install(&mappings, &keg),
        Err(BuildError::Install { .. })
    ));
    assert_eq!(fs::read_to_string(keg.join("bin/opsin.jar"))?, "user file");
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_file_mapping_never_writes_through_symlink() -> Result<()> {
    let temp = TempDir::new()?;
    let outside = temp.path().join("outside.jar");
    fs::write(&outside, "precious")?;
    let new_jar = temp.path().join("new.jar");
    fs::write(&new_jar, "new")?;

    let keg = temp.path().join("keg");
    fs::create_dir_all(keg.join("libexec"))?;
    std::os::unix::fs::symlink(&outside, keg.join("libexec/opsin.jar"))?;

    install(&[InstallMapping::file(&new_jar, "libexec/opsin.jar")], &keg)?;

    assert_eq!(fs::read_to_string(&outside)?, "precious");
    let installed = keg.join("libexec/opsin.jar");
    assert!(!installed.symlink_metadata()?.file_type().is_symlink());
    assert_eq!(fs::read_to_string(&installed)?, "new");
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_directory_mapping_never_writes_through_symlink() -> Result<()> {
    let temp = TempDir::new()?;
    let build = build_tree(temp.path())?;
    let outside = temp.path().join("outside.html");
    fs::write(&outside, "precious")?;

    let keg = temp.path().join("keg");
    fs::create_dir_all(keg.join("share/doc/rdkit"))?;
    std::os::unix::fs::symlink(&outside, keg.join("share/doc/rdkit/index.html"))?;

    install(
        &[InstallMapping::directory(build.join("docs/html"), "share/doc/rdkit")],
        &keg,
    )?;

    assert_eq!(fs::read_to_string(&outside)?, "precious");
    assert_eq!(fs::read_to_string(keg.join("share/doc/rdkit/index.html"))?, "<html/>");
    Ok(())
}
