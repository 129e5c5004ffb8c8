//! RDKit: cheminformatics toolkit built with CMake

use crate::dependency::Dependency;
use crate::error::Result;
use crate::formula::BuildMode::HeadOfSourceControl as Head;
use crate::formula::Condition::{All, Always, Mode, NotMode, With, Without};
use crate::formula::{Condition, DependencySpec, Formula, SourceSpec, StageContext, Vcs};
use crate::installer::InstallMapping;
use crate::options::OptionSpec;
use crate::platform::PythonFlavor;
use crate::resolver::{BuildStep, RecipeBuilder, Rule, RuleContext};

const JUNIT_URL: &str =
    "http://search.maven.org/remotecontent?filepath=junit/junit/4.11/junit-4.11.jar";
const JUNIT_JAR: &str = "External/java_lib/junit.jar";
const JUNIT_FETCH_SCRIPT: &str = r#"test -f "$1" || curl -fsSL "$2" -o "$1""#;
const AVALON_URL: &str = "https://downloads.sourceforge.net/project/avalontoolkit/AvalonToolkit_1.2/AvalonToolkit_1.2.0.source.tar";
const PGSQL_DIR: &str = "Code/PgSQL/rdkit";
const JAVA_WRAPPER_DIR: &str = "Code/JavaWrappers/gmwrapper";

pub fn formula() -> Formula {
    Formula {
        name: "rdkit",
        desc: "Cheminformatics and machine learning toolkit",
        homepage: "http://rdkit.org/",
        stable: SourceSpec::archive(
            "https://github.com/rdkit/rdkit/archive/Release_2015_09_2.tar.gz",
            "2ad97ec2de97729c483b89cd65470d828a4be84c88305043660cc524a86fd053",
            "2015.09.2",
        ),
        devel: Some(SourceSpec::archive(
            "https://github.com/rdkit/rdkit/archive/Release_2016_03_1b1.tar.gz",
            "3c86af381ef586591368acabd0f67d90877a6944fb38c51a8c532285b31f5980",
            "2016.03.1b1",
        )),
        head: Some(SourceSpec::checkout(
            "https://github.com/rdkit/rdkit.git",
            Vcs::Git,
        )),
        options: vec![
            OptionSpec::new("java", "Build with Java language bindings", false),
            OptionSpec::new("inchi", "Build without InChI support", true),
            OptionSpec::new("postgresql", "Build with PostgreSQL database cartridge", false),
            OptionSpec::new("avalon", "Build with Avalon support", false),
            OptionSpec::new("pycairo", "Build with py2cairo/py3cairo support", false),
        ],
        dependencies: dependencies(),
        rules: rules(),
        stage,
    }
}

fn dep(dependency: Dependency, when: Condition) -> DependencySpec {
    DependencySpec { dependency, when }
}

fn dependencies() -> Vec<DependencySpec> {
    vec![
        dep(Dependency::build("cmake"), Always),
        dep(Dependency::build("swig"), With("java")),
        dep(Dependency::runtime("boost"), Always),
        dep(Dependency::optional("python3"), Always),
        dep(Dependency::recommended("mcs07/cheminformatics/inchi"), Always),
        dep(Dependency::optional("postgresql"), Always),
        // python 3 flavour
        dep(Dependency::runtime("boost-python"), Always),
        dep(
            Dependency::runtime("py3cairo"),
            All(vec![With("python3"), With("pycairo")]),
        ),
        // python 2 flavour
        dep(Dependency::runtime("python"), Without("python3")),
        dep(Dependency::runtime("numpy"), Without("python3")),
        dep(
            Dependency::runtime("py2cairo"),
            All(vec![Without("python3"), With("pycairo")]),
        ),
    ]
}

fn rules() -> Vec<Rule> {
    vec![
        Rule::always("std-cmake-args", std_cmake_args),
        Rule::always("out-of-tree-install", |_, b| {
            b.flag("-DRDK_INSTALL_INTREE=OFF");
            Ok(())
        }),
        Rule::new("java-wrappers", With("java"), |_, b| {
            b.flag("-DRDK_BUILD_SWIG_WRAPPERS=ON");
            Ok(())
        }),
        Rule::new("avalon-support", With("avalon"), |_, b| {
            b.flag("-DRDK_BUILD_AVALON_SUPPORT=ON");
            Ok(())
        }),
        Rule::new(
            "pgsql-cartridge-cmake",
            All(vec![Mode(Head), With("postgresql")]),
            |_, b| {
                b.flag("-DRDK_BUILD_PGSQL=ON");
                Ok(())
            },
        ),
        Rule::new("inchi-support", With("inchi"), inchi_flags),
        Rule::new(
            "junit-download",
            All(vec![NotMode(Head), With("java")]),
            junit_download,
        ),
        Rule::new(
            "avalon-download",
            All(vec![NotMode(Head), With("avalon")]),
            avalon_download,
        ),
        Rule::always("python", python_flags),
        Rule::always("configure", |ctx, b| {
            b.invoke_with_flags("cmake", ["."], &ctx.layout.buildpath);
            Ok(())
        }),
        Rule::always("compile", |ctx, b| {
            b.step(
                BuildStep::new("make", Vec::<String>::new(), &ctx.layout.buildpath)
                    .env("MAKEFLAGS", format!("-j{}", ctx.platform.make_jobs())),
            );
            Ok(())
        }),
        Rule::always("install", |ctx, b| {
            b.step(BuildStep::new("make", ["install"], &ctx.layout.buildpath));
            Ok(())
        }),
        Rule::always("prune-cmake-files", |ctx, b| {
            let lib = ctx.layout.lib();
            b.step(
                BuildStep::new(
                    "find",
                    [
                        lib.display().to_string(),
                        "-maxdepth".to_string(),
                        "1".to_string(),
                        "-name".to_string(),
                        "*.cmake".to_string(),
                        "-delete".to_string(),
                    ],
                    &ctx.layout.buildpath,
                )
                .allow_failure(),
            );
            Ok(())
        }),
        Rule::new(
            "pgsql-cartridge-make",
            All(vec![NotMode(Head), With("postgresql")]),
            pgsql_make,
        ),
    ]
}

fn std_cmake_args(ctx: &RuleContext<'_>, b: &mut RecipeBuilder) -> Result<()> {
    b.flag(format!(
        "-DCMAKE_INSTALL_PREFIX={}",
        ctx.layout.prefix.display()
    ))
    .flag("-DCMAKE_BUILD_TYPE=Release")
    .flag("-DCMAKE_FIND_FRAMEWORK=LAST")
    .flag("-DCMAKE_VERBOSE_MAKEFILE=ON")
    .flag("-Wno-dev");
    Ok(())
}

fn inchi_flags(ctx: &RuleContext<'_>, b: &mut RecipeBuilder) -> Result<()> {
    let prefix = ctx.platform.homebrew_prefix();
    b.flag("-DRDK_BUILD_INCHI_SUPPORT=ON")
        .flag(format!(
            "-DINCHI_INCLUDE_DIR={}/",
            prefix.join("include/inchi").display()
        ))
        .flag(format!(
            "-DINCHI_LIBRARIES={}",
            prefix
                .join("lib")
                .join(format!("libinchi.{}", ctx.platform.os().dylib_extension()))
                .display()
        ));
    Ok(())
}

fn junit_download(ctx: &RuleContext<'_>, b: &mut RecipeBuilder) -> Result<()> {
    let src = &ctx.layout.buildpath;
    // skipped when the source tree ships the jar
    b.step(BuildStep::new("mkdir", ["-p", "External/java_lib"], src))
        .step(BuildStep::new(
            "sh",
            [
                "-c",
                JUNIT_FETCH_SCRIPT,
                "sh",
                JUNIT_JAR,
                JUNIT_URL,
            ],
            src,
        ));
    Ok(())
}

fn avalon_download(ctx: &RuleContext<'_>, b: &mut RecipeBuilder) -> Result<()> {
    let src = &ctx.layout.buildpath;
    b.step(BuildStep::new(
        "curl",
        ["-fsSL", AVALON_URL, "-o", "External/AvalonTools/avalon.tar"],
        src,
    ))
    .step(BuildStep::new(
        "tar",
        [
            "xf",
            "External/AvalonTools/avalon.tar",
            "-C",
            "External/AvalonTools",
        ],
        src,
    ))
    .flag(format!(
        "-DAVALONTOOLS_DIR={}",
        ctx.layout
            .build_file("External/AvalonTools/SourceDistribution")
            .display()
    ));
    Ok(())
}

fn python_flags(ctx: &RuleContext<'_>, b: &mut RecipeBuilder) -> Result<()> {
    let flavor = if ctx.selection.with("python3") {
        PythonFlavor::Python3
    } else {
        PythonFlavor::Python2
    };
    let python = ctx.platform.python(flavor)?;

    b.flag(format!("-DPYTHON_EXECUTABLE={}", python.executable.display()))
        .flag(format!(
            "-DPYTHON_INCLUDE_DIR={}",
            python.include_dir.display()
        ))
        .flag(format!("-DPYTHON_LIBRARY={}", python.library.display()));

    if let Some(numpy) = &python.numpy_include_dir {
        b.flag(format!("-DPYTHON_NUMPY_INCLUDE_PATH={}", numpy.display()));
    }
    Ok(())
}

fn pgsql_make(ctx: &RuleContext<'_>, b: &mut RecipeBuilder) -> Result<()> {
    let dir = ctx.layout.build_file(PGSQL_DIR);
    let prefix = ctx.layout.prefix.display().to_string();
    let make_args = [
        "USE_THREADS=1".to_string(),
        format!("CFLAGS=-I{}", ctx.layout.include().join("rdkit").display()),
        format!(
            "THREADLIBS=-L{} -lboost_thread-mt -lboost_system",
            ctx.platform.homebrew_prefix().join("lib").display()
        ),
    ];

    b.step(BuildStep::new("make", make_args, &dir).env("RDBASE", prefix.clone()))
        .step(BuildStep::new("make", ["install"], &dir).env("RDBASE", prefix));
    Ok(())
}

fn stage(ctx: &StageContext<'_>) -> Result<Vec<InstallMapping>> {
    let layout = ctx.layout;
    let mut mappings = Vec::new();

    if ctx.selection.with("java") {
        let wrappers = layout.build_file(JAVA_WRAPPER_DIR);
        let jni = format!("libGraphMolWrap.{}", ctx.platform.os().jni_extension());
        mappings.push(InstallMapping::file(
            wrappers.join("org.RDKit.jar"),
            "libexec/org.RDKit.jar",
        ));
        mappings.push(InstallMapping::file(
            wrappers.join("org.RDKitDoc.jar"),
            "libexec/org.RDKitDoc.jar",
        ));
        mappings.push(InstallMapping::file(wrappers.join(&jni), format!("lib/{}", jni)));
    }

    if ctx.selection.with("postgresql") && ctx.mode.is_head() {
        let pgsql = layout.build_file(PGSQL_DIR);
        mappings.push(InstallMapping::file(
            pgsql.join("rdkit.sql91.in"),
            "share/postgresql/extension/rdkit--3.4.sql",
        ));
        mappings.push(InstallMapping::file(
            pgsql.join("rdkit.control"),
            "share/postgresql/extension/rdkit.control",
        ));
        mappings.push(InstallMapping::file(
            pgsql.join("rdkit.so"),
            "lib/postgresql/rdkit.so",
        ));
    }

    Ok(mappings)
}
