use chembrew::dependency::Dependency;
use chembrew::formula::{BuildLayout, BuildMode, Formula};
use chembrew::formulae;
use chembrew::options::{OptionSelection, parse_flags};
use chembrew::platform::StaticPlatform;
use chembrew::resolver::build_steps;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

fn setup(flags: &[&str], mode: BuildMode) -> (Formula, OptionSelection, Vec<Dependency>) {
    let formula = formulae::find("rdkit").unwrap();
    let overrides = parse_flags(flags).unwrap();
    let selection = formula.resolve_options(&overrides).unwrap();
    let available = formula.enabled_dependencies(mode, &selection);
    (formula, selection, available)
}

fn bench_parse_flags(c: &mut Criterion) {
    let flags = ["--with-java", "--without-inchi", "--with-avalon", "--with-postgresql"];

    c.bench_function("parse_flags", |b| {
        b.iter(|| parse_flags(black_box(&flags)))
    });
}

fn bench_resolve_options(c: &mut Criterion) {
    let formula = formulae::find("rdkit").unwrap();
    let overrides = parse_flags(&["--with-java", "--with-python3"]).unwrap();

    c.bench_function("resolve_options rdkit", |b| {
        b.iter(|| formula.resolve_options(black_box(&overrides)))
    });
}

fn bench_build_steps(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_steps");
    let layout = BuildLayout::new("/tmp/build/rdkit", "/usr/local/Cellar/rdkit/2015.09.2");
    let platform = StaticPlatform::macos("/usr/local");

    let cases: [(&str, &[&str], BuildMode); 3] = [
        ("defaults", &[], BuildMode::Stable),
        (
            "everything",
            &["--with-java", "--with-avalon", "--with-postgresql", "--with-pycairo"],
            BuildMode::Stable,
        ),
        ("head", &["--with-java", "--with-postgresql"], BuildMode::HeadOfSourceControl),
    ];

    for (name, flags, mode) in cases {
        let (formula, selection, available) = setup(flags, mode);
        group.bench_with_input(BenchmarkId::new(name, flags.len()), &mode, |b, &mode| {
            b.iter(|| {
                build_steps(
                    black_box(&formula),
                    mode,
                    &selection,
                    &available,
                    &layout,
                    &platform,
                )
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse_flags, bench_resolve_options, bench_build_steps);
criterion_main!(benches);
