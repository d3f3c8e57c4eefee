//! Benchmarks for configuration parsing and override resolution.
//!
//! These benchmarks measure parsing `configs/versions.conf` files of various
//! sizes, and resolving every repository for a mode.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lime_dev::config;
use lime_dev::mode::Mode;
use lime_dev::resolver::OverrideResolver;

/// A single repository.
const MINIMAL_CONFIG: &str = "\
[repositories]
lime-app=https://github.com/libremesh/lime-app.git|develop|origin
";

/// The shape of a typical workspace configuration.
const TYPICAL_CONFIG: &str = "\
# LibreMesh development workspace
[repositories]
lime-app=https://github.com/libremesh/lime-app.git|develop|origin
lime-packages=https://github.com/libremesh/lime-packages.git|master|origin
librerouteros=https://gitlab.com/librerouter/librerouteros.git|main|origin
openwrt=https://git.openwrt.org/openwrt/openwrt.git|openwrt-23.05|origin
kconfig-utils=https://github.com/libremesh/kconfig-utils.git|master|origin

[release_overrides]
lime-app=|v0.2.25|
lime-packages=|v2024.1|
openwrt=https://github.com/openwrt/openwrt.git|v23.05.5|github

[build_targets]
default=x86_64
multi=ath79_generic
librerouter=librerouter-v1

[firmware_versions]
lime-packages=2024.1
openwrt=23.05.5

[system_requirements]
node=18
npm=9

[qemu_config]
image_dir=build/qemu
memory=256

[upstream_remotes]
kconfig-utils=https://github.com/libremesh/kconfig-utils.git|master

[upstream_exclusions]
lime-app=dev.sh, .vscode/, *.local.js
";

fn generate_large_config(num_repos: usize, num_modes: usize) -> String {
    let mut config = String::from("[repositories]\n");
    for i in 0..num_repos {
        config.push_str(&format!(
            "repo-{}=https://git.example.org/mesh/repo-{}.git|main|origin\n",
            i, i
        ));
    }

    for m in 0..num_modes {
        config.push_str(&format!("\n[mode{}_overrides]\n", m));
        for i in (0..num_repos).step_by(2) {
            config.push_str(&format!("repo-{}=|release-{}.{}|\n", i, m, i));
        }
    }

    config.push_str("\n[build_targets]\ndefault=x86_64\n");
    config
}

fn bench_config_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("config_parsing");

    group.bench_function("minimal", |b| {
        b.iter(|| config::parse(black_box(MINIMAL_CONFIG)))
    });

    group.bench_function("typical", |b| {
        b.iter(|| config::parse(black_box(TYPICAL_CONFIG)))
    });

    group.finish();
}

fn bench_config_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("config_scaling");

    for num_repos in [10, 50, 200] {
        let config = generate_large_config(num_repos, 2);
        group.bench_with_input(
            BenchmarkId::new("repos", num_repos),
            &config,
            |b, config| b.iter(|| config::parse(black_box(config))),
        );
    }

    for num_modes in [1, 5, 20] {
        let config = generate_large_config(20, num_modes);
        group.bench_with_input(
            BenchmarkId::new("modes", num_modes),
            &config,
            |b, config| b.iter(|| config::parse(black_box(config))),
        );
    }

    group.finish();
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("override_resolution");

    for num_repos in [10, 50, 200] {
        let model = config::parse(&generate_large_config(num_repos, 5)).unwrap();
        let mode = Mode::named("mode3");
        group.bench_with_input(BenchmarkId::new("repos", num_repos), &model, |b, model| {
            b.iter(|| OverrideResolver::new(black_box(model)).resolve_all(&mode))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_config_parsing,
    bench_config_scaling,
    bench_resolution
);
criterion_main!(benches);
