//! RustKit interaction benchmarks
//!
//! Run with: cargo bench -p rustkit-bench

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rustkit_bench::{generate_html, Fixture, Scenario};
use rustkit_dom::Document;

fn fixture_parsing_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("fixture_parsing");

    for buttons in [8, 64, 512] {
        let html = generate_html(buttons);
        group.throughput(Throughput::Bytes(html.len() as u64));
        group.bench_with_input(BenchmarkId::new("parse", buttons), &html, |b, html| {
            b.iter(|| Document::parse_html(html))
        });
    }

    group.finish();
}

fn press_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("press");
    let fixture = match Fixture::new(32) {
        Ok(fixture) => fixture,
        Err(err) => panic!("bench fixture: {err}"),
    };

    for scenario in [
        Scenario::MouseClick,
        Scenario::KeyboardPress,
        Scenario::VirtualClick,
    ] {
        group.bench_function(scenario.name(), |b| b.iter(|| scenario.replay(&fixture)));
    }

    group.throughput(Throughput::Elements(fixture.buttons.len() as u64));
    group.bench_function("toolbar-sweep", |b| {
        b.iter(|| Scenario::ToolbarSweep.replay(&fixture))
    });

    group.finish();
}

fn bound_controller_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("press_scaling");

    // A click only reaches its own target's controllers, so this should stay flat.
    for buttons in [1, 16, 128] {
        let fixture = match Fixture::new(buttons) {
            Ok(fixture) => fixture,
            Err(err) => panic!("bench fixture: {err}"),
        };
        group.bench_with_input(
            BenchmarkId::new("mouse-click", buttons),
            &fixture,
            |b, fixture| b.iter(|| Scenario::MouseClick.replay(fixture)),
        );
    }

    group.finish();
}

fn move_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("move");
    let fixture = match Fixture::new(1) {
        Ok(fixture) => fixture,
        Err(err) => panic!("bench fixture: {err}"),
    };

    for steps in [10u32, 100] {
        group.throughput(Throughput::Elements(steps as u64));
        group.bench_with_input(BenchmarkId::new("drag", steps), &steps, |b, &steps| {
            b.iter(|| Scenario::Drag { steps }.replay(&fixture))
        });
    }

    group.finish();
}

fn modality_benchmarks(c: &mut Criterion) {
    let fixture = match Fixture::new(1) {
        Ok(fixture) => fixture,
        Err(err) => panic!("bench fixture: {err}"),
    };
    c.bench_function("modality/flip", |b| {
        b.iter(|| Scenario::ModalityFlip.replay(&fixture))
    });
}

criterion_group!(
    benches,
    fixture_parsing_benchmarks,
    press_benchmarks,
    bound_controller_scaling,
    move_benchmarks,
    modality_benchmarks,
);

criterion_main!(benches);
