// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{
    BatchSize, BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main,
};
use kurbo::Size;
use std::time::Duration;
use understory_virtual_grid::{
    GridConfig, GridEvent, ManualEventSource, RenderWindow, Sentinel, StepContext, VirtualGrid,
    Visibility, WindowEvent, WindowState,
};

fn mounted_grid(items: usize, width: f64) -> (VirtualGrid, ManualEventSource) {
    let mut source = ManualEventSource::new();
    let mut grid = VirtualGrid::new(GridConfig::default()).unwrap();
    grid.mount(&mut source);
    let resize = source.resize_event(Size::new(width, 900.0)).unwrap();
    grid.handle_event(&mut source, resize, Duration::ZERO);
    grid.set_item_count(&mut source, items);
    grid.handle_event(&mut source, GridEvent::Scroll { offset: 100.0 }, Duration::ZERO);
    (grid, source)
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("virtual_grid/step");
    let ctx = StepContext::default();

    // The pure transition should be flat regardless of how much is loaded.
    for items in [1_000usize, 100_000, 10_000_000] {
        let state = WindowState::from_parts(0, items, 6, 12)
            .step(&WindowEvent::Scrolled { offset: 100.0 }, &ctx)
            .state
            .step(&WindowEvent::Scrolled { offset: 400.0 }, &ctx)
            .state;

        group.bench_with_input(BenchmarkId::new("top_sentinel", items), &state, |b, s| {
            b.iter(|| {
                black_box(s.step(
                    black_box(&WindowEvent::TopSentinel(Visibility::hidden_above())),
                    &ctx,
                ))
            });
        });

        group.bench_with_input(BenchmarkId::new("columns_changed", items), &state, |b, s| {
            b.iter(|| black_box(s.step(&WindowEvent::ColumnsChanged { columns: 5 }, &ctx)));
        });
    }

    group.finish();
}

fn bench_render_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("virtual_grid/render_window");

    // Manifest size scales with window_rows * columns, not with the item count.
    for window_rows in [6usize, 12, 48] {
        let state = WindowState::from_parts(1_000, 100_000, 6, window_rows);
        group.throughput(Throughput::Elements((window_rows * 6) as u64));
        group.bench_with_input(
            BenchmarkId::new("build", window_rows),
            &state,
            |b, state| {
                b.iter(|| black_box(RenderWindow::build(state, 2, Some(200_000))));
            },
        );
    }

    group.finish();
}

fn bench_scroll_session(c: &mut Criterion) {
    let mut group = c.benchmark_group("virtual_grid/scroll_session");

    // A full host round trip per scroll tick: scroll, sentinel, frame.
    for steps in [64usize, 512] {
        group.throughput(Throughput::Elements(steps as u64));
        group.bench_function(BenchmarkId::new("scroll_down", steps), |b| {
            b.iter_batched(
                || mounted_grid(100_000, 1300.0),
                |(mut grid, mut source)| {
                    for step in 0..steps {
                        let offset = 200.0 + step as f64 * 120.0;
                        grid.handle_event(&mut source, GridEvent::Scroll { offset }, Duration::ZERO);
                        if let Some(event) =
                            source.sentinel_event(Sentinel::Top, Visibility::hidden_above())
                        {
                            grid.handle_event(&mut source, event, Duration::ZERO);
                        }
                        black_box(grid.frame());
                    }
                    black_box(grid);
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_step,
    bench_render_window,
    bench_scroll_session
);
criterion_main!(benches);
