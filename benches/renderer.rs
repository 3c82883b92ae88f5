use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use pgm_diagram::canvas::Backend;
use pgm_diagram::{
    Diagram, DiagramConfig, EdgeSpec, NodeSpec, Recorder, RecordingBackend, SvgBackend, Theme,
};
use std::hint::black_box;

/// A chain of latent nodes, each emitting an observed child, inside one
/// plate: the usual shape of a hidden Markov model.
fn chain<B: Backend>(steps: usize, backend: B) -> Diagram<B> {
    let mut pgm = Diagram::with_backend(DiagramConfig::default(), backend).expect("config");
    for i in 0..steps {
        let x = i as f64;
        pgm.add_node(NodeSpec::new(format!("z{i}")).content(format!("z{i}")).at(x, 1.0))
            .expect("latent");
        pgm.add_node(
            NodeSpec::new(format!("x{i}"))
                .content(format!("x{i}"))
                .at(x, 0.0)
                .observed(true),
        )
        .expect("observed");
        pgm.add_edge(&format!("z{i}"), &format!("x{i}"), EdgeSpec::new())
            .expect("emission");
        if i > 0 {
            pgm.add_edge(&format!("z{}", i - 1), &format!("z{i}"), EdgeSpec::new())
                .expect("transition");
        }
    }
    pgm.add_plate(pgm_diagram::Plate::new([-0.5, -0.5, steps as f64, 2.0]).label("T"));
    pgm
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    for steps in [4usize, 32, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(steps), &steps, |b, &steps| {
            let mut pgm = chain(steps, RecordingBackend);
            b.iter(|| {
                let canvas: &Recorder = pgm.render(None).expect("render");
                black_box(canvas.calls().len());
            });
        });
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_svg");
    for steps in [4usize, 32, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(steps), &steps, |b, &steps| {
            let mut pgm = chain(steps, SvgBackend::new(Theme::classic()));
            b.iter(|| {
                let canvas = pgm.render(None).expect("render");
                black_box(canvas.to_svg(true).len());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_layout, bench_render);
criterion_main!(benches);
