//! Performance benchmarks for gatesim.
//!
//! Run with: `cargo bench`
//! Or for specific bench: `cargo bench --bench propagation_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use gatesim::{
    BoundaryLayout, Circuit, Component, ComponentId, EngineConfig, Frontier, GateOp, Position,
    PropagationEngine, Side,
};

// ============================================================================
// Benchmark Circuits
// ============================================================================

/// A switch feeding `length` inverters in series.
fn not_chain(length: usize) -> (Circuit, ComponentId) {
    let mut circuit = Circuit::new();
    let switch = circuit.add(Component::switch());
    let mut previous = switch;
    for _ in 0..length {
        let not = circuit.add(Component::not());
        circuit.connect(previous, 0, not, 0).unwrap();
        previous = not;
    }
    (circuit, switch)
}

/// `count` independent NAND latches whose set inputs share one switch.
fn latch_array(count: usize) -> (Circuit, ComponentId) {
    let mut circuit = Circuit::new();
    let set = circuit.add(Component::switch());
    let reset = circuit.add(Component::constant(true));
    for _ in 0..count {
        let top = circuit.add(Component::gate(GateOp::Nand, 2).unwrap());
        let bottom = circuit.add(Component::gate(GateOp::Nand, 2).unwrap());
        circuit.connect(set, 0, top, 0).unwrap();
        circuit.connect(reset, 0, bottom, 1).unwrap();
        circuit.connect(bottom, 0, top, 1).unwrap();
        circuit.connect(top, 0, bottom, 0).unwrap();
    }
    let seeds: Vec<_> = circuit.component_ids().collect();
    PropagationEngine::default().run(&mut circuit, seeds);
    (circuit, set)
}

/// Inverter wrapped in `depth` levels of Custom nodes.
fn nested_inverter(depth: usize) -> Component {
    let mut inner = Circuit::new();
    let input = inner.add(Component::switch());
    let core = if depth == 0 {
        inner.add(Component::not())
    } else {
        inner.add(nested_inverter(depth - 1))
    };
    let output = inner.add(Component::light());
    inner.connect(input, 0, core, 0).unwrap();
    inner.connect(core, 0, output, 0).unwrap();
    let layout = BoundaryLayout::new()
        .with_side(Side::Left, vec![input])
        .with_side(Side::Right, vec![output]);
    Component::custom(format!("INV{depth}"), inner, layout).unwrap()
}

// ============================================================================
// Propagation Benchmarks
// ============================================================================

fn bench_not_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("not_chain");

    for length in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*length as u64));
        group.bench_with_input(BenchmarkId::new("length", length), length, |b, &length| {
            let (mut circuit, switch) = not_chain(length);
            let engine = PropagationEngine::new(EngineConfig::default());
            b.iter(|| {
                circuit.toggle_switch(switch).unwrap();
                black_box(engine.run(&mut circuit, [switch]))
            });
        });
    }

    group.finish();
}

fn bench_latch_array(c: &mut Criterion) {
    let mut group = c.benchmark_group("latch_array");

    for count in [10, 100, 500].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("latches", count), count, |b, &count| {
            let (mut circuit, set) = latch_array(count);
            let engine = PropagationEngine::default();
            b.iter(|| {
                circuit.toggle_switch(set).unwrap();
                black_box(engine.run(&mut circuit, [set]))
            });
        });
    }

    group.finish();
}

fn bench_nested_custom(c: &mut Criterion) {
    let mut group = c.benchmark_group("nested_custom");

    for depth in [1, 4, 8].iter() {
        group.bench_with_input(BenchmarkId::new("depth", depth), depth, |b, &depth| {
            let mut circuit = Circuit::new();
            let switch = circuit.add(Component::switch());
            let node = circuit.add(nested_inverter(depth));
            circuit.connect(switch, 0, node, 0).unwrap();
            let engine = PropagationEngine::default();
            engine.run(&mut circuit, [switch, node]);

            b.iter(|| {
                circuit.toggle_switch(switch).unwrap();
                black_box(engine.run(&mut circuit, [switch]))
            });
        });
    }

    group.finish();
}

// ============================================================================
// Structure Benchmarks
// ============================================================================

fn bench_duplicate(c: &mut Criterion) {
    let mut group = c.benchmark_group("duplicate");

    for length in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*length as u64));
        group.bench_with_input(BenchmarkId::new("chain", length), length, |b, &length| {
            let (circuit, _) = not_chain(length);
            let ids: Vec<_> = circuit.component_ids().collect();
            b.iter(|| {
                let mut target = Circuit::new();
                black_box(gatesim::duplicate_into(&circuit, &ids, Position::default(), &mut target).unwrap())
            });
        });
    }

    group.finish();
}

fn bench_frontier(c: &mut Criterion) {
    let mut group = c.benchmark_group("frontier");

    for count in [1000, 10000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("push_pop", count), count, |b, &count| {
            let mut circuit = Circuit::new();
            let ids: Vec<_> = (0..count).map(|_| circuit.add(Component::light())).collect();
            b.iter(|| {
                let mut frontier = Frontier::new();
                for &id in &ids {
                    frontier.push(id);
                    frontier.push(id);
                }
                while let Some(id) = frontier.pop() {
                    black_box(id);
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_not_chain,
    bench_latch_array,
    bench_nested_custom,
    bench_duplicate,
    bench_frontier,
);

criterion_main!(benches);
