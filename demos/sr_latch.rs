//! NAND SR latch driven through the background scheduler.
//!
//! Builds a latch with active-low set and reset switches, hands it to a
//! `Scheduler` and pulses the inputs, printing Q and Q' after each pass
//! settles. A NOT gate wired to itself is added at the end to show how an
//! oscillating circuit is reported.

use std::time::Duration;

use gatesim::{
    Circuit, Component, ComponentId, EngineConfig, GateOp, Scheduler, SchedulerConfig,
    SchedulerEvent,
};

const TIMEOUT: Duration = Duration::from_secs(2);
const MAX_UPDATES: u64 = 1_000;

// -----------------------------------------------------------------------------
// Circuit
// -----------------------------------------------------------------------------

struct Latch {
    set: ComponentId,
    reset: ComponentId,
    q: ComponentId,
    q_bar: ComponentId,
}

fn build_latch(circuit: &mut Circuit) -> Result<Latch, gatesim::CircuitError> {
    let set = circuit.add(Component::switch().with_name("S").with_position(0, 0));
    let reset = circuit.add(Component::switch().with_name("R").with_position(0, 60));
    let top = circuit.add(Component::gate(GateOp::Nand, 2)?.with_position(60, 0));
    let bottom = circuit.add(Component::gate(GateOp::Nand, 2)?.with_position(60, 60));
    let q = circuit.add(Component::light().with_name("Q").with_position(120, 0));
    let q_bar = circuit.add(Component::light().with_name("Q_BAR").with_position(120, 60));

    circuit.connect(set, 0, top, 0)?;
    circuit.connect(reset, 0, bottom, 1)?;
    circuit.connect(bottom, 0, top, 1)?;
    circuit.connect(top, 0, bottom, 0)?;
    circuit.connect(top, 0, q, 0)?;
    circuit.connect(bottom, 0, q_bar, 0)?;

    circuit.set_switch(set, true)?;
    circuit.set_switch(reset, true)?;
    Ok(Latch { set, reset, q, q_bar })
}

fn print_outputs(scheduler: &Scheduler, latch: &Latch, step: &str) {
    let (q, q_bar) = scheduler.read(|c| {
        let high = |id| c.state(id).map(|s| s.is_high()).unwrap_or(false);
        (high(latch.q), high(latch.q_bar))
    });
    println!("{step:<14} Q={} Q'={}", q as u8, q_bar as u8);
}

fn settle(scheduler: &Scheduler) -> Result<(), gatesim::SchedulerError> {
    for event in scheduler.wait_for_idle(TIMEOUT)? {
        if let SchedulerEvent::PassCompleted(report) = event {
            if !report.is_stable() {
                println!(
                    "  pass {} did not settle after {} updates",
                    report.pass, report.stats.updates
                );
            }
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    gatesim::init_logging("warn");

    println!("==== SR latch example ====");
    println!("Active-low set/reset NAND latch on a background scheduler.\n");

    let mut circuit = Circuit::new();
    let latch = build_latch(&mut circuit)?;

    let config = SchedulerConfig::default()
        .with_engine(EngineConfig::default().with_max_updates(MAX_UPDATES));
    let scheduler = Scheduler::spawn(circuit, config)?;

    scheduler.request_all()?;
    settle(&scheduler)?;
    print_outputs(&scheduler, &latch, "power on");

    for (step, switch, value) in [
        ("set low", latch.set, false),
        ("set high", latch.set, true),
        ("reset low", latch.reset, false),
        ("reset high", latch.reset, true),
    ] {
        scheduler.set_switch(switch, value)?;
        settle(&scheduler)?;
        print_outputs(&scheduler, &latch, step);
    }

    // A ring of one inverter never settles.
    let not = scheduler.with_circuit(|c| {
        let not = c.add(Component::not().with_name("RING"));
        c.connect(not, 0, not, 0).map(|_| not)
    })?;
    scheduler.request(not)?;
    settle(&scheduler)?;

    let stats = scheduler.stats();
    println!("\n{}", stats.summary());
    scheduler.shutdown();
    Ok(())
}
