// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

use std::rc::Rc;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use lumen_engine::engine::Engine;
use lumen_engine::port::Port;
use lumen_optical::config::FabricConfig;
use lumen_optical::connector::Connector;
use lumen_optical::message::{Address, Message};
use lumen_optical::switch::Switch;
use lumen_track::tracker::dev_null_tracker;

const NUM_DEVICES: usize = 8;
const NUM_MESSAGES: usize = 200;

fn create_engine() -> Engine {
    // Create an engine without the tracker system opening files for logging
    let tracker = dev_null_tracker();
    Engine::new(&tracker)
}

fn run_engine(args: (Engine, Rc<Switch>)) {
    let (mut engine, switch) = args;
    engine.run().unwrap();
    assert_eq!(
        switch.num_forwarded() + switch.num_dropped(),
        NUM_DEVICES * NUM_MESSAGES
    );
}

fn setup_all_to_all() -> (Engine, Rc<Switch>) {
    let mut engine = create_engine();
    let clock = engine.default_clock();
    let top = engine.top().clone();

    let ports: Vec<_> = (0..NUM_DEVICES)
        .map(|i| Port::<Message>::new(&top, &format!("device_{i}"), NUM_MESSAGES, 1).unwrap())
        .collect();

    let switch = {
        let mut connector =
            Connector::new(&engine, &clock, &top, &FabricConfig::default()).unwrap();
        for port in &ports {
            connector.plug_in(port).unwrap();
        }
        connector.switch().clone()
    };

    for (i, port) in ports.iter().enumerate() {
        let port = port.clone();
        let dsts: Vec<_> = ports.iter().map(|p| Address::of_port(p)).collect();
        let clock = clock.clone();
        engine.spawn(async move {
            let src = Address::of_port(&port);
            for n in 0..NUM_MESSAGES {
                let dst = dsts[(i + n + 1) % NUM_DEVICES].clone();
                let write = Message::write_request(&port.entity, src.clone(), dst, vec![0; 64]);
                port.send(write)?;
                clock.wait_ticks(1).await;
            }
            Ok(())
        });
    }

    (engine, switch)
}

fn bench_fabric(c: &mut Criterion) {
    let mut group = c.benchmark_group("optical_fabric");

    group.bench_function("all_to_all", |b| {
        b.iter_batched(setup_all_to_all, run_engine, BatchSize::SmallInput);
    });

    group.finish();
}

criterion_group!(benches, bench_fabric);
criterion_main!(benches);
