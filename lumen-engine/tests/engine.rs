// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use lumen_engine::run_simulation;
use lumen_engine::sim_error;
use lumen_engine::test_helpers::start_test;
use lumen_engine::time::clock::Clock;
use lumen_engine::traits::Runnable;
use lumen_engine::types::SimResult;

struct Counter {
    clock: Clock,
    count: RefCell<u64>,
    limit: u64,
}

#[async_trait(?Send)]
impl Runnable for Counter {
    async fn run(&self) -> SimResult {
        for _ in 0..self.limit {
            self.clock.wait_ticks(1).await;
            *self.count.borrow_mut() += 1;
        }
        Ok(())
    }
}

struct Idle;

#[async_trait(?Send)]
impl Runnable for Idle {}

#[test]
fn registered_components_are_spawned() {
    let mut engine = start_test(file!());
    let clock = engine.default_clock();

    let counter = Rc::new(Counter {
        clock,
        count: RefCell::new(0),
        limit: 10,
    });
    engine.register(counter.clone());
    engine.register(Rc::new(Idle));

    run_simulation!(engine);
    assert_eq!(*counter.count.borrow(), 10);
    assert_eq!(engine.time_now_ns(), 10.0);
}

#[test]
fn error_stops_simulation() {
    let mut engine = start_test(file!());
    let clock = engine.default_clock();
    let reached = Rc::new(RefCell::new(false));

    {
        let clock = clock.clone();
        engine.spawn(async move {
            clock.wait_ticks(2).await;
            sim_error!("failed at {}", clock.tick_now())
        });
    }
    {
        let reached = reached.clone();
        engine.spawn(async move {
            clock.wait_ticks(4).await;
            *reached.borrow_mut() = true;
            Ok(())
        });
    }

    run_simulation!(engine, "Error: failed at 2");
    assert!(!*reached.borrow());
}

#[test]
fn spawn_from_task() {
    let mut engine = start_test(file!());
    let clock = engine.default_clock();
    let spawner = engine.spawner();
    let done = Rc::new(RefCell::new(0));

    {
        let done = done.clone();
        engine.spawn(async move {
            for i in 1..=3 {
                let clock = clock.clone();
                let done = done.clone();
                spawner.spawn(async move {
                    clock.wait_ticks(i).await;
                    *done.borrow_mut() += 1;
                    Ok(())
                });
            }
            Ok(())
        });
    }

    run_simulation!(engine);
    assert_eq!(*done.borrow(), 3);
    assert_eq!(engine.time_now_ns(), 3.0);
}
