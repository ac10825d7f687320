// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

use std::cell::RefCell;
use std::rc::Rc;

use lumen_engine::run_simulation;
use lumen_engine::test_helpers::start_test;

#[test]
fn time_advances() {
    let mut engine = start_test(file!());
    let clock = engine.default_clock();

    engine.spawn(async move {
        clock.wait_ticks(5).await;
        clock.wait_ticks(7).await;
        Ok(())
    });
    run_simulation!(engine);
    assert_eq!(engine.time_now_ns(), 12.0);
}

#[test]
fn same_tick_wakes_in_order() {
    let mut engine = start_test(file!());
    let clock = engine.default_clock();
    let order = Rc::new(RefCell::new(Vec::new()));

    for i in 0..4 {
        let clock = clock.clone();
        let order = order.clone();
        engine.spawn(async move {
            clock.wait_ticks(3).await;
            order.borrow_mut().push(i);
            Ok(())
        });
    }
    run_simulation!(engine);
    assert_eq!(*order.borrow(), vec![0, 1, 2, 3]);
}

#[test]
fn earlier_ticks_first() {
    let mut engine = start_test(file!());
    let clock = engine.default_clock();
    let order = Rc::new(RefCell::new(Vec::new()));

    for (name, ticks) in [("late", 9), ("early", 2), ("middle", 5)] {
        let clock = clock.clone();
        let order = order.clone();
        engine.spawn(async move {
            clock.wait_ticks(ticks).await;
            order.borrow_mut().push((name, clock.time_now_ns()));
            Ok(())
        });
    }
    run_simulation!(engine);
    assert_eq!(
        *order.borrow(),
        vec![("early", 2.0), ("middle", 5.0), ("late", 9.0)]
    );
}

#[test]
fn zero_ticks_yields() {
    let mut engine = start_test(file!());
    let clock = engine.default_clock();
    let order = Rc::new(RefCell::new(Vec::new()));

    {
        let clock = clock.clone();
        let order = order.clone();
        engine.spawn(async move {
            clock.wait_ticks(0).await;
            order.borrow_mut().push("waited");
            Ok(())
        });
    }
    {
        let order = order.clone();
        engine.spawn(async move {
            order.borrow_mut().push("ran");
            Ok(())
        });
    }
    run_simulation!(engine);
    assert_eq!(*order.borrow(), vec!["ran", "waited"]);
    assert_eq!(clock.tick_now().tick(), 0);
}
