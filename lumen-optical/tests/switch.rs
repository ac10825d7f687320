// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

use std::rc::Rc;

use lumen_engine::engine::Engine;
use lumen_engine::run_simulation;
use lumen_engine::test_helpers::start_test;
use lumen_optical::config::FabricConfig;
use lumen_optical::message::{Message, MessageKind};
use lumen_optical::switch::Switch;
use lumen_track::test_init;

mod common;
use common::pattern;

fn new_switch(engine: &Engine, config: &FabricConfig) -> Rc<Switch> {
    Switch::new_and_register(engine, engine.top(), "switch", config).unwrap()
}

fn write_to(engine: &Engine, src: &str, dst: &str, len: usize) -> Message {
    Message::write_request(engine.top(), src.into(), dst.into(), pattern(len))
}

#[test]
fn write_reaches_registered_port() {
    let engine = start_test(file!());
    let switch = new_switch(&engine, &FabricConfig::default());
    let _p0 = switch.create_port("port_0").unwrap();
    let p1 = switch.create_port("port_1").unwrap();
    switch.register_destination("dev-A".into(), &p1).unwrap();

    switch
        .process_message(write_to(&engine, "dev-B", "dev-A", 64))
        .unwrap();

    let traffic = switch.traffic();
    assert_eq!(traffic.bytes(&"dev-B".into(), &"dev-A".into()), 64);
    assert_eq!(p1.outbound_len(), 1);

    let envelope = p1.retrieve_outgoing().unwrap();
    let inner = envelope.unwrap_envelope();
    assert_eq!(inner.kind(), MessageKind::WriteRequest);
    assert_eq!(inner.payload().len(), 64);
    assert_eq!(inner.payload(), pattern(64).as_slice());
}

#[test]
fn last_registration_wins() {
    let engine = start_test(file!());
    let switch = new_switch(&engine, &FabricConfig::default());
    let p0 = switch.create_port("port_0").unwrap();
    let p1 = switch.create_port("port_1").unwrap();

    switch.register_destination("dev".into(), &p0).unwrap();
    switch.register_destination("dev".into(), &p1).unwrap();

    for _ in 0..3 {
        switch
            .process_message(write_to(&engine, "src", "dev", 8))
            .unwrap();
    }
    assert_eq!(p0.outbound_len(), 0);
    assert_eq!(p1.outbound_len(), 3);
}

#[test]
fn accounting_includes_drops() {
    let engine = start_test(file!());
    let config = FabricConfig::default();
    let switch = new_switch(&engine, &config);
    let port = switch.create_port("port_0").unwrap();
    switch.register_destination("b".into(), &port).unwrap();

    let num_sent = config.tx_buffer_entries + 4;
    for _ in 0..num_sent {
        switch.process_message(write_to(&engine, "a", "b", 32)).unwrap();
    }

    assert_eq!(switch.num_forwarded(), config.tx_buffer_entries);
    assert_eq!(switch.num_dropped(), 4);
    assert_eq!(port.outbound_len(), config.tx_buffer_entries);
    assert_eq!(
        switch.traffic().bytes(&"a".into(), &"b".into()),
        num_sent as u64 * 32
    );
}

#[test]
fn full_port_drops() {
    let engine = start_test(file!());
    let config = FabricConfig {
        tx_buffer_entries: 2,
        ..FabricConfig::default()
    };
    let switch = new_switch(&engine, &config);
    let port = switch.create_port("port_0").unwrap();
    switch.register_destination("b".into(), &port).unwrap();

    switch.process_message(write_to(&engine, "a", "b", 4)).unwrap();
    switch.process_message(write_to(&engine, "a", "b", 4)).unwrap();
    assert!(!port.can_send());

    switch.process_message(write_to(&engine, "a", "b", 4)).unwrap();
    assert_eq!(port.outbound_len(), 2);
    assert_eq!(switch.num_dropped(), 1);
    assert_eq!(switch.traffic().bytes(&"a".into(), &"b".into()), 12);
}

#[test]
fn no_route_is_an_error() {
    let engine = start_test(file!());
    let switch = new_switch(&engine, &FabricConfig::default());
    let port = switch.create_port("port_0").unwrap();
    switch.register_destination("b".into(), &port).unwrap();

    let err = switch
        .process_message(write_to(&engine, "a", "nowhere", 4))
        .unwrap_err();
    assert_eq!(
        format!("{err}"),
        "Error: top::switch: no route from a to nowhere"
    );
    assert_eq!(port.outbound_len(), 0);
    assert_eq!(switch.num_forwarded(), 0);
}

#[test]
fn sizes_by_kind() {
    let engine = start_test(file!());
    let switch = new_switch(&engine, &FabricConfig::default());
    let port = switch.create_port("port_0").unwrap();
    switch.register_destination("b".into(), &port).unwrap();
    let top = engine.top();

    let messages = [
        Message::read_request(top, "a".into(), "b".into(), 4096),
        Message::data_ready(top, "a".into(), "b".into(), vec![0; 100]),
        Message::write_done(top, "a".into(), "b".into()),
        Message::control(top, "a".into(), "b".into(), vec![0; 50]),
    ];
    for message in messages {
        switch.process_message(message).unwrap();
    }
    assert_eq!(switch.traffic().bytes(&"a".into(), &"b".into()), 8 + 100 + 1 + 1);
}

#[test]
fn topology_frozen_once_running() {
    let mut engine = start_test(file!());
    let switch = new_switch(&engine, &FabricConfig::default());
    let port = switch.create_port("port_0").unwrap();
    assert!(!switch.is_frozen());

    run_simulation!(engine);

    assert!(switch.is_frozen());
    assert!(switch.create_port("port_1").is_err());
    let err = switch.register_destination("b".into(), &port).unwrap_err();
    assert_eq!(
        format!("{err}"),
        "Error: top::switch: topology cannot change once the simulation has started"
    );
}

#[test]
fn drop_and_traffic_logged() {
    let (test_tracker, tracker) = test_init!(1);
    let engine = Engine::new(&tracker);
    let config = FabricConfig {
        tx_buffer_entries: 1,
        ..FabricConfig::default()
    };
    let switch = new_switch(&engine, &config);
    let port = switch.create_port("port_0").unwrap();
    switch.register_destination("b".into(), &port).unwrap();
    switch.process_message(write_to(&engine, "a", "b", 4)).unwrap();

    switch.process_message(write_to(&engine, "a", "b", 4)).unwrap();
    let events = test_tracker.events();
    let num_traced = events
        .iter()
        .filter(|e| e.contains(":TRACE: WriteReq a -> b 4B"))
        .count();
    assert_eq!(num_traced, 2);
    let drops: Vec<_> = events.iter().filter(|e| e.contains(":WARN: drop:")).collect();
    assert_eq!(drops.len(), 1);
    assert!(drops[0].contains("top::switch::port_0 full sending"));
}
