// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

use lumen_engine::run_simulation;
use lumen_engine::test_helpers::start_test;
use lumen_optical::config::FabricConfig;
use sim_optical::build_platform;
use sim_optical::device::{DeviceConfig, PeerSelection};

#[test]
fn every_request_answered() {
    let mut engine = start_test(file!());
    let clock = engine.default_clock();
    let device_config = DeviceConfig {
        num_requests: 10,
        interval_ticks: 4,
        ..DeviceConfig::default()
    };

    let (devices, switch) = build_platform(
        &engine,
        &clock,
        &FabricConfig::default(),
        &device_config,
        3,
    )
    .unwrap();
    run_simulation!(engine);

    assert_eq!(switch.num_dropped(), 0);
    for device in &devices {
        assert_eq!(device.num_sent(), 10);
        assert_eq!(device.num_responses(), 10);
        // Ten responses plus the requests from the other devices
        assert_eq!(device.num_received(), 20);
    }
    assert_eq!(switch.num_forwarded(), 3 * 10 * 2);
}

#[test]
fn round_robin_spreads_traffic() {
    let mut engine = start_test(file!());
    let clock = engine.default_clock();
    let device_config = DeviceConfig {
        num_requests: 6,
        write_ratio: 1.0,
        write_bytes: 32,
        interval_ticks: 2,
        ..DeviceConfig::default()
    };

    let (devices, switch) = build_platform(
        &engine,
        &clock,
        &FabricConfig::default(),
        &device_config,
        4,
    )
    .unwrap();
    run_simulation!(engine);

    let traffic = switch.traffic();
    let src = devices[0].address();
    for peer in &devices[1..] {
        // Two writes to each of the three peers
        assert_eq!(traffic.bytes(&src, &peer.address()), 64);
        // Two write acknowledgements back
        assert_eq!(traffic.bytes(&peer.address(), &src), 2);
    }
}

#[test]
fn same_seed_same_traffic() {
    let run = |seed| {
        let mut engine = start_test(file!());
        let clock = engine.default_clock();
        let device_config = DeviceConfig {
            num_requests: 20,
            selection: PeerSelection::Random,
            seed,
            ..DeviceConfig::default()
        };
        let (_devices, switch) = build_platform(
            &engine,
            &clock,
            &FabricConfig::default(),
            &device_config,
            4,
        )
        .unwrap();
        run_simulation!(engine);
        switch.traffic().snapshot()
    };

    assert_eq!(run(7), run(7));
}

#[test]
fn invalid_write_ratio_rejected() {
    let mut engine = start_test(file!());
    let clock = engine.default_clock();
    let device_config = DeviceConfig {
        write_ratio: 1.5,
        ..DeviceConfig::default()
    };
    let result = build_platform(&engine, &clock, &FabricConfig::default(), &device_config, 2);
    assert!(result.is_err());
}
