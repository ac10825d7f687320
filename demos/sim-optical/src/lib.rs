// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Simulate a set of devices exchanging memory traffic over an optical
//! switch.
//!
//! Every device is plugged into the switch through its own fibre and sends a
//! mix of reads and writes to the other devices. Each request is answered by
//! the receiving device (`DataReady` for reads, `WriteDone` for writes). A
//! fibre loses any message that arrives at a full inbound buffer, so some
//! requests and responses can be lost under heavy traffic.
//!
//! # Examples
//!
//! Eight devices each sending 1000 requests to random peers:
//! ```text
//! cargo run --bin sim-optical --release -- --num-devices 8 --num-requests 1000 --peer-selection random
//! ```
//!
//! Use buffers sized from the bandwidth-delay product of a 32GB/s fibre with
//! an 820ns round trip:
//! ```text
//! cargo run --bin sim-optical --release -- --bdp-bandwidth 32GB --bdp-window-ns 820 --interval-ticks 0
//! ```

use std::rc::Rc;

use lumen_engine::engine::Engine;
use lumen_engine::time::clock::Clock;
use lumen_engine::types::SimError;
use lumen_optical::config::FabricConfig;
use lumen_optical::connector::Connector;
use lumen_optical::switch::Switch;

pub mod device;

use device::{Device, DeviceConfig};

/// Create `num_devices` devices, plug them all into a new fabric and give
/// each device every other device as a peer.
pub fn build_platform(
    engine: &Engine,
    clock: &Clock,
    fabric_config: &FabricConfig,
    device_config: &DeviceConfig,
    num_devices: usize,
) -> Result<(Vec<Rc<Device>>, Rc<Switch>), SimError> {
    let top = engine.top();
    let devices = (0..num_devices)
        .map(|i| {
            Device::new_and_register(
                engine,
                clock,
                top,
                &format!("device_{i}"),
                i,
                device_config.clone(),
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut connector = Connector::new(engine, clock, top, fabric_config)?;
    for device in &devices {
        connector.plug_in(device.port())?;
    }

    for device in &devices {
        let peers = devices
            .iter()
            .filter(|peer| !Rc::ptr_eq(peer, device))
            .map(|peer| peer.address())
            .collect();
        device.set_peers(peers);
    }

    Ok((devices, connector.switch().clone()))
}
