// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

use std::rc::Rc;

use lumen_engine::port::Port;
use lumen_engine::types::SimError;
use lumen_optical::message::{Address, Message};
use lumen_track::entity::Entity;

pub type DevicePort = Rc<Port<Message>>;

pub fn device_port(parent: &Rc<Entity>, name: &str) -> Result<DevicePort, SimError> {
    Port::new(parent, name, 16, 4)
}

pub fn write(from: &DevicePort, to: &DevicePort, data: Vec<u8>) -> Message {
    Message::write_request(
        &from.entity,
        Address::of_port(from),
        Address::of_port(to),
        data,
    )
}

/// Every byte value in turn.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 256) as u8).collect()
}
