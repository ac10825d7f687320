// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

#![doc(test(attr(warn(unused))))]

//! An optical interconnect fabric.
//!
//! Devices exchange [messages](message::Message) through a single bufferless
//! [switch](switch::Switch). Each device port is joined to its own switch
//! port by a fixed-latency [link](link::Link). The
//! [connector](connector::Connector) builds this topology before the
//! simulation starts.
//!
//! ```text
//!  device port -> fiber_0 -> port_0 ┐
//!                                   switch (route, account, drop)
//!  device port <- fiber_1 <- port_1 ┘
//! ```
//!
//! All traffic seen by the switch is accumulated in a
//! [traffic matrix](traffic::TrafficMatrix) which may be read from other
//! threads while the simulation runs.

pub mod config;
pub mod connector;
pub mod link;
pub mod message;
pub mod sizing;
pub mod switch;
pub mod traffic;
