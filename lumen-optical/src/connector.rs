// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Assembles the optical fabric.
//!
//! The [`Connector`] creates a single [`Switch`] and then, for every device
//! port plugged in, a dedicated switch port, a [`Link`] joining the two and
//! a route to the device.
//!
//! ```rust
//! # use lumen_engine::engine::Engine;
//! # use lumen_engine::port::Port;
//! # use lumen_optical::config::FabricConfig;
//! # use lumen_optical::connector::Connector;
//! # use lumen_optical::message::{Address, Message};
//! let mut engine = Engine::default();
//! let clock = engine.default_clock();
//! let top = engine.top().clone();
//! let gpu = Port::<Message>::new(&top, "gpu", 8, 1).unwrap();
//!
//! let mut connector = Connector::new(&engine, &clock, &top, &FabricConfig::default()).unwrap();
//! let switch_port = connector.plug_in(&gpu).unwrap();
//!
//! assert_eq!(switch_port.entity.full_name(), "top::optical_switch::port_0");
//! let switch = connector.switch();
//! assert!(switch.route_for(&Address::of_port(&gpu)).is_some());
//! ```

use std::rc::Rc;

use lumen_engine::engine::Engine;
use lumen_engine::port::Port;
use lumen_engine::sim_error;
use lumen_engine::time::clock::Clock;
use lumen_engine::types::SimError;
use lumen_track::entity::Entity;

use crate::config::FabricConfig;
use crate::link::Link;
use crate::message::{Address, Message};
use crate::switch::Switch;

pub const SWITCH_NAME: &str = "optical_switch";

pub struct Connector<'a> {
    engine: &'a Engine,
    clock: Clock,
    parent: Rc<Entity>,
    latency_ticks: u64,
    switch: Rc<Switch>,
    links: Vec<Rc<Link>>,
    next_index: usize,
}

impl<'a> Connector<'a> {
    pub fn new(
        engine: &'a Engine,
        clock: &Clock,
        parent: &Rc<Entity>,
        config: &FabricConfig,
    ) -> Result<Self, SimError> {
        let switch = Switch::new_and_register(engine, parent, SWITCH_NAME, config)?;
        Ok(Self {
            engine,
            clock: clock.clone(),
            parent: parent.clone(),
            latency_ticks: config.link_latency_ticks,
            switch,
            links: Vec::new(),
            next_index: 0,
        })
    }

    /// Connect `device_port` to a new switch port through a new link.
    ///
    /// Returns the switch port now dedicated to the device. A device port
    /// that already has a connection is rejected before anything is created,
    /// so a failed call leaves the fabric unchanged.
    pub fn plug_in(
        &mut self,
        device_port: &Rc<Port<Message>>,
    ) -> Result<Rc<Port<Message>>, SimError> {
        if device_port.is_connected() {
            return sim_error!("{device_port} already connected");
        }

        let index = self.next_index;
        let switch_port = self.switch.create_port(&format!("port_{index}"))?;
        let link = Link::new_and_register(
            self.engine,
            &self.clock,
            &self.parent,
            &format!("fiber_{index}"),
            self.latency_ticks,
        )?;

        link.attach(device_port)?;
        link.attach(&switch_port)?;
        self.switch
            .register_destination(Address::of_port(device_port), &switch_port)?;

        self.links.push(link);
        self.next_index += 1;
        Ok(switch_port)
    }

    #[must_use]
    pub fn switch(&self) -> &Rc<Switch> {
        &self.switch
    }

    #[must_use]
    pub fn links(&self) -> &[Rc<Link>] {
        &self.links
    }

    /// Number of devices plugged in so far.
    #[must_use]
    pub fn num_plugged(&self) -> usize {
        self.next_index
    }
}
