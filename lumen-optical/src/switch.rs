// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! The central optical switch.
//!
//! The switch owns a set of ports, a static routing table from destination
//! [`Address`] to output port and a [`TrafficMatrix`].
//!
//! For every message that arrives on one of its ports the switch:
//!  1. records the message size in the traffic matrix,
//!  2. looks up the output port for the destination (a missing route stops
//!     the simulation with an error),
//!  3. drops the message if the output port cannot accept it,
//!  4. otherwise wraps the message in an envelope sent from the output port
//!     and queues it on that port.
//!
//! The output buffers are deliberately small: light does not queue, so a
//! burst that overflows them is lost rather than delayed.
//!
//! Routes and ports can only be added before the simulation starts.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use async_trait::async_trait;
use lumen_engine::engine::Engine;
use lumen_engine::executor::Spawner;
use lumen_engine::port::Port;
use lumen_engine::sim_error;
use lumen_engine::traits::{Event, Runnable};
use lumen_engine::types::{SimError, SimResult};
use lumen_model_builder::{EntityDisplay, EntityGet};
use lumen_track::entity::Entity;
use lumen_track::{trace, warn};

use crate::config::FabricConfig;
use crate::message::{Address, Message};
use crate::sizing::SizingPolicy;
use crate::traffic::TrafficMatrix;

type FabricPort = Rc<Port<Message>>;

/// State shared between the switch and the tasks draining its ports.
struct Fabric {
    entity: Rc<Entity>,
    ports: RefCell<Vec<FabricPort>>,
    routes: RefCell<BTreeMap<Address, usize>>,
    frozen: RefCell<bool>,
    sizing: SizingPolicy,
    traffic: Arc<TrafficMatrix>,
    header_bytes: usize,
    num_forwarded: RefCell<usize>,
    num_dropped: RefCell<usize>,
}

impl Fabric {
    fn on_inbound_available(&self, index: usize) -> SimResult {
        let port = match self.ports.borrow().get(index) {
            Some(port) => port.clone(),
            None => return sim_error!("{}: no port {index}", self.entity),
        };
        while let Some(message) = port.retrieve_incoming() {
            self.process_message(message)?;
        }
        Ok(())
    }

    fn process_message(&self, message: Message) -> SimResult {
        let src = message.src().clone();
        let dst = message.dst().clone();

        let num_bytes = self.sizing.size_of(&message);
        self.traffic.record(&src, &dst, num_bytes);
        trace!(self.entity ; "{} {src} -> {dst} {num_bytes}B", message.kind());

        let Some(&index) = self.routes.borrow().get(&dst) else {
            return sim_error!("{}: no route from {src} to {dst}", self.entity);
        };
        let out_port = self.ports.borrow()[index].clone();

        if !out_port.can_send() {
            warn!(self.entity ; "drop: {out_port} full sending {message} to {dst}");
            *self.num_dropped.borrow_mut() += 1;
            return Ok(());
        }

        let envelope = Message::envelope(
            &self.entity,
            Address::of_port(&out_port),
            message,
            self.header_bytes,
        );
        out_port.send(envelope)?;
        *self.num_forwarded.borrow_mut() += 1;
        Ok(())
    }
}

#[derive(EntityDisplay, EntityGet)]
pub struct Switch {
    pub entity: Rc<Entity>,
    spawner: Spawner,
    rx_buffer_entries: usize,
    tx_buffer_entries: usize,
    fabric: Rc<Fabric>,
}

impl Switch {
    pub fn new_and_register(
        engine: &Engine,
        parent: &Rc<Entity>,
        name: &str,
        config: &FabricConfig,
    ) -> Result<Rc<Self>, SimError> {
        config.validate()?;
        let entity = Rc::new(Entity::new(parent, name));
        let fabric = Rc::new(Fabric {
            entity: entity.clone(),
            ports: RefCell::new(Vec::new()),
            routes: RefCell::new(BTreeMap::new()),
            frozen: RefCell::new(false),
            sizing: config.sizing_policy(),
            traffic: Arc::new(TrafficMatrix::new()),
            header_bytes: config.envelope_header_bytes,
            num_forwarded: RefCell::new(0),
            num_dropped: RefCell::new(0),
        });
        let rc_self = Rc::new(Self {
            entity,
            spawner: engine.spawner(),
            rx_buffer_entries: config.rx_buffer_entries,
            tx_buffer_entries: config.tx_buffer_entries,
            fabric,
        });
        engine.register(rc_self.clone());
        Ok(rc_self)
    }

    /// Allocate a new port with the configured buffer sizes.
    pub fn create_port(&self, name: &str) -> Result<FabricPort, SimError> {
        self.check_not_frozen()?;
        let port = Port::new(
            &self.entity,
            name,
            self.rx_buffer_entries,
            self.tx_buffer_entries,
        )?;
        self.fabric.ports.borrow_mut().push(port.clone());
        Ok(port)
    }

    /// Route messages for `dst` out of `port`, replacing any existing route.
    pub fn register_destination(&self, dst: Address, port: &FabricPort) -> SimResult {
        self.check_not_frozen()?;
        let Some(index) = self
            .fabric
            .ports
            .borrow()
            .iter()
            .position(|p| Rc::ptr_eq(p, port))
        else {
            return sim_error!("{self}: {port} is not a port of this switch");
        };
        if let Some(previous) = self.fabric.routes.borrow_mut().insert(dst.clone(), index) {
            if previous != index {
                trace!(self.entity ; "route to {dst} moved from port {previous} to {index}");
            }
        }
        Ok(())
    }

    /// The output port for `dst`, if there is a route.
    #[must_use]
    pub fn route_for(&self, dst: &Address) -> Option<FabricPort> {
        let index = *self.fabric.routes.borrow().get(dst)?;
        self.fabric.ports.borrow().get(index).cloned()
    }

    /// Route a single message. See the [module documentation](self).
    pub fn process_message(&self, message: Message) -> SimResult {
        self.fabric.process_message(message)
    }

    /// Process every message waiting in the inbound buffer of port `index`
    /// in arrival order.
    pub fn on_inbound_available(&self, index: usize) -> SimResult {
        self.fabric.on_inbound_available(index)
    }

    /// The traffic matrix, which can be shared with other threads.
    #[must_use]
    pub fn traffic(&self) -> Arc<TrafficMatrix> {
        self.fabric.traffic.clone()
    }

    #[must_use]
    pub fn ports(&self) -> Vec<FabricPort> {
        self.fabric.ports.borrow().clone()
    }

    #[must_use]
    pub fn num_forwarded(&self) -> usize {
        *self.fabric.num_forwarded.borrow()
    }

    #[must_use]
    pub fn num_dropped(&self) -> usize {
        *self.fabric.num_dropped.borrow()
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        *self.fabric.frozen.borrow()
    }

    fn check_not_frozen(&self) -> SimResult {
        if self.is_frozen() {
            return sim_error!("{self}: topology cannot change once the simulation has started");
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl Runnable for Switch {
    async fn run(&self) -> SimResult {
        *self.fabric.frozen.borrow_mut() = true;

        for (index, port) in self.ports().into_iter().enumerate() {
            let fabric = self.fabric.clone();
            self.spawner
                .spawn(async move { run_port(fabric, index, port).await });
        }
        Ok(())
    }
}

async fn run_port(fabric: Rc<Fabric>, index: usize, port: FabricPort) -> SimResult {
    let arrivals = port.inbound_changed();
    loop {
        fabric.on_inbound_available(index)?;
        arrivals.listen().await;
    }
}

#[cfg(test)]
mod tests {
    use lumen_engine::traits::TotalBytes;

    use super::*;

    #[test]
    fn routes_and_envelopes() {
        let engine = Engine::default();
        let top = engine.top().clone();
        let switch =
            Switch::new_and_register(&engine, &top, "switch", &FabricConfig::default()).unwrap();
        let p0 = switch.create_port("port_0").unwrap();
        let p1 = switch.create_port("port_1").unwrap();
        assert_eq!(p0.rx_capacity(), 512);
        assert_eq!(p0.tx_capacity(), 16);

        switch.register_destination("dev-a".into(), &p1).unwrap();
        assert!(switch.route_for(&"dev-a".into()).is_some_and(|p| Rc::ptr_eq(&p, &p1)));
        assert!(switch.route_for(&"dev-b".into()).is_none());

        let write = Message::write_request(&top, "dev-b".into(), "dev-a".into(), vec![3; 64]);
        let write_id = lumen_track::id::Unique::id(&write);
        switch.process_message(write).unwrap();

        assert_eq!(p0.outbound_len(), 0);
        let envelope = p1.retrieve_outgoing().unwrap();
        assert!(envelope.is_envelope());
        assert_eq!(envelope.src(), &Address::of_port(&p1));
        assert_eq!(envelope.dst().as_str(), "dev-a");
        assert_eq!(envelope.traffic_bytes(), 16);
        assert_eq!(envelope.total_bytes(), 16 + 64);
        let inner = envelope.into_inner().unwrap();
        assert_eq!(lumen_track::id::Unique::id(&inner), write_id);

        assert_eq!(switch.traffic().bytes(&"dev-b".into(), &"dev-a".into()), 64);
        assert_eq!(switch.num_forwarded(), 1);
    }

    #[test]
    fn foreign_port_rejected() {
        let engine = Engine::default();
        let top = engine.top().clone();
        let config = FabricConfig::default();
        let switch = Switch::new_and_register(&engine, &top, "switch", &config).unwrap();
        let other = Switch::new_and_register(&engine, &top, "other", &config).unwrap();
        let port = other.create_port("port_0").unwrap();

        let err = switch.register_destination("dev".into(), &port).unwrap_err();
        assert_eq!(
            format!("{err}"),
            "Error: top::switch: top::other::port_0 is not a port of this switch"
        );
    }

    #[test]
    fn invalid_config_rejected() {
        let engine = Engine::default();
        let config = FabricConfig {
            rx_buffer_entries: 0,
            ..FabricConfig::default()
        };
        assert!(Switch::new_and_register(&engine, engine.top(), "switch", &config).is_err());
    }
}
