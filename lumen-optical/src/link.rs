// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! A fixed-latency fibre between exactly two ports.
//!
//! Whenever either attached port queues a message the link takes it from
//! that port's outbound buffer before `send` returns and, `latency_ticks`
//! later, places it in the inbound buffer of the port on the other side. The
//! link has no bandwidth limit, so a port's outbound buffer is always empty
//! again once `send` has returned.
//!
//! Messages wrapped in a forwarding [envelope](crate::message::Message::envelope)
//! are unwrapped before delivery.
//!
//! ```rust
//! # use lumen_engine::engine::Engine;
//! # use lumen_engine::port::Port;
//! # use lumen_engine::run_simulation;
//! # use lumen_optical::link::Link;
//! # use lumen_optical::message::{Address, Message};
//! let mut engine = Engine::default();
//! let clock = engine.default_clock();
//! let top = engine.top().clone();
//!
//! let a = Port::<Message>::new(&top, "a", 4, 1).unwrap();
//! let b = Port::<Message>::new(&top, "b", 4, 1).unwrap();
//! let fiber = Link::new_and_register(&engine, &clock, &top, "fiber", 5).unwrap();
//! fiber.attach(&a).unwrap();
//! fiber.attach(&b).unwrap();
//!
//! a.send(Message::control(&top, Address::of_port(&a), Address::of_port(&b), vec![1]))
//!     .unwrap();
//! run_simulation!(engine);
//!
//! assert_eq!(engine.time_now_ns(), 5.0);
//! assert_eq!(b.retrieve_incoming().map(|m| m.payload().to_vec()), Some(vec![1]));
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use async_trait::async_trait;
use lumen_engine::engine::Engine;
use lumen_engine::events::repeated::Repeated;
use lumen_engine::port::{Connection, Port};
use lumen_engine::sim_error;
use lumen_engine::time::clock::{Clock, ClockTick};
use lumen_engine::traits::{Event, Runnable};
use lumen_engine::types::{SimError, SimResult};
use lumen_model_builder::{EntityDisplay, EntityGet};
use lumen_track::entity::Entity;
use lumen_track::{debug, error, warn};

use crate::message::Message;

type FabricPort = Rc<Port<Message>>;
type InFlight = VecDeque<(Message, ClockTick, FabricPort)>;

#[derive(EntityDisplay, EntityGet)]
pub struct Link {
    pub entity: Rc<Entity>,
    clock: Clock,
    latency_ticks: u64,

    side_a: RefCell<Option<FabricPort>>,
    side_b: RefCell<Option<FabricPort>>,

    in_flight: RefCell<InFlight>,
    in_flight_changed: Repeated<()>,

    num_forwarded: RefCell<usize>,
    num_lost: RefCell<usize>,
}

impl Link {
    pub fn new_and_register(
        engine: &Engine,
        clock: &Clock,
        parent: &Rc<Entity>,
        name: &str,
        latency_ticks: u64,
    ) -> Result<Rc<Self>, SimError> {
        let rc_self = Rc::new(Self {
            entity: Rc::new(Entity::new(parent, name)),
            clock: clock.clone(),
            latency_ticks,
            side_a: RefCell::new(None),
            side_b: RefCell::new(None),
            in_flight: RefCell::new(VecDeque::new()),
            in_flight_changed: Repeated::default(),
            num_forwarded: RefCell::new(0),
            num_lost: RefCell::new(0),
        });
        engine.register(rc_self.clone());
        Ok(rc_self)
    }

    /// Bind `port` to a free side of the link.
    ///
    /// A link has two sides, attaching a third port is an error.
    pub fn attach(self: &Rc<Self>, port: &FabricPort) -> SimResult {
        let side = if self.side_a.borrow().is_none() {
            &self.side_a
        } else if self.side_b.borrow().is_none() {
            &self.side_b
        } else {
            return sim_error!("{self} supports only 2 ports, cannot attach {port}");
        };

        let connection: Weak<dyn Connection> = Rc::downgrade(self) as Weak<dyn Connection>;
        port.set_connection(connection)?;
        *side.borrow_mut() = Some(port.clone());
        Ok(())
    }

    /// Unbind `port` from the link. Nothing happens if it is not attached.
    pub fn detach(&self, port: &FabricPort) {
        for side in [&self.side_a, &self.side_b] {
            let matches = side
                .borrow()
                .as_ref()
                .is_some_and(|attached| Rc::ptr_eq(attached, port));
            if matches {
                side.borrow_mut().take();
                port.clear_connection();
            }
        }
    }

    #[must_use]
    pub fn num_attached(&self) -> usize {
        usize::from(self.side_a.borrow().is_some()) + usize::from(self.side_b.borrow().is_some())
    }

    #[must_use]
    pub fn latency_ticks(&self) -> u64 {
        self.latency_ticks
    }

    /// Number of messages scheduled for delivery.
    #[must_use]
    pub fn num_forwarded(&self) -> usize {
        *self.num_forwarded.borrow()
    }

    /// Number of messages that never reached the other side.
    #[must_use]
    pub fn num_lost(&self) -> usize {
        *self.num_lost.borrow()
    }

    /// Take one message from each side that has one queued until both
    /// outbound buffers are empty.
    fn forward_pending(&self) {
        loop {
            let mut moved = false;
            for (from, to) in [(&self.side_a, &self.side_b), (&self.side_b, &self.side_a)] {
                let from = from.borrow().clone();
                let Some(message) = from.and_then(|port| port.retrieve_outgoing()) else {
                    continue;
                };
                moved = true;
                let to = to.borrow().clone();
                self.forward(message, to);
            }
            if !moved {
                break;
            }
        }
    }

    fn forward(&self, message: Message, to: Option<FabricPort>) {
        let Some(to) = to else {
            error!(self.entity ; "no port attached to receive {message}, message lost");
            *self.num_lost.borrow_mut() += 1;
            return;
        };

        let message = if message.is_envelope() {
            message.unwrap_envelope()
        } else {
            debug!(self.entity ; "traffic {message}");
            message
        };

        let mut tick = self.clock.tick_now();
        tick.set_tick(tick.tick() + self.latency_ticks);
        self.in_flight.borrow_mut().push_back((message, tick, to));
        *self.num_forwarded.borrow_mut() += 1;
        self.in_flight_changed.notify();
    }
}

impl Connection for Link {
    fn connection_entity(&self) -> &Rc<Entity> {
        &self.entity
    }

    fn notify_send(&self) {
        self.forward_pending();
    }
}

/// Delivers in-flight messages once their latency has elapsed.
#[async_trait(?Send)]
impl Runnable for Link {
    async fn run(&self) -> SimResult {
        loop {
            let next = self.in_flight.borrow_mut().pop_front();
            let Some((message, tick, to)) = next else {
                self.in_flight_changed.listen().await;
                continue;
            };

            let tick_now = self.clock.tick_now();
            if tick > tick_now {
                self.clock.wait_ticks(tick.tick() - tick_now.tick()).await;
            }
            if let Err(message) = to.deliver(message) {
                warn!(self.entity ; "{to} inbound buffer full, {message} lost");
                *self.num_lost.borrow_mut() += 1;
            }
        }
    }
}
