// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Buffered ports.
//!
//! A [`Port`] is an endpoint with a bounded inbound FIFO and a bounded
//! outbound FIFO. Values queued for sending sit in the outbound buffer until
//! the attached [`Connection`] takes them with
//! [`retrieve_outgoing`](Port::retrieve_outgoing). The connection hands values
//! to the far end with [`deliver`](Port::deliver), after which the owner
//! reads them with [`retrieve_incoming`](Port::retrieve_incoming).
//!
//! ```rust
//! # use lumen_engine::engine::Engine;
//! # use lumen_engine::port::Port;
//! let engine = Engine::default();
//! let port = Port::<i32>::new(engine.top(), "port", 4, 1).unwrap();
//! assert!(port.can_send());
//! port.send(7).unwrap();
//! assert!(!port.can_send());
//! assert_eq!(port.retrieve_outgoing(), Some(7));
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use lumen_track::entity::Entity;
use lumen_track::{connect, enter, exit, trace};

use crate::events::repeated::Repeated;
use crate::sim_error;
use crate::traits::SimObject;
use crate::types::{SimError, SimResult};

/// Something that moves values out of a port's outbound buffer.
pub trait Connection {
    /// Entity of the connection, used for tracing.
    fn connection_entity(&self) -> &Rc<Entity>;

    /// Called whenever an attached port has newly queued an outgoing value.
    ///
    /// The call is made after the value is queued and before `send` returns,
    /// so the connection may take it with `retrieve_outgoing` straight away.
    fn notify_send(&self);
}

pub struct Port<T>
where
    T: SimObject,
{
    pub entity: Rc<Entity>,
    inbound: RefCell<VecDeque<T>>,
    outbound: RefCell<VecDeque<T>>,
    rx_capacity: usize,
    tx_capacity: usize,
    connection: RefCell<Option<Weak<dyn Connection>>>,
    inbound_changed: Repeated<usize>,
}

impl<T> fmt::Display for Port<T>
where
    T: SimObject,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.entity.fmt(f)
    }
}

impl<T> fmt::Debug for Port<T>
where
    T: SimObject,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Port")
            .field("entity", &self.entity)
            .field("inbound", &self.inbound.borrow().len())
            .field("outbound", &self.outbound.borrow().len())
            .finish()
    }
}

impl<T> Port<T>
where
    T: SimObject,
{
    /// Create a port with the given buffer capacities.
    ///
    /// Both capacities must be at least 1.
    pub fn new(
        parent: &Rc<Entity>,
        name: &str,
        rx_capacity: usize,
        tx_capacity: usize,
    ) -> Result<Rc<Self>, SimError> {
        let entity = Rc::new(Entity::new(parent, name));
        if rx_capacity == 0 || tx_capacity == 0 {
            return sim_error!(
                "{entity}: buffer capacities must be non-zero (rx {rx_capacity}, tx {tx_capacity})"
            );
        }
        Ok(Rc::new(Self {
            entity,
            inbound: RefCell::new(VecDeque::with_capacity(rx_capacity)),
            outbound: RefCell::new(VecDeque::with_capacity(tx_capacity)),
            rx_capacity,
            tx_capacity,
            connection: RefCell::new(None),
            inbound_changed: Repeated::new(0),
        }))
    }

    #[must_use]
    pub fn rx_capacity(&self) -> usize {
        self.rx_capacity
    }

    #[must_use]
    pub fn tx_capacity(&self) -> usize {
        self.tx_capacity
    }

    #[must_use]
    pub fn inbound_len(&self) -> usize {
        self.inbound.borrow().len()
    }

    #[must_use]
    pub fn outbound_len(&self) -> usize {
        self.outbound.borrow().len()
    }

    /// Attach the connection that will drain this port.
    pub fn set_connection(&self, connection: Weak<dyn Connection>) -> SimResult {
        if self.is_connected() {
            return sim_error!("{self} already connected");
        }
        if let Some(conn) = connection.upgrade() {
            connect!(self.entity ; conn.connection_entity());
        }
        *self.connection.borrow_mut() = Some(connection);
        Ok(())
    }

    /// Remove any attached connection.
    pub fn clear_connection(&self) {
        self.connection.borrow_mut().take();
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection
            .borrow()
            .as_ref()
            .is_some_and(|c| c.strong_count() > 0)
    }

    /// Whether the outbound buffer has space for another value.
    #[must_use]
    pub fn can_send(&self) -> bool {
        self.outbound.borrow().len() < self.tx_capacity
    }

    /// Queue a value for sending and notify the attached connection.
    ///
    /// Returns an error if the outbound buffer is full.
    pub fn send(&self, value: T) -> SimResult {
        if !self.can_send() {
            return sim_error!("{self}: outbound buffer full, cannot send {value}");
        }
        enter!(self.entity ; value.id());
        self.outbound.borrow_mut().push_back(value);

        let connection = self.connection.borrow().as_ref().and_then(Weak::upgrade);
        if let Some(connection) = connection {
            connection.notify_send();
        }
        Ok(())
    }

    /// Take the oldest value waiting to be sent.
    pub fn retrieve_outgoing(&self) -> Option<T> {
        let value = self.outbound.borrow_mut().pop_front()?;
        exit!(self.entity ; value.id());
        Some(value)
    }

    /// Take the oldest value that has been received.
    pub fn retrieve_incoming(&self) -> Option<T> {
        self.inbound.borrow_mut().pop_front()
    }

    /// Place a value in the inbound buffer.
    ///
    /// The value is handed back if the inbound buffer is full.
    pub fn deliver(&self, value: T) -> Result<(), T> {
        let len = {
            let mut inbound = self.inbound.borrow_mut();
            if inbound.len() >= self.rx_capacity {
                return Err(value);
            }
            trace!(self.entity ; "received {}", value);
            inbound.push_back(value);
            inbound.len()
        };
        self.inbound_changed.notify_result(len);
        Ok(())
    }

    /// Event notified every time a value is placed in the inbound buffer.
    #[must_use]
    pub fn inbound_changed(&self) -> Repeated<usize> {
        self.inbound_changed.clone()
    }
}
