// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Messages carried by the optical fabric.
//!
//! A [`Message`] is addressed from one endpoint to another using
//! [`Address`]es. The switch wraps every message it forwards in an
//! [envelope](MessageKind::Envelope) signed by its own output port. Links
//! remove the envelope again before delivery so that endpoints never see it.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use lumen_engine::port::Port;
use lumen_engine::traits::{SimObject, TotalBytes};
use lumen_track::entity::Entity;
use lumen_track::id::Unique;
use lumen_track::{Id, create_id};

/// The identity of an endpoint.
///
/// Addresses are cheap to clone and can be sent to other threads, so that the
/// traffic matrix can be read while the simulation is running.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(Arc<str>);

impl Address {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    /// The address of a port is its full hierarchical name.
    #[must_use]
    pub fn of_port<T: SimObject>(port: &Port<T>) -> Self {
        Self::new(&port.entity.full_name())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Address {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The kinds of message that travel through the fabric.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MessageKind {
    ReadRequest,
    WriteRequest,
    DataReady,
    WriteDone,
    Control,
    /// Only created by the switch.
    Envelope,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageKind::ReadRequest => "ReadReq",
            MessageKind::WriteRequest => "WriteReq",
            MessageKind::DataReady => "DataReady",
            MessageKind::WriteDone => "WriteDone",
            MessageKind::Control => "Control",
            MessageKind::Envelope => "Envelope",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug)]
pub struct Message {
    created_by: Rc<Entity>,
    id: Id,
    kind: MessageKind,
    src: Address,
    dst: Address,
    traffic_bytes: usize,
    payload: Vec<u8>,
    inner: Option<Box<Message>>,
}

impl Message {
    fn new(
        created_by: &Rc<Entity>,
        kind: MessageKind,
        src: Address,
        dst: Address,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            created_by: created_by.clone(),
            id: create_id!(created_by),
            kind,
            src,
            dst,
            traffic_bytes: 0,
            payload,
            inner: None,
        }
    }

    /// A request to read `num_bytes` from `dst`.
    ///
    /// The number of bytes requested is carried as an 8-byte little-endian
    /// payload.
    #[must_use]
    pub fn read_request(
        created_by: &Rc<Entity>,
        src: Address,
        dst: Address,
        num_bytes: u64,
    ) -> Self {
        Self::new(
            created_by,
            MessageKind::ReadRequest,
            src,
            dst,
            num_bytes.to_le_bytes().to_vec(),
        )
    }

    #[must_use]
    pub fn write_request(
        created_by: &Rc<Entity>,
        src: Address,
        dst: Address,
        data: Vec<u8>,
    ) -> Self {
        Self::new(created_by, MessageKind::WriteRequest, src, dst, data)
    }

    #[must_use]
    pub fn data_ready(created_by: &Rc<Entity>, src: Address, dst: Address, data: Vec<u8>) -> Self {
        Self::new(created_by, MessageKind::DataReady, src, dst, data)
    }

    #[must_use]
    pub fn write_done(created_by: &Rc<Entity>, src: Address, dst: Address) -> Self {
        Self::new(created_by, MessageKind::WriteDone, src, dst, Vec::new())
    }

    #[must_use]
    pub fn control(created_by: &Rc<Entity>, src: Address, dst: Address, data: Vec<u8>) -> Self {
        Self::new(created_by, MessageKind::Control, src, dst, data)
    }

    /// Wrap `inner` in an envelope sent from `src` to the final destination of
    /// `inner`.
    #[must_use]
    pub fn envelope(
        created_by: &Rc<Entity>,
        src: Address,
        inner: Message,
        header_bytes: usize,
    ) -> Self {
        let dst = inner.dst.clone();
        let mut envelope = Self::new(created_by, MessageKind::Envelope, src, dst, Vec::new());
        envelope.traffic_bytes = header_bytes;
        envelope.inner = Some(Box::new(inner));
        envelope
    }

    /// Set the number of bytes of header/overhead this message adds on top of
    /// its payload.
    #[must_use]
    pub fn with_traffic_bytes(mut self, traffic_bytes: usize) -> Self {
        self.traffic_bytes = traffic_bytes;
        self
    }

    #[must_use]
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    #[must_use]
    pub fn src(&self) -> &Address {
        &self.src
    }

    #[must_use]
    pub fn dst(&self) -> &Address {
        &self.dst
    }

    #[must_use]
    pub fn traffic_bytes(&self) -> usize {
        self.traffic_bytes
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// For a read request, the number of bytes requested.
    #[must_use]
    pub fn requested_bytes(&self) -> Option<u64> {
        if self.kind != MessageKind::ReadRequest {
            return None;
        }
        let bytes: [u8; 8] = self.payload.as_slice().try_into().ok()?;
        Some(u64::from_le_bytes(bytes))
    }

    #[must_use]
    pub fn is_envelope(&self) -> bool {
        self.inner.is_some()
    }

    #[must_use]
    pub fn inner(&self) -> Option<&Message> {
        self.inner.as_deref()
    }

    /// Take the wrapped message out of an envelope.
    ///
    /// Any other message is handed back unchanged as the error.
    pub fn into_inner(self) -> Result<Message, Message> {
        match self.inner {
            Some(inner) => Ok(*inner),
            None => Err(self),
        }
    }

    /// The message as the destination should see it.
    #[must_use]
    pub fn unwrap_envelope(self) -> Message {
        match self.into_inner() {
            Ok(inner) => inner,
            Err(message) => message,
        }
    }

    /// Copy this message giving it (and any wrapped message) a new identity.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self {
            created_by: self.created_by.clone(),
            id: create_id!(self.created_by),
            kind: self.kind,
            src: self.src.clone(),
            dst: self.dst.clone(),
            traffic_bytes: self.traffic_bytes,
            payload: self.payload.clone(),
            inner: self.inner.as_ref().map(|inner| Box::new(inner.duplicate())),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} -> {} ({}B)",
            self.kind,
            self.id,
            self.src,
            self.dst,
            self.total_bytes()
        )
    }
}

impl TotalBytes for Message {
    fn total_bytes(&self) -> usize {
        let inner = self.inner.as_ref().map_or(0, |inner| inner.total_bytes());
        self.traffic_bytes + self.payload.len() + inner
    }
}

impl Unique for Message {
    fn id(&self) -> Id {
        self.id
    }
}

impl SimObject for Message {}

#[cfg(test)]
mod tests {
    use lumen_track::entity::toplevel;
    use lumen_track::tracker::dev_null_tracker;

    use super::*;

    #[test]
    fn envelope_wraps_and_unwraps() {
        let tracker = dev_null_tracker();
        let top = toplevel(&tracker, "top");

        let write = Message::write_request(&top, "dev-b".into(), "dev-a".into(), vec![7; 64]);
        let write_id = write.id();
        let envelope = Message::envelope(&top, "switch::port_0".into(), write, 16);

        assert!(envelope.is_envelope());
        assert_eq!(envelope.kind(), MessageKind::Envelope);
        assert_eq!(envelope.src().as_str(), "switch::port_0");
        assert_eq!(envelope.dst().as_str(), "dev-a");
        assert_ne!(envelope.id(), write_id);
        assert_eq!(envelope.total_bytes(), 16 + 64);
        assert_eq!(envelope.inner().map(Message::id), Some(write_id));

        let delivered = envelope.unwrap_envelope();
        assert_eq!(delivered.id(), write_id);
        assert_eq!(delivered.src().as_str(), "dev-b");
        assert_eq!(delivered.payload(), &[7; 64][..]);
        assert!(!delivered.is_envelope());
    }

    #[test]
    fn into_inner_of_plain_message() {
        let tracker = dev_null_tracker();
        let top = toplevel(&tracker, "top");
        let done = Message::write_done(&top, "a".into(), "b".into());
        let id = done.id();
        let back = done.into_inner().unwrap_err();
        assert_eq!(back.id(), id);
    }

    #[test]
    fn duplicate_gets_new_ids() {
        let tracker = dev_null_tracker();
        let top = toplevel(&tracker, "top");

        let data = Message::data_ready(&top, "a".into(), "b".into(), vec![1, 2, 3]);
        let envelope = Message::envelope(&top, "s".into(), data, 16);
        let copy = envelope.duplicate();

        assert_ne!(copy.id(), envelope.id());
        assert_ne!(
            copy.inner().map(Message::id),
            envelope.inner().map(Message::id)
        );
        assert_eq!(copy.src(), envelope.src());
        assert_eq!(copy.dst(), envelope.dst());
        assert_eq!(
            copy.inner().map(Message::payload),
            envelope.inner().map(Message::payload)
        );
    }

    #[test]
    fn read_request_size() {
        let tracker = dev_null_tracker();
        let top = toplevel(&tracker, "top");
        let read = Message::read_request(&top, "a".into(), "b".into(), 256);
        assert_eq!(read.requested_bytes(), Some(256));

        let write = Message::write_request(&top, "a".into(), "b".into(), vec![0; 8]);
        assert_eq!(write.requested_bytes(), None);
    }
}
