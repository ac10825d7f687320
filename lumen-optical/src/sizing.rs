// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Table-driven accounting sizes for each [`MessageKind`].

use std::collections::BTreeMap;

use crate::message::{Message, MessageKind};

/// How the accounted size of one kind of message is computed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizeRule {
    Fixed(u64),
    PayloadLength,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SizingPolicy {
    rules: BTreeMap<MessageKind, SizeRule>,
    default_bytes: u64,
}

pub const DEFAULT_READ_REQUEST_BYTES: u64 = 8;
pub const DEFAULT_MESSAGE_BYTES: u64 = 1;

impl SizingPolicy {
    /// A policy with no rules, every message is `default_bytes`.
    #[must_use]
    pub fn empty(default_bytes: u64) -> Self {
        Self {
            rules: BTreeMap::new(),
            default_bytes,
        }
    }

    /// The standard memory traffic table.
    #[must_use]
    pub fn new(read_request_bytes: u64, default_bytes: u64) -> Self {
        Self::empty(default_bytes)
            .with_rule(MessageKind::ReadRequest, SizeRule::Fixed(read_request_bytes))
            .with_rule(MessageKind::WriteRequest, SizeRule::PayloadLength)
            .with_rule(MessageKind::DataReady, SizeRule::PayloadLength)
            .with_rule(MessageKind::WriteDone, SizeRule::Fixed(default_bytes))
    }

    /// Add a rule, replacing any existing rule for `kind`.
    #[must_use]
    pub fn with_rule(mut self, kind: MessageKind, rule: SizeRule) -> Self {
        self.rules.insert(kind, rule);
        self
    }

    #[must_use]
    pub fn rule_for(&self, kind: MessageKind) -> Option<SizeRule> {
        self.rules.get(&kind).copied()
    }

    #[must_use]
    pub fn default_bytes(&self) -> u64 {
        self.default_bytes
    }

    /// Number of bytes to account for `message`.
    #[must_use]
    pub fn size_of(&self, message: &Message) -> u64 {
        match self.rules.get(&message.kind()) {
            Some(SizeRule::Fixed(bytes)) => *bytes,
            Some(SizeRule::PayloadLength) => message.payload().len() as u64,
            None => self.default_bytes,
        }
    }
}

impl Default for SizingPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_READ_REQUEST_BYTES, DEFAULT_MESSAGE_BYTES)
    }
}
