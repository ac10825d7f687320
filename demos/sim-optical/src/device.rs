// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! A device that issues reads and writes to its peers and answers theirs.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use async_trait::async_trait;
use lumen_engine::engine::Engine;
use lumen_engine::executor::Spawner;
use lumen_engine::port::Port;
use lumen_engine::sim_error;
use lumen_engine::time::clock::Clock;
use lumen_engine::traits::{Event, Runnable};
use lumen_engine::types::{SimError, SimResult};
use lumen_model_builder::{EntityDisplay, EntityGet};
use lumen_optical::message::{Address, Message, MessageKind};
use lumen_track::entity::Entity;
use lumen_track::{debug, trace};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

/// How each request chooses which peer to send to.
#[derive(clap::ValueEnum, Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum PeerSelection {
    /// Cycle through the peers in order
    #[default]
    RoundRobin,

    /// Pick a peer at random for every request
    Random,
}

impl fmt::Display for PeerSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerSelection::RoundRobin => f.write_str("round-robin"),
            PeerSelection::Random => f.write_str("random"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DeviceConfig {
    pub num_requests: usize,
    pub write_bytes: usize,
    pub read_bytes: u64,
    /// Probability that a request is a write rather than a read.
    pub write_ratio: f64,
    pub interval_ticks: u64,
    pub selection: PeerSelection,
    pub seed: u64,
    pub rx_buffer_entries: usize,
    pub tx_buffer_entries: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            num_requests: 16,
            write_bytes: 64,
            read_bytes: 64,
            write_ratio: 0.5,
            interval_ticks: 1,
            selection: PeerSelection::default(),
            seed: 1,
            rx_buffer_entries: 64,
            tx_buffer_entries: 4,
        }
    }
}

#[derive(Default)]
struct DeviceStats {
    num_sent: usize,
    num_received: usize,
    num_responses: usize,
    bytes_received: usize,
}

#[derive(EntityDisplay, EntityGet)]
pub struct Device {
    pub entity: Rc<Entity>,
    spawner: Spawner,
    clock: Clock,
    port: Rc<Port<Message>>,
    config: DeviceConfig,
    peers: RefCell<Vec<Address>>,
    rng: RefCell<Xoshiro256PlusPlus>,
    stats: Rc<RefCell<DeviceStats>>,
}

impl Device {
    pub fn new_and_register(
        engine: &Engine,
        clock: &Clock,
        parent: &Rc<Entity>,
        name: &str,
        index: usize,
        config: DeviceConfig,
    ) -> Result<Rc<Self>, SimError> {
        if !(0.0..=1.0).contains(&config.write_ratio) {
            return sim_error!("write ratio {} must be in [0, 1]", config.write_ratio);
        }
        let entity = Rc::new(Entity::new(parent, name));
        let port = Port::new(
            &entity,
            "port",
            config.rx_buffer_entries,
            config.tx_buffer_entries,
        )?;
        // Each device gets its own random stream
        let rng = Xoshiro256PlusPlus::seed_from_u64(config.seed ^ index as u64);
        let rc_self = Rc::new(Self {
            entity,
            spawner: engine.spawner(),
            clock: clock.clone(),
            port,
            config,
            peers: RefCell::new(Vec::new()),
            rng: RefCell::new(rng),
            stats: Rc::new(RefCell::new(DeviceStats::default())),
        });
        engine.register(rc_self.clone());
        Ok(rc_self)
    }

    #[must_use]
    pub fn port(&self) -> &Rc<Port<Message>> {
        &self.port
    }

    #[must_use]
    pub fn address(&self) -> Address {
        Address::of_port(&self.port)
    }

    pub fn set_peers(&self, peers: Vec<Address>) {
        *self.peers.borrow_mut() = peers;
    }

    #[must_use]
    pub fn num_sent(&self) -> usize {
        self.stats.borrow().num_sent
    }

    /// Every message received, requests and responses.
    #[must_use]
    pub fn num_received(&self) -> usize {
        self.stats.borrow().num_received
    }

    /// Responses (`DataReady` and `WriteDone`) to this device's requests.
    #[must_use]
    pub fn num_responses(&self) -> usize {
        self.stats.borrow().num_responses
    }

    #[must_use]
    pub fn bytes_received(&self) -> usize {
        self.stats.borrow().bytes_received
    }

    fn next_request(&self, request_index: usize) -> Option<Message> {
        let peers = self.peers.borrow();
        let mut rng = self.rng.borrow_mut();
        let dst = match self.config.selection {
            PeerSelection::RoundRobin => peers.get(request_index % peers.len().max(1)),
            PeerSelection::Random => peers.choose(&mut *rng),
        }?
        .clone();

        let src = self.address();
        let request = if rng.gen_bool(self.config.write_ratio) {
            let mut data = vec![0u8; self.config.write_bytes];
            rng.fill(data.as_mut_slice());
            Message::write_request(&self.entity, src, dst, data)
        } else {
            Message::read_request(&self.entity, src, dst, self.config.read_bytes)
        };
        Some(request)
    }
}

#[async_trait(?Send)]
impl Runnable for Device {
    async fn run(&self) -> SimResult {
        let entity = self.entity.clone();
        let clock = self.clock.clone();
        let port = self.port.clone();
        let stats = self.stats.clone();
        self.spawner
            .spawn(async move { run_responder(entity, &clock, port, stats).await });

        for request_index in 0..self.config.num_requests {
            let Some(request) = self.next_request(request_index) else {
                debug!(self.entity ; "no peers to send to");
                break;
            };
            send_when_free(&self.clock, &self.port, request).await?;
            self.stats.borrow_mut().num_sent += 1;
            self.clock.wait_ticks(self.config.interval_ticks).await;
        }
        Ok(())
    }
}

/// The device port does not accept a message while its outbound buffer is
/// full, so retry on the next tick.
async fn send_when_free(clock: &Clock, port: &Port<Message>, message: Message) -> SimResult {
    while !port.can_send() {
        clock.wait_ticks(1).await;
    }
    port.send(message)
}

async fn run_responder(
    entity: Rc<Entity>,
    clock: &Clock,
    port: Rc<Port<Message>>,
    stats: Rc<RefCell<DeviceStats>>,
) -> SimResult {
    let arrivals = port.inbound_changed();
    loop {
        while let Some(message) = port.retrieve_incoming() {
            trace!(entity ; "received {message}");
            {
                let mut stats = stats.borrow_mut();
                stats.num_received += 1;
                stats.bytes_received += message.payload().len();
            }

            let reply = match message.kind() {
                MessageKind::ReadRequest => {
                    let num_bytes = message.requested_bytes().unwrap_or(0) as usize;
                    Some(Message::data_ready(
                        &entity,
                        message.dst().clone(),
                        message.src().clone(),
                        vec![0; num_bytes],
                    ))
                }
                MessageKind::WriteRequest => Some(Message::write_done(
                    &entity,
                    message.dst().clone(),
                    message.src().clone(),
                )),
                MessageKind::DataReady | MessageKind::WriteDone => {
                    stats.borrow_mut().num_responses += 1;
                    None
                }
                MessageKind::Control | MessageKind::Envelope => None,
            };
            if let Some(reply) = reply {
                send_when_free(clock, &port, reply).await?;
            }
        }
        arrivals.listen().await;
    }
}
