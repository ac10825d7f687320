// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Fabric configuration.
//!
//! Settings are merged from, in increasing order of priority:
//!  - the built-in defaults,
//!  - an optional configuration file (TOML, or YAML for `.yaml`/`.yml`),
//!  - environment variables prefixed with `LUMEN_` (e.g.
//!    `LUMEN_LINK_LATENCY_TICKS=5`).
//!
//! ```toml
//! link_latency_ticks = 820
//! rx_buffer_entries = 410
//! tx_buffer_entries = 1
//! ```

use std::path::Path;

use byte_unit::Byte;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml, Yaml};
use lumen_engine::sim_error;
use lumen_engine::types::{SimError, SimResult};
use serde::{Deserialize, Serialize};

use crate::sizing::{DEFAULT_MESSAGE_BYTES, DEFAULT_READ_REQUEST_BYTES, SizingPolicy};

pub const ENV_PREFIX: &str = "LUMEN_";

/// Buffer entries for switch inbound buffers when no bandwidth-delay sizing
/// is used.
pub const DEFAULT_RX_BUFFER_ENTRIES: usize = 512;

/// Outbound buffers are minimal so the switch does not queue.
pub const DEFAULT_TX_BUFFER_ENTRIES: usize = 16;

/// 8 byte id, 4 byte source, 4 byte destination.
pub const DEFAULT_ENVELOPE_HEADER_BYTES: usize = 16;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FabricConfig {
    /// Propagation delay of every fibre link in clock ticks.
    pub link_latency_ticks: u64,
    pub rx_buffer_entries: usize,
    pub tx_buffer_entries: usize,
    pub envelope_header_bytes: usize,
    pub read_request_bytes: u64,
    pub default_message_bytes: u64,
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            link_latency_ticks: 1,
            rx_buffer_entries: DEFAULT_RX_BUFFER_ENTRIES,
            tx_buffer_entries: DEFAULT_TX_BUFFER_ENTRIES,
            envelope_header_bytes: DEFAULT_ENVELOPE_HEADER_BYTES,
            read_request_bytes: DEFAULT_READ_REQUEST_BYTES,
            default_message_bytes: DEFAULT_MESSAGE_BYTES,
        }
    }
}

impl FabricConfig {
    /// The [`Figment`] that all the configuration sources are merged into.
    #[must_use]
    pub fn figment(conf_file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(FabricConfig::default()));
        if let Some(path) = conf_file {
            let is_yaml = path
                .extension()
                .is_some_and(|ext| ext == "yaml" || ext == "yml");
            figment = if is_yaml {
                figment.merge(Yaml::file(path))
            } else {
                figment.merge(Toml::file(path))
            };
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load and validate the configuration.
    pub fn from_figment(conf_file: Option<&Path>) -> Result<Self, SimError> {
        let config: FabricConfig = Self::figment(conf_file)
            .extract()
            .map_err(|e| SimError(format!("invalid fabric configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SimResult {
        if self.rx_buffer_entries == 0 || self.tx_buffer_entries == 0 {
            return sim_error!(
                "switch buffers must hold at least one entry (rx {}, tx {})",
                self.rx_buffer_entries,
                self.tx_buffer_entries
            );
        }
        Ok(())
    }

    #[must_use]
    pub fn sizing_policy(&self) -> SizingPolicy {
        SizingPolicy::new(self.read_request_bytes, self.default_message_bytes)
    }

    /// Size the inbound buffers from the bandwidth-delay product of the
    /// fabric, keeping a single-entry outbound buffer.
    pub fn with_bandwidth_delay_buffers(
        mut self,
        bandwidth_per_sec: &str,
        window_ns: f64,
        packet_bytes: u64,
    ) -> Result<Self, SimError> {
        self.rx_buffer_entries =
            bandwidth_delay_entries(bandwidth_per_sec, window_ns, packet_bytes)?;
        self.tx_buffer_entries = 1;
        self.validate()?;
        Ok(self)
    }
}

/// Number of `packet_bytes` packets in flight on a link carrying
/// `bandwidth_per_sec` (e.g. `"32GB"`) over a `window_ns` round trip.
///
/// ```rust
/// # use lumen_optical::config::bandwidth_delay_entries;
/// assert_eq!(bandwidth_delay_entries("32GB", 820.0, 64).unwrap(), 410);
/// ```
pub fn bandwidth_delay_entries(
    bandwidth_per_sec: &str,
    window_ns: f64,
    packet_bytes: u64,
) -> Result<usize, SimError> {
    let bandwidth = Byte::parse_str(bandwidth_per_sec, false)
        .map_err(|e| SimError(format!("unable to parse bandwidth '{bandwidth_per_sec}': {e}")))?;
    if packet_bytes == 0 {
        return sim_error!("packet size must be non-zero");
    }
    if !(window_ns.is_finite() && window_ns > 0.0) {
        return sim_error!("invalid bandwidth-delay window {window_ns}ns");
    }

    let bytes_in_flight = bandwidth.as_u64() as f64 * window_ns / 1e9;
    let entries = (bytes_in_flight / packet_bytes as f64).ceil() as usize;
    Ok(entries.max(1))
}
