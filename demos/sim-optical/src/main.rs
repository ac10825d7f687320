// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Simulate devices exchanging memory traffic over an optical switch.
//!
//! See `lib.rs` for details.

use std::path::PathBuf;
use std::rc::Rc;

use byte_unit::{AdjustedByte, Byte, UnitType};
use clap::Parser;
use lumen_engine::engine::Engine;
use lumen_engine::executor::Spawner;
use lumen_engine::sim_error;
use lumen_engine::time::clock::Clock;
use lumen_engine::types::SimError;
use lumen_optical::config::FabricConfig;
use lumen_optical::switch::Switch;
use lumen_track::builder::{TrackerConfig, TrackersConfig, setup_trackers};
use lumen_track::entity::Entity;
use lumen_track::{Track, Tracker, info, warn};
use sim_optical::build_platform;
use sim_optical::device::{Device, DeviceConfig, PeerSelection};

/// Command-line arguments.
#[derive(Parser)]
#[command(about = "Optical fabric evaluation application")]
struct Cli {
    /// Enable logging to the console.
    #[arg(long, default_value = "false")]
    stdout: bool,

    /// Level of log message to display.
    #[arg(long, default_value = "Info")]
    stdout_level: log::Level,

    /// Set a regular expression for which entites should have logging level set
    /// to `--stdout-level`. Others will have level set to `Error`.
    #[arg(long, default_value = "")]
    stdout_filter_regex: String,

    /// Write a text trace of the simulation to this file.
    #[arg(long)]
    trace_file: Option<String>,

    /// Level of trace events to record.
    #[arg(long, default_value = "Trace")]
    trace_level: log::Level,

    /// Set a regular expression for which entites should have trace level set
    /// to `--trace-level`. Others will have level set to `Error`.
    #[arg(long, default_value = "")]
    trace_filter_regex: String,

    /// Path to a fabric configuration file (TOML or YAML).
    #[arg(long)]
    conf_file: Option<PathBuf>,

    /// Size switch buffers from the bandwidth-delay product of a link with
    /// this bandwidth per second (e.g. "32GB").
    #[arg(long)]
    bdp_bandwidth: Option<String>,

    /// Round-trip window used with `--bdp-bandwidth`.
    #[arg(long, default_value = "820")]
    bdp_window_ns: f64,

    /// Packet size used with `--bdp-bandwidth`.
    #[arg(long, default_value = "64")]
    bdp_packet_bytes: u64,

    /// Number of devices plugged into the switch.
    #[arg(long, default_value = "4")]
    num_devices: usize,

    /// Number of requests each device sends.
    #[arg(long, default_value = "100")]
    num_requests: usize,

    /// Payload bytes of each write.
    #[arg(long, default_value = "64")]
    write_bytes: usize,

    /// Bytes requested by each read.
    #[arg(long, default_value = "64")]
    read_bytes: u64,

    /// Probability that a request is a write.
    #[arg(long, default_value = "0.5")]
    write_ratio: f64,

    /// Clock ticks between requests from one device.
    #[arg(long, default_value = "1")]
    interval_ticks: u64,

    /// How devices choose the peer for each request.
    #[clap(long, default_value_t, value_enum)]
    peer_selection: PeerSelection,

    /// Seed for random number generator.
    #[clap(long, default_value = "1")]
    seed: u64,

    /// Configure a clock tick on which to terminate the simulation. Use 0 to
    /// run until completion.
    #[arg(long, default_value = "0")]
    finish_tick: u64,
}

/// Install an event to terminate the simulation at the clock tick defined.
fn finish_at(spawner: &Spawner, clock: Clock, run_ticks: u64) {
    spawner.spawn(async move {
        clock.wait_ticks(run_ticks).await;
        sim_error!("Finish")
    });
}

fn setup_all_trackers(args: &Cli) -> Result<Tracker, SimError> {
    let config = TrackersConfig {
        stdout: TrackerConfig {
            enable: args.stdout,
            level: args.stdout_level,
            filter_regex: &args.stdout_filter_regex,
            file: None,
        },
        trace_file: TrackerConfig {
            enable: args.trace_file.is_some(),
            level: args.trace_level,
            filter_regex: &args.trace_filter_regex,
            file: args.trace_file.as_deref(),
        },
    };
    setup_trackers(&config).map_err(|e| SimError(e.to_string()))
}

fn create_config(top: &Rc<Entity>, args: &Cli) -> Result<(FabricConfig, DeviceConfig), SimError> {
    let mut fabric_config = FabricConfig::from_figment(args.conf_file.as_deref())?;
    if let Some(bandwidth) = &args.bdp_bandwidth {
        fabric_config = fabric_config.with_bandwidth_delay_buffers(
            bandwidth,
            args.bdp_window_ns,
            args.bdp_packet_bytes,
        )?;
    }

    let device_config = DeviceConfig {
        num_requests: args.num_requests,
        write_bytes: args.write_bytes,
        read_bytes: args.read_bytes,
        write_ratio: args.write_ratio,
        interval_ticks: args.interval_ticks,
        selection: args.peer_selection,
        seed: args.seed,
        ..DeviceConfig::default()
    };

    info!(top ;
        "{} devices, each sending {} requests ({} peers). Switch buffers {}/{} entries, link latency {} ticks.",
        args.num_devices,
        args.num_requests,
        args.peer_selection,
        fabric_config.rx_buffer_entries,
        fabric_config.tx_buffer_entries,
        fabric_config.link_latency_ticks,
    );
    info!(top ; "Random seed {}", args.seed);
    Ok((fabric_config, device_config))
}

fn main() -> Result<(), SimError> {
    let args = Cli::parse();
    let tracker = setup_all_trackers(&args)?;

    let mut engine = Engine::new(&tracker);
    let spawner = engine.spawner();
    let clock = engine.default_clock();
    let top = engine.top().clone();

    let (fabric_config, device_config) = create_config(&top, &args)?;
    let (devices, switch) = build_platform(
        &engine,
        &clock,
        &fabric_config,
        &device_config,
        args.num_devices,
    )?;
    info!(top ; "Platform built and connected");

    if args.finish_tick != 0 {
        finish_at(&spawner, clock.clone(), args.finish_tick);
    }

    if let Err(e) = engine.run() {
        if args.finish_tick == 0 || e.0 != "Finish" {
            tracker.shutdown();
            return Err(e);
        }
    }

    print_summary(&top, clock.time_now_ns(), &devices, &switch);
    Ok(())
}

fn print_summary(top: &Rc<Entity>, time_now_ns: f64, devices: &[Rc<Device>], switch: &Switch) {
    let traffic = switch.traffic();
    println!("Traffic matrix (bytes):");
    print!("{traffic}");

    let num_sent: usize = devices.iter().map(|d| d.num_sent()).sum();
    let num_responses: usize = devices.iter().map(|d| d.num_responses()).sum();
    let num_dropped = switch.num_dropped();
    if num_dropped > 0 {
        warn!(top ; "{num_dropped} messages dropped by the switch");
    }

    let time_now_s = time_now_ns / (1000.0 * 1000.0 * 1000.0);
    let (total, per_second) = compute_adjusted_value_and_rate(time_now_s, traffic.total_bytes());

    println!("Requests sent: {num_sent}, responses received: {num_responses}");
    println!(
        "Messages forwarded: {}, dropped: {num_dropped}",
        switch.num_forwarded()
    );
    println!("Finished at {time_now_ns:.2}ns. Total: {total:.2} ({per_second:.2}/s)");
}

fn compute_adjusted_value_and_rate(
    time_now_s: f64,
    num_bytes: u64,
) -> (AdjustedByte, AdjustedByte) {
    // Convert to a binary-only unit (KiB, MiB, etc)
    let count = Byte::from_u64(num_bytes).get_appropriate_unit(UnitType::Binary);
    let rate = if time_now_s > 0.0 {
        num_bytes as f64 / time_now_s
    } else {
        0.0
    };
    let per_second = Byte::from_f64(rate).unwrap_or(Byte::from_u64(0));
    (count, per_second.get_appropriate_unit(UnitType::Binary))
}
