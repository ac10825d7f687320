// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

#![doc(test(attr(warn(unused))))]

//! The LUMEN simulation engine.
//!
//! This library provides the [engine](crate::engine) which executes event
//! driven asynchronous components in virtual time, along with the
//! [clock](crate::time::clock), [events](crate::events) and buffered
//! [ports](crate::port) that the optical fabric models are built from.
//!
//! # Simple Application
//!
//! ```rust
//! use lumen_engine::engine::Engine;
//! use lumen_engine::run_simulation;
//!
//! let mut engine = Engine::default();
//! let clock = engine.default_clock();
//! engine.spawn(async move {
//!     clock.wait_ticks(10).await;
//!     Ok(())
//! });
//! run_simulation!(engine);
//! assert_eq!(engine.time_now_ns(), 10.0);
//! ```
//!
//! Components that implement [`Runnable`](crate::traits::Runnable) are
//! registered with the engine and spawned when the simulation starts. The
//! first error returned by any task stops the simulation and is returned by
//! [`Engine::run`](crate::engine::Engine::run).

pub mod engine;
pub mod events;
pub mod executor;
pub mod port;
pub mod test_helpers;
pub mod time;
pub mod traits;
pub mod types;

#[macro_export]
/// Spawn all registered components and then run the simulation.
///
/// The second form expects the simulation to fail with the given error.
macro_rules! run_simulation {
    ($engine:ident) => {
        $engine.run().unwrap();
    };
    ($engine:ident, $expect:expr) => {
        match $engine.run() {
            Ok(()) => panic!("Expected an error!"),
            Err(e) => assert_eq!(format!("{e}").as_str(), $expect),
        }
    };
}
