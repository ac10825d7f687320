// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! A set of common traits used across the LUMEN engine.

use core::mem::size_of;
use std::fmt::{Debug, Display};

use async_trait::async_trait;
use futures::future::LocalBoxFuture;
use lumen_track::id::Unique;

use crate::types::SimResult;

/// The `TotalBytes` trait is used to determine how many bytes an object
/// represents
pub trait TotalBytes {
    fn total_bytes(&self) -> usize;
}

/// A super-trait that objects that are passed around the simulation have to
/// implement
///
///  - Clone:       Allows the application to keep copies of objects sent
///    around.
///  - Debug/Display: Allows objects to be logged.
///  - Unique:      Every object has an [`Id`](lumen_track::Id) for tracing.
///  - TotalBytes:  Allows traffic to be accounted.
///  - 'static:     Objects are moved into futures.
pub trait SimObject: Clone + Debug + Display + Unique + TotalBytes + 'static {}

// Implementations for basic types that can be sent around the simulation for
// testing

impl TotalBytes for i32 {
    fn total_bytes(&self) -> usize {
        size_of::<i32>()
    }
}

impl SimObject for i32 {}

impl TotalBytes for usize {
    fn total_bytes(&self) -> usize {
        size_of::<usize>()
    }
}

impl SimObject for usize {}

/// The `Event` trait defines an object that can be used as an Event
///
/// This is a trait that defines the `listen` function that returns a future
/// so that it can be used in `async` code.
pub trait Event<T> {
    #[must_use = "Futures do nothing unless you `.await` or otherwise use them"]
    fn listen(&self) -> BoxFuture<'static, T>;
}

/// A component that is spawned by the engine when the simulation starts.
#[async_trait(?Send)]
pub trait Runnable {
    /// The main body of the component.
    async fn run(&self) -> SimResult {
        Ok(())
    }
}

/// The future returned by [`Event::listen`]. Simulation tasks are not `Send`.
pub type BoxFuture<'a, T> = LocalBoxFuture<'a, T>;
