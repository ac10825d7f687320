// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! The simulation clock.
//!
//! A single clock drives the whole simulation. Time only moves forward when
//! every runnable task is waiting, and tasks that wait for the same tick are
//! woken in the order in which they started waiting.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// Frequency of the simulation clock, one tick per ns.
pub const CLOCK_MHZ: f64 = 1000.0;

/// A point in time counted in ticks of the [`Clock`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClockTick {
    tick: u64,
}

impl ClockTick {
    #[must_use]
    pub fn new() -> Self {
        Self { tick: 0 }
    }

    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Change the value of `tick`.
    pub fn set_tick(&mut self, tick: u64) -> ClockTick {
        self.tick = tick;
        *self
    }
}

impl std::fmt::Display for ClockTick {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.tick)
    }
}

struct ClockState {
    now: Cell<ClockTick>,
    waiting: RefCell<BTreeMap<ClockTick, Vec<Waker>>>,
}

/// Handle to the simulation clock. Clones share the same time.
#[derive(Clone)]
pub struct Clock {
    state: Rc<ClockState>,
}

impl Clock {
    pub(crate) fn new() -> Self {
        Self {
            state: Rc::new(ClockState {
                now: Cell::new(ClockTick::new()),
                waiting: RefCell::new(BTreeMap::new()),
            }),
        }
    }

    #[must_use]
    pub fn tick_now(&self) -> ClockTick {
        self.state.now.get()
    }

    #[must_use]
    pub fn time_now_ns(&self) -> f64 {
        to_ns(self.tick_now())
    }

    /// Returns a [`ClockDelay`] future which must be `await`ed to delay the
    /// specified number of ticks.
    #[must_use = "Futures do nothing unless you `.await` or otherwise use them"]
    pub fn wait_ticks(&self, ticks: u64) -> ClockDelay {
        let mut until = self.tick_now();
        until.tick += ticks;
        ClockDelay {
            clock: self.clone(),
            until,
            scheduled: false,
        }
    }

    /// Move to the earliest tick that a task is waiting for and return the
    /// tasks to wake, oldest first.
    pub(crate) fn advance(&self) -> Option<Vec<Waker>> {
        let (tick, wakers) = self.state.waiting.borrow_mut().pop_first()?;
        if tick > self.tick_now() {
            self.state.now.set(tick);
        }
        Some(wakers)
    }

    fn schedule(&self, until: ClockTick, waker: &Waker) {
        self.state
            .waiting
            .borrow_mut()
            .entry(until)
            .or_default()
            .push(waker.clone());
    }
}

fn to_ns(tick: ClockTick) -> f64 {
    tick.tick as f64 / CLOCK_MHZ * 1000.0
}

/// Future returned by [`Clock::wait_ticks`].
pub struct ClockDelay {
    clock: Clock,
    until: ClockTick,
    scheduled: bool,
}

impl Future for ClockDelay {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.scheduled {
            if self.clock.tick_now() >= self.until {
                return Poll::Ready(());
            }
        } else {
            self.clock.schedule(self.until, cx.waker());
            self.scheduled = true;
        }
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_tick_per_ns() {
        assert_eq!(to_ns(ClockTick::new().set_tick(1)), 1.0);
        assert_eq!(to_ns(ClockTick::new().set_tick(820)), 820.0);
    }

    #[test]
    fn idle_clock_stays_put() {
        let clock = Clock::new();
        assert!(clock.advance().is_none());
        assert_eq!(clock.tick_now(), ClockTick::new());
    }
}
