// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! An event that can be notified any number of times.
//!
//! Each future returned by `listen()` completes at the first notification
//! after it was polled, yielding the value passed to the most recent
//! [`notify_result`](Repeated::notify_result).
//!
//! Notifying only wakes the listening tasks, so it cannot fail and can be
//! called from synchronous code such as a port delivering a value.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::traits::{BoxFuture, Event};

struct Shared<T> {
    listeners: RefCell<Vec<Waker>>,
    value: Cell<T>,
}

#[derive(Clone)]
pub struct Repeated<T>
where
    T: Copy,
{
    shared: Rc<Shared<T>>,
}

impl<T> Repeated<T>
where
    T: Copy,
{
    pub fn new(value: T) -> Self {
        Self {
            shared: Rc::new(Shared {
                listeners: RefCell::new(Vec::new()),
                value: Cell::new(value),
            }),
        }
    }

    /// Wake every task currently listening.
    pub fn notify(&self) {
        let listeners: Vec<Waker> = self.shared.listeners.borrow_mut().drain(..).collect();
        for waker in listeners {
            waker.wake();
        }
    }

    /// Set the value seen by listeners and wake them.
    pub fn notify_result(&self, value: T) {
        self.shared.value.set(value);
        self.notify();
    }
}

impl Default for Repeated<()> {
    fn default() -> Self {
        Self::new(())
    }
}

impl<T> Event<T> for Repeated<T>
where
    T: Copy + 'static,
{
    fn listen(&self) -> BoxFuture<'static, T> {
        Box::pin(Listen {
            shared: self.shared.clone(),
            waiting: false,
        })
    }
}

struct Listen<T> {
    shared: Rc<Shared<T>>,
    waiting: bool,
}

impl<T> Future for Listen<T>
where
    T: Copy,
{
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        if self.waiting {
            return Poll::Ready(self.shared.value.get());
        }
        self.waiting = true;
        self.shared.listeners.borrow_mut().push(cx.waker().clone());
        Poll::Pending
    }
}
