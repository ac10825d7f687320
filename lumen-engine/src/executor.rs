// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Single-threaded executor of simulation tasks.
//!
//! Tasks are polled in the order in which they were spawned or woken. When no
//! task is ready to run, the clock is advanced to the next tick at which a
//! task is waiting and all the tasks waiting for that tick are woken in the
//! order in which they started waiting.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

use lumen_track::entity::Entity;
use lumen_track::set_time;

use crate::time::clock::Clock;
use crate::types::SimResult;

type TaskFuture = Pin<Box<dyn Future<Output = SimResult>>>;

static VTABLE: RawWakerVTable =
    RawWakerVTable::new(clone_raw_waker, wake_task, wake_by_ref, drop_task);

fn waker_for_task(task: Rc<Task>) -> Waker {
    let ptr = Rc::into_raw(task) as *const ();
    // SAFETY: the pointer comes from `Rc::into_raw` and the vtable functions
    // keep the reference count balanced.
    unsafe { Waker::from_raw(RawWaker::new(ptr, &VTABLE)) }
}

unsafe fn clone_raw_waker(data: *const ()) -> RawWaker {
    // SAFETY: `data` was created by `Rc::into_raw` on an `Rc<Task>`.
    unsafe { Rc::increment_strong_count(data as *const Task) };
    RawWaker::new(data, &VTABLE)
}

unsafe fn wake_task(data: *const ()) {
    // SAFETY: consumes the reference held by the waker.
    let task = unsafe { Rc::from_raw(data as *const Task) };
    task.schedule();
}

unsafe fn wake_by_ref(data: *const ()) {
    // SAFETY: the waker keeps its reference so one is added for the queue.
    let task = unsafe {
        Rc::increment_strong_count(data as *const Task);
        Rc::from_raw(data as *const Task)
    };
    task.schedule();
}

unsafe fn drop_task(data: *const ()) {
    // SAFETY: releases the reference held by the waker.
    drop(unsafe { Rc::from_raw(data as *const Task) });
}

struct Task {
    /// Set to `None` once the future has completed so that spurious wakes do
    /// not poll a finished future.
    future: RefCell<Option<TaskFuture>>,
    executor_state: Rc<ExecutorState>,
}

impl Task {
    fn new(
        future: impl Future<Output = SimResult> + 'static,
        executor_state: Rc<ExecutorState>,
    ) -> Task {
        Task {
            future: RefCell::new(Some(Box::pin(future))),
            executor_state,
        }
    }

    fn schedule(self: Rc<Self>) {
        let state = self.executor_state.clone();
        state.new_tasks.borrow_mut().push(self);
    }

    fn poll(&self, context: &mut Context) -> Poll<SimResult> {
        let mut guard = self.future.borrow_mut();
        let Some(future) = guard.as_mut() else {
            return Poll::Ready(Ok(()));
        };
        let result = future.as_mut().poll(context);
        if result.is_ready() {
            *guard = None;
        }
        result
    }
}

struct ExecutorState {
    task_queue: RefCell<Vec<Rc<Task>>>,
    new_tasks: RefCell<Vec<Rc<Task>>>,
    clock: Clock,
}

/// Single-threaded executor
///
/// This is a thin-wrapper (using [`Rc`]) around the real executor, so that this
/// struct can be cloned and passed around.
#[derive(Clone)]
pub struct Executor {
    pub entity: Rc<Entity>,
    state: Rc<ExecutorState>,
}

impl Executor {
    /// Run until there are no tasks left to run and no tasks waiting on the
    /// clock.
    pub fn run(&self) -> SimResult {
        loop {
            self.step()?;
            if !self.state.new_tasks.borrow().is_empty() {
                continue;
            }

            let before = self.state.clock.tick_now();
            let Some(wakers) = self.state.clock.advance() else {
                break;
            };
            if self.state.clock.tick_now() != before {
                set_time!(self.entity ; self.state.clock.time_now_ns());
            }
            for waker in wakers {
                waker.wake();
            }
        }
        Ok(())
    }

    /// Poll every task that is ready to run once.
    fn step(&self) -> SimResult {
        let mut task_queue = self.state.task_queue.borrow_mut();
        task_queue.append(&mut self.state.new_tasks.borrow_mut());

        for task in task_queue.drain(..) {
            let waker = waker_for_task(task.clone());
            let mut context = Context::from_waker(&waker);

            if let Poll::Ready(Err(e)) = task.poll(&mut context) {
                return Err(e);
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.state.clock.clone()
    }

    #[must_use]
    pub fn time_now_ns(&self) -> f64 {
        self.state.clock.time_now_ns()
    }
}

/// `Spawner` spawns new futures into the executor.
#[derive(Clone)]
pub struct Spawner {
    state: Rc<ExecutorState>,
}

impl Spawner {
    pub fn spawn(&self, future: impl Future<Output = SimResult> + 'static) {
        self.state
            .new_tasks
            .borrow_mut()
            .push(Rc::new(Task::new(future, self.state.clone())));
    }
}

#[must_use]
pub fn new_executor_and_spawner(top: &Rc<Entity>) -> (Executor, Spawner) {
    let state = Rc::new(ExecutorState {
        task_queue: RefCell::new(Vec::new()),
        new_tasks: RefCell::new(Vec::new()),
        clock: Clock::new(),
    });
    let entity = Rc::new(Entity::new(top, "executor"));
    (
        Executor {
            entity,
            state: state.clone(),
        },
        Spawner { state },
    )
}
