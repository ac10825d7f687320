// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

use crate::Id;
use crate::tracker::{EntityManager, Track, Tracker};

/// Forwards every event to each of a list of [`Tracker`]s that has the
/// originating entity enabled at the event's level.
///
/// Used when the console and a trace file are both written.
pub struct MultiTracker {
    /// Only hands out IDs so they are unique across all the trackers.
    ids: EntityManager,
    trackers: Vec<Tracker>,
}

impl MultiTracker {
    /// Add a new tracker
    pub fn add_tracker(&mut self, tracker: Tracker) {
        self.trackers.push(tracker);
    }

    fn each_enabled(&self, id: Id, level: log::Level, f: impl Fn(&Tracker)) {
        self.trackers
            .iter()
            .filter(|tracker| tracker.is_entity_enabled(id, level))
            .for_each(f);
    }
}

impl Default for MultiTracker {
    fn default() -> Self {
        Self {
            ids: EntityManager::new(log::Level::Error),
            trackers: Vec::new(),
        }
    }
}

impl Track for MultiTracker {
    fn unique_id(&self) -> Id {
        self.ids.unique_id()
    }

    fn is_entity_enabled(&self, id: Id, level: log::Level) -> bool {
        self.trackers
            .iter()
            .any(|tracker| tracker.is_entity_enabled(id, level))
    }

    fn add_entity(&self, id: Id, entity_name: &str) {
        self.trackers
            .iter()
            .for_each(|tracker| tracker.add_entity(id, entity_name));
    }

    fn enter(&self, id: Id, object: Id) {
        self.each_enabled(id, log::Level::Trace, |t| t.enter(id, object));
    }

    fn exit(&self, id: Id, object: Id) {
        self.each_enabled(id, log::Level::Trace, |t| t.exit(id, object));
    }

    fn create(&self, created_by: Id, id: Id, num_bytes: usize, name: &str) {
        self.each_enabled(created_by, log::Level::Trace, |t| {
            t.create(created_by, id, num_bytes, name);
        });
    }

    fn destroy(&self, destroyed_by: Id, id: Id) {
        self.each_enabled(id, log::Level::Trace, |t| t.destroy(destroyed_by, id));
    }

    fn connect(&self, connect_from: Id, connect_to: Id) {
        self.each_enabled(connect_from, log::Level::Trace, |t| {
            t.connect(connect_from, connect_to);
        });
    }

    fn log(&self, id: Id, level: log::Level, msg: std::fmt::Arguments) {
        self.each_enabled(id, level, |t| t.log(id, level, msg));
    }

    fn time(&self, set_by: Id, time_ns: f64) {
        self.each_enabled(set_by, log::Level::Trace, |t| t.time(set_by, time_ns));
    }

    fn shutdown(&self) {
        self.trackers.iter().for_each(|tracker| tracker.shutdown());
    }
}
