// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Cumulative bytes sent between every ordered pair of endpoints.
//!
//! The matrix is written by the simulation thread and may be read at any
//! time from another thread, so all access goes through a [`Mutex`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::message::Address;

pub type TrafficTable = BTreeMap<Address, BTreeMap<Address, u64>>;

#[derive(Debug, Default)]
pub struct TrafficMatrix {
    table: Mutex<TrafficTable>,
}

impl TrafficMatrix {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TrafficTable> {
        // A panicking reader cannot leave the table half-updated
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn record(&self, src: &Address, dst: &Address, num_bytes: u64) {
        let mut table = self.lock();
        *table
            .entry(src.clone())
            .or_default()
            .entry(dst.clone())
            .or_insert(0) += num_bytes;
    }

    /// Bytes sent from `src` to `dst` so far.
    #[must_use]
    pub fn bytes(&self, src: &Address, dst: &Address) -> u64 {
        self.lock()
            .get(src)
            .and_then(|row| row.get(dst))
            .copied()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.lock().values().flat_map(BTreeMap::values).sum()
    }

    /// An owned copy of the whole table.
    #[must_use]
    pub fn snapshot(&self) -> TrafficTable {
        self.lock().clone()
    }
}

impl fmt::Display for TrafficMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (src, row) in self.snapshot() {
            for (dst, num_bytes) in row {
                writeln!(f, "{src} -> {dst}: {num_bytes}B")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn accumulates_per_pair() {
        let matrix = TrafficMatrix::new();
        let a = Address::from("a");
        let b = Address::from("b");

        matrix.record(&a, &b, 64);
        matrix.record(&a, &b, 64);
        matrix.record(&b, &a, 1);

        assert_eq!(matrix.bytes(&a, &b), 128);
        assert_eq!(matrix.bytes(&b, &a), 1);
        assert_eq!(matrix.bytes(&a, &a), 0);
        assert_eq!(matrix.total_bytes(), 129);
    }

    #[test]
    fn display_lists_pairs() {
        let matrix = TrafficMatrix::new();
        matrix.record(&"x".into(), &"y".into(), 8);
        assert_eq!(format!("{matrix}"), "x -> y: 8B\n");
    }

    #[test]
    fn read_from_another_thread() {
        let matrix = Arc::new(TrafficMatrix::new());
        let a = Address::from("a");
        let b = Address::from("b");

        let reader = {
            let matrix = matrix.clone();
            let (a, b) = (a.clone(), b.clone());
            thread::spawn(move || {
                let mut last = 0;
                for _ in 0..1000 {
                    let now = matrix.bytes(&a, &b);
                    assert!(now >= last);
                    last = now;
                }
            })
        };

        for _ in 0..1000 {
            matrix.record(&a, &b, 4);
        }
        reader.join().unwrap();
        assert_eq!(matrix.bytes(&a, &b), 4000);
    }
}
