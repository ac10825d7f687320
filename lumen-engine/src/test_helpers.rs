// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

use lumen_track::test_helpers::create_tracker;

use crate::engine::Engine;

/// Create an [`Engine`] whose full trace is written to
/// `traces/<test file>.log`.
#[must_use]
pub fn start_test(full_filepath: &str) -> Engine {
    Engine::new(&create_tracker(full_filepath))
}
