// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Virtual time.

pub mod clock;
