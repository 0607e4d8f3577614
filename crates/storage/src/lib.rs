// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! em-storage: Durable snapshots for the embermud driver
//!
//! Player, world, and permission state as JSON documents under a data
//! directory, written atomically (temp file + rename) so a crash mid-save
//! can never corrupt the previous snapshot.

pub mod autosave;
pub mod snapshot;
pub mod store;

pub use autosave::AutoSave;
pub use snapshot::{
    ObjectRecord, PlayerSnapshot, PlayerState, WorldSnapshot, CURRENT_SNAPSHOT_VERSION,
};
pub use store::{FileStore, StoreError};
