// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! agentpipe-storage: the State Store & Event Bus (§4.5) — atomic
//! per-run persistence plus fire-and-forget lifecycle event publication.

pub mod error;
pub mod events;
pub mod file;
pub mod memory;
pub mod store;

pub use error::StoreError;
pub use events::{Event, EventFilter, EventKind, InMemoryEventBus, SubscriptionId};
pub use file::FileStateStore;
pub use memory::InMemoryStateStore;
pub use store::StateStore;
