// SPDX-License-Identifier: PMPL-1.0-or-later
//! DynaQuery Memory
//!
//! Reference [`QueryProvider`](dynaquery_core::QueryProvider) that runs
//! predicates, projections and orderings over JSON rows held in memory.
//! Useful for tests, examples and small datasets.

mod eval;

pub mod error;
pub mod join;
pub mod store;

pub use error::MemoryProviderError;
pub use join::left_join;
pub use store::{MemoryQuery, MemoryStore};
