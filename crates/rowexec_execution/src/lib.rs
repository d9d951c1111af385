//! Batched, ownership-aware query execution primitives.
//!
//! The core of this crate is [`execution::operators::sort::PhysicalSort`], a
//! pull-based sort operator that buffers upstream row batches, computes a
//! total order over row coordinates, and rebuilds output batches while
//! transferring value ownership without unnecessary copies.

pub mod execution;
pub mod rows;
pub mod util;
