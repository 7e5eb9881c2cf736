//! Client side of a distributed time-series read path.
//!
//! A [`Reader`](reader::Reader) holds one connection per storage node. Each
//! read fans out to every selected node, merges the per-node frame streams
//! by group key, and hands the result to the caller as columnar
//! [`Table`](reader::Table)s in ascending key order.

pub mod query;
pub mod reader;
pub mod transport;

pub use reader::{Context, Error, Reader, ReaderConfig, ReadSpec, Table, TableIterator};
