//! Storage node transport seam.
//!
//! The wire protocol lives behind these traits: a `Dialer` turns a host
//! address into a `StorageClient`, and each read on a client opens a
//! `FrameStream` that yields batches of frames until the node is done.

use std::sync::Arc;

use crate::reader::{Context, Frame, ReadRequest};

mod memory;
mod prefetch;

pub use memory::{MemoryDialer, MemoryNode};
pub(crate) use prefetch::Prefetch;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Unavailable: {0}")]
    Unavailable(String),
    #[error("Remote error: {0}")]
    Remote(String),
    #[error("Cancelled")]
    Cancelled,
    #[error("Deadline exceeded")]
    DeadlineExceeded,
}

/// Response stream of one read on one storage node.
pub trait FrameStream: Send {
    /// Blocks for the next batch of frames. `Ok(None)` is the end of the
    /// stream.
    fn recv(&mut self) -> Result<Option<Vec<Frame>>, TransportError>;
}

/// Client handle for one storage node. Handles are reused across
/// sequential reads.
pub trait StorageClient: Send + Sync {
    fn read(&self, ctx: &Context, req: &ReadRequest) -> Result<Box<dyn FrameStream>, TransportError>;
}

/// Source of storage node addresses.
pub trait HostLookup {
    fn hosts(&self) -> Vec<String>;
}

impl<S: AsRef<str>> HostLookup for Vec<S> {
    fn hosts(&self) -> Vec<String> {
        self.iter().map(|h| h.as_ref().to_string()).collect()
    }
}

/// Opens client handles for host addresses.
pub trait Dialer {
    fn dial(&self, host: &str) -> Result<Arc<dyn StorageClient>, TransportError>;
}
