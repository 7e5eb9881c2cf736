//! Distributed read path: fans a read out to storage nodes and merges their
//! sorted frame streams into columnar tables, one per group key.

use std::io;
use std::sync::Arc;

mod context;
mod frame;
mod gate;
mod iterator;
mod key;
mod merge;
mod request;
mod schema;
mod stream;
mod table;

#[cfg(test)]
mod tests;

pub use context::Context;
pub use frame::{Frame, GroupFrame, PointType, Points, SeriesFrame, Tag};
pub use iterator::TableIterator;
pub use key::{Bounds, GroupKey, KeyValue};
pub use request::{
    Aggregate, AggregateType, GroupMode, Hints, ReadGroup, ReadRequest, ReadSource, ReadSpec,
    TimestampRange,
};
pub use schema::{
    col_idx, ColMeta, ColumnType, DEFAULT_START_COL_LABEL, DEFAULT_STOP_COL_LABEL,
    DEFAULT_TIME_COL_LABEL, DEFAULT_VALUE_COL_LABEL,
};
pub use table::Table;

use crate::query::{PredicateTranslator, TranslateError};
use crate::transport::{Dialer, HostLookup, StorageClient, TransportError};

/// Common error type for read operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unknown aggregate type {0:?}")]
    UnknownAggregate(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("Predicate error: {0}")]
    Predicate(#[from] TranslateError),
    #[error("failed to dial {host}: {source}")]
    Dial { host: String, source: TransportError },
    #[error("failed to open stream to {host}: {source}")]
    Dispatch { host: String, source: TransportError },
    #[error("internal error: short read")]
    ShortRead,
    #[error("value type changed from {from} -> {to}")]
    TypeConflict { from: ColumnType, to: ColumnType },
    #[error("receive from {host} failed: {source}")]
    Receive { host: String, source: TransportError },
    #[error("read cancelled")]
    Cancelled,
    #[error("read deadline exceeded")]
    DeadlineExceeded,
    #[error("column {label:?} has type {actual}, not {expected}")]
    ColumnType {
        label: String,
        expected: ColumnType,
        actual: ColumnType,
    },
    #[error("column index {index} out of range for {len} columns (wanted {expected})")]
    ColumnIndex {
        index: usize,
        len: usize,
        expected: ColumnType,
    },
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn from_context(err: TransportError) -> Self {
        match err {
            TransportError::DeadlineExceeded => Error::DeadlineExceeded,
            _ => Error::Cancelled,
        }
    }
}

/// What a connection's stream does when a receive fails for a reason other
/// than the end of the stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReceiveErrorPolicy {
    /// Fail the read once the current table is released.
    #[default]
    Propagate,
    /// Treat the failure as the end of that connection's stream.
    EndOfStream,
}

#[derive(Clone, Debug, Default)]
pub struct ReaderConfig {
    pub receive_errors: ReceiveErrorPolicy,
    /// Depth of the per-connection prefetch queue. `None` receives on the
    /// calling thread.
    pub prefetch: Option<usize>,
}

#[derive(Clone)]
pub(crate) struct Connection {
    pub(crate) host: String,
    pub(crate) client: Arc<dyn StorageClient>,
}

/// Client side of the storage read path: one connection per storage node.
pub struct Reader {
    conns: Vec<Connection>,
    config: ReaderConfig,
    translator: Option<Arc<dyn PredicateTranslator>>,
}

impl Reader {
    /// Dials every host once. Any dial failure is fatal.
    pub fn new(hosts: &dyn HostLookup, dialer: &dyn Dialer, config: ReaderConfig) -> Result<Self, Error> {
        let conns = hosts
            .hosts()
            .into_iter()
            .map(|host| match dialer.dial(&host) {
                Ok(client) => Ok(Connection { host, client }),
                Err(source) => Err(Error::Dial { host, source }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("reader connected to {} hosts", conns.len());

        Ok(Self {
            conns,
            config,
            translator: default_translator(),
        })
    }

    /// Replaces the translator used for read predicates.
    pub fn with_translator(mut self, translator: Arc<dyn PredicateTranslator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.conns.iter().map(|c| c.host.as_str())
    }

    /// Prepares a read of `spec` over `[start, stop)`.
    ///
    /// Predicate translation and request validation happen here, before
    /// any stream is opened.
    pub fn read(&self, ctx: &Context, spec: &ReadSpec, start: i64, stop: i64) -> Result<TableIterator, Error> {
        let predicate = match &spec.predicate {
            Some(expr) => {
                let translator = self.translator.as_ref().ok_or(TranslateError::NoTranslator)?;
                Some(translator.translate(expr)?)
            }
            None => None,
        };
        let bounds = Bounds::new(start, stop);
        let request = ReadRequest::build(spec, predicate, bounds)?;

        let conns: Vec<Connection> = self
            .conns
            .iter()
            .filter(|c| spec.hosts.is_empty() || spec.hosts.contains(&c.host))
            .cloned()
            .collect();
        if conns.is_empty() {
            log::warn!("no hosts selected for read of {:?}", spec.bucket_id);
        }

        Ok(TableIterator::new(ctx.clone(), bounds, conns, request, self.config.clone()))
    }

    pub fn close(self) {
        log::debug!("closing {} storage connections", self.conns.len());
    }
}

#[cfg(feature = "sql")]
fn default_translator() -> Option<Arc<dyn PredicateTranslator>> {
    Some(Arc::new(crate::query::SqlPredicateTranslator))
}

#[cfg(not(feature = "sql"))]
fn default_translator() -> Option<Arc<dyn PredicateTranslator>> {
    None
}
