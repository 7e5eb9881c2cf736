use std::sync::Arc;

use parking_lot::Mutex;

use super::frame::{Frame, Tag};
use super::gate::Release;
use super::key::{Bounds, GroupKey};
use super::merge::MergedStreams;
use super::request::ReadRequest;
use super::schema::{table_cols_for_group, table_cols_for_series, ColMeta, ColumnType};
use super::stream::StreamState;
use super::table::Table;
use super::{Connection, Context, Error, ReaderConfig};
use crate::transport::{FrameStream, Prefetch};

/// One read, fanned out to every selected storage node.
///
/// Tables are produced in ascending group key order by
/// [`for_each_table`](TableIterator::for_each_table), which consumes the
/// iterator.
pub struct TableIterator {
    ctx: Context,
    bounds: Bounds,
    conns: Vec<Connection>,
    request: ReadRequest,
    config: ReaderConfig,
}

impl TableIterator {
    pub(crate) fn new(
        ctx: Context,
        bounds: Bounds,
        conns: Vec<Connection>,
        request: ReadRequest,
        config: ReaderConfig,
    ) -> Self {
        Self {
            ctx,
            bounds,
            conns,
            request,
            config,
        }
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn request(&self) -> &ReadRequest {
        &self.request
    }

    /// Hosts this read is sent to.
    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.conns.iter().map(|c| c.host.as_str())
    }

    /// Calls `f` once per group key, in ascending key order.
    ///
    /// Each table must be drained, marked done, or dropped before the next
    /// one is produced. An error from `f` aborts the read and is returned
    /// as is.
    pub fn for_each_table<F, E>(self, f: F) -> Result<(), E>
    where
        F: FnMut(Table) -> Result<(), E>,
        E: From<Error>,
    {
        let streams = Arc::new(Mutex::new(self.dispatch()?));
        if self.request.group.is_grouping() {
            self.handle_group_read(f, &streams)
        } else {
            self.handle_read(f, &streams)
        }
    }

    fn dispatch(&self) -> Result<MergedStreams, Error> {
        let grouping = self.request.group.is_grouping();
        let group_keys: Arc<[String]> = self.request.group_keys.clone().into();
        log::debug!(
            "dispatching read of {:?} over [{}, {}) to {} hosts",
            self.request.source.database,
            self.bounds.start_time(),
            self.bounds.stop_time(),
            self.conns.len()
        );

        let mut streams = Vec::with_capacity(self.conns.len());
        for c in &self.conns {
            if let Some(err) = self.ctx.err() {
                return Err(Error::from_context(err));
            }
            let stream = c
                .client
                .read(&self.ctx, &self.request)
                .map_err(|source| Error::Dispatch {
                    host: c.host.clone(),
                    source,
                })?;
            let stream: Box<dyn FrameStream> = match self.config.prefetch {
                Some(depth) => Box::new(Prefetch::spawn(&c.host, stream, depth)?),
                None => stream,
            };
            streams.push(StreamState::new(
                c.host.clone(),
                stream,
                self.ctx.clone(),
                self.bounds,
                Arc::clone(&group_keys),
                grouping,
                self.config.receive_errors,
            ));
        }
        Ok(MergedStreams::new(streams))
    }

    fn handle_read<F, E>(&self, mut f: F, streams: &Arc<Mutex<MergedStreams>>) -> Result<(), E>
    where
        F: FnMut(Table) -> Result<(), E>,
        E: From<Error>,
    {
        loop {
            let (key, cols, tags) = {
                let mut ms = streams.lock();
                if !ms.more() {
                    break;
                }
                if !matches!(ms.peek(), Some(Frame::Series(_))) {
                    // The consumer did not read all the data off the last table.
                    return Err(Error::ShortRead.into());
                }
                let Some(Frame::Series(s)) = ms.next() else {
                    return Err(Error::ShortRead.into());
                };
                let key = GroupKey::for_series(&s, self.bounds);
                let cols = table_cols_for_series(&s, s.data_type.into());
                (key, cols, s.tags)
            };
            self.emit(&mut f, streams, key, cols, &tags)?;
        }
        self.finish(streams)
    }

    fn handle_group_read<F, E>(&self, mut f: F, streams: &Arc<Mutex<MergedStreams>>) -> Result<(), E>
    where
        F: FnMut(Table) -> Result<(), E>,
        E: From<Error>,
    {
        loop {
            let (key, cols) = {
                let mut ms = streams.lock();
                if !ms.more() {
                    break;
                }
                if !matches!(ms.peek(), Some(Frame::Group(_))) {
                    return Err(Error::ShortRead.into());
                }
                let Some(Frame::Group(g)) = ms.next() else {
                    return Err(Error::ShortRead.into());
                };
                let key = GroupKey::for_group(&g, &self.request.group_keys, self.bounds);
                let typ = infer_group_type(&mut ms, &key);
                (key, table_cols_for_group(&g, typ))
            };
            self.emit(&mut f, streams, key, cols, &[])?;
        }
        self.finish(streams)
    }

    // Hands one table to the visitor and waits for it to be released.
    fn emit<F, E>(
        &self,
        f: &mut F,
        streams: &Arc<Mutex<MergedStreams>>,
        key: GroupKey,
        cols: Vec<ColMeta>,
        tags: &[Tag],
    ) -> Result<(), E>
    where
        F: FnMut(Table) -> Result<(), E>,
        E: From<Error>,
    {
        log::debug!("emitting table {key}");
        let table = Table::new(self.bounds, key, cols, Arc::clone(streams), tags);
        let gate = table.gate();
        f(table)?;
        if let Release::TypeConflict { from, to } = gate.wait() {
            return Err(Error::TypeConflict { from, to }.into());
        }
        match streams.lock().take_err() {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    fn finish<E: From<Error>>(&self, streams: &Arc<Mutex<MergedStreams>>) -> Result<(), E> {
        match streams.lock().take_err() {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}

/// Value type of a group, taken from the first series announced for it.
/// Defaults to string when no series follows.
fn infer_group_type(ms: &mut MergedStreams, key: &GroupKey) -> ColumnType {
    loop {
        if !ms.more() || ms.key() != Some(key) {
            return ColumnType::String;
        }
        let announced = match ms.peek() {
            Some(Frame::Series(s)) => Some(s.data_type),
            // The same group announced by another connection.
            Some(Frame::Group(_)) => None,
            _ => return ColumnType::String,
        };
        match announced {
            Some(t) => return t.into(),
            None => {
                ms.next();
            }
        }
    }
}
