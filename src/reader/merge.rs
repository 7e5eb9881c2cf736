use super::frame::Frame;
use super::key::GroupKey;
use super::stream::StreamState;
use super::Error;

enum Cursor {
    Unstarted,
    At { index: usize, key: Option<GroupKey> },
    Exhausted,
}

/// K-way merge over the per-connection cursors.
///
/// Always exposes frames of the smallest group key still pending on any
/// connection. Streams that share the current key are drained one after
/// another in index order before the next key is chosen, so two keys are
/// never interleaved and a single stream is never reordered.
pub(crate) struct MergedStreams {
    streams: Vec<StreamState>,
    cursor: Cursor,
}

impl MergedStreams {
    pub(crate) fn new(streams: Vec<StreamState>) -> Self {
        Self {
            streams,
            cursor: Cursor::Unstarted,
        }
    }

    pub(crate) fn key(&self) -> Option<&GroupKey> {
        if self.streams.len() == 1 {
            return self.streams[0].key();
        }
        match &self.cursor {
            Cursor::At { key, .. } => key.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn peek(&self) -> Option<&Frame> {
        self.current().and_then(|i| self.streams[i].peek())
    }

    pub(crate) fn next(&mut self) -> Option<Frame> {
        let i = self.current()?;
        self.streams[i].next()
    }

    pub(crate) fn more(&mut self) -> bool {
        if self.streams.len() == 1 {
            return self.streams[0].more();
        }
        let mut index = match self.cursor {
            Cursor::Exhausted => return false,
            Cursor::Unstarted => return self.determine_new_key(),
            Cursor::At { index, .. } => index,
        };
        loop {
            if self.continues_key(index) {
                return true;
            }
            index += 1;
            if index == self.streams.len() {
                return self.determine_new_key();
            }
            if let Cursor::At { index: i, .. } = &mut self.cursor {
                *i = index;
            }
        }
    }

    /// First receive error recorded by any stream.
    pub(crate) fn take_err(&mut self) -> Option<Error> {
        self.streams.iter_mut().find_map(StreamState::take_err)
    }

    fn current(&self) -> Option<usize> {
        if self.streams.len() == 1 {
            return Some(0);
        }
        match self.cursor {
            Cursor::At { index, .. } => Some(index),
            _ => None,
        }
    }

    fn continues_key(&mut self, index: usize) -> bool {
        let Cursor::At { key, .. } = &self.cursor else {
            return false;
        };
        let stream = &mut self.streams[index];
        stream.more() && stream.key() == key.as_ref()
    }

    // Selects the stream holding the smallest key; the first one wins ties.
    fn determine_new_key(&mut self) -> bool {
        let mut min: Option<usize> = None;
        for i in 0..self.streams.len() {
            if !self.streams[i].more() {
                continue;
            }
            let smaller = match min {
                None => true,
                Some(m) => self.streams[i].key() < self.streams[m].key(),
            };
            if smaller {
                min = Some(i);
            }
        }
        self.cursor = match min {
            Some(index) => {
                let key = self.streams[index].key().cloned();
                if let Some(k) = &key {
                    log::trace!("merge selected stream {index} for key {k}");
                }
                Cursor::At { index, key }
            }
            None => Cursor::Exhausted,
        };
        min.is_some()
    }
}
