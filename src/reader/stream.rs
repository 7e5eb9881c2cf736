use std::collections::VecDeque;
use std::sync::Arc;

use super::frame::Frame;
use super::key::{Bounds, GroupKey};
use super::{Context, Error, ReceiveErrorPolicy};
use crate::transport::{FrameStream, TransportError};

/// Cursor over the response stream of one connection.
///
/// Holds the frames of the last received batch and the group key of the
/// most recent series (or group) frame seen at its head.
pub(crate) struct StreamState {
    host: String,
    stream: Box<dyn FrameStream>,
    frames: VecDeque<Frame>,
    current_key: Option<GroupKey>,
    bounds: Bounds,
    group_keys: Arc<[String]>,
    group: bool,
    finished: bool,
    ctx: Context,
    policy: ReceiveErrorPolicy,
    err: Option<Error>,
}

impl StreamState {
    pub(crate) fn new(
        host: String,
        stream: Box<dyn FrameStream>,
        ctx: Context,
        bounds: Bounds,
        group_keys: Arc<[String]>,
        group: bool,
        policy: ReceiveErrorPolicy,
    ) -> Self {
        Self {
            host,
            stream,
            frames: VecDeque::new(),
            current_key: None,
            bounds,
            group_keys,
            group,
            finished: false,
            ctx,
            policy,
            err: None,
        }
    }

    /// Reports whether a frame is available, receiving one batch from the
    /// network when the local buffer is empty.
    pub(crate) fn more(&mut self) -> bool {
        if !self.frames.is_empty() {
            return true;
        }
        if self.finished {
            return false;
        }
        if let Some(err) = self.ctx.err() {
            self.fail(err);
            return false;
        }
        match self.stream.recv() {
            Ok(Some(frames)) if !frames.is_empty() => {
                self.frames = frames.into();
                self.compute_key();
                true
            }
            Ok(_) => {
                log::debug!("stream from {} finished", self.host);
                self.finished = true;
                false
            }
            Err(err) => {
                self.fail(err);
                false
            }
        }
    }

    pub(crate) fn peek(&self) -> Option<&Frame> {
        self.frames.front()
    }

    pub(crate) fn next(&mut self) -> Option<Frame> {
        let frame = self.frames.pop_front();
        if !self.frames.is_empty() {
            self.compute_key();
        }
        frame
    }

    pub(crate) fn key(&self) -> Option<&GroupKey> {
        self.current_key.as_ref()
    }

    pub(crate) fn take_err(&mut self) -> Option<Error> {
        self.err.take()
    }

    fn compute_key(&mut self) {
        match self.frames.front() {
            Some(Frame::Group(g)) if self.group => {
                self.current_key = Some(GroupKey::for_group(g, &self.group_keys, self.bounds));
            }
            Some(Frame::Series(s)) if !self.group => {
                self.current_key = Some(GroupKey::for_series(s, self.bounds));
            }
            _ => {}
        }
    }

    fn fail(&mut self, source: TransportError) {
        self.finished = true;
        self.err = match source {
            TransportError::Cancelled => Some(Error::Cancelled),
            TransportError::DeadlineExceeded => Some(Error::DeadlineExceeded),
            source => match self.policy {
                ReceiveErrorPolicy::Propagate => Some(Error::Receive {
                    host: self.host.clone(),
                    source,
                }),
                ReceiveErrorPolicy::EndOfStream => {
                    log::warn!("ending stream from {} early: {}", self.host, source);
                    None
                }
            },
        };
    }
}
