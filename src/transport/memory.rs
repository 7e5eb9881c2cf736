use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{Dialer, FrameStream, StorageClient, TransportError};
use crate::reader::{Context, Frame, ReadRequest};

/// In-process storage node that replays scripted response batches.
///
/// Every read replays the same batches, dropping points frames when the
/// request carries the no-points hint.
#[derive(Clone, Default)]
pub struct MemoryNode {
    state: Arc<Mutex<NodeState>>,
}

#[derive(Default)]
struct NodeState {
    batches: Vec<Vec<Frame>>,
    open_error: Option<TransportError>,
    recv_error: Option<(usize, TransportError)>,
    requests: Vec<ReadRequest>,
}

impl MemoryNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batches(batches: Vec<Vec<Frame>>) -> Self {
        let node = Self::new();
        node.state.lock().batches = batches;
        node
    }

    pub fn push_batch(&self, frames: Vec<Frame>) {
        self.state.lock().batches.push(frames);
    }

    /// Makes every subsequent read fail to open.
    pub fn fail_open(&self, err: TransportError) {
        self.state.lock().open_error = Some(err);
    }

    /// Makes streams fail after delivering `batches` batches.
    pub fn fail_after(&self, batches: usize, err: TransportError) {
        self.state.lock().recv_error = Some((batches, err));
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<ReadRequest> {
        self.state.lock().requests.clone()
    }
}

impl StorageClient for MemoryNode {
    fn read(&self, ctx: &Context, req: &ReadRequest) -> Result<Box<dyn FrameStream>, TransportError> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }
        let mut state = self.state.lock();
        state.requests.push(req.clone());
        if let Some(err) = &state.open_error {
            return Err(err.clone());
        }

        let no_points = req.hints.no_points();
        let batches = state
            .batches
            .iter()
            .map(|batch| {
                batch
                    .iter()
                    .filter(|f| !no_points || f.is_boundary())
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();

        Ok(Box::new(MemoryStream {
            ctx: ctx.clone(),
            batches,
            delivered: 0,
            recv_error: state.recv_error.clone(),
        }))
    }
}

struct MemoryStream {
    ctx: Context,
    batches: VecDeque<Vec<Frame>>,
    delivered: usize,
    recv_error: Option<(usize, TransportError)>,
}

impl FrameStream for MemoryStream {
    fn recv(&mut self) -> Result<Option<Vec<Frame>>, TransportError> {
        if let Some(err) = self.ctx.err() {
            return Err(err);
        }
        if let Some((after, err)) = &self.recv_error {
            if self.delivered >= *after {
                return Err(err.clone());
            }
        }
        self.delivered += 1;
        Ok(self.batches.pop_front())
    }
}

/// Routes host addresses to in-process nodes.
#[derive(Clone, Default)]
pub struct MemoryDialer {
    nodes: HashMap<String, MemoryNode>,
}

impl MemoryDialer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, host: impl Into<String>, node: MemoryNode) -> &mut Self {
        self.nodes.insert(host.into(), node);
        self
    }

    pub fn hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self.nodes.keys().cloned().collect();
        hosts.sort();
        hosts
    }
}

impl Dialer for MemoryDialer {
    fn dial(&self, host: &str) -> Result<Arc<dyn StorageClient>, TransportError> {
        self.nodes
            .get(host)
            .map(|node| Arc::new(node.clone()) as Arc<dyn StorageClient>)
            .ok_or_else(|| TransportError::Unavailable(format!("no route to host {host}")))
    }
}
