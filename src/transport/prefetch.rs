use std::io;
use std::sync::mpsc::{self, Receiver};
use std::thread;

use super::{FrameStream, TransportError};
use crate::reader::Frame;

type Batch = Result<Option<Vec<Frame>>, TransportError>;

/// Runs a stream's receive loop on its own thread, buffering up to `depth`
/// batches ahead of the consumer.
///
/// The producer stops after the first end-of-stream or error, or as soon as
/// the consumer is dropped.
pub(crate) struct Prefetch {
    rx: Receiver<Batch>,
}

impl Prefetch {
    pub(crate) fn spawn(host: &str, mut inner: Box<dyn FrameStream>, depth: usize) -> io::Result<Self> {
        let (tx, rx) = mpsc::sync_channel(depth.max(1));
        thread::Builder::new()
            .name(format!("prefetch-{host}"))
            .spawn(move || {
                loop {
                    let batch = inner.recv();
                    let last = !matches!(batch, Ok(Some(_)));
                    if tx.send(batch).is_err() || last {
                        break;
                    }
                }
            })?;
        Ok(Self { rx })
    }
}

impl FrameStream for Prefetch {
    fn recv(&mut self) -> Result<Option<Vec<Frame>>, TransportError> {
        // A vanished producer has already delivered its last batch.
        self.rx.recv().unwrap_or(Ok(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{Frame, Points};

    struct Scripted(Vec<Batch>);

    impl FrameStream for Scripted {
        fn recv(&mut self) -> Result<Option<Vec<Frame>>, TransportError> {
            if self.0.is_empty() {
                return Ok(None);
            }
            self.0.remove(0)
        }
    }

    fn batch(v: i64) -> Vec<Frame> {
        vec![Frame::IntegerPoints(Points::new(vec![v], vec![v]))]
    }

    #[test]
    fn delivers_batches_in_order_then_ends() {
        let inner = Scripted(vec![Ok(Some(batch(1))), Ok(Some(batch(2)))]);
        let mut stream = Prefetch::spawn("a", Box::new(inner), 1).unwrap();
        assert_eq!(stream.recv().unwrap(), Some(batch(1)));
        assert_eq!(stream.recv().unwrap(), Some(batch(2)));
        assert_eq!(stream.recv().unwrap(), None);
        assert_eq!(stream.recv().unwrap(), None);
    }

    #[test]
    fn forwards_errors_and_stops() {
        let inner = Scripted(vec![
            Ok(Some(batch(1))),
            Err(TransportError::Remote("boom".into())),
            Ok(Some(batch(2))),
        ]);
        let mut stream = Prefetch::spawn("a", Box::new(inner), 4).unwrap();
        assert_eq!(stream.recv().unwrap(), Some(batch(1)));
        assert_eq!(stream.recv(), Err(TransportError::Remote("boom".into())));
        assert_eq!(stream.recv().unwrap(), None);
    }
}
