use parking_lot::{Condvar, Mutex};

use super::schema::ColumnType;

/// How a table released its group key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Release {
    Drained,
    TypeConflict { from: ColumnType, to: ColumnType },
}

/// One-shot completion signal between a table and its iterator.
#[derive(Default)]
pub(crate) struct Gate {
    state: Mutex<Option<Release>>,
    cond: Condvar,
}

impl Gate {
    /// Opens the gate. Only the first release is recorded.
    pub(crate) fn release(&self, how: Release) {
        let mut state = self.state.lock();
        if state.is_none() {
            *state = Some(how);
            self.cond.notify_all();
        }
    }

    /// Blocks until the gate is released.
    pub(crate) fn wait(&self) -> Release {
        let mut state = self.state.lock();
        loop {
            if let Some(how) = *state {
                return how;
            }
            self.cond.wait(&mut state);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn wait_returns_first_release() {
        let gate = Arc::new(Gate::default());
        let g = Arc::clone(&gate);
        let handle = thread::spawn(move || {
            g.release(Release::TypeConflict {
                from: ColumnType::Float,
                to: ColumnType::Int,
            });
            g.release(Release::Drained);
        });
        let how = gate.wait();
        handle.join().unwrap();
        assert_eq!(
            how,
            Release::TypeConflict {
                from: ColumnType::Float,
                to: ColumnType::Int
            }
        );
        assert_eq!(gate.wait(), how);
    }
}
