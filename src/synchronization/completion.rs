use std::{mem, sync::Arc};

use tokio::sync::Semaphore;

use crate::{NetErr, Result};

/// Blocks the initiator of a pass until every expected completion signal has arrived.
///
/// The barrier is reusable: each `wait` consumes exactly the signals armed since the previous
/// one.
pub struct CompletionBarrier {
    semaphore: Arc<Semaphore>,
    expected: usize,
}

/// The handle given to the tasks that report a completion to a `CompletionBarrier`.
#[derive(Clone)]
pub struct Signal {
    semaphore: Arc<Semaphore>,
}

impl CompletionBarrier {
    /// Creates a new `CompletionBarrier` expecting no signals.
    ///
    /// # Returns
    /// A new `CompletionBarrier` instance.
    pub fn new() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(0)),
            expected: 0,
        }
    }

    /// Returns a new handle to signal this barrier.
    pub fn signal(&self) -> Signal {
        Signal {
            semaphore: Arc::clone(&self.semaphore),
        }
    }

    /// Adds `n` signals to wait for in the next `wait`.
    ///
    /// # Returns
    /// An error if the amount of pending signals can't be represented by the barrier.
    pub fn arm(&mut self, n: usize) -> Result<()> {
        let Some(expected) = self
            .expected
            .checked_add(n)
            .filter(|&e| e <= Semaphore::MAX_PERMITS && u32::try_from(e).is_ok())
        else {
            return Err(NetErr::BarrierOverflow {
                pending: self.expected,
                more: n,
            });
        };

        self.expected = expected;
        Ok(())
    }

    /// Returns the amount of signals the next `wait` will wait for.
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Waits until every armed signal has arrived and disarms the barrier.
    ///
    /// # Returns
    /// An error if the barrier was closed while waiting.
    pub async fn wait(&mut self) -> Result<()> {
        // `arm` guarantees it fits in a u32.
        let n = mem::take(&mut self.expected) as u32;

        self.semaphore
            .acquire_many(n)
            .await
            .map_err(|_| NetErr::Poisoned)?
            .forget();

        Ok(())
    }
}

impl Default for CompletionBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl Signal {
    /// Reports one completion.
    pub fn done(&self) {
        self.semaphore.add_permits(1);
    }
}
