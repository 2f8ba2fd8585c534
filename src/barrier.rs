//! A breakable rendezvous for fail-atomic tool indexing (spec §4.3.1).
//!
//! Every tool belonging to a server must finish indexing before any of that
//! server's tool records are committed to the vector store; if any tool fails,
//! the whole server's indexing aborts with no partial commits. A
//! `tokio::sync::Barrier` only rendezvous N parties unconditionally — this
//! wraps one with a shared "broken" flag so a failing party can signal every
//! other party to abort instead of committing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Barrier;

/// Shared among every tool-indexing task for one server.
pub struct BreakableBarrier {
    barrier: Barrier,
    broken: AtomicBool,
}

impl BreakableBarrier {
    pub fn new(parties: usize) -> Arc<Self> {
        Arc::new(Self {
            barrier: Barrier::new(parties),
            broken: AtomicBool::new(false),
        })
    }

    /// Marks the barrier broken. Any party that has not yet rendezvoused will
    /// still pass through `wait`, but [`Self::is_broken`] lets every party
    /// know the commit must be skipped.
    pub fn r#break(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::SeqCst)
    }

    /// Rendezvous with the other parties. Returns once every party has
    /// called `wait` (successfully or after calling [`Self::break`]).
    pub async fn wait(&self) {
        self.barrier.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_all_parties_succeed() {
        let barrier = BreakableBarrier::new(3);
        let mut handles = Vec::new();
        for _ in 0..3 {
            let barrier = barrier.clone();
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                barrier.is_broken()
            }));
        }
        for handle in handles {
            assert!(!handle.await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_one_party_breaks_all_see_it() {
        let barrier = BreakableBarrier::new(3);
        let mut handles = Vec::new();
        for i in 0..3 {
            let barrier = barrier.clone();
            handles.push(tokio::spawn(async move {
                if i == 0 {
                    barrier.r#break();
                }
                barrier.wait().await;
                barrier.is_broken()
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }
    }
}
