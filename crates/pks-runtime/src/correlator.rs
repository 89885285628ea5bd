//! Run correlator: matches asynchronously produced results to the callers
//! waiting for them.
//!
//! The pending table is a plain mutex; no critical section awaits. Each entry
//! owns a `watch` channel, so waiting on one run never blocks another.
//!
//! Race between `resolve` and a timeout: whichever takes the table lock first
//! wins. If `resolve` wins, the waiter still reports `Completed` even though
//! its deadline has passed. If the timeout wins, the later `resolve` finds no
//! entry and returns `false`.
//!
//! A waiter whose future is dropped mid-wait (client gone) releases the entry
//! if no other waiter still holds it.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use pks_schemas::HitRateResult;
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq)]
pub enum RunOutcome {
    Completed(HitRateResult),
    TimedOut,
}

/// Issued by [`RunCorrelator::begin`]; consumed by [`RunCorrelator::await_result`].
#[derive(Debug)]
pub struct WaitHandle {
    run_id: Uuid,
    generation: u64,
    rx: watch::Receiver<Option<HitRateResult>>,
}

impl WaitHandle {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }
}

struct PendingEntry {
    generation: u64,
    tx: watch::Sender<Option<HitRateResult>>,
}

#[derive(Default)]
struct PendingTable {
    entries: HashMap<Uuid, PendingEntry>,
    next_generation: u64,
}

#[derive(Default)]
pub struct RunCorrelator {
    table: Mutex<PendingTable>,
}

impl std::fmt::Debug for RunCorrelator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunCorrelator")
            .field("pending", &self.pending_len())
            .finish()
    }
}

impl RunCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PendingTable> {
        // The table holds no invariants a panicking holder could break halfway.
        self.table.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register interest in `run_id`, or join the existing registration.
    pub fn begin(&self, run_id: Uuid) -> WaitHandle {
        let mut table = self.lock();

        if let Some(entry) = table.entries.get(&run_id) {
            return WaitHandle {
                run_id,
                generation: entry.generation,
                rx: entry.tx.subscribe(),
            };
        }

        table.next_generation += 1;
        let generation = table.next_generation;
        let (tx, rx) = watch::channel(None);
        table.entries.insert(run_id, PendingEntry { generation, tx });

        WaitHandle {
            run_id,
            generation,
            rx,
        }
    }

    /// Deliver `result` to every waiter on `run_id` and drop the entry.
    ///
    /// Returns `false` when nobody is waiting (late or duplicate delivery).
    pub fn resolve(&self, run_id: Uuid, result: HitRateResult) -> bool {
        let entry = self.lock().entries.remove(&run_id);
        match entry {
            Some(entry) => {
                entry.tx.send_replace(Some(result));
                true
            }
            None => {
                debug!(%run_id, "result for unknown or expired run dropped");
                false
            }
        }
    }

    /// Wait up to `timeout` for the result behind `handle`.
    ///
    /// On timeout the entry is removed, but only if it is still the one this
    /// handle was issued for.
    pub async fn await_result(&self, handle: WaitHandle, timeout: Duration) -> RunOutcome {
        let mut wait = PendingWait {
            correlator: self,
            run_id: handle.run_id,
            generation: handle.generation,
            rx: handle.rx,
        };

        let delivered = match tokio::time::timeout(timeout, wait.rx.wait_for(Option::is_some)).await {
            Ok(Ok(value)) => (*value).clone(),
            // Sender gone without a value: another waiter on the same entry expired it.
            Ok(Err(_)) | Err(_) => None,
        };
        if let Some(result) = delivered {
            return RunOutcome::Completed(result);
        }

        self.remove_if_current(wait.run_id, wait.generation, |_| true);

        // A resolve that took the lock just before us still counts.
        let late = wait.rx.borrow().clone();
        match late {
            Some(result) => RunOutcome::Completed(result),
            None => RunOutcome::TimedOut,
        }
    }

    fn remove_if_current(
        &self,
        run_id: Uuid,
        generation: u64,
        also: impl FnOnce(&PendingEntry) -> bool,
    ) {
        let mut table = self.lock();
        if table
            .entries
            .get(&run_id)
            .is_some_and(|e| e.generation == generation && also(e))
        {
            table.entries.remove(&run_id);
        }
    }

    pub fn pending_len(&self) -> usize {
        self.lock().entries.len()
    }
}

/// Receiver side of one `await_result` call. Dropping it before a result or
/// a timeout releases the entry, unless another waiter is still subscribed.
struct PendingWait<'a> {
    correlator: &'a RunCorrelator,
    run_id: Uuid,
    generation: u64,
    rx: watch::Receiver<Option<HitRateResult>>,
}

impl Drop for PendingWait<'_> {
    fn drop(&mut self) {
        // `self.rx` is still alive here and counts as one receiver.
        self.correlator
            .remove_if_current(self.run_id, self.generation, |e| e.tx.receiver_count() <= 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn result(mode: &str, hit_rate: f64) -> HitRateResult {
        HitRateResult {
            hit_rate,
            ..HitRateResult::empty(mode)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn resolve_before_deadline_delivers_that_result() {
        let c = Arc::new(RunCorrelator::new());
        let id = Uuid::new_v4();
        let handle = c.begin(id);
        assert_eq!(c.pending_len(), 1);

        let resolver = Arc::clone(&c);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            assert!(resolver.resolve(id, result("m", 2.5)));
        });

        let outcome = c.await_result(handle, Duration::from_secs(20)).await;
        assert_eq!(outcome, RunOutcome::Completed(result("m", 2.5)));
        assert_eq!(c.pending_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_removes_entry_and_late_resolve_is_refused() {
        let c = RunCorrelator::new();
        let id = Uuid::new_v4();
        let handle = c.begin(id);

        let outcome = c.await_result(handle, Duration::from_secs(20)).await;
        assert_eq!(outcome, RunOutcome::TimedOut);
        assert_eq!(c.pending_len(), 0);

        assert!(!c.resolve(id, result("late", 1.0)));
        assert_eq!(c.pending_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_begins_share_one_entry() {
        let c = Arc::new(RunCorrelator::new());
        let id = Uuid::new_v4();
        let a = c.begin(id);
        let b = c.begin(id);
        assert_eq!(c.pending_len(), 1);

        let ca = Arc::clone(&c);
        let cb = Arc::clone(&c);
        let wa = tokio::spawn(async move { ca.await_result(a, Duration::from_secs(10)).await });
        let wb = tokio::spawn(async move { cb.await_result(b, Duration::from_secs(10)).await });

        tokio::task::yield_now().await;
        assert!(c.resolve(id, result("shared", 4.0)));
        assert!(!c.resolve(id, result("dup", 0.0)));

        assert_eq!(wa.await.unwrap(), RunOutcome::Completed(result("shared", 4.0)));
        assert_eq!(wb.await.unwrap(), RunOutcome::Completed(result("shared", 4.0)));
    }

    #[tokio::test(start_paused = true)]
    async fn result_arriving_before_await_is_not_lost() {
        let c = RunCorrelator::new();
        let id = Uuid::new_v4();
        let handle = c.begin(id);
        assert!(c.resolve(id, result("early", 1.5)));

        let outcome = c.await_result(handle, Duration::from_secs(1)).await;
        assert_eq!(outcome, RunOutcome::Completed(result("early", 1.5)));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_handle_never_removes_a_newer_entry() {
        let c = RunCorrelator::new();
        let id = Uuid::new_v4();
        let first = c.begin(id);
        let joined = c.begin(id);

        assert_eq!(
            c.await_result(first, Duration::from_secs(1)).await,
            RunOutcome::TimedOut
        );
        assert_eq!(c.pending_len(), 0);

        let _fresh = c.begin(id);
        assert_eq!(c.pending_len(), 1);

        // The joined handle belongs to the expired generation.
        assert_eq!(
            c.await_result(joined, Duration::from_secs(1)).await,
            RunOutcome::TimedOut
        );
        assert_eq!(c.pending_len(), 1);
        assert!(c.resolve(id, result("fresh", 1.0)));
    }

    #[tokio::test(start_paused = true)]
    async fn unrelated_runs_do_not_block_each_other() {
        let c = Arc::new(RunCorrelator::new());
        let slow = Uuid::new_v4();
        let fast = Uuid::new_v4();
        let slow_handle = c.begin(slow);
        let fast_handle = c.begin(fast);

        let cs = Arc::clone(&c);
        let slow_wait =
            tokio::spawn(async move { cs.await_result(slow_handle, Duration::from_secs(30)).await });

        assert!(c.resolve(fast, result("fast", 1.0)));
        assert_eq!(
            c.await_result(fast_handle, Duration::from_secs(30)).await,
            RunOutcome::Completed(result("fast", 1.0))
        );
        assert_eq!(c.pending_len(), 1);

        assert_eq!(slow_wait.await.unwrap(), RunOutcome::TimedOut);
        assert_eq!(c.pending_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_waiter_releases_its_entry() {
        let c = Arc::new(RunCorrelator::new());
        let id = Uuid::new_v4();
        let handle = c.begin(id);

        let cw = Arc::clone(&c);
        let waiter = tokio::spawn(async move { cw.await_result(handle, Duration::from_secs(20)).await });
        tokio::task::yield_now().await;
        assert_eq!(c.pending_len(), 1);

        waiter.abort();
        assert!(waiter.await.unwrap_err().is_cancelled());
        assert_eq!(c.pending_len(), 0);

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(c.pending_len(), 0);
        assert!(!c.resolve(id, result("gone", 1.0)));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_waiter_leaves_shared_entry_to_the_others() {
        let c = Arc::new(RunCorrelator::new());
        let id = Uuid::new_v4();
        let dropped = c.begin(id);
        let kept = c.begin(id);

        let cd = Arc::clone(&c);
        let ck = Arc::clone(&c);
        let dropped_wait =
            tokio::spawn(async move { cd.await_result(dropped, Duration::from_secs(20)).await });
        let kept_wait = tokio::spawn(async move { ck.await_result(kept, Duration::from_secs(20)).await });
        tokio::task::yield_now().await;

        dropped_wait.abort();
        assert!(dropped_wait.await.unwrap_err().is_cancelled());
        assert_eq!(c.pending_len(), 1);

        assert!(c.resolve(id, result("kept", 3.0)));
        assert_eq!(kept_wait.await.unwrap(), RunOutcome::Completed(result("kept", 3.0)));
        assert_eq!(c.pending_len(), 0);
    }
}
