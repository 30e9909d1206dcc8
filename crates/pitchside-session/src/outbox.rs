//! Ordered, retrying delivery of local changes to the backend.
//!
//! A single worker task owns the queue, so writes are issued one at a time in
//! the order they were pushed. A failed write stays at the head of the queue
//! and blocks everything behind it until the next push or [`Outbox::retry`].
//! A write the backend rejects outright is dropped with a warning instead.

use std::{
  collections::VecDeque,
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  },
};

use pitchside_core::store::MatchStore;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
  error::SyncWarning,
  reconcile::{Outbound, Reconciler},
  wall_clock::WallClock,
};

enum Message {
  Push(Outbound),
  Retry,
}

pub(crate) struct Outbox {
  tx:      mpsc::UnboundedSender<Message>,
  /// Writes pushed but not yet confirmed (or dropped as superseded).
  pending: Arc<AtomicUsize>,
  task:    JoinHandle<()>,
}

impl Outbox {
  pub fn spawn<S: MatchStore + 'static>(
    reconciler: Reconciler<S>,
    clock: Arc<dyn WallClock>,
    warnings: mpsc::UnboundedSender<SyncWarning>,
  ) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    let pending = Arc::new(AtomicUsize::new(0));
    let worker = Worker {
      reconciler,
      clock,
      warnings,
      pending: Arc::clone(&pending),
      queue: VecDeque::new(),
    };
    let task = tokio::spawn(worker.run(rx));
    Self { tx, pending, task }
  }

  pub fn push(&self, op: Outbound) {
    self.pending.fetch_add(1, Ordering::SeqCst);
    if self.tx.send(Message::Push(op)).is_err() {
      self.pending.fetch_sub(1, Ordering::SeqCst);
      tracing::warn!("outbox worker has stopped; dropping write");
    }
  }

  /// Re-attempt whatever is stuck at the head of the queue.
  pub fn retry(&self) {
    if self.pending() > 0 {
      let _ = self.tx.send(Message::Retry);
    }
  }

  pub fn pending(&self) -> usize { self.pending.load(Ordering::SeqCst) }

  /// Stop accepting writes, make one last delivery attempt, and wait for the
  /// worker to exit.
  pub async fn close(self) {
    drop(self.tx);
    if let Err(e) = self.task.await {
      tracing::warn!(error = %e, "outbox worker did not shut down cleanly");
    }
  }
}

struct Worker<S> {
  reconciler: Reconciler<S>,
  clock:      Arc<dyn WallClock>,
  warnings:   mpsc::UnboundedSender<SyncWarning>,
  pending:    Arc<AtomicUsize>,
  queue:      VecDeque<Outbound>,
}

impl<S: MatchStore> Worker<S> {
  async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Message>) {
    while let Some(msg) = rx.recv().await {
      self.accept(msg);
      // Take everything already waiting so superseded writes are skipped.
      while let Ok(msg) = rx.try_recv() {
        self.accept(msg);
      }
      self.flush().await;
    }
    if !self.queue.is_empty() {
      self.flush().await;
    }
    if !self.queue.is_empty() {
      tracing::warn!(
        match_id = %self.reconciler.match_id(),
        unsent = self.queue.len(),
        "session closed with unsynced writes"
      );
    }
  }

  fn accept(&mut self, msg: Message) {
    let Message::Push(op) = msg else {
      return;
    };
    let before = self.queue.len();
    let barrier = self.queue.iter().rposition(Outbound::is_barrier);
    let mut index = 0;
    self.queue.retain(|queued| {
      let behind_barrier = barrier.is_some_and(|b| index <= b);
      index += 1;
      behind_barrier || !op.supersedes(queued)
    });
    let dropped = before - self.queue.len();
    if dropped > 0 {
      self.pending.fetch_sub(dropped, Ordering::SeqCst);
    }
    self.queue.push_back(op);
  }

  async fn flush(&mut self) {
    while let Some(op) = self.queue.front() {
      match self.reconciler.send(op).await {
        Ok(()) => {
          self.queue.pop_front();
          self.pending.fetch_sub(1, Ordering::SeqCst);
        }
        Err(e) if e.rejected => {
          tracing::warn!(
            match_id = %self.reconciler.match_id(),
            error = %e,
            "backend rejected write; dropping it"
          );
          let _ = self.warnings.send(SyncWarning::from_save(&e, self.clock.now()));
          self.queue.pop_front();
          self.pending.fetch_sub(1, Ordering::SeqCst);
        }
        Err(e) => {
          tracing::warn!(
            match_id = %self.reconciler.match_id(),
            error = %e,
            queued = self.queue.len(),
            "sync failed; will retry"
          );
          let _ = self.warnings.send(SyncWarning::from_save(&e, self.clock.now()));
          break;
        }
      }
    }
  }
}
