// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Best-effort hit counting.
//!
//! Counter updates leave the render path through a bounded queue drained by
//! one worker thread. Semantics are at-most-once:
//!
//! - [`HitQueue::record`] never blocks; when the queue is full the hit is
//!   dropped and a warning logged.
//! - An accepted hit is applied once. A failed update is logged and not
//!   retried.
//! - [`HitQueue::flush`] returns after every hit accepted before it has been
//!   applied.
//! - Dropping the queue drains what is queued and joins the worker.

use crate::data::DataSource;
use crate::error::{Result, TagError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// One counter increment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    /// Table holding the counter.
    pub table: String,
    /// Key column identifying the row.
    pub key_column: String,
    /// Row id.
    pub id: i64,
    /// Counter column.
    pub column: String,
}

impl Hit {
    /// Creates a hit on `table.column` for the row whose `key_column` is `id`.
    pub fn new(table: &str, key_column: &str, id: i64, column: &str) -> Self {
        Self {
            table: table.to_string(),
            key_column: key_column.to_string(),
            id,
            column: column.to_string(),
        }
    }
}

enum Message {
    Hit(Hit),
    Flush(mpsc::Sender<()>),
}

/// Bounded queue of counter increments with one worker thread.
#[derive(Debug)]
pub struct HitQueue {
    sender: Mutex<Option<SyncSender<Message>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    dropped: AtomicU64,
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Message::Hit(hit) => f.debug_tuple("Hit").field(hit).finish(),
            Message::Flush(_) => f.write_str("Flush"),
        }
    }
}

impl HitQueue {
    /// Starts the worker thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn new(data: Arc<dyn DataSource>, capacity: usize) -> Result<Self> {
        let (sender, receiver) = mpsc::sync_channel(capacity.max(1));
        let worker = std::thread::Builder::new()
            .name("cmstags-hits".to_string())
            .spawn(move || run_worker(data, receiver))?;

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
            dropped: AtomicU64::new(0),
        })
    }

    /// Queues a hit without blocking. Returns false if it was dropped.
    pub fn record(&self, hit: Hit) -> bool {
        let Ok(guard) = self.sender.lock() else {
            return false;
        };
        let Some(sender) = guard.as_ref() else {
            return false;
        };
        match sender.try_send(Message::Hit(hit)) {
            Ok(()) => true,
            Err(TrySendError::Full(Message::Hit(hit))) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(table = %hit.table, id = hit.id, "hit queue full, dropping hit");
                false
            }
            Err(_) => {
                tracing::warn!("hit queue closed, dropping hit");
                false
            }
        }
    }

    /// Waits until every hit accepted so far has been applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker is gone.
    pub fn flush(&self) -> Result<()> {
        let (reply_tx, reply_rx) = mpsc::channel();
        {
            let guard = self
                .sender
                .lock()
                .map_err(|_| TagError::Data("hit queue lock poisoned".to_string()))?;
            let sender = guard
                .as_ref()
                .ok_or_else(|| TagError::Data("hit queue is shut down".to_string()))?;
            sender
                .send(Message::Flush(reply_tx))
                .map_err(|_| TagError::Data("hit worker stopped".to_string()))?;
        }
        reply_rx
            .recv()
            .map_err(|_| TagError::Data("hit worker stopped".to_string()))
    }

    /// Number of hits dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for HitQueue {
    fn drop(&mut self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
        if let Ok(mut worker) = self.worker.lock() {
            if let Some(handle) = worker.take() {
                if handle.join().is_err() {
                    tracing::error!("hit worker panicked");
                }
            }
        }
    }
}

fn run_worker(data: Arc<dyn DataSource>, receiver: Receiver<Message>) {
    for message in receiver {
        match message {
            Message::Hit(hit) => {
                if let Err(err) = data.increment(&hit.table, &hit.key_column, hit.id, &hit.column) {
                    tracing::error!(
                        table = %hit.table,
                        id = hit.id,
                        error = %err,
                        "failed to update hit counter"
                    );
                }
            }
            Message::Flush(reply) => {
                let _ = reply.send(());
            }
        }
    }
    tracing::debug!("hit worker stopped");
}
