//! Background writer: bounded queue in, SQLite batches out.

use std::sync::Arc;

use parking_lot::Mutex;
use roomcast_protocol::{ChatMessage, RoomName};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::db::MessageArchive;
use crate::{ArchiveConfig, ArchiveResult};

/// Largest batch written in one transaction.
const MAX_BATCH: usize = 64;

pub struct ArchiveWriter {
    tx: mpsc::Sender<ChatMessage>,
    db: Arc<Mutex<MessageArchive>>,
    task: JoinHandle<()>,
}

impl ArchiveWriter {
    /// Open the archive file and start the writer task.
    pub fn open(config: &ArchiveConfig) -> ArchiveResult<Self> {
        let archive = MessageArchive::open(&config.path)?;
        Ok(Self::spawn(archive, config.queue_capacity))
    }

    /// Start the writer task over an already opened archive. Must be called
    /// inside a tokio runtime.
    pub fn spawn(archive: MessageArchive, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let db = Arc::new(Mutex::new(archive));
        let task = tokio::spawn(run_writer(rx, db.clone()));
        Self { tx, db, task }
    }

    /// Queue a message without waiting. Returns `false` if it was dropped.
    pub fn submit(&self, message: ChatMessage) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(msg)) => {
                warn!("Archive queue full, dropping message {}", msg.id);
                false
            }
            Err(TrySendError::Closed(msg)) => {
                warn!("Archive writer stopped, dropping message {}", msg.id);
                false
            }
        }
    }

    /// Run a blocking archive query on the tokio blocking pool.
    pub async fn with_db<F, R>(&self, f: F) -> ArchiveResult<R>
    where
        F: FnOnce(&MessageArchive) -> ArchiveResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let db = db.lock();
            f(&db)
        })
        .await?
    }

    pub async fn room_history(
        &self,
        room: RoomName,
        limit: usize,
    ) -> ArchiveResult<Vec<ChatMessage>> {
        self.with_db(move |db| db.room_history(&room, limit)).await
    }

    pub async fn count(&self) -> ArchiveResult<u64> {
        self.with_db(|db| db.count()).await
    }

    /// Close the queue and wait until everything already queued is written.
    pub async fn shutdown(self) {
        let Self { tx, task, .. } = self;
        drop(tx);
        if let Err(e) = task.await {
            warn!("Archive writer task failed: {}", e);
        }
    }
}

async fn run_writer(mut rx: mpsc::Receiver<ChatMessage>, db: Arc<Mutex<MessageArchive>>) {
    while let Some(first) = rx.recv().await {
        let mut batch = vec![first];
        while batch.len() < MAX_BATCH {
            match rx.try_recv() {
                Ok(msg) => batch.push(msg),
                Err(_) => break,
            }
        }

        let db = db.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut db = db.lock();
            db.insert_batch(&batch)
        })
        .await;

        match result {
            Ok(Ok(stored)) => debug!("Archived {} messages", stored),
            Ok(Err(e)) => warn!("Archive write failed: {}", e),
            Err(e) => warn!("Archive task join error: {}", e),
        }
    }
    debug!("Archive writer stopped");
}
