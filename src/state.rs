use crate::config::AppConfig;
use crate::images::ImageIngest;
use crate::markup::MarkupEntry;
use crate::repository::{MarkupRepository, SyncReport};
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

// ── Messages OUT to dashboards ──

#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type")]
pub enum WsMessage {
    /// Sent once on connect.
    #[serde(rename = "snapshot")]
    Snapshot { entries: Vec<MarkupEntry> },

    #[serde(rename = "entry_created")]
    EntryCreated { entry: MarkupEntry },

    #[serde(rename = "entry_updated")]
    EntryUpdated { entry: MarkupEntry },

    #[serde(rename = "entry_deleted")]
    EntryDeleted { id: String },

    #[serde(rename = "journal_replaced")]
    JournalReplaced { report: SyncReport },
}

// ── Service counters (lock-free) ──

pub struct PerfCounters {
    pub entries_created: AtomicU64,
    pub entries_updated: AtomicU64,
    pub entries_deleted: AtomicU64,
    pub store_failures: AtomicU64,
    pub ws_messages_sent: AtomicU64,
}

impl PerfCounters {
    pub fn new() -> Self {
        Self {
            entries_created: AtomicU64::new(0),
            entries_updated: AtomicU64::new(0),
            entries_deleted: AtomicU64::new(0),
            store_failures: AtomicU64::new(0),
            ws_messages_sent: AtomicU64::new(0),
        }
    }
}

// ── Application shared state ──

pub struct AppState {
    pub config: AppConfig,
    pub repo: MarkupRepository,
    pub images: ImageIngest,

    // Mutations -> dashboards (broadcast for WS clients)
    pub ws_tx: broadcast::Sender<WsMessage>,

    pub counters: PerfCounters,
}

impl AppState {
    pub fn new(config: AppConfig, repo: MarkupRepository) -> Arc<Self> {
        let (ws_tx, _) = broadcast::channel(256);
        let images = ImageIngest::new(config.image_max_bytes);

        Arc::new(Self {
            config,
            repo,
            images,
            ws_tx,
            counters: PerfCounters::new(),
        })
    }

    #[inline]
    pub fn broadcast(&self, msg: WsMessage) {
        self.counters.ws_messages_sent.fetch_add(1, Ordering::Relaxed);
        // no subscribers is fine
        let _ = self.ws_tx.send(msg);
    }
}
