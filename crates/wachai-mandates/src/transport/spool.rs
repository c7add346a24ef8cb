//! Directory-backed transport.
//!
//! # Layout
//!
//! ```text
//! <root>/
//!   <recipient address, lowercase>/
//!     <uuidv7>.json   # {"sender": "0x...", "content": "..."}
//!     .cursor         # id of the newest acknowledged message
//! ```
//!
//! File names sort by creation time, so the cursor and the live poll state
//! are a single name each. Messages are written to a temp file and renamed,
//! so a listing only ever sees complete messages. Two processes that share a
//! root can exchange mandates without any network.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, warn};

use super::{inbox_key, InboundMessage, MessageStream, Transport};
use crate::error::{MandateError, MandateResult};
use crate::store::write_atomic;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

const CURSOR_FILE: &str = ".cursor";

#[derive(Debug, Serialize, Deserialize)]
struct SpoolEntry {
    sender: String,
    content: String,
}

#[derive(Debug, Clone)]
pub struct SpoolTransport {
    root: PathBuf,
    address: String,
    poll_interval: Duration,
}

impl SpoolTransport {
    pub fn new(root: impl Into<PathBuf>, address: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            address: address.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn inbox_dir(&self, address: &str) -> PathBuf {
        self.root.join(inbox_key(address))
    }
}

#[async_trait]
impl Transport for SpoolTransport {
    fn address(&self) -> &str {
        &self.address
    }

    async fn send(&self, peer: &str, content: &[u8]) -> MandateResult<()> {
        let content = std::str::from_utf8(content).map_err(|_| MandateError::Transport {
            message: "spool transport only carries UTF-8 messages".to_string(),
        })?;
        let dir = self.inbox_dir(peer);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| transport_error("failed to create inbox", &dir, e))?;

        let entry = SpoolEntry {
            sender: self.address.clone(),
            content: content.to_string(),
        };
        let path = dir.join(format!("{}.json", uuid::Uuid::now_v7()));
        write_atomic(&path, &serde_json::to_vec(&entry)?).await?;
        debug!(to = peer, path = %path.display(), "message spooled");
        Ok(())
    }

    async fn list_messages(&self) -> MandateResult<Vec<InboundMessage>> {
        let dir = self.inbox_dir(&self.address);
        let cursor = read_cursor(&dir).await?;
        let mut messages = Vec::new();
        for path in scan_after(&dir, cursor.as_deref()).await? {
            if let Some(message) = read_entry(&path).await {
                messages.push(message);
            }
        }
        Ok(messages)
    }

    async fn stream_messages(&self) -> MandateResult<MessageStream> {
        let dir = self.inbox_dir(&self.address);
        let cursor = read_cursor(&dir).await?;
        let newest = scan(&dir).await?.last().and_then(|p| message_id(p));
        let last = cursor.max(newest);

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let state = PollState {
            dir,
            last,
            ticker,
            pending: VecDeque::new(),
        };
        Ok(futures::stream::unfold(state, poll_next).boxed())
    }

    async fn acknowledge(&self, message: &InboundMessage) -> MandateResult<()> {
        let Some(id) = message.id.as_deref() else {
            return Ok(());
        };
        let dir = self.inbox_dir(&self.address);
        if read_cursor(&dir).await?.is_some_and(|cursor| cursor.as_str() >= id) {
            return Ok(());
        }
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| transport_error("failed to create inbox", &dir, e))?;
        write_atomic(&dir.join(CURSOR_FILE), id.as_bytes()).await?;
        debug!(id, "spool cursor advanced");
        Ok(())
    }
}

struct PollState {
    dir: PathBuf,
    /// Newest message name handed to `pending`.
    last: Option<String>,
    ticker: Interval,
    pending: VecDeque<PathBuf>,
}

async fn poll_next(mut state: PollState) -> Option<(MandateResult<InboundMessage>, PollState)> {
    loop {
        while let Some(path) = state.pending.pop_front() {
            if let Some(message) = read_entry(&path).await {
                return Some((Ok(message), state));
            }
        }

        state.ticker.tick().await;
        match scan_after(&state.dir, state.last.as_deref()).await {
            Ok(paths) => {
                if let Some(newest) = paths.last().and_then(|p| message_id(p)) {
                    state.last = Some(newest);
                }
                state.pending.extend(paths);
            }
            Err(e) => return Some((Err(e), state)),
        }
    }
}

/// Message files named after `after`, oldest first.
async fn scan_after(dir: &Path, after: Option<&str>) -> MandateResult<Vec<PathBuf>> {
    let mut paths = scan(dir).await?;
    if let Some(after) = after {
        paths.retain(|p| message_id(p).is_some_and(|id| id.as_str() > after));
    }
    Ok(paths)
}

async fn read_cursor(dir: &Path) -> MandateResult<Option<String>> {
    let path = dir.join(CURSOR_FILE);
    match fs::read_to_string(&path).await {
        Ok(raw) => {
            let cursor = raw.trim();
            Ok((!cursor.is_empty()).then(|| cursor.to_string()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(transport_error("failed to read cursor", &path, e)),
    }
}

fn message_id(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
}

/// Complete message files in `dir`, oldest first. A missing inbox is empty.
async fn scan(dir: &Path) -> MandateResult<Vec<PathBuf>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(transport_error("failed to read inbox", dir, e)),
    };

    let mut paths = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| transport_error("failed to read inbox", dir, e))?
    {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

async fn read_entry(path: &Path) -> Option<InboundMessage> {
    let raw = match fs::read(path).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable spool entry");
            return None;
        }
    };
    match serde_json::from_slice::<SpoolEntry>(&raw) {
        Ok(entry) => {
            let message = InboundMessage::new(entry.sender, entry.content);
            Some(match message_id(path) {
                Some(id) => message.with_id(id),
                None => message,
            })
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "malformed spool entry");
            None
        }
    }
}

fn transport_error(context: &str, path: &Path, err: std::io::Error) -> MandateError {
    MandateError::Transport {
        message: format!("{} {}: {}", context, path.display(), err),
    }
}
