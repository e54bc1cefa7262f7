mod coordinator;
mod paths;

pub use coordinator::*;
pub use paths::*;

use lume_shared::{LumeError, LumeResult};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Messages the worker sends to its host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HostMessage {
    /// The host should replace the running server with a fresh one.
    #[serde(rename = "reload")]
    Reload,
}

/// Sending half of the bounded worker → host channel.
///
/// Cheap to clone; the file-change path and the request path each hold one.
#[derive(Debug, Clone)]
pub struct HostSender {
    tx: mpsc::Sender<HostMessage>,
}

impl HostSender {
    pub async fn send(&self, message: HostMessage) -> LumeResult {
        self.tx
            .send(message)
            .await
            .map_err(|_| LumeError::HostDisconnected)
    }

    pub async fn reload(&self) -> LumeResult {
        self.send(HostMessage::Reload).await
    }
}

pub fn host_channel(capacity: usize) -> (HostSender, mpsc::Receiver<HostMessage>) {
    let (tx, rx) = mpsc::channel(capacity);
    (HostSender { tx }, rx)
}
