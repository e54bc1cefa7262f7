use super::{Worker, WorkerMessage};
use crate::reload::HostMessage;
use log::{debug, trace, warn};
use lume_shared::LumeResult;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;

/// Drives `worker` over newline-delimited JSON.
///
/// Every line read from `reader` is one [`WorkerMessage`]; every
/// [`HostMessage`] received on `host_rx` is written to `writer` as one line.
/// Returns once `reader` reaches EOF and the worker has shut down.
pub async fn run_stdio<R, W>(
    worker: Arc<Worker>,
    host_rx: mpsc::Receiver<HostMessage>,
    reader: R,
    writer: W,
) -> LumeResult
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let forward = tokio::spawn(forward_host_messages(host_rx, writer, stop_rx));

    let mut builds = JoinSet::new();
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let message = match serde_json::from_str::<WorkerMessage>(line) {
            Ok(message) => message,
            Err(e) => {
                warn!(target: "worker", "Skipping malformed message: {}", e);
                continue;
            }
        };
        trace!("Received {:?}", message);

        if message.is_build() {
            let worker = Arc::clone(&worker);
            builds.spawn(async move {
                // Failures are logged by the worker; the host only sees reloads.
                let _ = worker.handle(message).await;
            });
        } else {
            worker.handle(message).await?;
        }

        // Reap finished builds so the set does not grow over a long session.
        while builds.try_join_next().is_some() {}
    }

    debug!("Host closed the input stream");
    while builds.join_next().await.is_some() {}
    worker.shutdown().await;

    let _ = stop_tx.send(());
    forward.await.map_err(anyhow::Error::from)??;

    Ok(())
}

async fn forward_host_messages<W>(
    mut host_rx: mpsc::Receiver<HostMessage>,
    mut writer: W,
    mut stop_rx: oneshot::Receiver<()>,
) -> LumeResult
where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            biased;
            message = host_rx.recv() => match message {
                Some(message) => write_line(&mut writer, &message).await?,
                None => break,
            },
            _ = &mut stop_rx => {
                while let Ok(message) = host_rx.try_recv() {
                    write_line(&mut writer, &message).await?;
                }
                break;
            }
        }
    }

    writer.flush().await?;
    Ok(())
}

async fn write_line<W>(writer: &mut W, message: &HostMessage) -> LumeResult
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}
