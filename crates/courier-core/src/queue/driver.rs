//! Scheduling loop.
//!
//! 一本の tokio task が以下のいずれかで `process_queue` を呼びます:
//! - interval tick（`processIntervalMs`、最初の tick は即時）
//! - enqueue / retry 予約からの wake（`Notify`）
//! - 最も早い timer の期限
//!
//! - `shutdown_tx` に true を送る（または drop する）とループが止まる
//! - 実行中の tick はキャンセルしない（dispatch は最後まで走る）
//! - queue 本体は `Weak` で持つので、handle が全部 drop されればループも終わる

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::orchestrator::{Inner, OperationQueue};

pub(crate) struct Driver {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl Driver {
    /// Spawn the loop on the current runtime. `None` outside a runtime.
    pub(crate) fn spawn(inner: Weak<Inner>, wake: Arc<Notify>) -> Option<Self> {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!("no tokio runtime; scheduling loop not started");
                return None;
            }
        };
        let interval = OperationQueue {
            inner: inner.upgrade()?,
        }
        .config()
        .process_interval();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = handle.spawn(run(inner, wake, interval, shutdown_rx));
        tracing::debug!(interval_ms = interval.as_millis() as u64, "scheduling loop started");
        Some(Self { shutdown_tx, join })
    }

    /// Stop taking new ticks. The current tick, if any, runs to completion.
    pub(crate) fn request_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// The loop task has exited (shutdown, queue dropped, or panic).
    pub(crate) fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    pub(crate) async fn shutdown_and_join(self) {
        self.request_shutdown();
        if let Err(err) = self.join.await {
            tracing::error!(error = %err, "scheduling loop ended abnormally");
        }
    }
}

async fn run(
    inner: Weak<Inner>,
    wake: Arc<Notify>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // 強参照は sleep の間は持たない
        let next_timer = match inner.upgrade() {
            Some(inner) => OperationQueue { inner }.until_next_timer(),
            None => break,
        };

        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            _ = ticker.tick() => {}
            _ = wake.notified() => {}
            _ = tokio::time::sleep(next_timer.unwrap_or_default()), if next_timer.is_some() => {}
        }

        if *shutdown_rx.borrow() {
            break;
        }
        let Some(inner) = inner.upgrade() else {
            break;
        };
        OperationQueue { inner }.process_queue().await;
    }
    tracing::debug!("scheduling loop stopped");
}

impl OperationQueue {
    /// Drive `set_online` from a network-status channel.
    ///
    /// The current value is applied first; the task ends when the sender is
    /// dropped or every queue handle is gone.
    pub fn follow_network(&self, mut status: watch::Receiver<bool>) -> JoinHandle<()> {
        let inner = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            loop {
                let online = *status.borrow_and_update();
                match inner.upgrade() {
                    Some(inner) => OperationQueue { inner }.set_online(online),
                    None => break,
                }
                if status.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}
