use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use courier_core::impls::{BroadcastEventSink, JsonFileStorage};
use courier_core::ports::QueueStorage;
use courier_core::{
    EnqueueOptions, Operation, ProcessError, ProcessResult, QueueBuilder, QueueConfig, QueueEvent,
    RetryPolicy, TypedOperation, TypedProcessor,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "courier", about = "Drive lesson-progress sync through an offline period")]
struct Cli {
    /// Queue document on disk; survives restarts.
    #[arg(long, default_value = "courier-queue.json")]
    storage: PathBuf,
    /// JSON queue config. Defaults are tuned for a quick demo.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value_t = 5)]
    lessons: u32,
    /// Transient failures the remote returns before it starts accepting.
    #[arg(long, default_value_t = 2)]
    failures: u32,
    /// How long the client stays offline before the network comes back.
    #[arg(long, default_value_t = 1000)]
    offline_ms: u64,
    /// Drop anything left over from a previous run.
    #[arg(long)]
    reset: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct LessonProgress {
    lesson_id: String,
    percent: u8,
}

impl TypedOperation for LessonProgress {
    const TYPE: &'static str = "lesson.progress";
}

#[derive(Debug, Serialize, Deserialize)]
struct ProfileUpdate {
    display_name: String,
}

impl TypedOperation for ProfileUpdate {
    const TYPE: &'static str = "profile.update";
}

/// Simulated remote that times out a few times before it accepts writes.
struct ProgressSync {
    remaining_failures: AtomicU32,
}

impl ProgressSync {
    fn new(n: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(n),
        }
    }
}

#[async_trait]
impl TypedProcessor<LessonProgress> for ProgressSync {
    async fn process(&self, payload: LessonProgress, _operation: &Operation) -> ProcessResult {
        tokio::time::sleep(Duration::from_millis(50)).await;

        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(ProcessError::retryable(format!(
                "gateway timeout (left={left})"
            )));
        }
        Ok(Some(json!({ "lesson": payload.lesson_id, "stored": payload.percent })))
    }
}

struct ProfileSync;

#[async_trait]
impl TypedProcessor<ProfileUpdate> for ProfileSync {
    async fn process(&self, payload: ProfileUpdate, _operation: &Operation) -> ProcessResult {
        if payload.display_name.trim().is_empty() {
            return Err(ProcessError::permanent("400: display name must not be empty"));
        }
        Ok(None)
    }

    async fn compensate(&self, payload: ProfileUpdate, operation: &Operation) -> Result<(), ProcessError> {
        tracing::info!(
            operation_id = %operation.id(),
            display_name = %payload.display_name,
            "reverting optimistic profile change"
        );
        Ok(())
    }
}

fn demo_config() -> QueueConfig {
    QueueConfig {
        process_interval_ms: 500,
        completed_retention_ms: 500,
        retry: RetryPolicy::new(Duration::from_millis(200), Duration::from_secs(2)),
        ..QueueConfig::default()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,courier_core=info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => QueueConfig::from_file(path)?,
        None => demo_config(),
    };

    let storage = Arc::new(JsonFileStorage::open(&cli.storage).await?);
    if cli.reset {
        storage.clear().await?;
    }

    let events = Arc::new(BroadcastEventSink::default());
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match &event {
                QueueEvent::RetryScheduled {
                    id, delay, error, ..
                } => tracing::info!(operation_id = %id, delay_ms = delay.as_millis() as u64, %error, "event: retry scheduled"),
                QueueEvent::Failed { id, error, kind, .. } => {
                    tracing::info!(operation_id = %id, ?kind, %error, "event: failed")
                }
                other => tracing::debug!(event = other.name(), "event"),
            }
        }
    });

    let queue = QueueBuilder::new()
        .config(config)
        .storage(storage)
        .events(events)
        .online(false)
        .typed_processor::<LessonProgress, _>(ProgressSync::new(cli.failures))
        .typed_processor::<ProfileUpdate, _>(ProfileSync)
        .expect_types(&[LessonProgress::TYPE, ProfileUpdate::TYPE])
        .build()?;

    let (network_tx, network_rx) = watch::channel(false);
    let follower = queue.follow_network(network_rx);

    let report = queue.initialize().await;
    tracing::info!(loaded = report.loaded, recovered = report.recovered, "queue ready (offline)");

    for n in 0..cli.lessons {
        let payload = LessonProgress {
            lesson_id: format!("lesson-{n}"),
            percent: ((n + 1) * 100 / cli.lessons.max(1)).min(100) as u8,
        };
        let op = queue
            .enqueue_typed(&payload, EnqueueOptions::new().priority(n as i32))
            .await?;
        tracing::info!(operation_id = %op.id(), "queued while offline");
    }
    queue
        .enqueue_typed(
            &ProfileUpdate {
                display_name: "   ".into(),
            },
            EnqueueOptions::new().priority(10),
        )
        .await?;

    tokio::time::sleep(Duration::from_millis(cli.offline_ms)).await;
    tracing::info!(stats = %serde_json::to_string(&queue.get_stats())?, "before reconnect");

    network_tx.send(true)?;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
    loop {
        let stats = queue.get_stats();
        let open = stats.by_state.pending + stats.by_state.processing + stats.by_state.retrying;
        if open == 0 {
            break;
        }
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("interrupted; unfinished operations stay on disk");
                break;
            }
            _ = tokio::time::sleep_until(deadline) => {
                tracing::warn!(open, "gave up waiting");
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(100)) => {}
        }
    }

    queue.shutdown().await;
    drop(network_tx);
    follower.await?;

    println!("{}", serde_json::to_string_pretty(&queue.get_stats())?);
    let failed = queue.clear_failed().await;
    if failed > 0 {
        tracing::info!(failed, "dropped failed operations after reporting");
    }
    Ok(())
}
