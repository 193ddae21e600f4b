//! QueueBuilder - キューの構築とワイヤリング
//!
//! - 依存（storage, event sink, clock, id generator）はすべてここで注入
//! - `expect_types()` で期待する operation type を宣言すると、`build()` 時に
//!   processor の登録漏れを検出する（Fail-fast）

use std::sync::Arc;

use crate::domain::OperationType;
use crate::impls::{InMemoryStorage, NoopEventSink};
use crate::ports::{Clock, EventSink, IdGenerator, OperationProcessor, QueueStorage, SystemClock, UlidGenerator};
use crate::queue::{OperationQueue, ProcessorRegistry, QueueConfig};
use crate::typed::{Typed, TypedOperation, TypedProcessor};

/// Builds an `OperationQueue`.
///
/// # 使用例
/// ```ignore
/// let queue = QueueBuilder::new()
///     .config(QueueConfig::from_file("queue.json")?)
///     .storage(Arc::new(JsonFileStorage::open("queue-data.json").await?))
///     .typed_processor::<LessonProgress, _>(ProgressSync::new(api))
///     .expect_types(&[LessonProgress::TYPE])
///     .build()?;
/// queue.initialize().await;
/// ```
///
/// Defaults: `QueueConfig::default()`, in-memory storage, no events, system
/// clock, ULID ids, online.
pub struct QueueBuilder {
    config: QueueConfig,
    storage: Option<Arc<dyn QueueStorage>>,
    events: Option<Arc<dyn EventSink>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    registry: ProcessorRegistry,
    expected: Option<Vec<OperationType>>,
    online: bool,
}

/// BuildError はキュー構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing processors for operation types: {0:?}")]
    MissingTypes(Vec<String>),

    #[error("invalid config: {0}")]
    Config(String),
}

impl QueueBuilder {
    pub fn new() -> Self {
        Self {
            config: QueueConfig::default(),
            storage: None,
            events: None,
            clock: None,
            ids: None,
            registry: ProcessorRegistry::new(),
            expected: None,
            online: true,
        }
    }

    pub fn config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    pub fn storage(mut self, storage: Arc<dyn QueueStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Initial network state.
    pub fn online(mut self, online: bool) -> Self {
        self.online = online;
        self
    }

    pub fn processor(mut self, processor: Arc<dyn OperationProcessor>) -> Self {
        self.registry.register(processor);
        self
    }

    pub fn typed_processor<T, P>(self, processor: P) -> Self
    where
        T: TypedOperation,
        P: TypedProcessor<T> + 'static,
    {
        self.processor(Arc::new(Typed::<T, P>::new(processor)))
    }

    /// Operation types that must have a processor when `build()` runs.
    pub fn expect_types(mut self, types: &[&str]) -> Self {
        self.expected = Some(types.iter().map(|t| OperationType::new(*t)).collect());
        self
    }

    /// # 検証
    /// - config の値
    /// - `expect_types()` の各 type が explicit か wildcard で解決できること
    pub fn build(self) -> Result<OperationQueue, BuildError> {
        self.config
            .validate()
            .map_err(|e| BuildError::Config(e.to_string()))?;

        if let Some(expected) = &self.expected {
            let missing: Vec<String> = expected
                .iter()
                .filter(|t| self.registry.resolve(t).is_none())
                .map(|t| t.to_string())
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingTypes(missing));
            }
        }

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&clock))) as Arc<dyn IdGenerator>);
        Ok(OperationQueue::with_parts(
            self.config,
            self.storage
                .unwrap_or_else(|| Arc::new(InMemoryStorage::new()) as Arc<dyn QueueStorage>),
            self.events
                .unwrap_or_else(|| Arc::new(NoopEventSink) as Arc<dyn EventSink>),
            clock,
            ids,
            self.registry,
            self.online,
        ))
    }
}

impl Default for QueueBuilder {
    fn default() -> Self {
        Self::new()
    }
}
