//! ProcessorRegistry - operation type から processor を引く
//!
//! - 明示登録: `HashMap<OperationType, Arc<dyn OperationProcessor>>`
//! - wildcard: 明示登録のない type について、登録順に `can_process` を問い合わせる
//! - 同じ type の二重登録は後勝ち（warn ログを出す）

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::OperationType;
use crate::ports::OperationProcessor;

#[derive(Default)]
pub struct ProcessorRegistry {
    by_type: HashMap<OperationType, Arc<dyn OperationProcessor>>,
    wildcards: Vec<Arc<dyn OperationProcessor>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `processor` for each of its supported types, or as a wildcard
    /// if it lists none.
    ///
    /// Returns the types whose previous processor was replaced.
    pub fn register(&mut self, processor: Arc<dyn OperationProcessor>) -> Vec<OperationType> {
        let types = processor.supported_types();
        if types.is_empty() {
            tracing::debug!(processor = processor.name(), "registered wildcard processor");
            self.wildcards.push(processor);
            return Vec::new();
        }

        let mut replaced = Vec::new();
        for op_type in types {
            if let Some(previous) = self.by_type.insert(op_type.clone(), Arc::clone(&processor)) {
                tracing::warn!(
                    operation_type = %op_type,
                    previous = previous.name(),
                    processor = processor.name(),
                    "processor registration overwritten (last registration wins)"
                );
                replaced.push(op_type);
            } else {
                tracing::debug!(
                    operation_type = %op_type,
                    processor = processor.name(),
                    "registered processor"
                );
            }
        }
        replaced
    }

    /// Explicit registration first, then the first wildcard that accepts the type.
    pub fn resolve(&self, op_type: &OperationType) -> Option<Arc<dyn OperationProcessor>> {
        if let Some(p) = self.by_type.get(op_type) {
            return Some(Arc::clone(p));
        }
        self.wildcards
            .iter()
            .find(|p| p.can_process(op_type))
            .cloned()
    }

    /// Explicitly registered types (wildcards excluded).
    pub fn registered_types(&self) -> Vec<OperationType> {
        let mut types: Vec<OperationType> = self.by_type.keys().cloned().collect();
        types.sort();
        types
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.by_type.len() + self.wildcards.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Operation, ProcessResult};
    use async_trait::async_trait;

    struct Named {
        name: &'static str,
        types: Vec<&'static str>,
        prefix: Option<&'static str>,
    }

    #[async_trait]
    impl OperationProcessor for Named {
        fn name(&self) -> &str {
            self.name
        }

        fn supported_types(&self) -> Vec<OperationType> {
            self.types.iter().map(|t| OperationType::new(*t)).collect()
        }

        fn can_process(&self, op_type: &OperationType) -> bool {
            self.prefix
                .is_some_and(|prefix| op_type.as_str().starts_with(prefix))
        }

        async fn process(&self, _operation: &Operation) -> ProcessResult {
            Ok(None)
        }
    }

    fn explicit(name: &'static str, types: Vec<&'static str>) -> Arc<dyn OperationProcessor> {
        Arc::new(Named {
            name,
            types,
            prefix: None,
        })
    }

    fn wildcard(name: &'static str, prefix: &'static str) -> Arc<dyn OperationProcessor> {
        Arc::new(Named {
            name,
            types: vec![],
            prefix: Some(prefix),
        })
    }

    #[test]
    fn register_and_resolve() {
        let mut registry = ProcessorRegistry::new();
        registry.register(explicit("progress", vec!["lesson.progress", "lesson.complete"]));

        let p = registry.resolve(&OperationType::new("lesson.complete")).unwrap();
        assert_eq!(p.name(), "progress");
        assert!(registry.resolve(&OperationType::new("profile.update")).is_none());
        assert_eq!(
            registry.registered_types(),
            vec![
                OperationType::new("lesson.complete"),
                OperationType::new("lesson.progress")
            ]
        );
    }

    #[test]
    fn last_registration_wins() {
        let mut registry = ProcessorRegistry::new();
        assert!(registry.register(explicit("first", vec!["a"])).is_empty());
        let replaced = registry.register(explicit("second", vec!["a", "b"]));

        assert_eq!(replaced, vec![OperationType::new("a")]);
        assert_eq!(registry.resolve(&OperationType::new("a")).unwrap().name(), "second");
    }

    #[test]
    fn explicit_beats_wildcard_and_wildcards_go_in_order() {
        let mut registry = ProcessorRegistry::new();
        registry.register(wildcard("any-lesson", "lesson."));
        registry.register(wildcard("everything", ""));
        registry.register(explicit("progress", vec!["lesson.progress"]));

        let resolve = |t: &str| registry.resolve(&OperationType::new(t)).unwrap().name().to_string();
        assert_eq!(resolve("lesson.progress"), "progress");
        assert_eq!(resolve("lesson.bookmark"), "any-lesson");
        assert_eq!(resolve("profile.update"), "everything");
        assert_eq!(registry.len(), 3);
    }
}
