//! EventSink port - ライフサイクル通知の出口
//!
//! # 実装
//! - NoopEventSink: 何もしない
//! - BroadcastEventSink: tokio broadcast で購読者に配る
//! - TracingEventSink: tracing ログに流す

use crate::domain::QueueEvent;

/// EventSink はキューのライフサイクルイベントを受け取る
///
/// `emit` は同期・非ブロッキングであること（キューのロック外から呼ばれるが、
/// dispatch の完了処理を遅らせないため）。
pub trait EventSink: Send + Sync {
    fn emit(&self, event: QueueEvent);
}
