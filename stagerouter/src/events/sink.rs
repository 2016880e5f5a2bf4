//! Event sinks.

use async_trait::async_trait;
use tracing::{debug, info, warn, Level};

/// Destination for driver events.
///
/// Both drivers report every stage outcome, heartbeat and item result
/// through a sink handed to them at construction, so the caller decides
/// where those lines go.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Reports `event_type` (e.g. `stage.succeeded`) with an optional JSON
    /// payload.
    async fn emit(&self, event_type: &str, data: Option<serde_json::Value>);

    /// Same as [`emit`](Self::emit), usable outside async code. Never fails.
    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event_type: &str, _data: Option<serde_json::Value>) {}

    fn try_emit(&self, _event_type: &str, _data: Option<serde_json::Value>) {}
}

/// An event sink that turns events into `tracing` lines.
///
/// The well-known payload keys (`stage`, `status`, `url`, `index`/`total`,
/// `elapsed`, `exit_code`, `detail`) become structured fields when present.
/// Any other keys are attached together as `extra`. Problem events (`*.failed`,
/// `*.missing_input`, `*.blocked`) are raised to WARN whatever the
/// configured level.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self::info()
    }
}

const PROBLEM_SUFFIXES: [&str; 3] = [".failed", ".missing_input", ".blocked"];

/// Payload keys logged as their own fields.
const NAMED_KEYS: [&str; 8] = [
    "stage", "status", "url", "index", "total", "elapsed", "exit_code", "detail",
];

fn field<'a>(data: Option<&'a serde_json::Value>, key: &str) -> Option<&'a serde_json::Value> {
    data.and_then(|d| d.get(key)).filter(|v| !v.is_null())
}

fn text_field(data: Option<&serde_json::Value>, key: &str) -> Option<String> {
    match field(data, key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// The payload minus the named keys and nulls, as compact JSON.
fn remaining_fields(data: Option<&serde_json::Value>) -> Option<String> {
    let data = data.filter(|d| !d.is_null())?;
    let Some(map) = data.as_object() else {
        return Some(data.to_string());
    };
    let rest: serde_json::Map<String, serde_json::Value> = map
        .iter()
        .filter(|(key, value)| !NAMED_KEYS.contains(&key.as_str()) && !value.is_null())
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    (!rest.is_empty()).then(|| serde_json::Value::Object(rest).to_string())
}

impl LoggingEventSink {
    /// Creates a sink that logs routine events at `level`.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Routine events at DEBUG.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Routine events at INFO.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }

    fn level_for(&self, event_type: &str) -> Level {
        if PROBLEM_SUFFIXES.iter().any(|s| event_type.ends_with(s)) {
            Level::WARN
        } else {
            self.level
        }
    }

    fn log_event(&self, event_type: &str, data: Option<&serde_json::Value>) {
        let stage = text_field(data, "stage");
        let status = text_field(data, "status");
        let url = text_field(data, "url");
        let progress = match (field(data, "index"), field(data, "total")) {
            (Some(index), Some(total)) => Some(format!("{index}/{total}")),
            _ => None,
        };
        let elapsed = text_field(data, "elapsed");
        let exit_code = text_field(data, "exit_code");
        let detail = text_field(data, "detail");
        let extra = remaining_fields(data);

        // Absent values are `None` and leave no field on the line.
        macro_rules! emit_at {
            ($mac:ident) => {
                $mac!(
                    event = event_type,
                    stage = stage.as_deref(),
                    status = status.as_deref(),
                    url = url.as_deref(),
                    progress = progress.as_deref(),
                    elapsed = elapsed.as_deref(),
                    exit_code = exit_code.as_deref(),
                    detail = detail.as_deref().map(str::trim_end),
                    extra = extra.as_deref(),
                    "{event_type}"
                )
            };
        }

        match self.level_for(event_type) {
            Level::WARN | Level::ERROR => emit_at!(warn),
            Level::INFO => emit_at!(info),
            _ => emit_at!(debug),
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.log_event(event_type, data.as_ref());
    }

    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.log_event(event_type, data.as_ref());
    }
}

/// One event captured by [`CollectingEventSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    /// Event name, e.g. `stage.succeeded`.
    pub event_type: String,
    /// Payload, or `Null` when none was given.
    pub data: serde_json::Value,
}

impl RecordedEvent {
    /// The `stage` field of the payload, if any.
    #[must_use]
    pub fn stage(&self) -> Option<&str> {
        self.data.get("stage").and_then(serde_json::Value::as_str)
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    recorded: parking_lot::RwLock<Vec<RecordedEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.recorded.write().push(RecordedEvent {
            event_type: event_type.to_string(),
            data: data.unwrap_or(serde_json::Value::Null),
        });
    }

    /// Snapshot of everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.recorded.read().clone()
    }

    /// Event names in order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.recorded
            .read()
            .iter()
            .map(|e| e.event_type.clone())
            .collect()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.recorded.read().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recorded.read().is_empty()
    }

    /// Forgets everything recorded.
    pub fn clear(&self) {
        self.recorded.write().clear();
    }

    /// Events whose name starts with `prefix`.
    #[must_use]
    pub fn events_of_type(&self, prefix: &str) -> Vec<RecordedEvent> {
        self.recorded
            .read()
            .iter()
            .filter(|e| e.event_type.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Names of the events whose payload names `stage`.
    #[must_use]
    pub fn events_for_stage(&self, stage: &str) -> Vec<String> {
        self.recorded
            .read()
            .iter()
            .filter(|e| e.stage() == Some(stage))
            .map(|e| e.event_type.clone())
            .collect()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.record(event_type, data);
    }

    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.record(event_type, data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_noop_sink_accepts_anything() {
        let sink = NoOpEventSink;
        sink.emit("pipeline.persisted", None).await;
        sink.try_emit("stage.failed", Some(serde_json::json!({"stage": "clip"})));
    }

    #[tokio::test]
    async fn test_logging_sink() {
        let sink = LoggingEventSink::default();
        sink.emit("stage.succeeded", Some(serde_json::json!({"stage": "clip"}))).await;
        sink.emit(
            "batch.heartbeat",
            Some(serde_json::json!({"index": 2, "total": 9, "url": "u2", "elapsed": "1m00s"})),
        )
        .await;
        sink.try_emit("stage.failed", None);
    }

    #[test]
    fn test_payload_fields() {
        let data = serde_json::json!({"stage": "clip", "exit_code": 3, "detail": null});
        assert_eq!(text_field(Some(&data), "stage").as_deref(), Some("clip"));
        assert_eq!(text_field(Some(&data), "exit_code").as_deref(), Some("3"));
        assert_eq!(text_field(Some(&data), "detail"), None);
        assert_eq!(text_field(None, "stage"), None);
    }

    #[test]
    fn test_remaining_fields_skip_named_keys() {
        let stage = serde_json::json!({
            "stage": "clip",
            "status": "succeeded",
            "url": "u1",
            "artifact": "/tmp/c.mp4",
            "detail": null
        });
        assert_eq!(
            remaining_fields(Some(&stage)).as_deref(),
            Some(r#"{"artifact":"/tmp/c.mp4"}"#)
        );

        let started = serde_json::json!({"index": 1, "total": 3, "url": "u1"});
        assert_eq!(remaining_fields(Some(&started)), None);
        assert_eq!(remaining_fields(Some(&serde_json::Value::Null)), None);
        assert_eq!(remaining_fields(None), None);
    }

    #[test]
    fn test_logging_sink_escalates_problems() {
        let sink = LoggingEventSink::debug();
        assert_eq!(sink.level_for("stage.failed"), Level::WARN);
        assert_eq!(sink.level_for("stage.missing_input"), Level::WARN);
        assert_eq!(sink.level_for("stage.blocked"), Level::WARN);
        assert_eq!(sink.level_for("stage.succeeded"), Level::DEBUG);
        assert_eq!(LoggingEventSink::info().level_for("batch.heartbeat"), Level::INFO);
    }

    #[tokio::test]
    async fn test_collecting_sink_keeps_order() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit("pipeline.bootstrap", Some(serde_json::json!({"stage": "download"})))
            .await;
        sink.try_emit("pipeline.persisted", None);

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.event_types(), vec!["pipeline.bootstrap", "pipeline.persisted"]);
        assert_eq!(sink.events()[1].data, serde_json::Value::Null);
        assert_eq!(sink.events()[0].stage(), Some("download"));
    }

    #[tokio::test]
    async fn test_collecting_sink_filters() {
        let sink = CollectingEventSink::new();
        sink.emit("stage.skipped", Some(serde_json::json!({"stage": "clip"}))).await;
        sink.emit("stage.succeeded", Some(serde_json::json!({"stage": "watermark"}))).await;
        sink.emit("batch.heartbeat", Some(serde_json::json!({"index": 1}))).await;

        assert_eq!(sink.events_of_type("stage.").len(), 2);
        assert_eq!(sink.events_of_type("batch.")[0].data["index"], 1);
        assert_eq!(sink.events_for_stage("clip"), vec!["stage.skipped".to_string()]);

        sink.clear();
        assert!(sink.is_empty());
    }
}
