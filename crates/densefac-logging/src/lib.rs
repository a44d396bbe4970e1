//! Logging setup for densefac.
//!
//! [`init_logging`] installs the process subscriber: an `EnvFilter`, a bridge layer that turns
//! every event into a [`RuntimeLogRecord`] for the optional process hook, and an optional
//! human-readable stderr layer. [`capture_logs`] runs a closure under a scoped subscriber that
//! records everything, which is what tests use to observe pipeline stages.

use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::{Arc, Mutex};
use tracing::subscriber::DefaultGuard;
use tracing::Subscriber;
use tracing_log::LogTracer;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// Environment variable consulted after `RUST_LOG`.
pub const LOG_ENV: &str = "DENSEFAC_LOG";

#[derive(Debug, Clone, Serialize)]
pub struct RuntimeLogRecord {
    pub ts: String,
    pub level: String,
    pub target: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<JsonValue>,
}

impl RuntimeLogRecord {
    /// Look up a structured field recorded on the event.
    pub fn field(&self, name: &str) -> Option<&JsonValue> {
        self.fields.as_ref().and_then(|f| f.get(name))
    }

    /// String form of a field, if present.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(JsonValue::as_str)
    }
}

type LogHook = Arc<dyn Fn(&RuntimeLogRecord) + Send + Sync>;

static LOG_HOOK: OnceCell<LogHook> = OnceCell::new();

pub struct LoggingGuard {
    _guard: Option<DefaultGuard>,
}

#[derive(Debug, Clone, Default)]
pub struct LoggingOptions {
    /// Filter directive used when neither `RUST_LOG` nor `DENSEFAC_LOG` is set.
    pub level: Option<String>,
    /// Also write formatted events to stderr.
    pub stderr: bool,
}

pub fn set_runtime_log_hook<F>(hook: F)
where
    F: Fn(&RuntimeLogRecord) + Send + Sync + 'static,
{
    let _ = LOG_HOOK.set(Arc::new(hook));
}

pub fn init_logging(opts: LoggingOptions) -> LoggingGuard {
    // Install LogTracer so log:: macros flow into tracing
    let _ = LogTracer::init();

    let fallback = opts.level.clone().unwrap_or_else(|| "info".to_string());
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env(LOG_ENV))
        .or_else(|_| EnvFilter::try_new(&fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let build_subscriber = || {
        let stderr_layer = opts.stderr.then(|| {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
        });
        tracing_subscriber::registry()
            .with(env_filter.clone())
            .with(LogBridgeLayer)
            .with(stderr_layer)
    };

    let guard = match tracing::subscriber::set_global_default(build_subscriber()) {
        Ok(()) => None,
        Err(_) => Some(tracing::subscriber::set_default(build_subscriber())),
    };

    LoggingGuard { _guard: guard }
}

/// Run `f` with a thread-scoped subscriber that records every event at every level, and return
/// the closure's result together with the captured records.
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, Vec<RuntimeLogRecord>) {
    let _ = LogTracer::init();
    let sink = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(CaptureLayer { sink: sink.clone() });
    let out = tracing::subscriber::with_default(subscriber, f);
    let records = match sink.lock() {
        Ok(mut guard) => std::mem::take(&mut *guard),
        Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
    };
    (out, records)
}

struct LogBridgeLayer;

struct CaptureLayer {
    sink: Arc<Mutex<Vec<RuntimeLogRecord>>>,
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn build_record<S>(event: &tracing::Event<'_>, ctx: &Context<'_, S>) -> RuntimeLogRecord
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let mut visitor = JsonVisitor::default();
    event.record(&mut visitor);

    let current = ctx.event_span(event);
    RuntimeLogRecord {
        ts: now_rfc3339(),
        level: event.metadata().level().to_string(),
        target: event.metadata().target().to_string(),
        message: visitor
            .message
            .unwrap_or_else(|| event.metadata().name().to_string()),
        span: current.as_ref().map(|span| span.name().to_string()),
        span_id: current.as_ref().map(|span| span.id().into_u64().to_string()),
        fields: visitor
            .fields
            .filter(|obj| obj.as_object().map(|m| !m.is_empty()).unwrap_or(false)),
    }
}

impl<S> Layer<S> for LogBridgeLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, ctx: Context<'_, S>) {
        if let Some(hook) = LOG_HOOK.get() {
            hook(&build_record(event, &ctx));
        }
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, ctx: Context<'_, S>) {
        let record = build_record(event, &ctx);
        if let Ok(mut sink) = self.sink.lock() {
            sink.push(record);
        }
    }
}

#[derive(Default)]
struct JsonVisitor {
    message: Option<String>,
    fields: Option<JsonValue>,
}

impl JsonVisitor {
    fn insert(&mut self, field: &tracing::field::Field, entry: JsonValue) {
        let obj = self
            .fields
            .get_or_insert_with(|| JsonValue::Object(Default::default()));
        if let JsonValue::Object(map) = obj {
            map.insert(field.name().to_string(), entry);
        }
    }
}

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = Some(rendered);
        } else {
            self.insert(field, JsonValue::String(rendered));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.insert(field, JsonValue::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.insert(field, JsonValue::from(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.insert(field, JsonValue::from(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.insert(field, JsonValue::from(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{info, trace};

    #[test]
    fn log_hook_receives_record() {
        let captured: Arc<Mutex<Vec<RuntimeLogRecord>>> = Arc::new(Mutex::new(Vec::new()));
        let hook = {
            let c = captured.clone();
            move |rec: &RuntimeLogRecord| {
                c.lock().unwrap().push(rec.clone());
            }
        };
        set_runtime_log_hook(hook);
        let _guard = init_logging(LoggingOptions {
            level: Some("info".to_string()),
            stderr: false,
        });

        info!("hello world");

        let items = captured.lock().unwrap();
        assert!(!items.is_empty());
        assert!(items.iter().any(|r| r.message.contains("hello world")));
    }

    #[test]
    fn capture_records_fields_and_span() {
        let ((), records) = capture_logs(|| {
            let span = tracing::info_span!("qr", m = 3_u64);
            let _enter = span.enter();
            trace!(stage = "packed", lwork = -1_i64, "stage transition");
        });
        let rec = records
            .iter()
            .find(|r| r.message == "stage transition")
            .unwrap();
        assert_eq!(rec.level, "TRACE");
        assert_eq!(rec.span.as_deref(), Some("qr"));
        assert_eq!(rec.field_str("stage"), Some("packed"));
        assert_eq!(rec.field("lwork"), Some(&JsonValue::from(-1_i64)));
    }
}
