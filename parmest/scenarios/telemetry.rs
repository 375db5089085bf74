use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::Result;
use serde_json::Value;
use shared_logging::{JsonLogger, LogLevel, LogRecord, LogSink};

/// Telemetry builder for scenario generation.
pub struct ScenarioTelemetryBuilder {
    module: String,
    log_path: Option<PathBuf>,
    sink: Option<Arc<dyn LogSink>>,
}

impl ScenarioTelemetryBuilder {
    /// Creates a new builder scoped to a module label.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            log_path: None,
            sink: None,
        }
    }

    /// Writes JSON lines to this path.
    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Uses an existing sink. Takes precedence over `log_path`.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Builds telemetry.
    pub fn build(self) -> Result<ScenarioTelemetry> {
        let sink: Option<Arc<dyn LogSink>> = match (self.sink, self.log_path) {
            (Some(sink), _) => Some(sink),
            (None, Some(path)) => Some(Arc::new(JsonLogger::new(path)?)),
            (None, None) => None,
        };
        Ok(ScenarioTelemetry {
            inner: Arc::new(TelemetryInner {
                module: self.module,
                sink,
            }),
        })
    }
}

/// Telemetry handle shared across scenario components.
///
/// Every record is mirrored to `tracing`; the JSON sink is optional.
#[derive(Clone)]
pub struct ScenarioTelemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for ScenarioTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioTelemetry")
            .field("module", &self.inner.module)
            .field("sink", &self.inner.sink.is_some())
            .finish()
    }
}

struct TelemetryInner {
    module: String,
    sink: Option<Arc<dyn LogSink>>,
}

impl ScenarioTelemetry {
    /// Returns a builder.
    #[must_use]
    pub fn builder(module: impl Into<String>) -> ScenarioTelemetryBuilder {
        ScenarioTelemetryBuilder::new(module)
    }

    /// Module label.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.inner.module
    }

    /// Logs an event with JSON metadata.
    pub fn log(&self, level: LogLevel, message: &str, metadata: Value) -> Result<()> {
        let module = self.inner.module.as_str();
        match level {
            LogLevel::Debug => tracing::debug!(module, %metadata, "{message}"),
            LogLevel::Info => tracing::info!(module, %metadata, "{message}"),
            LogLevel::Warn => tracing::warn!(module, %metadata, "{message}"),
            LogLevel::Error => tracing::error!(module, %metadata, "{message}"),
        }
        if let Some(sink) = &self.inner.sink {
            sink.log(&LogRecord::new(module, level, message).with_metadata(&metadata))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared_logging::{read_records, MemoryLogger};
    use tempfile::tempdir;

    #[test]
    fn telemetry_writes_json_log() {
        let tmp = tempdir().unwrap();
        let log_path = tmp.path().join("scen.log");
        let telemetry = ScenarioTelemetry::builder("scenarios")
            .log_path(&log_path)
            .build()
            .unwrap();
        telemetry
            .log(LogLevel::Info, "scenarios.export.written", json!({ "rows": 2 }))
            .unwrap();
        let records = read_records(&log_path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].module, "scenarios");
        assert_eq!(records[0].metadata["rows"], json!(2));
    }

    #[test]
    fn explicit_sink_wins_over_path() {
        let tmp = tempdir().unwrap();
        let memory = Arc::new(MemoryLogger::new());
        let telemetry = ScenarioTelemetry::builder("scenarios")
            .log_path(tmp.path().join("unused.log"))
            .sink(memory.clone())
            .build()
            .unwrap();
        telemetry.log(LogLevel::Warn, "w", json!({})).unwrap();
        assert_eq!(memory.messages(), vec!["w"]);
        assert!(!tmp.path().join("unused.log").exists());
    }

    #[test]
    fn telemetry_without_sink_is_silent() {
        let telemetry = ScenarioTelemetry::builder("quiet").build().unwrap();
        assert!(telemetry.log(LogLevel::Error, "x", Value::Null).is_ok());
    }
}
