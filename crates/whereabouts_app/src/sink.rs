use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use engine_logging::engine_debug;
use serde::Serialize;
use serde_json::json;
use whereabouts_engine::{AtomicFileWriter, Capacity};

/// Records each labeled run as `<label>.json` in the output directory,
/// wrapping the payload in a small envelope with the run parameters.
pub struct JsonReportSink {
    writer: AtomicFileWriter,
}

impl JsonReportSink {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir),
        }
    }

    pub fn record<T: Serialize>(
        &self,
        label: &str,
        capacity: Capacity,
        elapsed: Duration,
        payload: &T,
    ) -> anyhow::Result<PathBuf> {
        let envelope = json!({
            "label": label,
            "capacity": capacity.to_string(),
            "elapsed_ms": elapsed.as_millis() as u64,
            "generated_utc": Utc::now().to_rfc3339(),
            "result": payload,
        });
        let body = serde_json::to_string_pretty(&envelope)
            .with_context(|| format!("serializing {label}"))?;
        let path = self
            .writer
            .write(&format!("{label}.json"), &body)
            .with_context(|| format!("writing {label}"))?;
        engine_debug!("report written to {}", path.display());
        Ok(path)
    }
}
