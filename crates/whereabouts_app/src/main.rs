//! Demo binary: runs the whereabouts aggregation at a sweep of pool
//! capacities and records each timed run through the JSON report sink.
mod logging;
mod sink;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use engine_logging::engine_info;
use whereabouts_engine::{Aggregator, ApiSettings, Capacity, ReqwestApi};

use crate::sink::JsonReportSink;

/// In-flight caps compared by the demo, fully sequential first.
const CAPACITIES: [usize; 7] = [1, 2, 5, 10, 15, 25, 50];

fn main() -> anyhow::Result<()> {
    logging::initialize(logging::LogDestination::Both);

    let api = ReqwestApi::new(ApiSettings::default()).context("building the api client")?;
    let runtime = tokio::runtime::Runtime::new().context("building the tokio runtime")?;
    let sink = JsonReportSink::new(PathBuf::from("./reports"));
    let aggregator = Aggregator::new(&api);

    for limit in CAPACITIES {
        let capacity = Capacity::limit(limit).context("capacity must be positive")?;
        run_once(&runtime, &aggregator, &sink, capacity)?;
    }
    // Baseline: submit everything at once and wait for the stragglers.
    run_once(&runtime, &aggregator, &sink, Capacity::Unbounded)?;

    Ok(())
}

fn run_once(
    runtime: &tokio::runtime::Runtime,
    aggregator: &Aggregator<'_>,
    sink: &JsonReportSink,
    capacity: Capacity,
) -> anyhow::Result<()> {
    let label = format!("aggregate-c{capacity}");
    let started = Instant::now();
    let reports = runtime
        .block_on(aggregator.aggregate(capacity))
        .with_context(|| format!("{label} failed"))?;
    let elapsed = started.elapsed();
    engine_info!(
        "{label} executed in {elapsed:?} ({} episodes)",
        reports.len()
    );
    sink.record(&label, capacity, elapsed, &reports)?;
    Ok(())
}
