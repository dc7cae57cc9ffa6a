use std::io::{self, Write};
use std::time::Instant;

use camino::Utf8Path;
use serde::Serialize;

use crate::app::{
    ClearResult, EnrichResult, FetchResult, NetworkResult, ProgressEvent, ProgressSink,
    StatusResult,
};
use crate::enrich::EnrichmentRow;
use crate::error::MetseaError;
use crate::relate::SharedPair;
use crate::store::Store;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_fetch(result: &FetchResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_enrich(result: &EnrichResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_network(result: &NetworkResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_status(result: &StatusResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_clear(result: &ClearResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Prints progress lines to stderr for interactive runs, with seconds
/// since the sink was created when the event carries no timing.
pub struct ConsoleSink {
    started: Instant,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ConsoleSink {
    fn event(&self, event: ProgressEvent) {
        let elapsed = event.elapsed.unwrap_or_else(|| self.started.elapsed());
        eprintln!(
            "\x1b[2m[{:>5.1}s] {}\x1b[0m",
            elapsed.as_secs_f64(),
            event.message
        );
    }
}

pub fn write_enrichment_csv(path: &Utf8Path, rows: &[EnrichmentRow]) -> Result<(), MetseaError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(row)
            .map_err(|err| MetseaError::TableExport(err.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| MetseaError::TableExport(err.to_string()))?;
    Store::write_file_atomic(path, &bytes)
}

pub fn write_pairs_csv(path: &Utf8Path, pairs: &[SharedPair]) -> Result<(), MetseaError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for pair in pairs {
        writer
            .serialize(pair)
            .map_err(|err| MetseaError::TableExport(err.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| MetseaError::TableExport(err.to_string()))?;
    Store::write_file_atomic(path, &bytes)
}
