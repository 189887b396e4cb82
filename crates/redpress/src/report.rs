use anyhow::Context;
use redpress_core::{unix_secs, IoError, IoOperation, ReportRecord, ReportSink};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Writes one tab separated line per report record.
///
/// The address is quoted and every other column is an integer:
///
/// ```text
/// "192.0.2.1"	1700000000	1700000060	60	58	1	1
/// ```
pub struct TsvReportSink<W: io::Write> {
    writer: csv::Writer<W>,
    path: Option<PathBuf>,
}

impl TsvReportSink<File> {
    /// Create `redpress-<started>.tsv` in `dir`, appending if it already exists.
    pub fn create<P: AsRef<Path>>(dir: P, started: SystemTime) -> anyhow::Result<Self> {
        let path = dir
            .as_ref()
            .join(format!("redpress-{}.tsv", unix_secs(started)));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to create report file: {}", path.display()))?;
        Ok(Self {
            path: Some(path),
            ..Self::new(file)
        })
    }
}

impl<W: io::Write> TsvReportSink<W> {
    pub fn new(writer: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(csv::QuoteStyle::NonNumeric)
            .has_headers(false)
            .from_writer(writer);
        Self { writer, path: None }
    }

    /// The report file path, if writing to a file.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn write_row(&mut self, record: &ReportRecord) -> io::Result<()> {
        self.writer.serialize(TsvRow::from(record))?;
        self.writer.flush()
    }
}

impl<W: io::Write + Send> ReportSink for TsvReportSink<W> {
    fn write_record(&mut self, record: &ReportRecord) -> redpress_core::Result<()> {
        self.write_row(record)
            .map_err(|err| IoError::Other(err, IoOperation::WriteReport))?;
        Ok(())
    }
}

#[derive(Serialize)]
struct TsvRow {
    addr: IpAddr,
    window_start: u64,
    window_end: u64,
    sent: u64,
    recv_in_order: u64,
    recv_out_of_order: u64,
    lost: i64,
}

impl From<&ReportRecord> for TsvRow {
    fn from(record: &ReportRecord) -> Self {
        Self {
            addr: record.addr,
            window_start: unix_secs(record.window_start),
            window_end: unix_secs(record.window_end),
            sent: record.sent,
            recv_in_order: record.recv_in_order,
            recv_out_of_order: record.recv_out_of_order,
            lost: record.lost,
        }
    }
}
