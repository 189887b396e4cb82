use crate::config::InfluxDbConfig;
use anyhow::Context;
use crossbeam::channel::{Receiver, RecvTimeoutError};
use redpress_core::Sample;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::instrument;

/// The maximum number of lines posted in one write.
const MAX_BATCH_LINES: usize = 500;

/// The maximum time a line waits before its batch is posted.
const FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// The timeout for a single write request.
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// A destination for batches of line protocol.
pub trait LineWriter: Send {
    fn write_lines(&mut self, body: String) -> anyhow::Result<()>;
}

/// Writes line protocol to the `InfluxDB` v2 write API.
pub struct InfluxDbWriter {
    client: reqwest::blocking::Client,
    endpoint: String,
    org: String,
    bucket: String,
    token: String,
}

impl InfluxDbWriter {
    pub fn new(cfg: &InfluxDbConfig) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(WRITE_TIMEOUT)
            .build()
            .context("failed to create InfluxDB client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/v2/write", cfg.url.trim_end_matches('/')),
            org: cfg.org.clone(),
            bucket: cfg.bucket.clone(),
            token: cfg.token.clone(),
        })
    }
}

impl LineWriter for InfluxDbWriter {
    #[instrument(skip_all, level = "trace")]
    fn write_lines(&mut self, body: String) -> anyhow::Result<()> {
        self.client
            .post(&self.endpoint)
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "ms"),
            ])
            .header(AUTHORIZATION, format!("Token {}", self.token))
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body)
            .send()?
            .error_for_status()?;
        Ok(())
    }
}

/// Drain `samples` on a new thread, posting them to `writer` in batches.
///
/// The thread exits once every sender of `samples` has been dropped and the
/// final batch has been written.
pub fn spawn<W: LineWriter + 'static>(
    samples: Receiver<Sample>,
    writer: W,
    source: String,
) -> anyhow::Result<JoinHandle<()>> {
    let exporter = Exporter {
        samples,
        writer,
        source,
        batch: Vec::with_capacity(MAX_BATCH_LINES),
    };
    thread::Builder::new()
        .name(String::from("redpress-export"))
        .spawn(move || exporter.run())
        .context("failed to spawn export thread")
}

struct Exporter<W> {
    samples: Receiver<Sample>,
    writer: W,
    source: String,
    batch: Vec<String>,
}

impl<W: LineWriter> Exporter<W> {
    fn run(mut self) {
        let mut deadline = Instant::now() + FLUSH_INTERVAL;
        loop {
            let timeout = deadline.saturating_duration_since(Instant::now());
            match self.samples.recv_timeout(timeout) {
                Ok(sample) => {
                    self.batch.push(render(&sample, &self.source));
                    if self.batch.len() >= MAX_BATCH_LINES {
                        self.flush();
                        deadline = Instant::now() + FLUSH_INTERVAL;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    self.flush();
                    deadline = Instant::now() + FLUSH_INTERVAL;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.flush();
                    tracing::debug!("sample queue closed, exporter stopped");
                    return;
                }
            }
        }
    }

    fn flush(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        let lines = self.batch.len();
        let body = self.batch.join("\n");
        self.batch.clear();
        match self.writer.write_lines(body) {
            Ok(()) => tracing::debug!(lines, "exported batch"),
            Err(err) => tracing::warn!(lines, error = %err, "failed to export batch, discarded"),
        }
    }
}

/// Render a sample as a single line of `InfluxDB` line protocol.
fn render(sample: &Sample, source: &str) -> String {
    match sample {
        Sample::Reach(reach) => {
            format!(
                "reach,host={},source={} send={}i,recv={}i,delayed={}i,lost={}i {}",
                escape_tag(&reach.host.to_string()),
                escape_tag(source),
                reach.send,
                reach.recv,
                reach.delayed,
                reach.lost,
                unix_millis(reach.time)
            )
        }
        Sample::Rtt(rtt) => {
            format!(
                "rtt,host={},source={} rtt={}i {}",
                escape_tag(&rtt.host.to_string()),
                escape_tag(source),
                rtt.rtt.as_millis(),
                unix_millis(rtt.time)
            )
        }
    }
}

/// Escape commas, equals signs and spaces in a tag value.
fn escape_tag(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | '=' | ' ') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn unix_millis(time: SystemTime) -> u128 {
    time.duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis())
}
