use crate::config::{LogFormat, QueueOverflow};
use anyhow::Context;
use encoding_rs_io::DecodeReaderBytes;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Read the config from the given path.
///
/// The file may be UTF-8 or UTF-16 and may carry a byte order mark.
pub fn read_config_file<P: AsRef<Path>>(path: P) -> anyhow::Result<ConfigFile> {
    let file = File::open(path.as_ref())
        .with_context(|| format!("config file not found: {}", path.as_ref().display()))?;
    let mut decoder = DecodeReaderBytes::new(BufReader::new(file));
    let mut dest = String::new();
    decoder
        .read_to_string(&mut dest)
        .with_context(|| format!("failed to read config file: {}", path.as_ref().display()))?;
    toml::from_str(&dest)
        .with_context(|| format!("invalid config file: {}", path.as_ref().display()))
}

#[derive(Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigFile {
    pub hosts: Option<Vec<String>>,
    pub probe_interval: Option<u64>,
    pub report_interval: Option<u64>,
    pub unprivileged: Option<bool>,
    pub history_size: Option<usize>,
    pub report_dir: Option<String>,
    pub influxdb: Option<ConfigInfluxDb>,
    pub log: Option<ConfigLog>,
}

#[derive(Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigInfluxDb {
    pub url: Option<String>,
    pub bucket: Option<String>,
    pub org: Option<String>,
    pub token: Option<String>,
    pub queue_capacity: Option<usize>,
    pub queue_overflow: Option<QueueOverflow>,
}

#[derive(Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigLog {
    pub format: Option<LogFormat>,
    pub filter: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_config_file() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            "hosts = [\"192.0.2.1\"]\nprobe-interval = 2\n\n[log]\nformat = \"json\"\n"
        )?;
        let cfg = read_config_file(file.path())?;
        assert_eq!(Some(vec![String::from("192.0.2.1")]), cfg.hosts);
        assert_eq!(Some(2), cfg.probe_interval);
        assert_eq!(Some(LogFormat::Json), cfg.log.and_then(|log| log.format));
        Ok(())
    }

    #[test]
    fn test_read_config_file_with_bom() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(b"\xef\xbb\xbfreport-interval = 120\n")?;
        let cfg = read_config_file(file.path())?;
        assert_eq!(Some(120), cfg.report_interval);
        Ok(())
    }

    #[test]
    fn test_read_config_file_utf16() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        let mut bytes = vec![0xff, 0xfe];
        for unit in "history-size = 32\n".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        file.write_all(&bytes)?;
        let cfg = read_config_file(file.path())?;
        assert_eq!(Some(32), cfg.history_size);
        Ok(())
    }

    #[test]
    fn test_missing_config_file() {
        let err = read_config_file("/nonexistent/redpress.toml").unwrap_err();
        assert_eq!(
            "config file not found: /nonexistent/redpress.toml",
            err.to_string()
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = toml::from_str::<ConfigFile>("hosts = []\nbogus = 1\n").unwrap_err();
        assert!(err.to_string().contains("unknown field `bogus`"));
    }

    #[test]
    fn test_influxdb_section() -> anyhow::Result<()> {
        let cfg: ConfigFile = toml::from_str(
            r#"
            [influxdb]
            url = "http://localhost:8086"
            bucket = "ping"
            org = "example"
            token = "secret"
            queue-overflow = "drop-oldest"
            "#,
        )?;
        let influxdb = cfg.influxdb.unwrap();
        assert_eq!(Some(String::from("ping")), influxdb.bucket);
        assert_eq!(Some(QueueOverflow::DropOldest), influxdb.queue_overflow);
        assert_eq!(None, influxdb.queue_capacity);
        Ok(())
    }
}
