use crate::config::LogFormat;
use clap::builder::Styles;
use clap::Parser;

/// Monitor the reachability and latency of a set of hosts
#[expect(clippy::doc_markdown)]
#[derive(Parser, Debug)]
#[command(name = "redpress", author, version, about, long_about = None, arg_required_else_help(true), styles=Styles::styled())]
pub struct Args {
    /// The TOML config file
    #[arg(value_name = "CONFIG", value_hint = clap::ValueHint::FilePath)]
    pub config_file: String,

    /// Probe using IPPROTO_ICMP datagram sockets without elevated privileges [default: false]
    #[arg(short = 'u', long)]
    pub unprivileged: bool,

    /// Log at debug level unless a log filter is given
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// The log format [default: compact]
    #[arg(value_enum, long)]
    pub log_format: Option<LogFormat>,

    /// The log filter directive [default: redpress=info]
    #[arg(long)]
    pub log_filter: Option<String>,
}
