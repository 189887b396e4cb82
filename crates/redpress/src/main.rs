#![warn(clippy::all, clippy::pedantic, clippy::nursery, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::option_if_let_else,
    clippy::missing_const_for_fn,
    clippy::cast_possible_truncation,
    clippy::redundant_pub_crate
)]
#![forbid(unsafe_code)]

use crate::config::{Args, RedpressConfig};
use crate::privilege::Privilege;
use clap::Parser;
use std::process;

mod app;
mod config;
mod export;
mod privilege;
mod report;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let privilege = Privilege::acquire_privileges()?;
    let pid = u16::try_from(process::id() % u32::from(u16::MAX))?;
    let cfg = RedpressConfig::from(args, &privilege)?;
    app::run_redpress(&cfg, pid)
}
