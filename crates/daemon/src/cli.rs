// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line flags (§6), turned into an [`autophone_core::Config`].

use autophone_core::config::{LogLevel, WorkerTuning};
use autophone_core::{Config, EmailSettings};
use clap::Parser;
use std::net::UdpSocket;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "autophoned", about = "AutoPhone test-farm coordinator")]
pub struct Cli {
    /// Rejoin an already-populated fleet cache instead of starting empty.
    #[arg(long)]
    pub restarting: bool,

    /// Skip the reboot-before-install step on every job.
    #[arg(long)]
    pub no_reboot: bool,

    /// Callback address phones dial back to. Auto-detected from the default
    /// route if omitted.
    #[arg(long)]
    pub ipaddr: Option<String>,

    /// Command-server TCP port.
    #[arg(long, default_value_t = Config::DEFAULT_PORT)]
    pub port: u16,

    /// Fleet cache file.
    #[arg(long, default_value = "autophone_cache.json")]
    pub cache: PathBuf,

    /// Coordinator log file.
    #[arg(long, default_value = "autophone.log")]
    pub logfile: PathBuf,

    /// One of ERROR, WARNING, INFO, DEBUG.
    #[arg(long, default_value = "DEBUG")]
    pub loglevel: String,

    /// Test-plugin manifest.
    #[arg(long = "test-path", default_value = "tests/manifest.ini")]
    pub test_path: PathBuf,

    /// Email notification config.
    #[arg(long = "emailcfg", default_value = "email.ini")]
    pub emailcfg: PathBuf,
}

impl Cli {
    /// Builds the immutable [`Config`], resolving `--loglevel` and the
    /// auto-detected `--ipaddr`. A bad log level is the one flag-parsing
    /// failure the original treats as fatal before any other startup work
    /// (§6 "Exit codes: EINVAL on bad log level").
    pub fn into_config(self) -> Result<Config, crate::error::StartupError> {
        let loglevel: LogLevel = self.loglevel.parse()?;
        let ipaddr = self.ipaddr.unwrap_or_else(detect_local_ip);

        Ok(Config {
            restarting: self.restarting,
            reboot_phones: !self.no_reboot,
            ipaddr,
            port: self.port,
            cache_path: self.cache,
            logfile: self.logfile,
            loglevel,
            test_path: self.test_path,
            emailcfg_path: self.emailcfg,
            email: EmailSettings::default(),
            tuning: WorkerTuning::default(),
        })
    }
}

/// Finds the local address used to reach the public internet, without
/// actually sending anything: connecting a UDP socket only resolves a route.
/// Falls back to loopback if no route exists (e.g. in a sandboxed CI host).
fn detect_local_ip() -> String {
    UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect("8.8.8.8:80")?;
            socket.local_addr()
        })
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|_| "127.0.0.1".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_reboot_flag_inverts_default_reboot_phones() {
        let cli = Cli::parse_from(["autophoned", "--no-reboot"]);
        let config = cli.into_config().unwrap();
        assert!(!config.reboot_phones);
    }

    #[test]
    fn default_reboot_phones_is_true() {
        let cli = Cli::parse_from(["autophoned"]);
        let config = cli.into_config().unwrap();
        assert!(config.reboot_phones);
    }

    #[test]
    fn bad_loglevel_is_rejected() {
        let cli = Cli::parse_from(["autophoned", "--loglevel", "TRACE"]);
        assert!(cli.into_config().is_err());
    }

    #[test]
    fn explicit_ipaddr_is_not_overridden() {
        let cli = Cli::parse_from(["autophoned", "--ipaddr", "10.0.0.1"]);
        let config = cli.into_config().unwrap();
        assert_eq!(config.ipaddr, "10.0.0.1");
    }

    #[test]
    fn default_port_matches_config_default() {
        let cli = Cli::parse_from(["autophoned"]);
        assert_eq!(cli.port, Config::DEFAULT_PORT);
    }
}
