use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use ethlink_session::{RetryPolicy, SessionConfig};
use ethlink_transport::{FrameTransport, MacAddr};

use crate::exit::{io_error, session_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod loopback;
pub mod recv;
pub mod send;
pub mod version;

/// Any link the CLI can open.
pub type DynLink = Box<dyn FrameTransport + Send>;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a file to the peer.
    Send(SendArgs),
    /// Receive a file from the peer.
    Recv(RecvArgs),
    /// Run a transfer between two in-process peers.
    Loopback(LoopbackArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Recv(args) => recv::run(args, format),
        Command::Loopback(args) => loopback::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct LinkArgs {
    /// Local socket path (unix datagram link).
    #[arg(long, value_name = "PATH", requires = "peer", conflicts_with = "iface")]
    pub local: Option<PathBuf>,
    /// Peer socket path (unix datagram link).
    #[arg(long, value_name = "PATH", requires = "local")]
    pub peer: Option<PathBuf>,
    /// Network interface (raw Ethernet link).
    #[arg(long, value_name = "NAME", requires_all = ["src_mac", "dst_mac"])]
    pub iface: Option<String>,
    /// Our MAC address (raw Ethernet link).
    #[arg(long, value_name = "MAC", requires = "iface")]
    pub src_mac: Option<MacAddr>,
    /// Peer MAC address (raw Ethernet link).
    #[arg(long, value_name = "MAC", requires = "iface")]
    pub dst_mac: Option<MacAddr>,
    /// Length of one timeout unit in milliseconds. Default: 1.
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub tick_ms: Option<u64>,
}

impl LinkArgs {
    fn tick(&self) -> Option<Duration> {
        self.tick_ms.map(Duration::from_millis)
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// Session config file (JSON).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Timeout for each receive attempt, in link units (see --tick-ms).
    #[arg(long, value_name = "UNITS")]
    pub timeout: Option<u32>,
    /// Give up after N attempts per receive. Default: retry forever.
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// File to send.
    pub file: PathBuf,
    /// Use the fixed-size protocol (the receiver must pass --size).
    #[arg(long)]
    pub fixed: bool,
    #[command(flatten)]
    pub link: LinkArgs,
    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Args, Debug)]
pub struct RecvArgs {
    /// Where to write the received payload.
    pub file: PathBuf,
    /// Expected size in bytes; selects the fixed-size protocol.
    #[arg(long, value_name = "BYTES")]
    pub size: Option<usize>,
    /// Wait at most UNITS for the sender, then exit 124 (fixed-size only).
    #[arg(long, value_name = "UNITS", requires = "size")]
    pub wait: Option<u32>,
    #[command(flatten)]
    pub link: LinkArgs,
    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Args, Debug)]
pub struct LoopbackArgs {
    /// Payload size in bytes.
    #[arg(long, value_name = "BYTES")]
    pub size: usize,
    /// Use the fixed-size protocol.
    #[arg(long)]
    pub fixed: bool,
    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

impl SessionArgs {
    /// Load `--config` and apply the flag overrides.
    pub fn load(&self) -> CliResult<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let json = fs::read_to_string(path).map_err(|err| {
                    io_error(&format!("failed reading {}", path.display()), err)
                })?;
                SessionConfig::from_json(&json)
                    .map_err(|err| session_error(&format!("{}", path.display()), err))?
            }
            None => SessionConfig::default(),
        };
        if let Some(timeout) = self.timeout {
            config.timeout_units = timeout;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.retry = RetryPolicy {
                max_attempts: Some(max_attempts),
                ..config.retry
            };
        }
        config
            .validate()
            .map_err(|err| session_error("invalid options", err))?;
        Ok(config)
    }
}

/// Open the link selected by `args`.
pub fn open_link(args: &LinkArgs) -> CliResult<DynLink> {
    if let (Some(local), Some(peer)) = (&args.local, &args.peer) {
        return open_datagram(local, peer, args.tick());
    }
    if let (Some(iface), Some(src), Some(dst)) = (&args.iface, args.src_mac, args.dst_mac) {
        return open_raw(iface, src, dst, args.tick());
    }
    Err(CliError::new(
        USAGE,
        "no link selected: pass --local/--peer or --iface/--src-mac/--dst-mac",
    ))
}

#[cfg(unix)]
fn open_datagram(
    local: &std::path::Path,
    peer: &std::path::Path,
    tick: Option<Duration>,
) -> CliResult<DynLink> {
    let mut link = ethlink_transport::DatagramLink::bind(local, peer)
        .map_err(|err| crate::exit::transport_error("cannot open datagram link", err))?;
    if let Some(tick) = tick {
        link = link.with_tick(tick);
    }
    Ok(Box::new(link))
}

#[cfg(not(unix))]
fn open_datagram(
    _local: &std::path::Path,
    _peer: &std::path::Path,
    _tick: Option<Duration>,
) -> CliResult<DynLink> {
    Err(CliError::new(
        USAGE,
        "the datagram link needs unix domain sockets",
    ))
}

#[cfg(target_os = "linux")]
fn open_raw(iface: &str, src: MacAddr, dst: MacAddr, tick: Option<Duration>) -> CliResult<DynLink> {
    let mut link = ethlink_transport::RawEthernetLink::open(iface, src, dst)
        .map_err(|err| crate::exit::transport_error("cannot open raw link", err))?;
    if let Some(tick) = tick {
        link = link.with_tick(tick);
    }
    Ok(Box::new(link))
}

#[cfg(not(target_os = "linux"))]
fn open_raw(
    _iface: &str,
    _src: MacAddr,
    _dst: MacAddr,
    _tick: Option<Duration>,
) -> CliResult<DynLink> {
    Err(CliError::new(USAGE, "the raw Ethernet link is Linux-only"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_file() {
        let dir = std::env::temp_dir().join(format!("ethlink-cfg-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("session.json");
        fs::write(
            &path,
            r#"{"timeout_units": 50, "retry": {"backoff": {"kind": "fixed", "delay_ms": 2}}}"#,
        )
        .unwrap();

        let args = SessionArgs {
            config: Some(path),
            timeout: None,
            max_attempts: Some(9),
        };
        let config = args.load().unwrap();
        assert_eq!(config.timeout_units, 50);
        assert_eq!(config.retry.max_attempts, Some(9));
        assert_eq!(
            config.retry.backoff,
            ethlink_session::Backoff::Fixed { delay_ms: 2 }
        );
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn invalid_override_is_usage_error() {
        let args = SessionArgs {
            timeout: Some(0),
            ..SessionArgs::default()
        };
        assert_eq!(args.load().unwrap_err().code, USAGE);
    }

    #[test]
    fn tick_flag_maps_to_duration() {
        let args = LinkArgs {
            tick_ms: Some(10),
            ..LinkArgs::default()
        };
        assert_eq!(args.tick(), Some(Duration::from_millis(10)));
        assert_eq!(LinkArgs::default().tick(), None);
    }

    #[test]
    fn missing_link_is_usage_error() {
        let err = open_link(&LinkArgs::default()).err().unwrap();
        assert_eq!(err.code, USAGE);
    }
}
