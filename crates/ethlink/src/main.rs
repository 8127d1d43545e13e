mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "ethlink",
    version,
    about = "Reliable file transfer over a raw link-layer frame transport"
)]
struct Cli {
    /// Report format. Default: table on a terminal, JSON otherwise.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        env = "ETHLINK_LOG_LEVEL",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_send_over_datagram_link() {
        let cli = Cli::try_parse_from([
            "ethlink",
            "send",
            "payload.bin",
            "--local",
            "/tmp/a.sock",
            "--peer",
            "/tmp/b.sock",
            "--fixed",
        ])
        .expect("send args should parse");

        match cli.command {
            Command::Send(args) => {
                assert!(args.fixed);
                assert!(args.link.local.is_some());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_raw_link_macs() {
        let cli = Cli::try_parse_from([
            "ethlink",
            "recv",
            "out.bin",
            "--iface",
            "eth0",
            "--src-mac",
            "01606e11020f",
            "--dst-mac",
            "01:60:6e:11:02:10",
        ])
        .expect("raw link args should parse");

        match cli.command {
            Command::Recv(args) => {
                assert_eq!(args.link.iface.as_deref(), Some("eth0"));
                assert_eq!(
                    args.link.dst_mac.map(|m| m.to_string()).as_deref(),
                    Some("01:60:6e:11:02:10")
                );
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_mixed_links() {
        let err = Cli::try_parse_from([
            "ethlink",
            "send",
            "f",
            "--local",
            "/tmp/a.sock",
            "--peer",
            "/tmp/b.sock",
            "--iface",
            "eth0",
            "--src-mac",
            "01606e11020f",
            "--dst-mac",
            "01606e110210",
        ])
        .expect_err("two links should conflict");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn rejects_bad_mac() {
        assert!(Cli::try_parse_from([
            "ethlink", "send", "f", "--iface", "eth0", "--src-mac", "zz", "--dst-mac", "01606e110210",
        ])
        .is_err());
    }

    #[test]
    fn tick_must_be_positive() {
        let base = [
            "ethlink", "recv", "out.bin", "--local", "/tmp/a.sock", "--peer", "/tmp/b.sock",
        ];
        let cli = Cli::try_parse_from(base.iter().copied().chain(["--tick-ms", "5"]))
            .expect("tick should parse");
        match cli.command {
            Command::Recv(args) => assert_eq!(args.link.tick_ms, Some(5)),
            other => panic!("unexpected command {other:?}"),
        }

        assert!(Cli::try_parse_from(base.iter().copied().chain(["--tick-ms", "0"])).is_err());
    }

    #[test]
    fn wait_requires_size() {
        let err = Cli::try_parse_from([
            "ethlink",
            "recv",
            "out.bin",
            "--local",
            "/tmp/a.sock",
            "--peer",
            "/tmp/b.sock",
            "--wait",
            "10",
        ])
        .expect_err("--wait without --size should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
