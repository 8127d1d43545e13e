use std::fs;

use ethlink_session::{RecvStatus, Role, TransferReport, TransferSession};
use tracing::{debug, info};

use crate::cmd::{open_link, DynLink, RecvArgs};
use crate::exit::{io_error, session_error, CliError, CliResult, DATA_INVALID, SUCCESS, TIMEOUT};
use crate::output::{print_reports, OutputFormat};

pub fn run(args: RecvArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.session.load()?;
    let link = open_link(&args.link)?;
    let mut session = TransferSession::new(link, Role::Responder, config)
        .map_err(|err| session_error("cannot start session", err))?;

    let (report, data) = match args.size {
        Some(size) => recv_fixed(&mut session, size, args.wait)?,
        None => {
            info!("waiting for sender");
            let mut data = Vec::new();
            let report = session
                .recv_variable(&mut data)
                .map_err(|err| session_error("receive failed", err))?;
            (report, data)
        }
    };

    fs::write(&args.file, &data)
        .map_err(|err| io_error(&format!("failed writing {}", args.file.display()), err))?;
    print_reports(&[report], format);
    Ok(SUCCESS)
}

/// With `wait`, give the sender one rendezvous window. Without it, keep
/// polling with the session timeout until the sender shows up.
fn recv_fixed(
    session: &mut TransferSession<DynLink>,
    size: usize,
    wait: Option<u32>,
) -> CliResult<(TransferReport, Vec<u8>)> {
    let mut data = vec![0u8; size];
    let window = wait.unwrap_or(session.config().timeout_units);
    info!(size, window, "waiting for sender");

    loop {
        let status = session
            .recv_fixed(&mut data, size, window)
            .map_err(|err| session_error("receive failed", err))?;
        match (status, wait) {
            (RecvStatus::Received(report), _) => return Ok((report, data)),
            (RecvStatus::NoData, Some(units)) => {
                return Err(CliError::new(
                    TIMEOUT,
                    format!("no sender within {units} units"),
                ));
            }
            (RecvStatus::InvalidCrc, Some(_)) => {
                return Err(CliError::new(
                    DATA_INVALID,
                    "rendezvous frame failed its checksum",
                ));
            }
            (status, None) => debug!(?status, "no sender yet"),
        }
    }
}
