use std::thread;

use ethlink_session::{RecvStatus, Role, TransferReport, TransferSession};
use ethlink_transport::MemoryLink;
use tracing::info;

use crate::cmd::LoopbackArgs;
use crate::exit::{io_error, session_error, CliError, CliResult, DATA_INVALID, INTERNAL, SUCCESS};
use crate::output::{print_reports, OutputFormat};

pub fn run(args: LoopbackArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.session.load()?;
    let (left, right) = MemoryLink::pair();
    let mut sender = TransferSession::new(left, Role::Initiator, config.clone())
        .map_err(|err| session_error("cannot start sender", err))?;
    let mut receiver = TransferSession::new(right, Role::Responder, config)
        .map_err(|err| session_error("cannot start receiver", err))?;

    let payload = test_payload(args.size);
    let size = args.size;
    let fixed = args.fixed;
    info!(size, fixed, "loopback transfer");

    let responder = thread::Builder::new()
        .name("responder".to_string())
        .spawn(move || -> CliResult<(TransferReport, Vec<u8>)> {
            if fixed {
                let mut out = vec![0u8; size];
                let wait = receiver.config().timeout_units;
                loop {
                    match receiver
                        .recv_fixed(&mut out, size, wait)
                        .map_err(|err| session_error("receive failed", err))?
                    {
                        RecvStatus::Received(report) => return Ok((report, out)),
                        RecvStatus::NoData | RecvStatus::InvalidCrc => continue,
                    }
                }
            }
            let mut out = Vec::new();
            let report = receiver
                .recv_variable(&mut out)
                .map_err(|err| session_error("receive failed", err))?;
            Ok((report, out))
        })
        .map_err(|err| io_error("cannot spawn responder", err))?;

    let sent = if fixed {
        sender.send_fixed(&payload)
    } else {
        sender.send_variable(&payload)
    }
    .map_err(|err| session_error("send failed", err))?;

    let (received, out) = responder
        .join()
        .map_err(|_| CliError::new(INTERNAL, "responder thread panicked"))??;

    print_reports(&[sent.clone(), received], format);

    if out != payload {
        return Err(CliError::new(
            DATA_INVALID,
            "received payload differs from the one sent",
        ));
    }
    if sent.mismatches > 0 {
        return Err(CliError::new(
            DATA_INVALID,
            format!("{} echoed bytes differed", sent.mismatches),
        ));
    }
    Ok(SUCCESS)
}

/// Deterministic payload bytes.
fn test_payload(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_has_requested_size() {
        let payload = test_payload(3001);
        assert_eq!(payload.len(), 3001);
        assert_eq!(payload[251], 0);
        assert_eq!(payload[252], 1);
    }
}
