use std::fs;

use ethlink_session::{Role, TransferSession};
use tracing::info;

use crate::cmd::{open_link, SendArgs};
use crate::exit::{io_error, session_error, CliResult, SUCCESS};
use crate::output::{print_reports, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let data = fs::read(&args.file)
        .map_err(|err| io_error(&format!("failed reading {}", args.file.display()), err))?;
    let config = args.session.load()?;
    let link = open_link(&args.link)?;

    let mut session = TransferSession::new(link, Role::Initiator, config)
        .map_err(|err| session_error("cannot start session", err))?;
    info!(file = %args.file.display(), size = data.len(), fixed = args.fixed, "sending");

    let report = if args.fixed {
        session.send_fixed(&data)
    } else {
        session.send_variable(&data)
    }
    .map_err(|err| session_error("send failed", err))?;

    print_reports(&[report], format);
    Ok(SUCCESS)
}
