//! Variable-size transfer between two threads over an in-memory link.
//!
//! Run with:
//!   cargo run --example loopback-transfer
//!
//! The same exchange between two processes:
//!   cargo run --features cli -- recv out.bin --local /tmp/r.sock --peer /tmp/s.sock
//!   cargo run --features cli -- send in.bin --local /tmp/s.sock --peer /tmp/r.sock

use std::thread;

use ethlink::session::{Role, SessionConfig, TransferSession};
use ethlink::transport::MemoryLink;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (left, right) = MemoryLink::pair();
    let config = SessionConfig::default();

    let receiver = thread::spawn(move || -> Result<Vec<u8>, ethlink::session::SessionError> {
        let mut session = TransferSession::new(right, Role::Responder, config)?;
        let mut out = Vec::new();
        let report = session.recv_variable(&mut out)?;
        eprintln!(
            "receiver: {} bytes in {} chunks",
            report.bytes, report.chunks
        );
        Ok(out)
    });

    let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 256) as u8).collect();
    let mut sender = TransferSession::new(left, Role::Initiator, SessionConfig::default())?
        .with_progress(|p| eprintln!("sent chunk {}/{} ({} bytes)", p.chunk + 1, p.chunks, p.bytes));
    let report = sender.send_variable(&payload)?;
    eprintln!(
        "sender: {} bytes, {} mismatches, {} retries",
        report.bytes,
        report.mismatches,
        report.link.retries()
    );

    let received = receiver
        .join()
        .map_err(|_| "receiver thread panicked")??;
    assert_eq!(received, payload);
    Ok(())
}
