use ethlink_frame::{pad_frame, ChunkPlan};
use ethlink_transport::FrameTransport;
use tracing::{debug, warn};

use crate::error::Result;
use crate::retry::{receive_until, Stage};
use crate::session::{ChunkOutcome, Progress, SessionState, TransferSession};

impl<T: FrameTransport> TransferSession<T> {
    /// Send `data[..total]` chunk by chunk, waiting for each echo.
    ///
    /// Only the receive is retried; a chunk is transmitted once. Echo bytes
    /// that differ from the chunk are counted but never resent.
    pub(crate) fn send_chunks(&mut self, data: &[u8], total: usize) -> Result<ChunkOutcome> {
        let plan = ChunkPlan::new(total, self.config.frame.max_chunk);
        let chunks = plan.chunk_count();
        let min_frame = self.config.frame.min_frame;
        let mut outcome = ChunkOutcome::default();

        for chunk in plan.chunks() {
            self.state = SessionState::Transferring { chunk: chunk.index };
            let payload = &data[chunk.range()];
            let frame = pad_frame(payload, min_frame, &mut self.scratch.pad);
            self.transport.transmit(frame)?;

            let mut retrier = self.config.retry.start(Stage::Chunk(chunk.index));
            let echo = &mut self.scratch.rx[..chunk.len];
            receive_until(
                &mut self.transport,
                echo,
                chunk.len,
                false,
                self.config.timeout_units,
                &mut retrier,
                &mut self.stats,
            )?;

            let mismatches = payload
                .iter()
                .zip(echo.iter())
                .filter(|(sent, back)| sent != back)
                .count() as u64;
            if mismatches > 0 {
                debug!(chunk = chunk.index, mismatches, "echo differs from chunk");
            }

            outcome.mismatches += mismatches;
            outcome.bytes += chunk.len;
            outcome.chunks += 1;
            self.report_progress(Progress {
                chunk: chunk.index,
                chunks,
                bytes: outcome.bytes,
                total,
            });
        }

        if outcome.mismatches > 0 {
            warn!(
                mismatches = outcome.mismatches,
                bytes = outcome.bytes,
                "echoes did not match the data sent"
            );
        }
        Ok(outcome)
    }

    /// Receive `total` bytes into `out` chunk by chunk, echoing each one.
    ///
    /// A chunk shorter than `min_frame` arrives zero-padded, so a frame with
    /// the filler marker in its place is a duplicate announcement and is
    /// skipped.
    pub(crate) fn recv_chunks(&mut self, out: &mut [u8], total: usize) -> Result<ChunkOutcome> {
        let plan = ChunkPlan::new(total, self.config.frame.max_chunk);
        let chunks = plan.chunk_count();
        let min_frame = self.config.frame.min_frame;
        let mut outcome = ChunkOutcome::default();

        for chunk in plan.chunks() {
            self.state = SessionState::Transferring { chunk: chunk.index };
            let mut retrier = self.config.retry.start(Stage::Chunk(chunk.index));
            receive_until(
                &mut self.transport,
                &mut self.scratch.rx[..chunk.len.max(min_frame)],
                chunk.len,
                chunk.len < min_frame,
                self.config.timeout_units,
                &mut retrier,
                &mut self.stats,
            )?;
            let slot = &mut out[chunk.range()];
            slot.copy_from_slice(&self.scratch.rx[..chunk.len]);

            let echo = pad_frame(slot, min_frame, &mut self.scratch.pad);
            self.transport.transmit(echo)?;

            outcome.bytes += chunk.len;
            outcome.chunks += 1;
            self.report_progress(Progress {
                chunk: chunk.index,
                chunks,
                bytes: outcome.bytes,
                total,
            });
        }
        Ok(outcome)
    }
}
