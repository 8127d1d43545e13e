use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use ethlink_session::TransferReport;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Print one report per line (JSON) or one row per report (table).
pub fn print_reports(reports: &[TransferReport], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for report in reports {
                println!(
                    "{}",
                    serde_json::to_string(report).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => println!("{}", report_table(reports)),
        OutputFormat::Pretty => {
            for report in reports {
                println!("{}", pretty_line(report));
            }
        }
    }
}

fn report_table(reports: &[TransferReport]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "DIRECTION",
            "ROLE",
            "BYTES",
            "CHUNKS",
            "MISMATCHES",
            "HANDSHAKE",
            "TIMEOUTS",
            "BAD FCS",
            "STALE",
            "ELAPSED",
        ]);
    for report in reports {
        table.add_row(vec![
            report.direction.to_string(),
            report.role.to_string(),
            format!("{}/{}", report.bytes, report.total_size),
            report.chunks.to_string(),
            report.mismatches.to_string(),
            report.handshake_attempts.to_string(),
            report.link.timeouts.to_string(),
            report.link.checksum_failures.to_string(),
            report.link.stale_frames.to_string(),
            format!("{} ms", report.elapsed_ms),
        ]);
    }
    table
}

fn pretty_line(report: &TransferReport) -> String {
    format!(
        "{} as {}: {}/{} bytes in {} chunks, {} mismatches, {} retries, {} ms",
        report.direction,
        report.role,
        report.bytes,
        report.total_size,
        report.chunks,
        report.mismatches,
        report.link.retries(),
        report.elapsed_ms
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethlink_session::{Direction, LinkStats, Role};

    fn report() -> TransferReport {
        TransferReport {
            direction: Direction::Receive,
            role: Role::Responder,
            total_size: 3000,
            bytes: 3000,
            chunks: 2,
            mismatches: 0,
            handshake_attempts: 1,
            link: LinkStats {
                timeouts: 4,
                checksum_failures: 1,
                stale_frames: 0,
            },
            elapsed_ms: 12,
        }
    }

    #[test]
    fn pretty_line_summarizes() {
        assert_eq!(
            pretty_line(&report()),
            "receive as responder: 3000/3000 bytes in 2 chunks, 0 mismatches, 5 retries, 12 ms"
        );
    }

    #[test]
    fn table_has_a_row_per_report() {
        let table = report_table(&[report(), report()]);
        assert_eq!(table.row_iter().count(), 2);
        assert!(table.to_string().contains("3000/3000"));
    }
}
