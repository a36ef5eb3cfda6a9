use crate::types::ScanReport;
use anyhow::{Context, Result};
use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::OffsetDateTime;

/// Default report file name for a target: `port_scan_10_0_0_1.txt`.
pub fn default_report_path(target: &str) -> PathBuf {
    PathBuf::from(format!("port_scan_{}.txt", target.replace('.', "_")))
}

/// `dd/mm/YYYY HH:MM:SS`, the date line used in rendered reports.
pub fn format_report_date(ts: OffsetDateTime) -> String {
    let fmt = format_description!("[day]/[month]/[year] [hour]:[minute]:[second]");
    ts.format(&fmt)
        .unwrap_or_else(|_| String::from("01/01/1970 00:00:00"))
}

/// `HH:MM:SS`, used on console banners and verbose lines.
pub fn format_clock(ts: OffsetDateTime) -> String {
    let fmt = format_description!("[hour]:[minute]:[second]");
    ts.format(&fmt).unwrap_or_else(|_| String::from("00:00:00"))
}

/// Render a plain-text document: target, date, open ports with service, OS guess.
pub fn render_text(report: &ScanReport) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_text(&mut out, report);
    out
}

fn write_text(out: &mut impl fmt::Write, report: &ScanReport) -> fmt::Result {
    writeln!(out, "Scan Report: {}", report.target)?;
    writeln!(out, "Date: {}", format_report_date(report.ended_at))?;
    if !report.complete {
        writeln!(out, "Status: incomplete (scan was cancelled)")?;
    }
    writeln!(out)?;
    writeln!(out, "Open Ports:")?;
    let mut any = false;
    for r in report.open_ports() {
        any = true;
        let service = r.service.as_deref().unwrap_or("unknown");
        writeln!(out, "  - Port {} ({})", r.port, service)?;
    }
    if !any {
        writeln!(out, "  (none)")?;
    }
    writeln!(out)?;
    writeln!(out, "System is likely {}", report.os_guess)
}

pub fn write_text_report(path: &Path, report: &ScanReport) -> Result<()> {
    fs::write(path, render_text(report))
        .with_context(|| format!("failed to write report to {}", path.display()))
}

pub fn write_json_report(path: &Path, report: &ScanReport) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, report)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OsGuess, PortResult};
    use std::time::Duration;
    use time::macros::datetime;

    fn sample() -> ScanReport {
        ScanReport {
            target: "10.0.0.5".into(),
            started_at: datetime!(2024-03-07 09:15:00 UTC),
            ended_at: datetime!(2024-03-07 09:15:42 UTC),
            results: vec![
                PortResult::open(22, Some("SSH"), Duration::from_millis(3)),
                PortResult::closed(80, Some("HTTP"), None),
                PortResult::open(111, Some("rpcbind"), Duration::from_millis(4)),
                PortResult::open(9999, None, Duration::from_millis(2)),
            ],
            os_guess: OsGuess::Linux,
            complete: true,
        }
    }

    #[test]
    fn default_path_replaces_dots() {
        assert_eq!(
            default_report_path("192.168.1.10"),
            PathBuf::from("port_scan_192_168_1_10.txt")
        );
    }

    #[test]
    fn date_format_is_day_first() {
        assert_eq!(
            format_report_date(datetime!(2024-03-07 09:15:42 UTC)),
            "07/03/2024 09:15:42"
        );
        assert_eq!(format_clock(datetime!(2024-03-07 09:15:42 UTC)), "09:15:42");
    }

    #[test]
    fn text_lists_only_open_ports() {
        let text = render_text(&sample());
        assert!(text.contains("Scan Report: 10.0.0.5"));
        assert!(text.contains("Date: 07/03/2024 09:15:42"));
        assert!(text.contains("Port 22 (SSH)"));
        assert!(text.contains("Port 111 (rpcbind)"));
        assert!(text.contains("Port 9999 (unknown)"));
        assert!(!text.contains("Port 80"));
        assert!(text.contains("System is likely linux"));
        assert!(!text.contains("incomplete"));
    }

    #[test]
    fn no_open_ports_says_none() {
        let mut report = sample();
        report.results.retain(|r| !r.is_open());
        report.os_guess = OsGuess::Unknown;
        let text = render_text(&report);
        assert!(text.contains("Open Ports:\n  (none)\n"));
        assert!(text.ends_with("System is likely unknown\n"));
    }

    #[test]
    fn partial_reports_are_marked() {
        let mut report = sample();
        report.complete = false;
        assert!(render_text(&report).contains("incomplete"));
    }
}
