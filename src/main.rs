use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use hostprobe_rs::scanner::{self, ScanConfig, DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT_MS};
use hostprobe_rs::types::{PortResult, PortState, ScanReport};
use hostprobe_rs::{catalog, ports, report, ScanError};

use anyhow::Result;
use clap::Parser;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// hostprobe-rs — async TCP connect port scanner with service labels and an OS guess.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "hostprobe-rs",
    version,
    about = "Async TCP connect port scanner with service labels and a port-based OS guess.",
    long_about = "Scans every port 0-65535 unless -p, -r or --ports-file narrows the set."
)]
struct Cli {
    /// Target IP address or hostname.
    #[arg(required_unless_present = "list_services")]
    target: Option<String>,

    /// Scan a single port.
    #[arg(short = 'p', long, conflicts_with_all = ["range", "ports_file"])]
    port: Option<String>,

    /// Inclusive range `start-end`; comma lists like `22,80,8000-8010` also work.
    #[arg(short = 'r', long, conflicts_with = "ports_file")]
    range: Option<String>,

    /// Path to ports list file (one port or range per line).
    #[arg(long = "ports-file")]
    ports_file: Option<PathBuf>,

    /// Time-stamp console lines and show service labels.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Write a plain-text report; defaults to port_scan_<target>.txt when no path is given.
    #[arg(long)]
    report: Option<Option<PathBuf>>,

    /// Write the full results as pretty JSON to this path.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Socket connect timeout in milliseconds.
    #[arg(long = "timeout-ms", default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Max concurrent TCP connect attempts.
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Print the well-known service table and exit.
    #[arg(long = "list-services", default_value_t = false)]
    list_services: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.list_services {
        for (port, name) in catalog::entries() {
            println!("{port:>5}  {name}");
        }
        return ExitCode::SUCCESS;
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            let code = e
                .downcast_ref::<ScanError>()
                .map(ScanError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

/// Log filter used when `RUST_LOG` is unset.
fn default_log_filter(verbose: bool) -> &'static str {
    if verbose {
        "warn,hostprobe_rs=debug"
    } else {
        "warn"
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_filter(verbose)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let target = cli.target.clone().unwrap_or_default();
    let ports = requested_ports(&cli)?;
    let config = ScanConfig::new(Duration::from_millis(cli.timeout_ms), cli.concurrency);
    config.validate()?;

    // Ctrl-C cancels the scan; the partial report is still printed.
    let cancel = CancellationToken::new();
    let cancel_ctrlc = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_ctrlc.cancel();
        }
    });

    let (tx, mut rx) = mpsc::unbounded_channel::<PortResult>();
    let verbose = cli.verbose;
    let single = ports.len() == 1;
    let printer = tokio::spawn(async move {
        while let Some(res) = rx.recv().await {
            print_port_line(&res, verbose, single);
        }
    });

    println!("Starting scan: {}", report::format_clock(OffsetDateTime::now_utc()));
    println!("{}", "-".repeat(50));
    let scanned = scanner::scan_with_observer(&target, &ports, config, cancel, tx).await;
    let _ = printer.await;
    let scan_report = scanned?;

    print_summary(&scan_report);

    if let Some(path) = &cli.report {
        let path = path
            .clone()
            .unwrap_or_else(|| report::default_report_path(&scan_report.target));
        report::write_text_report(&path, &scan_report)?;
        println!("\n[+] Report generated: {}", path.display());
    }
    if let Some(path) = &cli.json {
        report::write_json_report(path, &scan_report)?;
        println!("[+] Wrote JSON results to {}", path.display());
    }

    if !scan_report.complete {
        println!("\nExiting.");
        return Ok(ExitCode::from(ScanError::Cancelled.exit_code()));
    }
    Ok(ExitCode::SUCCESS)
}

fn requested_ports(cli: &Cli) -> std::result::Result<Vec<u16>, ScanError> {
    if let Some(p) = cli.port.as_deref() {
        return Ok(vec![ports::parse_port(p)?]);
    }
    if let Some(r) = cli.range.as_deref() {
        return ports::parse_port_spec(r);
    }
    if let Some(path) = cli.ports_file.as_deref() {
        return ports::load_ports_from_path(path).map_err(|e| ScanError::invalid(format!("{e:#}")));
    }
    Ok(ports::full_range())
}

fn print_port_line(res: &PortResult, verbose: bool, single: bool) {
    let stamp = verbose.then(|| report::format_clock(OffsetDateTime::now_utc()));
    if let Some(line) = port_line(res, stamp.as_deref(), verbose, single) {
        println!("{line}");
    }
}

/// Console line for one result, `None` when the result is not worth a line.
///
/// Open ports always print. Closed ports and probe errors only print when a
/// single port was requested; errors also print in verbose mode.
fn port_line(res: &PortResult, stamp: Option<&str>, verbose: bool, single: bool) -> Option<String> {
    let stamp = stamp.map(|s| format!("[{s}] ")).unwrap_or_default();
    let line = match res.state {
        PortState::Open if verbose => format!(
            "{stamp}[+] {} ({}) Open",
            res.port,
            res.service.as_deref().unwrap_or("unknown")
        ),
        PortState::Open => format!("{stamp}[+] {} Open", res.port),
        PortState::Closed if single => format!("{stamp}[-] {} Closed", res.port),
        PortState::Error if verbose || single => format!(
            "{stamp}[!] {} Error: {}",
            res.port,
            res.error.as_deref().unwrap_or("unknown error")
        ),
        _ => return None,
    };
    Some(line)
}

fn print_summary(scan_report: &ScanReport) {
    let errors = scan_report
        .results
        .iter()
        .filter(|r| r.state == PortState::Error)
        .count();
    println!("{}", "-".repeat(50));
    println!("Ending scan: {}", report::format_clock(scan_report.ended_at));
    println!(
        "Open ports: {} (probed: {}, errors: {}, elapsed: {} ms)",
        scan_report.open_count(),
        scan_report.results.len(),
        errors,
        scan_report.elapsed().as_millis()
    );
    println!("System is likely {}", scan_report.os_guess);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_logs_this_crate_at_debug() {
        assert_eq!(default_log_filter(false), "warn");
        assert!(default_log_filter(true).contains("hostprobe_rs=debug"));
        assert!(default_log_filter(true).parse::<EnvFilter>().is_ok());
    }

    #[test]
    fn open_lines_gain_service_and_stamp_when_verbose() {
        let res = PortResult::open(22, Some("SSH"), Duration::from_millis(1));
        assert_eq!(port_line(&res, None, false, false).as_deref(), Some("[+] 22 Open"));
        assert_eq!(
            port_line(&res, Some("12:00:01"), true, false).as_deref(),
            Some("[12:00:01] [+] 22 (SSH) Open")
        );
    }

    #[test]
    fn closed_lines_only_for_single_port() {
        let res = PortResult::closed(81, None, None);
        assert_eq!(port_line(&res, None, true, false), None);
        assert_eq!(port_line(&res, None, false, true).as_deref(), Some("[-] 81 Closed"));
    }

    #[test]
    fn error_lines_when_verbose_or_single() {
        let res = PortResult::error(82, None, "network is down");
        assert_eq!(port_line(&res, None, false, false), None);
        assert_eq!(
            port_line(&res, None, true, false).as_deref(),
            Some("[!] 82 Error: network is down")
        );
        assert!(port_line(&res, None, false, true).is_some());
    }
}
