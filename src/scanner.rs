use crate::catalog;
use crate::error::{Result, ScanError};
use crate::fingerprint;
use crate::types::{PortResult, ScanReport};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use ::time::OffsetDateTime;
use tokio::net::{self, TcpStream};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_TIMEOUT_MS: u64 = 500;
pub const DEFAULT_CONCURRENCY: usize = 500;
/// Hard ceiling on simultaneous sockets, whatever the caller asks for.
pub const MAX_CONCURRENCY: usize = 5_000;

/// Per-scan tuning: connect timeout and number of attempts in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    pub timeout: Duration,
    pub concurrency: usize,
}

impl ScanConfig {
    pub fn new(timeout: Duration, concurrency: usize) -> Self {
        Self {
            timeout,
            concurrency,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(ScanError::invalid("timeout must be greater than 0ms, got 0ms"));
        }
        if self.concurrency == 0 {
            return Err(ScanError::invalid("concurrency must be at least 1, got 0"));
        }
        Ok(())
    }

    fn permits(&self) -> usize {
        self.concurrency.clamp(1, MAX_CONCURRENCY)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_TIMEOUT_MS), DEFAULT_CONCURRENCY)
    }
}

/// Scan `ports` on `target` using asynchronous TCP connects with a concurrency limit.
///
/// - The target is resolved once up front; failure aborts with `HostUnreachable`.
/// - Limits concurrent socket attempts using a `Semaphore`.
/// - Uses `tokio::time::timeout` to bound connect time per socket.
/// - Returns one `PortResult` per distinct requested port, ascending.
pub async fn scan(
    target: &str,
    ports: &[u16],
    timeout: Duration,
    concurrency: usize,
) -> Result<ScanReport> {
    let config = ScanConfig::new(timeout, concurrency);
    scan_internal(target, ports, config, None, None).await
}

/// Variant that accepts a `CancellationToken` to allow external cancellation.
///
/// A cancelled scan still returns `Ok`, with `complete == false` and the
/// results gathered so far.
pub async fn scan_with_cancel(
    target: &str,
    ports: &[u16],
    config: ScanConfig,
    cancel: CancellationToken,
) -> Result<ScanReport> {
    scan_internal(target, ports, config, Some(cancel), None).await
}

/// Like [`scan_with_cancel`], and also sends every result to `observer` as it completes.
///
/// Results arrive in completion order, not port order.
pub async fn scan_with_observer(
    target: &str,
    ports: &[u16],
    config: ScanConfig,
    cancel: CancellationToken,
    observer: mpsc::UnboundedSender<PortResult>,
) -> Result<ScanReport> {
    scan_internal(target, ports, config, Some(cancel), Some(observer)).await
}

/// Resolve a hostname or IP literal to the address every probe will use.
pub async fn resolve_target(target: &str) -> Result<IpAddr> {
    let unreachable = || ScanError::HostUnreachable {
        target: target.to_string(),
    };
    if let Ok(ip) = target.parse::<IpAddr>() {
        return Ok(ip);
    }
    let addrs = match net::lookup_host((target, 0u16)).await {
        Ok(addrs) => addrs,
        Err(e) => {
            warn!(host = target, error = %e, "failed to resolve target");
            return Err(unreachable());
        }
    };
    match pick_address(addrs) {
        Some(ip) => Ok(ip),
        None => {
            warn!(host = target, "target resolved to no addresses");
            Err(unreachable())
        }
    }
}

/// First IPv4 address if there is one, else the first address of any family.
fn pick_address<I>(addrs: I) -> Option<IpAddr>
where
    I: IntoIterator<Item = SocketAddr>,
{
    let addrs: Vec<IpAddr> = addrs.into_iter().map(|a| a.ip()).collect();
    addrs
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
}

async fn scan_internal(
    target: &str,
    ports: &[u16],
    config: ScanConfig,
    cancel_opt: Option<CancellationToken>,
    observer: Option<mpsc::UnboundedSender<PortResult>>,
) -> Result<ScanReport> {
    if target.trim().is_empty() {
        return Err(ScanError::invalid("target must not be empty"));
    }
    if ports.is_empty() {
        return Err(ScanError::invalid("no ports to scan"));
    }
    config.validate()?;

    let wanted: BTreeSet<u16> = ports.iter().copied().collect();
    let started_at = OffsetDateTime::now_utc();
    let ip = resolve_target(target).await?;
    info!(
        host = target,
        %ip,
        ports = wanted.len(),
        concurrency = config.permits(),
        timeout_ms = config.timeout.as_millis() as u64,
        "scan started"
    );

    let cancel = cancel_opt.unwrap_or_default();
    let sem = Arc::new(Semaphore::new(config.permits()));
    let mut set = JoinSet::new();
    let mut results: BTreeMap<u16, PortResult> = BTreeMap::new();
    let mut cancelled = false;

    for &port in &wanted {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                cancelled = true;
                break;
            }
            permit = sem.clone().acquire_owned() => permit,
        };
        let Ok(permit) = permit else { break };

        let cancel = cancel.clone();
        let timeout = config.timeout;
        set.spawn(async move {
            let _permit = permit; // keep permit until task completes
            if cancel.is_cancelled() {
                return None;
            }
            Some(probe(SocketAddr::new(ip, port), timeout).await)
        });

        while let Some(joined) = set.try_join_next() {
            record(&mut results, joined, observer.as_ref());
        }
    }

    if !cancelled {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                joined = set.join_next() => match joined {
                    Some(joined) => record(&mut results, joined, observer.as_ref()),
                    None => break,
                },
            }
        }
    }

    if cancelled {
        drain_or_abandon(&mut set, &mut results, observer.as_ref(), config.timeout).await;
    }

    let results: Vec<PortResult> = results.into_values().collect();
    let os_guess = fingerprint::guess(results.iter().filter(|r| r.is_open()).map(|r| r.port));
    let report = ScanReport {
        target: target.to_string(),
        started_at,
        ended_at: OffsetDateTime::now_utc(),
        results,
        os_guess,
        complete: !cancelled,
    };
    info!(
        host = target,
        probed = report.results.len(),
        open = report.open_count(),
        os = %report.os_guess,
        complete = report.complete,
        "scan finished"
    );
    Ok(report)
}

/// Collect in-flight attempts for at most `grace`, then abort the rest.
///
/// Returns how many attempts were abandoned.
async fn drain_or_abandon(
    set: &mut JoinSet<Option<PortResult>>,
    results: &mut BTreeMap<u16, PortResult>,
    observer: Option<&mpsc::UnboundedSender<PortResult>>,
    grace: Duration,
) -> usize {
    let drain = async {
        while let Some(joined) = set.join_next().await {
            record(results, joined, observer);
        }
    };
    let drained = time::timeout(grace, drain).await;
    let abandoned = if drained.is_ok() { 0 } else { set.len() };
    if abandoned > 0 {
        warn!(in_flight = abandoned, "abandoning in-flight probes after cancel");
    }
    set.shutdown().await;
    abandoned
}

fn record(
    results: &mut BTreeMap<u16, PortResult>,
    joined: std::result::Result<Option<PortResult>, tokio::task::JoinError>,
    observer: Option<&mpsc::UnboundedSender<PortResult>>,
) {
    match joined {
        Ok(Some(res)) => {
            if let Some(tx) = observer {
                let _ = tx.send(res.clone());
            }
            results.insert(res.port, res);
        }
        Ok(None) => {}
        Err(e) if e.is_cancelled() => {}
        Err(e) => warn!(error = %e, "probe task failed"),
    }
}

/// One bounded connect attempt. The stream is dropped before returning.
pub async fn probe(addr: SocketAddr, timeout: Duration) -> PortResult {
    let port = addr.port();
    let service = catalog::lookup(port);
    let start = Instant::now();
    match time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => {
            let latency = start.elapsed();
            drop(stream);
            debug!(%addr, latency_ms = latency.as_millis() as u64, "open");
            PortResult::open(port, service, latency)
        }
        Ok(Err(e)) => classify_connect_error(port, service, &e, start.elapsed()),
        Err(_) => {
            debug!(%addr, "connect timed out");
            PortResult::closed(port, service, None)
        }
    }
}

/// Refusals and unreachable answers mean closed; anything else is a probe error.
fn classify_connect_error(
    port: u16,
    service: Option<&str>,
    err: &io::Error,
    elapsed: Duration,
) -> PortResult {
    match err.kind() {
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::HostUnreachable
        | io::ErrorKind::NetworkUnreachable => PortResult::closed(port, service, Some(elapsed)),
        io::ErrorKind::TimedOut => PortResult::closed(port, service, None),
        _ => {
            debug!(port, error = %err, "probe error");
            PortResult::error(port, service, err.to_string())
        }
    }
}
