use crate::error::{Result, ScanError};
use anyhow::Context;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Every TCP port, 0 through 65535.
pub fn full_range() -> Vec<u16> {
    (0..=u16::MAX).collect()
}

/// Parse a single port number such as `443`.
pub fn parse_port(s: &str) -> Result<u16> {
    let s = s.trim();
    s.parse::<u16>()
        .map_err(|_| ScanError::invalid(format!("invalid port: {s} (expected 0-65535)")))
}

/// Parse an inclusive range `start-end` into its ports.
pub fn parse_range(s: &str) -> Result<Vec<u16>> {
    let (a, b) = s
        .split_once('-')
        .ok_or_else(|| ScanError::invalid(format!("invalid range: {s} (expected start-end)")))?;
    let start = parse_port(a).map_err(|_| ScanError::invalid(format!("invalid range: {s}")))?;
    let end = parse_port(b).map_err(|_| ScanError::invalid(format!("invalid range: {s}")))?;
    if start > end {
        return Err(ScanError::invalid(format!(
            "invalid range: {s} (start {start} > end {end})"
        )));
    }
    Ok((start..=end).collect())
}

/// Parse a comma separated port specification, e.g. `22,80,8000-8010`.
///
/// Duplicates are dropped, first appearance wins the position.
pub fn parse_port_spec(spec: &str) -> Result<Vec<u16>> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for item in spec.split(',').map(str::trim) {
        if item.is_empty() {
            return Err(ScanError::invalid(format!("empty item in port list: {spec}")));
        }
        let ports = if item.contains('-') {
            parse_range(item)?
        } else {
            vec![parse_port(item)?]
        };
        out.extend(ports.into_iter().filter(|p| seen.insert(*p)));
    }
    Ok(out)
}

/// Parse a ports file into a deduplicated list of TCP ports.
///
/// One port (`80`) or inclusive range (`8000-8010`) per line. Everything
/// after `#` is a comment; blank lines are skipped.
pub fn parse_ports_str(s: &str) -> Result<Vec<u16>> {
    let mut out: Vec<u16> = Vec::new();
    let mut seen = HashSet::new();

    for (idx, raw_line) in s.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.split('#').next().map(str::trim).unwrap_or("");
        if line.is_empty() {
            continue;
        }

        let ports = if line.contains('-') {
            parse_range(line)
        } else {
            parse_port(line).map(|p| vec![p])
        }
        .map_err(|e| match e {
            ScanError::InvalidArgument(msg) => ScanError::invalid(format!("line {line_no}: {msg}")),
            other => other,
        })?;
        out.extend(ports.into_iter().filter(|p| seen.insert(*p)));
    }

    if out.is_empty() {
        return Err(ScanError::invalid("ports file lists no ports"));
    }
    Ok(out)
}

/// Load a ports list from a file path. Errors if the file cannot be read or parsed.
pub fn load_ports_from_path(path: impl AsRef<Path>) -> anyhow::Result<Vec<u16>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read ports file: {}", path.display()))?;
    let ports =
        parse_ports_str(&content).with_context(|| format!("in ports file {}", path.display()))?;
    Ok(ports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_port_bounds() {
        assert_eq!(parse_port("0").unwrap(), 0);
        assert_eq!(parse_port(" 65535 ").unwrap(), 65535);
        let err = parse_port("65536").unwrap_err();
        assert!(err.to_string().contains("65536"));
    }

    #[test]
    fn range_is_inclusive() {
        assert_eq!(parse_range("20-23").unwrap(), vec![20, 21, 22, 23]);
        assert_eq!(parse_range("7-7").unwrap(), vec![7]);
    }

    #[test]
    fn reversed_range_reports_the_value() {
        let err = parse_range("90-10").unwrap_err();
        assert!(matches!(err, ScanError::InvalidArgument(_)));
        assert!(err.to_string().contains("90-10"));
    }

    #[test]
    fn spec_mixes_ports_and_ranges() {
        let ports = parse_port_spec("22, 80,8000-8002,80").unwrap();
        assert_eq!(ports, vec![22, 80, 8000, 8001, 8002]);
    }

    #[test]
    fn spec_rejects_garbage() {
        assert!(parse_port_spec("http").is_err());
        assert!(parse_port_spec("22,,80").is_err());
        assert!(parse_port_spec("1-70000").is_err());
    }

    #[test]
    fn empty_file_is_an_error() {
        let err = parse_ports_str("# only comments\n\n").unwrap_err();
        assert!(err.to_string().contains("no ports"));
    }

    #[test]
    fn file_errors_carry_line_numbers() {
        let err = parse_ports_str("22\n70000\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
        assert!(err.to_string().contains("70000"));
    }

    #[test]
    fn full_range_covers_every_port() {
        let all = full_range();
        assert_eq!(all.len(), 65536);
        assert_eq!(all.first(), Some(&0));
        assert_eq!(all.last(), Some(&65535));
    }
}
