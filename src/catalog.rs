/// Well-known TCP ports and the service usually behind them, sorted by port.
const SERVICES: &[(u16, &str)] = &[
    (21, "FTP"),
    (22, "SSH"),
    (23, "Telnet"),
    (25, "SMTP"),
    (53, "DNS"),
    (80, "HTTP"),
    (88, "Kerberos"),
    (111, "rpcbind"),
    (139, "NetBIOS"),
    (389, "LDAP"),
    (443, "HTTPS"),
    (445, "SMB"),
    (1433, "MSSQL"),
    (2105, "Kerberos"),
    (3306, "MySQL"),
    (3389, "RDP"),
    (5985, "WinRM"),
    (8080, "HTTP-Alt"),
];

/// Service label for a well-known port, `None` for anything else.
pub fn lookup(port: u16) -> Option<&'static str> {
    SERVICES
        .binary_search_by_key(&port, |&(p, _)| p)
        .ok()
        .map(|i| SERVICES[i].1)
}

/// The whole catalog in ascending port order.
pub fn entries() -> &'static [(u16, &'static str)] {
    SERVICES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_ports_resolve() {
        assert_eq!(lookup(80), Some("HTTP"));
        assert_eq!(lookup(22), Some("SSH"));
        assert_eq!(lookup(2105), Some("Kerberos"));
        assert_eq!(lookup(8080), Some("HTTP-Alt"));
    }

    #[test]
    fn unknown_ports_are_none() {
        assert_eq!(lookup(54321), None);
        assert_eq!(lookup(0), None);
        assert_eq!(lookup(65535), None);
    }

    #[test]
    fn table_is_sorted_for_binary_search() {
        assert!(entries().windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(entries().len(), 18);
    }
}
