use crate::types::OsGuess;

/// Ports that usually only show up on Linux hosts, with their weight.
const LINUX_WEIGHTS: &[(u16, f64)] = &[
    (22, 3.0),   // ssh
    (111, 2.0),  // rpcbind
    (631, 1.5),  // cups
    (3306, 1.0), // mysql
    (5900, 1.0), // vnc
    (873, 1.0),  // rsync
];

/// Ports that usually only show up on Windows hosts, with their weight.
const WINDOWS_WEIGHTS: &[(u16, f64)] = &[
    (3389, 3.0), // rdp
    (445, 2.5),  // smb
    (135, 2.0),  // msrpc
    (1433, 1.5), // sql server
    (5985, 1.5), // winrm
    (139, 1.0),  // netbios
];

/// Per-family score sums for one set of open ports.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OsScores {
    pub linux: f64,
    pub windows: f64,
}

impl OsScores {
    /// Zero/zero is `Unknown`; any other tie goes to Windows.
    pub fn verdict(&self) -> OsGuess {
        if self.linux == 0.0 && self.windows == 0.0 {
            OsGuess::Unknown
        } else if self.linux > self.windows {
            OsGuess::Linux
        } else {
            OsGuess::Windows
        }
    }
}

fn table_score(table: &[(u16, f64)], open: &[u16]) -> f64 {
    table
        .iter()
        .filter(|(port, _)| open.contains(port))
        .map(|(_, w)| w)
        .sum()
}

/// Sum the weights of every diagnostic port present in `open_ports`.
///
/// Repeated ports count once.
pub fn score<I>(open_ports: I) -> OsScores
where
    I: IntoIterator<Item = u16>,
{
    let mut open: Vec<u16> = open_ports.into_iter().collect();
    open.sort_unstable();
    open.dedup();
    OsScores {
        linux: table_score(LINUX_WEIGHTS, &open),
        windows: table_score(WINDOWS_WEIGHTS, &open),
    }
}

pub fn guess<I>(open_ports: I) -> OsGuess
where
    I: IntoIterator<Item = u16>,
{
    score(open_ports).verdict()
}
