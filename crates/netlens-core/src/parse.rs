use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use crate::models::{Connection, RiskLevel, SourceFormat};

// ---------------------------------------------------------------------------
// Format detection
// ---------------------------------------------------------------------------

static WINDOWS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(TCP|UDP)\s+").unwrap());
static LINUX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(tcp|udp|tcp6|udp6)\s+").unwrap());
static MACOS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(tcp4|udp4|tcp6|udp6|tcp|udp)\s+").unwrap());

/// Case-sensitive, checked in order; first match wins. Uppercase `TCP`/`UDP`
/// is the Windows convention, lowercase belongs to the Unix tools.
fn match_format(line: &str) -> Option<SourceFormat> {
    if WINDOWS_RE.is_match(line) {
        Some(SourceFormat::Windows)
    } else if LINUX_RE.is_match(line) {
        Some(SourceFormat::Linux)
    } else if MACOS_RE.is_match(line) {
        Some(SourceFormat::Macos)
    } else {
        None
    }
}

/// Scan the whole input for the first line matching one of the three format
/// patterns. Banners and unrecognised lines do not lock anything; `generic`
/// is the fallback only when no line in the input matches.
fn detect_format(input: &str) -> SourceFormat {
    input
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !is_header_line(l))
        .find_map(match_format)
        .unwrap_or(SourceFormat::Generic)
}

fn matches_format(line: &str, format: SourceFormat) -> bool {
    match format {
        SourceFormat::Windows => WINDOWS_RE.is_match(line),
        SourceFormat::Linux => LINUX_RE.is_match(line),
        SourceFormat::Macos => MACOS_RE.is_match(line),
        SourceFormat::Generic => true,
    }
}

fn is_header_line(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    (lower.contains("proto") && (lower.contains("address") || lower.contains("state")))
        || lower.contains("active connections")
        || lower.contains("listening ports")
        || lower.contains("executing netstat")
        || line.starts_with("----")
        || lower.starts_with("client ip address:")
}

// ---------------------------------------------------------------------------
// Snapshot parsing
// ---------------------------------------------------------------------------

/// A parsed connection-table dump: the surviving connections plus the format
/// the dump was recognised as.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub connections: Vec<Connection>,
    pub format: SourceFormat,
}

/// Parse a raw connection-table dump. The format is locked by the first line
/// anywhere in the input that matches one of the format patterns; lines that
/// do not match the locked format are skipped, as are lines that fail their
/// format's field layout. Malformed input never fails, it just yields fewer
/// connections.
pub fn parse_snapshot(input: &str) -> Snapshot {
    let format = detect_format(input);

    let mut connections = Vec::new();
    let mut skipped = 0usize;

    for raw in input.lines() {
        let line = raw.trim();
        if line.is_empty() || is_header_line(line) {
            continue;
        }

        if !matches_format(line, format) {
            skipped += 1;
            debug!(line, "line does not match detected format, skipping");
            continue;
        }

        match parse_line(line, format) {
            Some(conn) => connections.push(conn),
            None => skipped += 1,
        }
    }

    info!(
        format = format.as_str(),
        connections = connections.len(),
        skipped,
        "snapshot parsed"
    );
    Snapshot { connections, format }
}

fn parse_line(line: &str, format: SourceFormat) -> Option<Connection> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 3 {
        return None;
    }

    let fields = match format {
        SourceFormat::Windows => parse_windows(&parts),
        SourceFormat::Linux => parse_linux(&parts),
        SourceFormat::Macos => parse_macos(&parts),
        SourceFormat::Generic => parse_generic(&parts),
    }?;

    if fields.protocol != "TCP" && fields.protocol != "UDP" {
        return None;
    }

    Some(Connection {
        protocol: fields.protocol,
        local_address: fields.local,
        foreign_address: fields.foreign,
        state: fields.state,
        pid: fields.pid,
        raw_line: line.to_string(),
        source_format: format,
        risk: RiskLevel::Safe,
        issues: Vec::new(),
    })
}

struct LineFields {
    protocol: String,
    local: String,
    foreign: String,
    state: String,
    pid: Option<String>,
}

fn default_state(protocol: &str) -> String {
    if protocol == "UDP" {
        String::new()
    } else {
        "UNKNOWN".to_string()
    }
}

// `TCP  0.0.0.0:135  0.0.0.0:0  LISTENING  888`
fn parse_windows(parts: &[&str]) -> Option<LineFields> {
    let protocol = parts[0].to_ascii_uppercase();
    let state = parts
        .get(3)
        .map(|s| s.to_string())
        .unwrap_or_else(|| default_state(&protocol));
    Some(LineFields {
        protocol,
        local: parts[1].to_string(),
        foreign: parts[2].to_string(),
        state,
        pid: parts.get(4).map(|s| s.to_string()),
    })
}

// netstat: `tcp  0  0  127.0.0.1:5432  0.0.0.0:*  LISTEN  1234/postgres`
// ss:      `udp  UNCONN  0  0  0.0.0.0:68  0.0.0.0:*`
fn parse_linux(parts: &[&str]) -> Option<LineFields> {
    let mut protocol = parts[0].to_ascii_uppercase();
    if protocol == "TCP6" {
        protocol = "TCP".to_string();
    } else if protocol == "UDP6" {
        protocol = "UDP".to_string();
    }
    if parts.len() < 6 {
        return None;
    }

    // Everything after the fixed columns is the PID/program field.
    let pid = {
        let joined = parts[6..].join(" ");
        let trimmed = joined.trim_end_matches('-').trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    };

    let unconn = protocol == "UDP" && parts[1].eq_ignore_ascii_case("UNCONN");
    if unconn {
        return Some(LineFields {
            protocol,
            local: parts[4].to_string(),
            foreign: parts[5].to_string(),
            state: "UNCONN".to_string(),
            pid,
        });
    }

    Some(LineFields {
        protocol,
        local: parts[3].to_string(),
        foreign: parts[4].to_string(),
        state: parts
            .get(5)
            .map(|s| s.to_string())
            .unwrap_or_else(|| "UNKNOWN".to_string()),
        pid,
    })
}

// `tcp4  0  0  127.0.0.1.5432  *.*  LISTEN`
fn parse_macos(parts: &[&str]) -> Option<LineFields> {
    let mut protocol = parts[0].to_ascii_uppercase();
    protocol.truncate(3);

    // Some variants drop the queue columns; find where the addresses start.
    let looks_like_addr = |s: &str| s.contains(':') || s.contains('.');
    let (local_idx, foreign_idx, state_idx) = if looks_like_addr(parts[1]) {
        (1, 2, 3)
    } else if parts.len() > 2 && looks_like_addr(parts[2]) {
        (2, 3, 4)
    } else {
        (3, 4, 5)
    };

    let local = parts.get(local_idx)?.to_string();
    let foreign = parts.get(foreign_idx)?.to_string();
    let mut state = parts
        .get(state_idx)
        .map(|s| s.to_string())
        .unwrap_or_else(|| default_state(&protocol));

    let last = parts.last()?;
    let pid = if last.chars().all(|c| c.is_ascii_digit()) && !last.is_empty() {
        Some(last.to_string())
    } else {
        None
    };
    // A trailing pid with no state column gets mistaken for the state.
    if let Some(p) = &pid {
        if *p == state && protocol == "TCP" {
            state = "UNKNOWN".to_string();
        }
    }

    Some(LineFields {
        protocol,
        local,
        foreign,
        state,
        pid,
    })
}

// `<proto> <local> <foreign> <state> [pid]`
fn parse_generic(parts: &[&str]) -> Option<LineFields> {
    if parts.len() < 4 {
        return None;
    }
    Some(LineFields {
        protocol: parts[0].to_ascii_uppercase(),
        local: parts[1].to_string(),
        foreign: parts[2].to_string(),
        state: parts[3].to_string(),
        pid: parts.get(4).map(|s| s.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_windows_format() {
        let input = "\
Active Connections

  Proto  Local Address          Foreign Address        State           PID
  TCP    0.0.0.0:135            0.0.0.0:0              LISTENING       888
  TCP    192.168.1.5:49623      93.184.216.34:443      ESTABLISHED     4210
  UDP    0.0.0.0:5353           *:*
";
        let snap = parse_snapshot(input);
        assert_eq!(snap.format, SourceFormat::Windows);
        assert_eq!(snap.connections.len(), 3);

        let listener = &snap.connections[0];
        assert_eq!(listener.protocol, "TCP");
        assert_eq!(listener.local_address, "0.0.0.0:135");
        assert_eq!(listener.state, "LISTENING");
        assert_eq!(listener.pid.as_deref(), Some("888"));

        let udp = &snap.connections[2];
        assert_eq!(udp.protocol, "UDP");
        assert_eq!(udp.state, "");
    }

    #[test]
    fn test_detects_linux_format() {
        let input = "\
Proto Recv-Q Send-Q Local Address           Foreign Address         State       PID/Program name
tcp        0      0 127.0.0.1:5432          0.0.0.0:*               LISTEN      1234/postgres
tcp6       0      0 :::22                   :::*                    LISTEN      901/sshd
";
        let snap = parse_snapshot(input);
        assert_eq!(snap.format, SourceFormat::Linux);
        assert_eq!(snap.connections.len(), 2);

        let pg = &snap.connections[0];
        assert_eq!(pg.protocol, "TCP");
        assert_eq!(pg.local_address, "127.0.0.1:5432");
        assert_eq!(pg.state, "LISTEN");
        assert_eq!(pg.pid.as_deref(), Some("1234/postgres"));

        // tcp6 normalises to TCP
        assert_eq!(snap.connections[1].protocol, "TCP");
    }

    #[test]
    fn test_linux_ss_unconn_layout() {
        let input = "udp   UNCONN 0      0      0.0.0.0:68        0.0.0.0:*\n";
        let snap = parse_snapshot(input);
        assert_eq!(snap.format, SourceFormat::Linux);
        let c = &snap.connections[0];
        assert_eq!(c.protocol, "UDP");
        assert_eq!(c.local_address, "0.0.0.0:68");
        assert_eq!(c.foreign_address, "0.0.0.0:*");
        assert_eq!(c.state, "UNCONN");
        assert!(c.pid.is_none());
    }

    #[test]
    fn test_linux_ss_unconn_keeps_process_field() {
        let input =
            "udp   UNCONN 0      0      0.0.0.0:68        0.0.0.0:*    users:((\"dhclient\",pid=873,fd=6))\n";
        let snap = parse_snapshot(input);
        let c = &snap.connections[0];
        assert_eq!(c.state, "UNCONN");
        assert_eq!(
            c.pid.as_deref(),
            Some("users:((\"dhclient\",pid=873,fd=6))")
        );
    }

    #[test]
    fn test_detects_macos_format() {
        let input = "\
Active Internet connections
Proto Recv-Q Send-Q  Local Address          Foreign Address        (state)
tcp4       0      0  127.0.0.1.5432         *.*                    LISTEN
udp4       0      0  *.5353                 *.*
";
        let snap = parse_snapshot(input);
        assert_eq!(snap.format, SourceFormat::Macos);
        assert_eq!(snap.connections.len(), 2);
        assert_eq!(snap.connections[0].protocol, "TCP");
        assert_eq!(snap.connections[0].local_address, "127.0.0.1.5432");
        assert_eq!(snap.connections[0].state, "LISTEN");
        assert_eq!(snap.connections[1].state, "");
    }

    #[test]
    fn test_generic_fallback() {
        let input = "CONN 10.0.0.1:1000 10.0.0.2:2000 OPEN 42\n";
        let snap = parse_snapshot(input);
        assert_eq!(snap.format, SourceFormat::Generic);
        // non-TCP/UDP protocols are dropped
        assert!(snap.connections.is_empty());

        let snap = parse_snapshot("tcp_conn 1 2\nTCP 10.0.0.1:1000 10.0.0.2:2000 OPEN 42\n");
        assert_eq!(snap.connections.len(), 1);
        assert_eq!(snap.connections[0].pid.as_deref(), Some("42"));
    }

    #[test]
    fn test_detection_scans_past_unrecognized_lines() {
        // An uncaught banner line must not lock the generic fallback.
        let input = "\
Active Internet connections (including servers)
tcp4       0      0  127.0.0.1.5432         *.*                    LISTEN
";
        let snap = parse_snapshot(input);
        assert_eq!(snap.format, SourceFormat::Macos);
        assert_eq!(snap.connections.len(), 1);
        assert_eq!(snap.connections[0].local_address, "127.0.0.1.5432");
    }

    #[test]
    fn test_format_lock_skips_foreign_lines() {
        // First data line locks windows; the lowercase line is discarded.
        let input = "\
TCP    0.0.0.0:80      0.0.0.0:0    LISTENING    10
tcp        0      0 127.0.0.1:5432          0.0.0.0:*               LISTEN      1/pg
";
        let snap = parse_snapshot(input);
        assert_eq!(snap.format, SourceFormat::Windows);
        assert_eq!(snap.connections.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        let snap = parse_snapshot("\n\n   \n");
        assert_eq!(snap.format, SourceFormat::Generic);
        assert!(snap.connections.is_empty());
    }

    #[test]
    fn test_header_lines_are_skipped() {
        assert!(is_header_line("Proto  Local Address  Foreign Address  State"));
        assert!(is_header_line("Active Connections"));
        assert!(is_header_line("--------------------------------"));
        assert!(is_header_line("Client IP address: 10.0.0.1"));
        assert!(!is_header_line("TCP 1.2.3.4:80 5.6.7.8:443 ESTABLISHED"));
    }
}
