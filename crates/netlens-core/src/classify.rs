use crate::addr;
use crate::intel::ThreatIntelMatcher;
use crate::models::{Connection, RiskLevel};
use crate::ports::{self, WellKnownPortDetail};

/// A connection after risk classification: canonical addresses, accumulated
/// risk and issue list, plus the extracted fields the aggregation pass needs.
#[derive(Debug, Clone)]
pub struct ClassifiedConnection {
    /// Addresses rewritten to canonical `ip:port` form, risk and issues set.
    pub connection: Connection,
    /// Local address token as it appeared in the dump, for listener entries.
    pub listener_address: String,
    pub local_ip: Option<String>,
    pub local_port: Option<String>,
    pub foreign_ip: Option<String>,
    pub foreign_port: Option<String>,
    pub port_info: Option<&'static WellKnownPortDetail>,
    pub is_listener: bool,
    /// Risk for the listening-port entry this connection contributes,
    /// including any local threat-intel escalation. Meaningful only when
    /// `is_listener` is set.
    pub listener_risk: RiskLevel,
    pub local_threat_risk: Option<RiskLevel>,
    pub foreign_threat_risk: Option<RiskLevel>,
}

fn canonical(ip: &Option<String>, port: &Option<String>) -> String {
    format!(
        "{}:{}",
        ip.as_deref().unwrap_or("*"),
        port.as_deref().unwrap_or("*")
    )
}

fn is_all_interfaces(ip: &str) -> bool {
    ip == "0.0.0.0" || ip == "::" || ip == "*"
}

/// Run the rule pipeline over a single parsed connection.
pub fn classify(conn: &Connection, matcher: &ThreatIntelMatcher) -> ClassifiedConnection {
    let (local_ip, local_port) = addr::extract_ip_port(&conn.local_address);
    let (foreign_ip, foreign_port) = addr::extract_ip_port(&conn.foreign_address);

    let mut out = conn.clone();
    out.local_address = canonical(&local_ip, &local_port);
    out.foreign_address = canonical(&foreign_ip, &foreign_port);
    out.risk = RiskLevel::Safe;
    out.issues = Vec::new();

    // Threat intelligence beats every other signal.
    let local_threat = local_ip.as_deref().and_then(|ip| matcher.match_ip(ip));
    let foreign_threat = foreign_ip.as_deref().and_then(|ip| matcher.match_ip(ip));
    let local_threat_risk = local_threat.as_ref().map(|m| m.risk_level());
    let foreign_threat_risk = foreign_threat.as_ref().map(|m| m.risk_level());

    if let (Some(m), Some(ip)) = (&local_threat, local_ip.as_deref()) {
        out.risk = m.risk_level();
        let msg = format!(
            "Threat Intel Match (Local): {} - {} ({} severity, Source: {})",
            ip,
            if m.description.is_empty() { "Known threat" } else { m.description },
            m.severity.label(),
            m.source
        );
        if !out.issues.contains(&msg) {
            out.issues.push(msg);
        }
    }
    if let (Some(m), Some(ip)) = (&foreign_threat, foreign_ip.as_deref()) {
        out.risk.escalate_to(m.risk_level());
        let msg = format!(
            "Threat Intel Match (Foreign): {} - {} ({} severity, Source: {})",
            ip,
            if m.description.is_empty() { "Known threat" } else { m.description },
            m.severity.label(),
            m.source
        );
        if !out.issues.contains(&msg) {
            out.issues.push(msg);
        }
    }

    // Well-known local port baseline.
    let port_info = local_port.as_deref().and_then(ports::lookup);
    if let (Some(info), Some(port)) = (port_info, local_port.as_deref()) {
        out.risk.escalate_to(info.risk);
        if info.risk != RiskLevel::Safe && info.risk != RiskLevel::Unknown {
            out.issues.push(format!(
                "{} risk service on local port {}: {} ({}).",
                info.risk.capitalized(),
                port,
                info.name,
                info.description
            ));
        }
    }

    let state = conn.state.to_ascii_uppercase();
    let mut is_listener = false;
    let mut listener_specific_risk = out.risk;

    if conn.protocol.eq_ignore_ascii_case("TCP") {
        if state == "LISTEN" || state == "LISTENING" {
            is_listener = true;
        }
    } else if conn.protocol.eq_ignore_ascii_case("UDP") {
        // UDP listeners show a wildcard peer or no state at all.
        let fa = conn.foreign_address.to_ascii_uppercase();
        if local_port.is_some()
            && (fa == "*:*"
                || fa == "*"
                || fa.ends_with(":*")
                || state.is_empty()
                || state == "UNKNOWN"
                || state == "UNCONN")
        {
            is_listener = true;
            if let Some(info) = port_info {
                listener_specific_risk.escalate_to(info.risk);
            }
        }
    }

    let mut listener_risk = out.risk;
    if is_listener {
        if local_ip.as_deref().is_some_and(is_all_interfaces) {
            if listener_specific_risk == RiskLevel::Safe {
                listener_specific_risk = RiskLevel::Warning;
            }
            if !out.issues.iter().any(|i| i.contains("all interfaces")) {
                out.issues.push(format!(
                    "Service on port {} is listening on all interfaces ({}). Ensure this is intentional and firewalled appropriately.",
                    local_port.as_deref().unwrap_or("unknown"),
                    local_ip.as_deref().unwrap_or("*")
                ));
            }
        }
        out.risk.escalate_to(listener_specific_risk);
        listener_risk = out.risk;
        if let Some(threat_risk) = local_threat_risk {
            listener_risk.escalate_to(threat_risk);
        }
    } else if state == "ESTABLISHED" {
        if let Some(ip) = foreign_ip.as_deref() {
            if addr::is_public_ip(ip) && foreign_threat.is_none() {
                if out.risk == RiskLevel::Safe {
                    out.risk = RiskLevel::Warning;
                }
                out.issues.push(format!(
                    "Established connection to public IP: {}:{}. Verify legitimacy.",
                    ip,
                    foreign_port.as_deref().unwrap_or("*")
                ));
            }
        }
        if let (Some(info), Some(port)) = (
            foreign_port.as_deref().and_then(ports::lookup),
            foreign_port.as_deref(),
        ) {
            if foreign_threat.is_none()
                && matches!(info.risk, RiskLevel::Critical | RiskLevel::Suspicious)
            {
                out.risk.escalate_to(info.risk);
                out.issues.push(format!(
                    "Connected to a {} risk service on remote port {}: {}. This could be an outbound connection to a compromised or risky service.",
                    info.risk.label(),
                    port,
                    info.name
                ));
            }
        }
    } else if matches!(state.as_str(), "SYN_SENT" | "SYN_RECV" | "SYN_RCVD") {
        if matches!(out.risk, RiskLevel::Safe | RiskLevel::Warning) {
            out.risk = RiskLevel::Suspicious;
        }
        out.issues.push(format!(
            "Connection in potentially unstable state: {}. Could indicate scanning, connection attempts, or network issues.",
            state
        ));
    }

    if !out.issues.is_empty() && out.risk == RiskLevel::Safe {
        out.risk = RiskLevel::Warning;
    }

    ClassifiedConnection {
        connection: out,
        listener_address: conn.local_address.clone(),
        local_ip,
        local_port,
        foreign_ip,
        foreign_port,
        port_info,
        is_listener,
        listener_risk,
        local_threat_risk,
        foreign_threat_risk,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SourceFormat, ThreatList};

    fn conn(protocol: &str, local: &str, foreign: &str, state: &str) -> Connection {
        Connection {
            protocol: protocol.to_string(),
            local_address: local.to_string(),
            foreign_address: foreign.to_string(),
            state: state.to_string(),
            pid: None,
            raw_line: format!("{protocol} {local} {foreign} {state}"),
            source_format: SourceFormat::Generic,
            risk: RiskLevel::Safe,
            issues: Vec::new(),
        }
    }

    fn matcher() -> ThreatIntelMatcher<'static> {
        static EMPTY: [ThreatList; 0] = [];
        ThreatIntelMatcher::new(&EMPTY)
    }

    #[test]
    fn test_telnet_listener_on_all_interfaces_is_critical() {
        let m = matcher();
        let c = classify(&conn("TCP", "0.0.0.0:23", "0.0.0.0:0", "LISTENING"), &m);
        assert!(c.is_listener);
        assert_eq!(c.connection.risk, RiskLevel::Critical);
        assert_eq!(c.listener_risk, RiskLevel::Critical);
        assert!(c.connection.issues.iter().any(|i| i.contains("Telnet")));
        assert!(c.connection.issues.iter().any(|i| i.contains("all interfaces")));
    }

    #[test]
    fn test_safe_listener_on_all_interfaces_becomes_warning() {
        let m = matcher();
        let c = classify(&conn("TCP", "0.0.0.0:22", "0.0.0.0:0", "LISTEN"), &m);
        assert!(c.is_listener);
        assert_eq!(c.connection.risk, RiskLevel::Warning);
        assert!(c.connection.issues.iter().any(|i| i.contains("all interfaces")));
    }

    #[test]
    fn test_loopback_listener_stays_safe() {
        let m = matcher();
        let c = classify(&conn("TCP", "127.0.0.1:22", "0.0.0.0:0", "LISTEN"), &m);
        assert!(c.is_listener);
        assert_eq!(c.connection.risk, RiskLevel::Safe);
        assert!(c.connection.issues.is_empty());
    }

    #[test]
    fn test_builtin_threat_ip_is_critical() {
        let m = matcher();
        let c = classify(
            &conn("TCP", "192.168.1.5:49623", "81.19.208.112:443", "ESTABLISHED"),
            &m,
        );
        assert_eq!(c.connection.risk, RiskLevel::Critical);
        assert_eq!(c.foreign_threat_risk, Some(RiskLevel::Critical));
        let issue = c
            .connection
            .issues
            .iter()
            .find(|i| i.contains("Threat Intel Match (Foreign)"))
            .expect("threat issue present");
        assert!(issue.contains("81.19.208.112"));
        assert!(issue.contains("Built-in Threat Intel"));
        // the public-IP warning is suppressed for threat-matched peers
        assert!(!c.connection.issues.iter().any(|i| i.contains("public IP")));
    }

    #[test]
    fn test_established_to_public_ip_is_warning() {
        let m = matcher();
        let c = classify(
            &conn("TCP", "192.168.1.5:50000", "93.184.216.34:443", "ESTABLISHED"),
            &m,
        );
        assert!(!c.is_listener);
        assert_eq!(c.connection.risk, RiskLevel::Warning);
        assert!(c
            .connection
            .issues
            .iter()
            .any(|i| i.contains("Established connection to public IP: 93.184.216.34:443")));
    }

    #[test]
    fn test_outbound_to_risky_remote_port() {
        let m = matcher();
        let c = classify(
            &conn("TCP", "192.168.1.5:50001", "10.0.0.9:5900", "ESTABLISHED"),
            &m,
        );
        assert_eq!(c.connection.risk, RiskLevel::Suspicious);
        assert!(c
            .connection
            .issues
            .iter()
            .any(|i| i.contains("remote port 5900: VNC")));
    }

    #[test]
    fn test_syn_states_escalate_to_suspicious() {
        let m = matcher();
        for state in ["SYN_SENT", "SYN_RECV", "SYN_RCVD"] {
            let c = classify(&conn("TCP", "192.168.1.5:50002", "10.0.0.9:80", state), &m);
            assert_eq!(c.connection.risk, RiskLevel::Suspicious, "{state}");
            assert!(c
                .connection
                .issues
                .iter()
                .any(|i| i.contains("potentially unstable state")));
        }
    }

    #[test]
    fn test_udp_wildcard_peer_is_listener() {
        let m = matcher();
        let c = classify(&conn("UDP", "0.0.0.0:5353", "*:*", ""), &m);
        assert!(c.is_listener);
    }

    #[test]
    fn test_addresses_are_canonicalized() {
        let m = matcher();
        let c = classify(&conn("TCP", "127.0.0.1.5432", "*.*", "LISTEN"), &m);
        assert_eq!(c.connection.local_address, "127.0.0.1:5432");
        assert_eq!(c.connection.foreign_address, "*:*");
        assert_eq!(c.listener_address, "127.0.0.1.5432");
    }
}
