use std::collections::{BTreeMap, HashSet};

use tracing::info;

use crate::addr;
use crate::classify::{self, ClassifiedConnection};
use crate::intel::ThreatIntelMatcher;
use crate::models::{
    AnalysisResult, AnalysisSummary, Connection, DetailedPortUsageStats, IpAnalysisDetail,
    ListeningPort, LocalServiceDetail, RiskLevel, RiskMatrixCell, SourceFormat, ThreatList,
};
use crate::ports;
use crate::recommend;

pub const NO_DATA_ERROR: &str = "No valid netstat data found. Please ensure the file contains proper netstat output (e.g., from `netstat -an`, `ss -tulpn`). Check for empty lines or incorrect formatting. The parser might have skipped all lines if they did not match expected connection patterns.";

fn numeric_port(port: Option<&str>) -> i64 {
    port.and_then(|p| p.parse::<i64>().ok()).unwrap_or(0)
}

fn port_from_canonical(address: &str) -> i64 {
    address
        .rsplit_once(':')
        .map(|(_, p)| p)
        .and_then(|p| p.parse::<i64>().ok())
        .unwrap_or(0)
}

/// Run classification and aggregation over a parsed snapshot.
///
/// Never fails: an empty connection set yields an empty result carrying a
/// user-facing error string, everything else degrades per-connection.
pub fn analyze(
    connections: &[Connection],
    format: SourceFormat,
    threat_lists: &[ThreatList],
) -> AnalysisResult {
    if connections.is_empty() {
        return AnalysisResult::empty(format, Some(NO_DATA_ERROR.to_string()));
    }

    let matcher = ThreatIntelMatcher::new(threat_lists);
    let classified: Vec<ClassifiedConnection> = connections
        .iter()
        .map(|c| classify::classify(c, &matcher))
        .collect();
    info!(connections = classified.len(), "classification complete");

    let mut result = AnalysisResult::empty(format, None);
    result.total_connections = connections.len();

    let mut loopback: BTreeMap<(String, String), LocalServiceDetail> = BTreeMap::new();
    let mut local_ports: BTreeMap<String, DetailedPortUsageStats> = BTreeMap::new();
    let mut foreign_ports: BTreeMap<String, DetailedPortUsageStats> = BTreeMap::new();
    let mut summary = AnalysisSummary::default();

    for c in &classified {
        accumulate_loopback(&mut loopback, c);
        if let Some(port) = c.local_port.as_deref() {
            accumulate_port(&mut local_ports, port, &c.connection.protocol);
        }
        if let Some(port) = c.foreign_port.as_deref() {
            accumulate_port(&mut foreign_ports, port, &c.connection.protocol);
        }

        if c.is_listener {
            result.listening_ports.push(ListeningPort {
                port: c.local_port.clone(),
                service: listener_service_name(c),
                risk: c.listener_risk,
                address: c.listener_address.clone(),
                protocol: c.connection.protocol.clone(),
            });
        } else if c.connection.state.to_ascii_uppercase() == "ESTABLISHED" {
            result.established_connections.push(c.connection.clone());
        }

        accumulate_ip_analysis(&mut result.ip_analysis, c);

        summary.record(c.connection.risk);
        if c.connection.risk != RiskLevel::Safe {
            result.flagged_connections.push(c.connection.clone());
        }
    }
    result.summary = summary;

    result.listening_ports.sort_by(|a, b| {
        a.risk
            .severity_rank()
            .cmp(&b.risk.severity_rank())
            .then_with(|| numeric_port(a.port.as_deref()).cmp(&numeric_port(b.port.as_deref())))
    });
    result.flagged_connections.sort_by(|a, b| {
        a.risk
            .severity_rank()
            .cmp(&b.risk.severity_rank())
            .then_with(|| {
                port_from_canonical(&a.local_address).cmp(&port_from_canonical(&b.local_address))
            })
    });

    result.local_port_activity = sorted_port_stats(local_ports);
    result.foreign_port_activity = sorted_port_stats(foreign_ports);

    result.loopback_services = loopback.into_values().collect();
    result.loopback_services.sort_by(|a, b| {
        a.risk
            .severity_rank()
            .cmp(&b.risk.severity_rank())
            .then_with(|| numeric_port(Some(a.port.as_str())).cmp(&numeric_port(Some(b.port.as_str()))))
    });

    result.risk_matrix = build_risk_matrix(&classified, &result.listening_ports);

    result.recommendations = recommend::generate(
        &classified,
        &result.listening_ports,
        &result.ip_analysis,
        &result.summary,
        &matcher,
    );

    info!(
        total = result.total_connections,
        flagged = result.flagged_connections.len(),
        listeners = result.listening_ports.len(),
        critical = result.summary.critical,
        "analysis complete"
    );
    result
}

fn listener_service_name(c: &ClassifiedConnection) -> String {
    if let Some(info) = c.port_info {
        return info.name.to_string();
    }
    match c.local_port.as_deref() {
        Some(port) if port.chars().next().is_some_and(|ch| ch.is_ascii_digit()) => {
            "Unknown".to_string()
        }
        Some(port) => port.to_string(),
        None => "Unknown".to_string(),
    }
}

fn accumulate_loopback(
    map: &mut BTreeMap<(String, String), LocalServiceDetail>,
    c: &ClassifiedConnection,
) {
    let state = c.connection.state.as_str();
    let target_port = if c.local_ip.as_deref() == Some("127.0.0.1")
        && c.local_port.is_some()
        && (state == "LISTEN" || state == "LISTENING")
    {
        c.local_port.clone()
    } else if c.local_ip.as_deref() == Some("127.0.0.1")
        && c.foreign_ip.as_deref() == Some("127.0.0.1")
        && c.foreign_port.is_some()
    {
        c.foreign_port.clone()
    } else {
        None
    };
    let Some(port) = target_port else { return };

    let key = (port.clone(), c.connection.protocol.clone());
    let table = ports::lookup(&port);
    let detail = map.entry(key).or_insert_with(|| LocalServiceDetail {
        port: port.clone(),
        protocol: c.connection.protocol.clone(),
        service_name: table.map(|t| t.name.to_string()).unwrap_or_else(|| "Unknown".to_string()),
        description: table
            .map(|t| t.description.to_string())
            .unwrap_or_else(|| "Local service on loopback interface.".to_string()),
        risk: table.map(|t| t.risk).unwrap_or(RiskLevel::Unknown),
        associated_pids: Vec::new(),
        connection_count: 0,
        raw_example_lines: Vec::new(),
    });

    detail.connection_count += 1;
    if let Some(pid) = c.connection.pid.as_deref() {
        let pid = pid.trim();
        if !pid.is_empty() && !detail.associated_pids.iter().any(|p| p == pid) {
            detail.associated_pids.push(pid.to_string());
        }
    }
    if detail.raw_example_lines.len() < 3 {
        detail
            .raw_example_lines
            .push(c.connection.raw_line.trim().to_string());
    }
    if let Some(t) = table {
        detail.risk.escalate_to(t.risk);
    }
    detail.risk.escalate_to(c.connection.risk);
}

fn accumulate_port(
    map: &mut BTreeMap<String, DetailedPortUsageStats>,
    port: &str,
    protocol: &str,
) {
    let key = format!("{port}:{protocol}");
    let table = ports::lookup(port);
    let stats = map.entry(key).or_insert_with(|| DetailedPortUsageStats {
        port: port.to_string(),
        service: table.map(|t| t.name.to_string()).unwrap_or_else(|| "Unknown".to_string()),
        protocol: protocol.to_string(),
        count: 0,
        risk: table.map(|t| t.risk).unwrap_or(RiskLevel::Unknown),
        description: table
            .map(|t| t.description.to_string())
            .unwrap_or_else(|| "No specific description for this port.".to_string()),
    });
    stats.count += 1;
    if let Some(t) = table {
        stats.risk.escalate_to(t.risk);
    }
}

fn sorted_port_stats(
    map: BTreeMap<String, DetailedPortUsageStats>,
) -> Vec<DetailedPortUsageStats> {
    let mut stats: Vec<DetailedPortUsageStats> = map.into_values().collect();
    stats.sort_by(|a, b| {
        a.risk
            .severity_rank()
            .cmp(&b.risk.severity_rank())
            .then_with(|| b.count.cmp(&a.count))
    });
    stats
}

fn accumulate_ip_analysis(
    map: &mut BTreeMap<String, IpAnalysisDetail>,
    c: &ClassifiedConnection,
) {
    let conn_risk = c.connection.risk;

    if let Some(ip) = c.foreign_ip.as_deref() {
        if !matches!(ip, "*" | "0.0.0.0" | "::") {
            let detail = map.entry(ip.to_string()).or_insert_with(|| {
                let is_public = addr::is_public_ip(ip);
                let risk = c.foreign_threat_risk.unwrap_or(
                    if is_public && conn_risk == RiskLevel::Safe {
                        RiskLevel::Warning
                    } else {
                        conn_risk
                    },
                );
                IpAnalysisDetail {
                    ip: ip.to_string(),
                    connections: 0,
                    ports: Default::default(),
                    is_public,
                    risk,
                }
            });
            detail.connections += 1;
            if let Some(port) = c.foreign_port.clone() {
                detail.ports.insert(port);
            }
            match c.foreign_threat_risk {
                Some(threat) => detail.risk.escalate_to(threat),
                None => detail.risk.escalate_to(conn_risk),
            }
        }
    }

    if let Some(ip) = c.local_ip.as_deref() {
        let lower = ip.to_ascii_lowercase();
        if !matches!(ip, "*" | "0.0.0.0" | "::")
            && !ip.starts_with("127.")
            && !lower.starts_with("fe80:")
            && !c.is_listener
        {
            let detail = map.entry(ip.to_string()).or_insert_with(|| IpAnalysisDetail {
                ip: ip.to_string(),
                connections: 0,
                ports: Default::default(),
                is_public: addr::is_public_ip(ip),
                risk: c.local_threat_risk.unwrap_or(conn_risk),
            });
            detail.connections += 1;
            if let Some(port) = c.local_port.clone() {
                detail.ports.insert(port);
            }
            match c.local_threat_risk {
                Some(threat) => detail.risk.escalate_to(threat),
                None => detail.risk.escalate_to(conn_risk),
            }
        }
    }
}

fn build_risk_matrix(
    classified: &[ClassifiedConnection],
    listening_ports: &[ListeningPort],
) -> Vec<RiskMatrixCell> {
    let mut cells: BTreeMap<String, RiskMatrixCell> = BTreeMap::new();
    let mut seen_raw: HashSet<&str> = HashSet::new();

    for c in classified {
        let established = c.connection.state.to_ascii_uppercase() == "ESTABLISHED"
            && !c.is_listener;
        if !established && c.connection.risk == RiskLevel::Safe {
            continue;
        }
        if !seen_raw.insert(c.connection.raw_line.as_str()) {
            continue;
        }

        let id = format!(
            "{}-{}-{}",
            c.connection.local_address, c.connection.foreign_address, c.connection.protocol
        );
        match cells.get_mut(&id) {
            None => {
                let mut cell = RiskMatrixCell {
                    id: id.clone(),
                    local_address: c.connection.local_address.clone(),
                    local_ip: c.local_ip.clone(),
                    local_port: c.local_port.clone(),
                    foreign_address: c.connection.foreign_address.clone(),
                    foreign_ip: c.foreign_ip.clone(),
                    foreign_port: c.foreign_port.clone(),
                    protocol: c.connection.protocol.clone(),
                    risk: c.connection.risk,
                    connection_count: 1,
                    states: Default::default(),
                    issues: c.connection.issues.clone(),
                    aggregated_pids: Default::default(),
                    is_listener_interaction: false,
                };
                cell.states.insert(c.connection.state.clone());
                if let Some(pid) = c.connection.pid.clone() {
                    cell.aggregated_pids.insert(pid);
                }
                cells.insert(id, cell);
            }
            Some(cell) => {
                cell.connection_count += 1;
                cell.states.insert(c.connection.state.clone());
                for issue in &c.connection.issues {
                    if !cell.issues.contains(issue) {
                        cell.issues.push(issue.clone());
                    }
                }
                if let Some(pid) = c.connection.pid.clone() {
                    cell.aggregated_pids.insert(pid);
                }
                cell.risk.escalate_to(c.connection.risk);
            }
        }
    }

    for lp in listening_ports {
        let (local_ip, local_port) = addr::extract_ip_port(&lp.address);
        let v6 = lp.protocol == "UDP"
            && (lp.address.contains(':') || local_ip.as_deref().is_some_and(|ip| ip.contains(':')));
        let (foreign_address, foreign_ip) = if v6 { ("[::]:*", "::") } else { ("*:*", "*") };
        let id = format!("{}-{}-{}-LISTEN", lp.address, foreign_address, lp.protocol);

        match cells.get_mut(&id) {
            None => {
                let mut cell = RiskMatrixCell {
                    id: id.clone(),
                    local_address: lp.address.clone(),
                    local_ip,
                    local_port,
                    foreign_address: foreign_address.to_string(),
                    foreign_ip: Some(foreign_ip.to_string()),
                    foreign_port: None,
                    protocol: lp.protocol.clone(),
                    risk: lp.risk,
                    connection_count: 1,
                    states: Default::default(),
                    issues: Vec::new(),
                    aggregated_pids: Default::default(),
                    is_listener_interaction: true,
                };
                cell.states.insert("LISTEN".to_string());
                cells.insert(id, cell);
            }
            Some(cell) => {
                cell.connection_count += 1;
                cell.risk.escalate_to(lp.risk);
                cell.is_listener_interaction = true;
            }
        }
    }

    let mut out: Vec<RiskMatrixCell> = cells.into_values().collect();
    out.sort_by(|a, b| {
        a.risk
            .severity_rank()
            .cmp(&b.risk.severity_rank())
            .then_with(|| b.is_listener_interaction.cmp(&a.is_listener_interaction))
            .then_with(|| b.connection_count.cmp(&a.connection_count))
            .then_with(|| a.local_address.cmp(&b.local_address))
            .then_with(|| a.foreign_address.cmp(&b.foreign_address))
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn analyze_text(input: &str) -> AnalysisResult {
        let snap = parse::parse_snapshot(input);
        analyze(&snap.connections, snap.format, &[])
    }

    #[test]
    fn test_empty_input_yields_error_result() {
        let result = analyze(&[], SourceFormat::Generic, &[]);
        assert_eq!(result.total_connections, 0);
        assert!(result.error.as_deref().is_some_and(|e| e.contains("No valid netstat data")));
        assert!(result.listening_ports.is_empty());
        assert!(result.recommendations.is_empty());
    }

    #[test]
    fn test_loopback_postgres_service() {
        let result = analyze_text(
            "tcp        0      0 127.0.0.1:5432          0.0.0.0:*               LISTEN      1234/postgres\n",
        );
        assert_eq!(result.loopback_services.len(), 1);
        let svc = &result.loopback_services[0];
        assert_eq!(svc.port, "5432");
        assert_eq!(svc.protocol, "TCP");
        assert_eq!(svc.service_name, "PostgreSQL");
        assert!(svc.risk.severity_rank() <= RiskLevel::Warning.severity_rank());
        assert_eq!(svc.associated_pids, vec!["1234/postgres".to_string()]);
        assert_eq!(svc.connection_count, 1);
    }

    #[test]
    fn test_summary_conservation() {
        let input = "\
TCP    0.0.0.0:23      0.0.0.0:0          LISTENING    10
TCP    192.168.1.5:50000  93.184.216.34:443  ESTABLISHED  11
TCP    127.0.0.1:8080  127.0.0.1:50001    ESTABLISHED  12
UDP    0.0.0.0:5353    *:*                             13
";
        let result = analyze_text(input);
        assert_eq!(result.total_connections, 4);
        assert_eq!(result.summary.total(), 4);
    }

    #[test]
    fn test_listening_ports_sorted_by_severity_then_port() {
        let input = "\
TCP    0.0.0.0:80      0.0.0.0:0    LISTENING    1
TCP    0.0.0.0:23      0.0.0.0:0    LISTENING    2
TCP    0.0.0.0:445     0.0.0.0:0    LISTENING    3
";
        let result = analyze_text(input);
        let ports: Vec<&str> = result
            .listening_ports
            .iter()
            .filter_map(|p| p.port.as_deref())
            .collect();
        // critical (23), then suspicious (445), then warning-grade (80)
        assert_eq!(ports, vec!["23", "445", "80"]);
    }

    #[test]
    fn test_established_to_threat_ip_flagged_critical() {
        let result = analyze_text(
            "TCP    192.168.1.5:49623  81.19.208.112:443  ESTABLISHED  4210\n",
        );
        assert_eq!(result.summary.critical, 1);
        assert_eq!(result.flagged_connections.len(), 1);
        let detail = result.ip_analysis.get("81.19.208.112").expect("ip tracked");
        assert_eq!(detail.risk, RiskLevel::Critical);
        assert!(detail.is_public);
        assert!(result
            .recommendations
            .iter()
            .any(|r| r.title == "Block Connections to Known Malicious IPs"));
    }

    #[test]
    fn test_ip_analysis_counts_and_ports() {
        let input = "\
TCP    192.168.1.5:50000  93.184.216.34:443  ESTABLISHED  1
TCP    192.168.1.5:50001  93.184.216.34:80   ESTABLISHED  2
";
        let result = analyze_text(input);
        let detail = result.ip_analysis.get("93.184.216.34").expect("tracked");
        assert_eq!(detail.connections, 2);
        assert!(detail.ports.contains("443") && detail.ports.contains("80"));
        assert!(detail.is_public);
    }

    #[test]
    fn test_many_external_ips_recommendation() {
        let mut input = String::new();
        for i in 1..=15 {
            input.push_str(&format!(
                "TCP    192.168.1.5:5{i:04}  203.0.113.{i}:443  ESTABLISHED  {i}\n"
            ));
        }
        let result = analyze_text(&input);
        assert!(result
            .recommendations
            .iter()
            .any(|r| r.title == "Monitor Numerous External Connections"));
    }

    #[test]
    fn test_risk_matrix_merges_and_listener_rows() {
        let input = "\
TCP    0.0.0.0:23         0.0.0.0:0          LISTENING    10
TCP    192.168.1.5:50000  93.184.216.34:443  ESTABLISHED  11
TCP    192.168.1.5:50000  93.184.216.34:443  ESTABLISHED  11
";
        let result = analyze_text(input);

        let listener_cell = result
            .risk_matrix
            .iter()
            .find(|c| c.is_listener_interaction)
            .expect("listener row");
        assert_eq!(listener_cell.foreign_address, "*:*");
        assert!(listener_cell.states.contains("LISTEN"));

        // the two identical raw lines are deduplicated, not merged
        let est = result
            .risk_matrix
            .iter()
            .find(|c| c.foreign_address == "93.184.216.34:443")
            .expect("established row");
        assert_eq!(est.connection_count, 1);
        assert!(est.aggregated_pids.contains("11"));

        // most severe first, listener is critical
        assert_eq!(result.risk_matrix[0].risk, RiskLevel::Critical);
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let input = "\
TCP    0.0.0.0:23         0.0.0.0:0          LISTENING    10
TCP    192.168.1.5:50000  8.8.8.8:53         ESTABLISHED  11
TCP    192.168.1.5:50001  93.184.216.34:443  ESTABLISHED  12
UDP    0.0.0.0:5353       *:*                             13
TCP    192.168.1.5:50002  81.19.208.112:443  ESTABLISHED  14
";
        let a = serde_json::to_string(&analyze_text(input)).unwrap();
        let b = serde_json::to_string(&analyze_text(input)).unwrap();
        assert_eq!(a, b);
    }
}
