use std::collections::BTreeMap;

use crate::addr;
use crate::classify::ClassifiedConnection;
use crate::intel::ThreatIntelMatcher;
use crate::models::{
    AnalysisSummary, IpAnalysisDetail, ListeningPort, Recommendation, RecommendationKind,
    RiskLevel,
};

const EXTERNAL_IP_THRESHOLD: usize = 10;

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

fn listener_threat_matched(lp: &ListeningPort, matcher: &ThreatIntelMatcher) -> bool {
    let (ip, _) = addr::extract_ip_port(&lp.address);
    ip.as_deref().is_some_and(|ip| matcher.match_ip(ip).is_some())
}

/// Turn the aggregated findings into an ordered, actionable list.
pub fn generate(
    classified: &[ClassifiedConnection],
    listening_ports: &[ListeningPort],
    ip_analysis: &BTreeMap<String, IpAnalysisDetail>,
    summary: &AnalysisSummary,
    matcher: &ThreatIntelMatcher,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    let threat_conns: Vec<&ClassifiedConnection> = classified
        .iter()
        .filter(|c| c.connection.risk != RiskLevel::Safe)
        .filter(|c| {
            c.connection
                .issues
                .iter()
                .any(|i| i.contains("Threat Intel Match"))
        })
        .collect();
    if !threat_conns.is_empty() {
        let mut threat_ips = Vec::new();
        let mut services = Vec::new();
        for c in &threat_conns {
            let ip = if c.local_threat_risk.is_some() {
                c.local_ip.as_deref()
            } else {
                c.foreign_ip.as_deref()
            };
            if let Some(ip) = ip {
                push_unique(&mut threat_ips, ip.to_string());
            }
            let service = c
                .port_info
                .map(|p| p.name.to_string())
                .unwrap_or_else(|| c.connection.protocol.clone());
            push_unique(&mut services, service);
        }
        recommendations.push(Recommendation {
            kind: RecommendationKind::Critical,
            title: "Block Connections to Known Malicious IPs".to_string(),
            description: format!(
                "Detected {} connection(s) involving IPs on threat intelligence lists. These connections pose an immediate and severe risk. Block these IPs at your firewall immediately. Investigate systems involved for signs of compromise. IPs: {}",
                threat_conns.len(),
                threat_ips.join(", ")
            ),
            services: Some(services.join(", ")),
        });
    }

    let high_risk_listening: Vec<&ListeningPort> = listening_ports
        .iter()
        .filter(|p| matches!(p.risk, RiskLevel::Critical | RiskLevel::Suspicious))
        .filter(|p| !listener_threat_matched(p, matcher))
        .collect();
    if !high_risk_listening.is_empty() {
        let exposed: Vec<String> = high_risk_listening
            .iter()
            .map(|p| {
                format!(
                    "{} (Port {}) on {}",
                    p.service,
                    p.port.as_deref().unwrap_or("N/A"),
                    p.address
                )
            })
            .collect();
        recommendations.push(Recommendation {
            kind: RecommendationKind::Critical,
            title: "Secure or Disable High-Risk Listening Services (External Exposure)"
                .to_string(),
            description: format!(
                "Found {} high-risk services potentially exposed externally: {}. Review their necessity. If essential, ensure they are firewalled, patched, and configured securely.",
                high_risk_listening.len(),
                exposed.join(", ")
            ),
            services: Some(
                high_risk_listening
                    .iter()
                    .map(|p| p.service.clone())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        });
    }

    let unencrypted: Vec<&ListeningPort> = listening_ports
        .iter()
        .filter(|p| {
            p.port
                .as_deref()
                .and_then(crate::ports::lookup)
                .is_some_and(|info| matches!(info.name, "FTP" | "Telnet" | "HTTP"))
        })
        .collect();
    if !unencrypted.is_empty() {
        let named: Vec<String> = unencrypted
            .iter()
            .map(|p| {
                format!(
                    "{} (Port {}) on {}",
                    p.service,
                    p.port.as_deref().unwrap_or("N/A"),
                    p.address
                )
            })
            .collect();
        recommendations.push(Recommendation {
            kind: RecommendationKind::Warning,
            title: "Unencrypted Listening Services Detected".to_string(),
            description: format!(
                "Unencrypted services like {} transmit data in plaintext. Upgrade to secure alternatives if exposed.",
                named.join(", ")
            ),
            services: Some(
                unencrypted
                    .iter()
                    .map(|p| p.service.clone())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        });
    }

    let external_count = ip_analysis
        .values()
        .filter(|d| d.is_public && matcher.match_ip(&d.ip).is_none())
        .count();
    if external_count > EXTERNAL_IP_THRESHOLD {
        recommendations.push(Recommendation {
            kind: RecommendationKind::Warning,
            title: "Monitor Numerous External Connections".to_string(),
            description: format!(
                "Detected {} unique external IP addresses (excluding known threats). While not inherently malicious, a high number of external connections warrants monitoring. Ensure all are legitimate and expected. Investigate any unfamiliar IPs.",
                external_count
            ),
            services: None,
        });
    }

    let all_interfaces: Vec<&ListeningPort> = listening_ports
        .iter()
        .filter(|p| {
            let (ip, _) = addr::extract_ip_port(&p.address);
            matches!(ip.as_deref(), Some("0.0.0.0") | Some("::") | Some("*"))
        })
        .filter(|p| !listener_threat_matched(p, matcher))
        .collect();
    if !all_interfaces.is_empty() {
        let leading: Vec<String> = all_interfaces
            .iter()
            .take(3)
            .map(|p| p.service.clone())
            .collect();
        recommendations.push(Recommendation {
            kind: RecommendationKind::Warning,
            title: "Services Listening on All Interfaces".to_string(),
            description: format!(
                "{} service(s) are listening on all network interfaces. This can increase exposure. Ensure this is intentional for services like {} and that appropriate firewall rules are in place.",
                all_interfaces.len(),
                leading.join(", ")
            ),
            services: Some(
                all_interfaces
                    .iter()
                    .map(|p| p.service.clone())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        });
    }

    if summary.critical > 0 && threat_conns.is_empty() {
        recommendations.insert(
            0,
            Recommendation {
                kind: RecommendationKind::Critical,
                title: format!(
                    "Address {} Critical Risk Item(s) Immediately",
                    summary.critical
                ),
                description: format!(
                    "There are {} item(s) identified as critical risk. These require immediate attention. Review the 'Risky Connections' and 'Listening Ports' or 'Local Services' tabs for details.",
                    summary.critical
                ),
                services: None,
            },
        );
    } else if summary.suspicious > 0 {
        recommendations.insert(
            0,
            Recommendation {
                kind: RecommendationKind::Warning,
                title: format!("Investigate {} Suspicious Item(s)", summary.suspicious),
                description: format!(
                    "There are {} item(s) identified as suspicious. Review these in the relevant tabs.",
                    summary.suspicious
                ),
                services: None,
            },
        );
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::models::{Connection, SourceFormat, ThreatList};

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

    fn listener(port: &str, service: &str, risk: RiskLevel, address: &str) -> ListeningPort {
        ListeningPort {
            port: Some(port.to_string()),
            service: service.to_string(),
            risk,
            address: address.to_string(),
            protocol: "TCP".to_string(),
        }
    }

    #[test]
    fn test_threat_match_produces_blocking_recommendation() {
        let m = matcher();
        let classified = vec![classify(
            &conn("TCP", "192.168.1.5:49623", "81.19.208.112:443", "ESTABLISHED"),
            &m,
        )];
        let mut summary = AnalysisSummary::default();
        summary.record(classified[0].connection.risk);

        let recs = generate(&classified, &[], &BTreeMap::new(), &summary, &m);
        let block = &recs[0];
        assert_eq!(block.kind, RecommendationKind::Critical);
        assert_eq!(block.title, "Block Connections to Known Malicious IPs");
        assert!(block.description.contains("81.19.208.112"));
        // threat recommendation suppresses the generic critical-count one
        assert!(!recs.iter().any(|r| r.title.contains("Critical Risk Item")));
    }

    #[test]
    fn test_high_risk_listener_recommendation() {
        let m = matcher();
        let ports = vec![listener("23", "Telnet", RiskLevel::Critical, "0.0.0.0:23")];
        let mut summary = AnalysisSummary::default();
        summary.record(RiskLevel::Critical);

        let recs = generate(&[], &ports, &BTreeMap::new(), &summary, &m);
        assert!(recs.iter().any(|r| {
            r.title == "Secure or Disable High-Risk Listening Services (External Exposure)"
                && r.description.contains("Telnet (Port 23) on 0.0.0.0:23")
        }));
        assert!(recs
            .iter()
            .any(|r| r.title == "Unencrypted Listening Services Detected"));
        assert!(recs
            .iter()
            .any(|r| r.title == "Services Listening on All Interfaces"));
        // generic critical front-insert applies when no threat match exists
        assert_eq!(recs[0].title, "Address 1 Critical Risk Item(s) Immediately");
    }

    #[test]
    fn test_many_external_ips_trigger_monitoring() {
        let m = matcher();
        let mut ips = BTreeMap::new();
        for i in 0..12 {
            let ip = format!("203.0.113.{i}");
            ips.insert(
                ip.clone(),
                IpAnalysisDetail {
                    ip,
                    connections: 1,
                    ports: Default::default(),
                    is_public: true,
                    risk: RiskLevel::Warning,
                },
            );
        }
        let recs = generate(&[], &[], &ips, &AnalysisSummary::default(), &m);
        let rec = recs
            .iter()
            .find(|r| r.title == "Monitor Numerous External Connections")
            .expect("monitoring recommendation");
        assert!(rec.description.contains("12 unique external IP addresses"));
    }

    #[test]
    fn test_suspicious_summary_front_insert() {
        let m = matcher();
        let mut summary = AnalysisSummary::default();
        summary.record(RiskLevel::Suspicious);
        let recs = generate(&[], &[], &BTreeMap::new(), &summary, &m);
        assert_eq!(recs[0].title, "Investigate 1 Suspicious Item(s)");
        assert_eq!(recs[0].kind, RecommendationKind::Warning);
    }

    #[test]
    fn test_quiet_results_produce_no_recommendations() {
        let m = matcher();
        let recs = generate(&[], &[], &BTreeMap::new(), &AnalysisSummary::default(), &m);
        assert!(recs.is_empty());
    }
}
