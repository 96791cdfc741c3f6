use serde::Serialize;

use crate::addr;
use crate::models::{AnalysisResult, RiskLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Critical,
    High,
    Medium,
    Low,
    Minimal,
}

/// Posture verdict for a whole analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct OverallRisk {
    pub band: RiskBand,
    pub headline: &'static str,
    pub detail: String,
}

/// Collapse an analysis into a single risk band. Returns `None` when the
/// analysis itself failed (no usable data).
pub fn overall_risk(result: &AnalysisResult) -> Option<OverallRisk> {
    if result.error.is_some() {
        return None;
    }

    let summary = &result.summary;
    let critical_listeners = result
        .listening_ports
        .iter()
        .filter(|p| p.risk == RiskLevel::Critical)
        .count();
    let suspicious_listeners = result
        .listening_ports
        .iter()
        .filter(|p| p.risk == RiskLevel::Suspicious)
        .count();
    let high_risk_listeners_all_interfaces = result
        .listening_ports
        .iter()
        .filter(|p| matches!(p.risk, RiskLevel::Critical | RiskLevel::Suspicious))
        .filter(|p| {
            let (ip, _) = addr::extract_ip_port(&p.address);
            matches!(ip.as_deref(), Some("0.0.0.0") | Some("::") | Some("*"))
        })
        .count();

    if summary.critical > 0 || critical_listeners > 0 {
        return Some(OverallRisk {
            band: RiskBand::Critical,
            headline: "CRITICAL RISK",
            detail: format!(
                "Immediate attention required. {} critical connections/issues and {} critical listening ports (exposed externally or on all interfaces) identified. These pose a severe threat.",
                summary.critical, critical_listeners
            ),
        });
    }
    if summary.suspicious > 3 || high_risk_listeners_all_interfaces > 0 || suspicious_listeners > 2
    {
        let focus = if high_risk_listeners_all_interfaces > 0 {
            format!(
                "{} high-risk listeners on all interfaces",
                high_risk_listeners_all_interfaces
            )
        } else {
            format!("{} suspicious listening ports", suspicious_listeners)
        };
        return Some(OverallRisk {
            band: RiskBand::High,
            headline: "HIGH RISK",
            detail: format!(
                "High risk profile. {} suspicious items or {}. Prioritize investigation.",
                summary.suspicious, focus
            ),
        });
    }
    if summary.suspicious > 0 || summary.warning > 5 {
        return Some(OverallRisk {
            band: RiskBand::Medium,
            headline: "MEDIUM RISK",
            detail: format!(
                "Medium risk. {} suspicious items and {} warnings detected. Review these findings.",
                summary.suspicious, summary.warning
            ),
        });
    }
    if summary.warning > 0 {
        return Some(OverallRisk {
            band: RiskBand::Low,
            headline: "LOW RISK",
            detail: format!(
                "Low risk. {} warnings identified. Review for optimal security hygiene.",
                summary.warning
            ),
        });
    }
    Some(OverallRisk {
        band: RiskBand::Minimal,
        headline: "MINIMAL RISK",
        detail: "Minimal risk detected based on the provided netstat data. Continue good security practices.".to_string(),
    })
}
