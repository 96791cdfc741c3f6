use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// Risk levels: the ordered severity scale every merge in the system uses
// ---------------------------------------------------------------------------

/// Totally ordered severity scale. `Critical` is the most severe, `Unknown`
/// the least. Classification only ever escalates along this order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Critical,
    Suspicious,
    Warning,
    Safe,
    Unknown,
}

impl RiskLevel {
    /// Numeric rank, 0 = most severe. Lower rank always wins a merge.
    pub fn severity_rank(self) -> u8 {
        match self {
            RiskLevel::Critical => 0,
            RiskLevel::Suspicious => 1,
            RiskLevel::Warning => 2,
            RiskLevel::Safe => 3,
            RiskLevel::Unknown => 4,
        }
    }

    pub fn is_more_severe_than(self, other: RiskLevel) -> bool {
        self.severity_rank() < other.severity_rank()
    }

    /// Replace `self` with `candidate` only if the candidate is more severe.
    pub fn escalate_to(&mut self, candidate: RiskLevel) {
        if candidate.is_more_severe_than(*self) {
            *self = candidate;
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Critical => "critical",
            RiskLevel::Suspicious => "suspicious",
            RiskLevel::Warning => "warning",
            RiskLevel::Safe => "safe",
            RiskLevel::Unknown => "unknown",
        }
    }

    pub fn capitalized(self) -> &'static str {
        match self {
            RiskLevel::Critical => "Critical",
            RiskLevel::Suspicious => "Suspicious",
            RiskLevel::Warning => "Warning",
            RiskLevel::Safe => "Safe",
            RiskLevel::Unknown => "Unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot source formats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Windows,
    Linux,
    Macos,
    Generic,
}

impl SourceFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceFormat::Windows => "windows",
            SourceFormat::Linux => "linux",
            SourceFormat::Macos => "macos",
            SourceFormat::Generic => "generic",
        }
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Connections: one record per surviving snapshot line
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub protocol: String,
    pub local_address: String,
    pub foreign_address: String,
    pub state: String,
    pub pid: Option<String>,
    pub raw_line: String,
    pub source_format: SourceFormat,
    pub risk: RiskLevel,
    pub issues: Vec<String>,
}

// ---------------------------------------------------------------------------
// Threat intelligence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ThreatSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatSeverity {
    /// Map indicator severity onto the connection risk scale.
    pub fn risk_level(self) -> RiskLevel {
        match self {
            ThreatSeverity::Low => RiskLevel::Warning,
            ThreatSeverity::Medium => RiskLevel::Suspicious,
            ThreatSeverity::High | ThreatSeverity::Critical => RiskLevel::Critical,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ThreatSeverity::Low => "low",
            ThreatSeverity::Medium => "medium",
            ThreatSeverity::High => "high",
            ThreatSeverity::Critical => "critical",
        }
    }
}

impl Default for ThreatSeverity {
    fn default() -> Self {
        ThreatSeverity::Medium
    }
}

/// A single indicator: an exact IPv4 address or a CIDR block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatIndicator {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub severity: ThreatSeverity,
    #[serde(default)]
    pub source: String,
    #[serde(default = "Utc::now")]
    pub date_added: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// User-defined indicator list. Owned by the surrounding application; the
/// core only reads active lists at classification time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatList {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub entries: Vec<ThreatIndicator>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "Utc::now")]
    pub date_created: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub date_modified: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Aggregate views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListeningPort {
    pub port: Option<String>,
    pub service: String,
    pub risk: RiskLevel,
    /// The original local endpoint token, e.g. `0.0.0.0:23`.
    pub address: String,
    pub protocol: String,
}

/// Aggregate for services bound to the loopback interface, keyed by
/// (port, protocol).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalServiceDetail {
    pub port: String,
    pub protocol: String,
    pub service_name: String,
    pub description: String,
    pub risk: RiskLevel,
    pub associated_pids: Vec<String>,
    pub connection_count: usize,
    pub raw_example_lines: Vec<String>,
}

/// Port-usage histogram bucket, keyed by (port, protocol).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedPortUsageStats {
    pub port: String,
    pub service: String,
    pub protocol: String,
    pub count: usize,
    pub risk: RiskLevel,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpAnalysisDetail {
    pub ip: String,
    pub connections: usize,
    pub ports: BTreeSet<String>,
    pub is_public: bool,
    pub risk: RiskLevel,
}

/// One deduplicated local/foreign endpoint-pair interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskMatrixCell {
    pub id: String,
    pub local_address: String,
    pub local_ip: Option<String>,
    pub local_port: Option<String>,
    pub foreign_address: String,
    pub foreign_ip: Option<String>,
    pub foreign_port: Option<String>,
    pub protocol: String,
    pub risk: RiskLevel,
    pub connection_count: usize,
    pub states: BTreeSet<String>,
    pub issues: Vec<String>,
    pub aggregated_pids: BTreeSet<String>,
    pub is_listener_interaction: bool,
}

// ---------------------------------------------------------------------------
// Recommendations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    Critical,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<String>,
}

// ---------------------------------------------------------------------------
// The result: top-level container, primary API contract
// ---------------------------------------------------------------------------

/// Per-severity connection counts. `unknown` never occurs during
/// classification (risk starts at `safe` and only escalates), so it has no
/// slot here; `record` ignores it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub safe: usize,
    pub warning: usize,
    pub suspicious: usize,
    pub critical: usize,
}

impl AnalysisSummary {
    pub fn record(&mut self, risk: RiskLevel) {
        match risk {
            RiskLevel::Safe => self.safe += 1,
            RiskLevel::Warning => self.warning += 1,
            RiskLevel::Suspicious => self.suspicious += 1,
            RiskLevel::Critical => self.critical += 1,
            RiskLevel::Unknown => {}
        }
    }

    pub fn total(&self) -> usize {
        self.safe + self.warning + self.suspicious + self.critical
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub total_connections: usize,
    pub format: SourceFormat,
    pub listening_ports: Vec<ListeningPort>,
    pub loopback_services: Vec<LocalServiceDetail>,
    /// Every connection whose final risk is worse than `safe`.
    pub flagged_connections: Vec<Connection>,
    pub established_connections: Vec<Connection>,
    pub summary: AnalysisSummary,
    pub ip_analysis: BTreeMap<String, IpAnalysisDetail>,
    pub recommendations: Vec<Recommendation>,
    pub local_port_activity: Vec<DetailedPortUsageStats>,
    pub foreign_port_activity: Vec<DetailedPortUsageStats>,
    pub risk_matrix: Vec<RiskMatrixCell>,
    /// Set exactly when zero connections survived parsing; all other fields
    /// are empty in that case.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResult {
    pub fn empty(format: SourceFormat, error: Option<String>) -> Self {
        Self {
            total_connections: 0,
            format,
            listening_ports: Vec::new(),
            loopback_services: Vec::new(),
            flagged_connections: Vec::new(),
            established_connections: Vec::new(),
            summary: AnalysisSummary::default(),
            ip_analysis: BTreeMap::new(),
            recommendations: Vec::new(),
            local_port_activity: Vec::new(),
            foreign_port_activity: Vec::new(),
            risk_matrix: Vec::new(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(RiskLevel::Critical.is_more_severe_than(RiskLevel::Suspicious));
        assert!(RiskLevel::Suspicious.is_more_severe_than(RiskLevel::Warning));
        assert!(RiskLevel::Warning.is_more_severe_than(RiskLevel::Safe));
        assert!(RiskLevel::Safe.is_more_severe_than(RiskLevel::Unknown));
        assert!(!RiskLevel::Unknown.is_more_severe_than(RiskLevel::Unknown));
    }

    #[test]
    fn test_escalation_is_monotone() {
        let mut risk = RiskLevel::Safe;
        risk.escalate_to(RiskLevel::Warning);
        assert_eq!(risk, RiskLevel::Warning);
        risk.escalate_to(RiskLevel::Safe);
        assert_eq!(risk, RiskLevel::Warning);
        risk.escalate_to(RiskLevel::Unknown);
        assert_eq!(risk, RiskLevel::Warning);
        risk.escalate_to(RiskLevel::Critical);
        assert_eq!(risk, RiskLevel::Critical);
    }

    #[test]
    fn test_threat_severity_mapping() {
        assert_eq!(ThreatSeverity::Low.risk_level(), RiskLevel::Warning);
        assert_eq!(ThreatSeverity::Medium.risk_level(), RiskLevel::Suspicious);
        assert_eq!(ThreatSeverity::High.risk_level(), RiskLevel::Critical);
        assert_eq!(ThreatSeverity::Critical.risk_level(), RiskLevel::Critical);
    }

    #[test]
    fn test_summary_ignores_unknown() {
        let mut summary = AnalysisSummary::default();
        summary.record(RiskLevel::Safe);
        summary.record(RiskLevel::Critical);
        summary.record(RiskLevel::Unknown);
        assert_eq!(summary.total(), 2);
    }
}
