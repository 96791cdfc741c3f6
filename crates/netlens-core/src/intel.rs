use std::collections::HashSet;
use std::net::Ipv4Addr;

use crate::models::{ThreatList, ThreatSeverity};

pub const BUILTIN_SOURCE: &str = "Built-in Threat Intel";
const BUILTIN_DESCRIPTION: &str = "Known malicious IP from built-in threat intelligence";

/// Static critical indicator set: exact IPv4 addresses with known-bad
/// reputation, baked into the binary.
const BUILTIN_CRITICAL_IPS: &[&str] = &[
    "81.19.208.112", "45.146.54.61", "185.220.101.188", "169.150.219.149",
    "209.141.45.189", "5.189.140.45", "163.125.203.239", "195.80.150.186",
    "172.98.33.101", "181.41.206.140", "216.24.212.177", "154.16.192.215",
    "156.146.45.112", "80.246.28.92", "91.132.22.237", "157.97.134.73",
    "146.70.52.202", "185.153.177.33", "95.181.238.95", "172.94.87.70",
    "36.104.198.27", "193.43.135.246", "102.129.153.107", "134.19.179.155",
    "140.228.24.215", "2.56.252.242", "217.146.90.10", "79.142.197.173",
    "84.53.229.249", "31.170.22.21", "175.10.18.144", "116.98.116.44",
    "156.146.56.118", "154.16.192.31", "46.166.191.25", "37.120.210.219",
    "173.239.218.3", "81.162.64.120", "37.19.199.65", "37.120.233.252",
    "120.229.32.100", "94.134.181.133", "140.228.24.171", "68.235.48.108",
    "101.71.38.244", "91.90.44.25", "136.158.10.127", "178.249.214.137",
    "84.17.46.192", "193.32.249.163", "95.174.65.157", "136.144.35.232",
    "140.228.24.24", "172.98.92.52", "172.98.33.77", "219.100.37.240",
    "194.61.41.27", "45.8.68.59", "84.17.46.220", "185.225.234.37",
    "154.47.24.79", "5.182.32.55", "196.240.54.6", "84.247.59.197",
    "162.221.207.99", "213.152.187.230", "66.115.189.171", "112.132.249.170",
    "102.129.252.137", "84.17.46.27", "51.79.240.216", "109.202.99.41",
    "217.138.192.219", "191.96.106.164", "185.199.103.89", "194.156.136.42",
    "102.129.145.79", "185.202.220.45", "138.199.62.3", "37.19.221.32",
    "212.102.46.213", "162.216.47.203", "195.181.172.204", "223.252.34.57",
    "154.16.192.112", "46.166.191.29", "138.199.60.166", "181.214.94.104",
    "212.7.202.204", "192.109.205.223", "156.146.60.135", "223.73.64.230",
    "178.249.214.10", "172.98.87.242", "192.99.4.116", "138.199.60.10",
    "117.5.152.164", "223.252.34.41", "191.101.31.235", "45.132.225.245",
    "149.57.16.187", "77.81.142.13", "185.236.42.52", "45.87.214.100",
    "185.65.134.167", "85.95.179.59", "185.107.80.201", "85.194.207.76",
    "46.166.191.26", "185.218.127.161", "157.97.121.221", "217.138.252.205",
    "193.37.253.60", "172.93.177.172", "179.6.164.5", "95.111.230.250",
    "181.41.206.225", "77.234.43.189", "83.220.239.26", "31.206.121.191",
    "136.144.17.183", "156.146.60.79", "193.37.33.137", "84.17.52.84",
    "213.21.209.40", "157.254.225.137", "157.97.134.109", "193.176.31.125",
    "149.34.253.149", "185.220.101.154", "216.24.212.146", "181.214.150.104",
    "154.16.192.57", "185.203.122.184", "178.249.214.138", "193.176.31.60",
    "172.93.207.197", "178.239.163.110", "181.214.166.146", "194.61.41.74",
    "159.253.173.154", "45.8.68.39", "154.6.89.152", "189.201.145.130",
    "188.213.34.5", "213.152.176.252", "192.166.244.244", "149.57.16.156",
    "213.232.87.230", "157.97.134.156", "176.100.43.56", "169.150.232.188",
    "79.142.69.236", "91.90.126.84", "89.238.186.122", "192.145.116.249",
    "185.153.176.212", "143.244.48.4", "181.41.206.181", "79.173.88.48",
    "46.166.191.27", "149.36.49.174", "191.96.206.23", "172.93.207.45",
    "185.203.218.159", "185.220.100.251", "157.97.134.45", "169.150.196.18",
    "77.40.62.85", "178.249.214.130", "154.6.95.8", "181.41.202.137",
    "154.16.192.188", "185.23.214.43", "81.19.208.84", "37.19.217.245",
    "106.8.130.229", "165.231.182.146", "193.56.116.217", "37.19.196.102",
    "2.63.249.198", "85.174.203.197", "159.48.55.5", "103.231.88.22",
    "161.129.70.219", "102.129.235.75", "146.70.97.248", "154.6.83.17",
    "77.222.107.192", "191.101.41.30", "178.214.246.84", "188.126.94.109",
    "185.107.44.212", "37.19.200.26", "43.225.189.87", "59.173.200.234",
    "5.182.110.23", "191.96.255.138", "95.181.238.12", "163.125.203.248",
    "138.199.24.6", "138.199.10.10", "37.120.246.135", "193.19.205.174",
    "185.107.44.18", "146.70.34.90", "101.71.38.52", "174.240.251.6",
    "115.56.112.241", "192.145.117.51", "154.6.82.8", "188.191.238.51",
    "23.26.222.70", "185.236.42.26", "193.19.109.129", "156.146.57.44",
    "212.102.35.16", "45.133.180.10", "193.176.31.68", "185.177.124.148",
    "185.225.234.39", "136.144.42.155", "216.131.84.27", "185.162.184.14",
    "184.170.241.107", "176.113.72.213", "84.17.47.120", "45.134.140.142",
    "185.132.134.202", "45.91.23.141", "185.210.143.133", "45.85.144.247",
    "117.120.9.38", "213.87.160.4", "185.216.34.214", "146.70.65.145",
    "94.140.8.239", "185.229.59.129", "185.219.143.181", "185.77.217.75",
    "37.140.223.198", "79.142.69.160", "178.175.128.44", "172.98.92.62",
    "103.163.220.33", "59.153.220.18", "37.19.217.41", "94.140.8.217",
    "45.132.226.197", "82.180.149.203", "94.140.8.156", "191.96.37.164",
    "185.236.42.43", "157.97.121.109", "185.236.42.55", "181.214.218.187",
    "2.57.171.45", "154.28.188.136", "184.170.252.201", "94.46.24.59",
    "82.118.30.80", "192.166.244.241", "102.129.152.99", "169.150.204.4",
    "195.200.245.17", "212.102.39.154", "120.233.127.196", "173.239.254.196",
    "191.96.103.149", "194.233.98.20", "192.166.247.92", "178.72.71.22",
    "85.93.59.224", "191.96.168.75", "36.153.85.5", "185.189.114.94",
    "188.126.73.217", "109.70.150.100", "23.152.225.6", "138.199.29.231",
    "159.242.228.184", "38.242.7.253", "91.234.192.236", "184.170.242.25",
    "176.67.84.5", "125.201.224.54", "140.250.206.85", "185.15.38.89",
    "143.244.44.61", "192.166.246.12", "185.202.221.62", "89.37.173.42",
    "185.146.232.168", "73.93.39.154", "208.78.42.217", "82.102.23.158",
    "173.245.217.76", "71.19.251.161", "91.219.214.172", "45.130.203.200",
    "173.255.175.7", "172.58.139.95", "104.254.90.203", "196.196.232.10",
    "188.241.177.107", "23.129.64.250", "185.215.181.223", "199.59.243.222",
    "192.142.227.18", "91.90.126.79", "184.75.221.211", "157.97.134.116",
    "198.54.133.35", "194.32.122.23", "89.46.223.184", "173.244.49.17",
    "154.6.82.145", "185.213.82.115", "173.255.172.157", "23.152.225.11",
    "146.70.137.42", "216.73.160.236", "5.182.110.171", "216.24.212.16",
    "85.9.20.135", "85.9.20.149", "87.249.134.10", "213.152.161.170",
    "102.129.235.27", "45.144.113.48", "75.184.103.239", "5.182.110.124",
    "185.211.32.2", "191.96.36.105", "193.43.135.104", "85.24.253.49",
    "213.232.87.234", "37.19.221.83", "43.239.85.192", "178.17.170.169",
    "125.206.32.30", "84.17.37.157", "1.165.96.74", "193.176.31.78",
    "185.153.151.147", "185.206.225.235", "77.81.142.29", "102.129.143.60",
    "81.162.64.208", "159.242.228.94", "188.126.73.222", "195.200.221.44",
    "51.158.22.143", "121.228.196.44", "181.215.176.114", "85.203.34.137",
    "208.78.41.68", "107.189.5.217", "185.132.179.9", "212.102.53.84",
    "31.173.86.103", "200.105.82.83", "156.146.45.101", "188.241.177.252",
    "181.214.94.93", "172.98.80.125", "148.72.164.107", "86.48.12.211",
    "178.249.214.136", "194.187.251.155", "185.236.42.31", "143.244.42.95",
    "185.84.35.218", "156.146.46.204", "176.100.43.129", "185.21.216.197",
    "138.199.22.146", "216.73.161.122", "181.214.150.107", "85.9.20.248",
    "154.6.85.27", "58.221.37.66", "45.248.78.197", "185.65.134.165",
    "173.239.214.125", "180.248.3.85", "176.67.86.91", "212.102.47.9",
    "92.60.40.227", "212.102.47.84", "185.223.152.36", "185.153.179.59",
    "45.146.54.173", "136.144.35.124", "102.129.153.61", "212.102.40.77",
    "156.146.54.200", "157.97.134.163", "185.229.59.86", "143.244.42.104",
    "199.58.83.12", "5.62.43.111", "91.90.126.4", "178.255.168.226",
    "173.239.196.161", "178.255.154.106", "185.65.135.157", "188.214.152.69",
    "213.232.87.228", "62.182.82.10", "92.119.36.30", "185.254.75.55",
    "41.216.202.180", "80.78.26.147", "118.160.6.199", "185.153.179.17",
    "181.214.94.206", "122.177.111.205", "91.90.126.132", "185.216.74.10",
    "143.244.44.70", "103.204.169.244", "112.118.234.84", "37.140.254.21",
    "199.249.230.27", "188.170.76.124", "116.27.219.130", "163.125.203.246",
    "178.255.154.181", "91.218.89.89", "192.145.116.26", "212.188.11.146",
    "77.247.246.213", "154.6.95.147", "195.181.162.163", "91.90.120.135",
    "212.102.42.90",
];

/// The outcome of a threat-intel lookup, borrowing descriptive fields from
/// the matched entry (or the built-in constants).
#[derive(Debug, Clone)]
pub struct IntelMatch<'a> {
    pub ip: String,
    pub description: &'a str,
    pub severity: ThreatSeverity,
    pub source: &'a str,
}

impl IntelMatch<'_> {
    pub fn risk_level(&self) -> crate::models::RiskLevel {
        self.severity.risk_level()
    }
}

/// Matches IPs against the built-in set first, then the active user lists in
/// order. First matching entry wins; severities are not merged across
/// multiple matches.
pub struct ThreatIntelMatcher<'a> {
    builtin: HashSet<&'static str>,
    lists: &'a [ThreatList],
}

impl<'a> ThreatIntelMatcher<'a> {
    pub fn new(lists: &'a [ThreatList]) -> Self {
        Self {
            builtin: BUILTIN_CRITICAL_IPS.iter().copied().collect(),
            lists,
        }
    }

    pub fn match_ip(&self, ip: &str) -> Option<IntelMatch<'a>> {
        if self.builtin.contains(ip) {
            return Some(IntelMatch {
                ip: ip.to_string(),
                description: BUILTIN_DESCRIPTION,
                severity: ThreatSeverity::Critical,
                source: BUILTIN_SOURCE,
            });
        }

        for list in self.lists {
            if !list.is_active {
                continue;
            }
            for entry in &list.entries {
                if entry.ip == ip || (entry.ip.contains('/') && cidr_contains(ip, &entry.ip)) {
                    return Some(IntelMatch {
                        ip: ip.to_string(),
                        description: &entry.description,
                        severity: entry.severity,
                        source: &entry.source,
                    });
                }
            }
        }
        None
    }
}

/// True when `ip` falls inside the IPv4 CIDR block `cidr`. A value without a
/// `/` is compared for exact equality. Malformed input never matches.
pub fn cidr_contains(ip: &str, cidr: &str) -> bool {
    let Some((network, prefix)) = cidr.split_once('/') else {
        return ip == cidr;
    };
    let Ok(network) = network.parse::<Ipv4Addr>() else {
        return false;
    };
    let Ok(ip) = ip.parse::<Ipv4Addr>() else {
        return false;
    };
    let Ok(prefix) = prefix.parse::<u32>() else {
        return false;
    };
    if prefix > 32 {
        return false;
    }
    let mask = u32::MAX.checked_shl(32 - prefix).unwrap_or(0);
    (u32::from(network) & mask) == (u32::from(ip) & mask)
}
