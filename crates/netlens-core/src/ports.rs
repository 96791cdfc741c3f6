use crate::models::RiskLevel;

/// One row of the well-known-port table. Loaded once, immutable.
#[derive(Debug, Clone, Copy)]
pub struct WellKnownPortDetail {
    pub name: &'static str,
    pub risk: RiskLevel,
    pub description: &'static str,
}

/// Baseline service knowledge keyed by port-as-string. The table is small
/// enough that a linear scan beats building a map per analysis.
const WELL_KNOWN_PORTS: &[(&str, WellKnownPortDetail)] = &[
    ("1", WellKnownPortDetail { name: "TCPMUX", risk: RiskLevel::Critical, description: "TCP Port Service Multiplexer (TCPMUX). Historic IANA assignment (TCP: Yes, UDP: Assigned). Rarely used legitimately; exposure can indicate misconfiguration or be an exploit vector." }),
    ("7", WellKnownPortDetail { name: "Echo", risk: RiskLevel::Unknown, description: "Echo Protocol (TCP/UDP: Yes). Used for testing network connectivity. Can be abused for DDoS amplification (UDP)." }),
    ("9", WellKnownPortDetail { name: "Discard", risk: RiskLevel::Unknown, description: "Discard Protocol (TCP/UDP: Yes). Discards any data received. Can be abused for DDoS amplification (UDP CHARGEN/Discard). Some systems use UDP 9 for Wake-on-LAN (Unofficial)." }),
    ("13", WellKnownPortDetail { name: "Daytime", risk: RiskLevel::Unknown, description: "Daytime Protocol (TCP/UDP: Yes). Returns current date and time. Minor information disclosure risk." }),
    ("19", WellKnownPortDetail { name: "CHARGEN", risk: RiskLevel::Warning, description: "Character Generator Protocol (TCP/UDP: Yes). Generates a stream of characters. Can be abused for DDoS amplification (UDP CHARGEN/Discard)." }),
    ("20", WellKnownPortDetail { name: "FTP Data", risk: RiskLevel::Suspicious, description: "File Transfer Protocol (FTP) Data Transfer (TCP: Yes, UDP: Assigned). Unencrypted data channel for FTP." }),
    ("21", WellKnownPortDetail { name: "FTP Control", risk: RiskLevel::Suspicious, description: "File Transfer Protocol (FTP) Control/Command (TCP: Yes, UDP: Assigned). Unencrypted, transmits credentials in plaintext." }),
    ("22", WellKnownPortDetail { name: "SSH", risk: RiskLevel::Safe, description: "Secure Shell (SSH) (TCP: Yes, UDP: Assigned). Encrypted remote login, file transfer (scp, sftp), and port forwarding." }),
    ("23", WellKnownPortDetail { name: "Telnet", risk: RiskLevel::Critical, description: "Telnet (TCP: Yes, UDP: Assigned). Unencrypted text communications, including credentials. Highly insecure." }),
    ("25", WellKnownPortDetail { name: "SMTP", risk: RiskLevel::Warning, description: "Simple Mail Transfer Protocol (SMTP) (TCP: Yes, UDP: Assigned). Used for email routing. Often unencrypted by default, can be abused for spam if open relay." }),
    ("53", WellKnownPortDetail { name: "DNS", risk: RiskLevel::Safe, description: "Domain Name System (DNS) (TCP/UDP: Yes). Essential for resolving hostnames to IP addresses." }),
    ("67", WellKnownPortDetail { name: "BOOTP Server / DHCP", risk: RiskLevel::Safe, description: "Bootstrap Protocol (BOOTP) Server / Dynamic Host Configuration Protocol (DHCP) (UDP: Yes). Used for assigning IP addresses and network configuration. Typically internal." }),
    ("68", WellKnownPortDetail { name: "BOOTP Client / DHCP", risk: RiskLevel::Safe, description: "Bootstrap Protocol (BOOTP) Client / Dynamic Host Configuration Protocol (DHCP) (UDP: Yes). Used by clients to obtain IP addresses. Typically internal." }),
    ("69", WellKnownPortDetail { name: "TFTP", risk: RiskLevel::Warning, description: "Trivial File Transfer Protocol (TFTP) (UDP: Yes). Simplified file transfer, no authentication. Often used for network booting or device configuration. Can be a security risk if exposed." }),
    ("79", WellKnownPortDetail { name: "Finger", risk: RiskLevel::Warning, description: "Finger Protocol (TCP/UDP: Yes). Provides information about users on a system. Can disclose sensitive user information." }),
    ("80", WellKnownPortDetail { name: "HTTP", risk: RiskLevel::Warning, description: "Hypertext Transfer Protocol (HTTP) (TCP: Yes, UDP: Yes for QUIC/HTTP3). Unencrypted web traffic. Vulnerable to eavesdropping and modification." }),
    ("109", WellKnownPortDetail { name: "POP2", risk: RiskLevel::Warning, description: "Post Office Protocol version 2 (POP2) (TCP: Yes, UDP: Assigned). Older email retrieval protocol, often unencrypted." }),
    ("110", WellKnownPortDetail { name: "POP3", risk: RiskLevel::Warning, description: "Post Office Protocol version 3 (POP3) (TCP: Yes, UDP: Assigned). Email retrieval, transmits credentials and messages in plaintext if not secured (use POP3S on 995)." }),
    ("111", WellKnownPortDetail { name: "RPC Portmapper", risk: RiskLevel::Warning, description: "ONC RPC (Portmapper/sunrpc) (TCP/UDP: Yes). Maps RPC services to ports. Can be queried to enumerate RPC services, potentially exposing vulnerabilities if services are insecure." }),
    ("113", WellKnownPortDetail { name: "Ident/Auth", risk: RiskLevel::Unknown, description: "Identification Protocol (Ident) / Authentication Service (Auth) (TCP: Yes). Used by some services (e.g., IRC) to identify user of a connection. Can be spoofed or blocked." }),
    ("123", WellKnownPortDetail { name: "NTP", risk: RiskLevel::Safe, description: "Network Time Protocol (NTP) (UDP: Yes). Used for time synchronization. Essential for logging and security systems. Can be abused for DDoS amplification if server is misconfigured." }),
    ("135", WellKnownPortDetail { name: "MS RPC EPMAP", risk: RiskLevel::Suspicious, description: "Microsoft RPC Endpoint Mapper (EPMAP / DCE/RPC Locator) (TCP/UDP: Yes). Used by Windows services (DHCP, DNS, WINS, DCOM). Historically vulnerable and targeted if exposed externally." }),
    ("137", WellKnownPortDetail { name: "NetBIOS-NS", risk: RiskLevel::Suspicious, description: "NetBIOS Name Service (TCP/UDP: Yes). Used for name registration and resolution in NetBIOS networks. Can leak system information and be targeted." }),
    ("138", WellKnownPortDetail { name: "NetBIOS-DGM", risk: RiskLevel::Suspicious, description: "NetBIOS Datagram Service (UDP: Yes). Connectionless NetBIOS communication. Part of legacy Windows networking, often targeted." }),
    ("139", WellKnownPortDetail { name: "NetBIOS-SSN", risk: RiskLevel::Suspicious, description: "NetBIOS Session Service (TCP: Yes). Used for connection-oriented NetBIOS services like file/printer sharing over SMB. Often targeted with SMB vulnerabilities." }),
    ("143", WellKnownPortDetail { name: "IMAP", risk: RiskLevel::Warning, description: "Internet Message Access Protocol (IMAP) (TCP: Yes, UDP: Assigned). Email management on server. Transmits credentials/messages in plaintext if not secured (use IMAPS on 993)." }),
    ("161", WellKnownPortDetail { name: "SNMP", risk: RiskLevel::Warning, description: "Simple Network Management Protocol (SNMP) (UDP: Yes). Used for network device management. Default community strings (public/private) are a major risk if exposed." }),
    ("162", WellKnownPortDetail { name: "SNMPTRAP", risk: RiskLevel::Warning, description: "Simple Network Management Protocol Trap (SNMPTRAP) (TCP/UDP: Yes). Used for devices to send unsolicited alerts to an SNMP manager. Ensure traps do not contain sensitive data if exposed." }),
    ("389", WellKnownPortDetail { name: "LDAP", risk: RiskLevel::Warning, description: "Lightweight Directory Access Protocol (LDAP) (TCP/UDP: Yes). Used for accessing directory services. Can transmit data unencrypted; use LDAPS on 636." }),
    ("443", WellKnownPortDetail { name: "HTTPS", risk: RiskLevel::Safe, description: "Hypertext Transfer Protocol Secure (HTTPS) (TCP: Yes, UDP: Yes for QUIC/HTTP3). Encrypted web communication using TLS/SSL." }),
    ("445", WellKnownPortDetail { name: "Microsoft-DS (SMB)", risk: RiskLevel::Suspicious, description: "Microsoft Directory Services / Server Message Block (SMB) (TCP: Yes, UDP: Assigned). Used for file/printer sharing, Active Directory. Historically vulnerable (e.g., WannaCry, NotPetya) if exposed, especially to the internet." }),
    ("465", WellKnownPortDetail { name: "SMTPS (Implicit TLS)", risk: RiskLevel::Safe, description: "Authenticated SMTP over TLS/SSL (URL Rendezvous Directory for Cisco SSM / Message Submission over TLS) (TCP: Yes). Secure email submission. Preferred over STARTTLS on port 587 by some clients." }),
    ("500", WellKnownPortDetail { name: "ISAKMP/IKE", risk: RiskLevel::Warning, description: "Internet Security Association and Key Management Protocol (ISAKMP) / Internet Key Exchange (IKE) (UDP: Yes). Used for VPN key exchange (IPsec). Ensure strong ciphers and keys." }),
    ("512", WellKnownPortDetail { name: "rexec / comsat", risk: RiskLevel::Critical, description: "Remote Process Execution (rexec) (TCP: Yes) / comsat biff client (UDP: Yes). Rexec is highly insecure. Comsat notifies users of new mail." }),
    ("513", WellKnownPortDetail { name: "rlogin / Who", risk: RiskLevel::Critical, description: "Remote Login (rlogin) (TCP: Yes) / Who service (UDP: Yes). Rlogin is highly insecure. Who provides list of logged-in users." }),
    ("514", WellKnownPortDetail { name: "rsh / Syslog", risk: RiskLevel::Critical, description: "Remote Shell (rsh/remsh) (TCP: Unofficial) / Syslog (UDP: Yes). Rsh is highly insecure. Syslog is used for system logging; UDP syslog can be spoofed." }),
    ("515", WellKnownPortDetail { name: "LPD", risk: RiskLevel::Warning, description: "Line Printer Daemon (LPD) (TCP: Yes, UDP: Assigned). Network print service. Can be exploited if misconfigured." }),
    ("548", WellKnownPortDetail { name: "AFP", risk: RiskLevel::Warning, description: "Apple Filing Protocol (AFP) (TCP: Yes, UDP: Assigned). File sharing for macOS. Ensure strong authentication and limit exposure." }),
    ("587", WellKnownPortDetail { name: "SMTP Submission (STARTTLS)", risk: RiskLevel::Safe, description: "Email Message Submission (SMTP with STARTTLS) (TCP: Yes, UDP: Assigned). Standard port for email clients to submit mail to a server, typically secured with STARTTLS." }),
    ("631", WellKnownPortDetail { name: "IPP / CUPS", risk: RiskLevel::Warning, description: "Internet Printing Protocol (IPP) (TCP/UDP: Yes). Used for network printing (e.g., CUPS). Ensure administrative interfaces are secured." }),
    ("636", WellKnownPortDetail { name: "LDAPS", risk: RiskLevel::Safe, description: "Lightweight Directory Access Protocol over TLS/SSL (LDAPS) (TCP: Yes, UDP: Assigned). Secure directory access." }),
    ("990", WellKnownPortDetail { name: "FTPS Control", risk: RiskLevel::Safe, description: "FTP over TLS/SSL (FTPS) Control (TCP: Yes). Secure (encrypted) FTP control channel." }),
    ("992", WellKnownPortDetail { name: "TelnetS", risk: RiskLevel::Warning, description: "Telnet over TLS/SSL (TCP: Yes). Encrypted Telnet. While better than Telnet, SSH is generally preferred." }),
    ("993", WellKnownPortDetail { name: "IMAPS", risk: RiskLevel::Safe, description: "Internet Message Access Protocol over TLS/SSL (IMAPS) (TCP: Yes, UDP: Assigned). Secure email management." }),
    ("995", WellKnownPortDetail { name: "POP3S", risk: RiskLevel::Safe, description: "Post Office Protocol 3 over TLS/SSL (POP3S) (TCP: Yes). Secure email retrieval." }),
    ("1080", WellKnownPortDetail { name: "SOCKS Proxy", risk: RiskLevel::Warning, description: "SOCKS Proxy (TCP: Yes). Network proxy protocol. Can be misused if open or misconfigured." }),
    ("1433", WellKnownPortDetail { name: "MSSQL Server", risk: RiskLevel::Suspicious, description: "Microsoft SQL Server (MSSQL) Server (TCP/UDP: Yes). Database service. Critical target if exposed; ensure strong authentication, patching, and network restrictions." }),
    ("1434", WellKnownPortDetail { name: "MSSQL Monitor", risk: RiskLevel::Warning, description: "Microsoft SQL Server (MSSQL) Monitor (UDP: Yes). Used to discover SQL Server instances. Can reveal information about database servers." }),
    ("1723", WellKnownPortDetail { name: "PPTP", risk: RiskLevel::Suspicious, description: "Point-to-Point Tunneling Protocol (PPTP) (TCP/UDP: Yes). VPN protocol with known security weaknesses. Avoid if possible; use stronger VPN protocols like IPsec or OpenVPN." }),
    ("3306", WellKnownPortDetail { name: "MySQL", risk: RiskLevel::Warning, description: "MySQL Database System (TCP/UDP: Yes). Database service. Ensure strong passwords, network restrictions, and regular patching." }),
    ("3389", WellKnownPortDetail { name: "RDP / WBT", risk: RiskLevel::Suspicious, description: "Remote Desktop Protocol (RDP) / Windows Based Terminal (WBT) (TCP/UDP: Yes). Often targeted for unauthorized access if exposed, especially to the internet. Secure with VPN, strong passwords, MFA, and Network Level Authentication." }),
    ("5060", WellKnownPortDetail { name: "SIP", risk: RiskLevel::Warning, description: "Session Initiation Protocol (SIP) (TCP/UDP: Yes). Used for VoIP signaling. Can be targeted for toll fraud or denial of service if unsecured." }),
    ("5061", WellKnownPortDetail { name: "SIPS", risk: RiskLevel::Safe, description: "Session Initiation Protocol over TLS (SIPS) (TCP: Yes). Secure VoIP signaling." }),
    ("5353", WellKnownPortDetail { name: "mDNS", risk: RiskLevel::Unknown, description: "Multicast DNS (mDNS) (UDP: Yes). Used for zero-configuration service discovery on local networks (e.g., Bonjour, Avahi). Generally safe on trusted networks but can leak host information." }),
    ("5432", WellKnownPortDetail { name: "PostgreSQL", risk: RiskLevel::Warning, description: "PostgreSQL Database (TCP/UDP: Yes). Database service. Ensure strong passwords, network restrictions, and regular patching." }),
    ("5900", WellKnownPortDetail { name: "VNC", risk: RiskLevel::Suspicious, description: "Virtual Network Computing (VNC) / Remote Frame Buffer (RFB) (TCP: Yes). Remote desktop, often unencrypted or weakly secured by default. Ensure strong passwords or use VNC over SSH." }),
    ("5938", WellKnownPortDetail { name: "TeamViewer", risk: RiskLevel::Warning, description: "TeamViewer Remote Desktop (UDP: Unofficial). Remote desktop software. Ensure legitimate use, strong passwords, and 2FA. Manage unattended access carefully." }),
    ("6379", WellKnownPortDetail { name: "Redis", risk: RiskLevel::Warning, description: "Redis Key-Value Store (TCP: Yes). In-memory data store. Ensure proper authentication (Redis 6+) and network configuration; can be exploited if exposed unauthenticated." }),
    ("8080", WellKnownPortDetail { name: "HTTP Alternate", risk: RiskLevel::Warning, description: "HTTP Alternate (often used for web proxies or secondary web servers) (TCP: Yes). Similar risks to HTTP (Port 80) if unencrypted. Common for application servers like Tomcat." }),
    ("27017", WellKnownPortDetail { name: "MongoDB", risk: RiskLevel::Warning, description: "MongoDB Database (TCP: Unofficial). NoSQL database. Ensure proper authentication, network configuration, and authorization; historically found exposed." }),
    ("61000", WellKnownPortDetail { name: "Expected Operational Port", risk: RiskLevel::Safe, description: "Often used by specific applications for operational purposes. Verify its use aligns with expected software behavior on your system." }),
];

pub fn lookup(port: &str) -> Option<&'static WellKnownPortDetail> {
    WELL_KNOWN_PORTS
        .iter()
        .find(|(p, _)| *p == port)
        .map(|(_, detail)| detail)
}

/// Resolve a service name (as it appears in endpoint tokens like
/// `localhost.postgresql`) back to its canonical port string.
pub fn port_for_service(service: &str) -> Option<&'static str> {
    WELL_KNOWN_PORTS
        .iter()
        .find(|(_, detail)| detail.name.eq_ignore_ascii_case(service))
        .map(|(port, _)| *port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_ports() {
        let telnet = lookup("23").unwrap();
        assert_eq!(telnet.name, "Telnet");
        assert_eq!(telnet.risk, RiskLevel::Critical);

        let postgres = lookup("5432").unwrap();
        assert_eq!(postgres.name, "PostgreSQL");
        assert_eq!(postgres.risk, RiskLevel::Warning);

        assert!(lookup("49152").is_none());
    }

    #[test]
    fn test_service_name_resolution() {
        assert_eq!(port_for_service("ssh"), Some("22"));
        assert_eq!(port_for_service("HTTPS"), Some("443"));
        assert_eq!(port_for_service("no-such-service"), None);
    }
}
