use std::sync::LazyLock;

use regex::Regex;

use crate::ports;

static BRACKETED_V6_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[(.+)\]:(\*|\d+|[A-Za-z0-9_-]+)$").unwrap());

/// Decompose a raw endpoint token into `(ip, port)`.
///
/// Handles universal wildcards, bracketed IPv6, `host:port`, the macOS
/// `host.port` dotted form, and bare port/service tokens. Service names are
/// resolved to canonical port strings through the well-known-port table;
/// unresolvable names pass through unchanged.
pub fn extract_ip_port(endpoint: &str) -> (Option<String>, Option<String>) {
    if endpoint.is_empty() {
        return (None, None);
    }
    if matches!(endpoint, "*" | "*.*" | "0.0.0.0:*" | "[::]:*") {
        let ip = if endpoint == "*.*" {
            "*".to_string()
        } else {
            endpoint.replacen(":*", "", 1)
        };
        return (Some(ip), None);
    }

    if let Some(caps) = BRACKETED_V6_RE.captures(endpoint) {
        let ip = caps[1].to_string();
        let token = &caps[2];
        if token == "*" {
            return (Some(ip), None);
        }
        if is_numeric_token(token) {
            return (Some(ip), Some(token.to_string()));
        }
        return (Some(ip), Some(resolve_service_port(token)));
    }

    // Split on the last colon so bracket-less IPv6 degenerates gracefully.
    if let Some((host, token)) = endpoint.rsplit_once(':') {
        let ip = if host.is_empty() {
            endpoint.to_string()
        } else {
            host.to_string()
        };
        if token == "*" {
            let port = ports::port_for_service(token).map(|p| p.to_string());
            return (Some(ip), port);
        }
        if is_numeric_token(token) {
            return (Some(ip), Some(token.to_string()));
        }
        return (Some(ip), Some(resolve_service_port(token)));
    }

    // No colon: macOS `host.port-or-service` form, split on the last dot.
    if let Some(dot) = endpoint.rfind('.') {
        if dot > 0 && dot < endpoint.len() - 1 {
            let host = &endpoint[..dot];
            let token = &endpoint[dot + 1..];
            if is_numeric_token(token) {
                return (Some(host.to_string()), Some(token.to_string()));
            }
            if let Some(port) = ports::port_for_service(token) {
                return (Some(host.to_string()), Some(port.to_string()));
            }
            return (Some(endpoint.to_string()), None);
        }
    }

    // Bare token: a lone port number or service name, no host part.
    if is_numeric_token(endpoint) {
        (Some("*".to_string()), Some(endpoint.to_string()))
    } else {
        (Some("*".to_string()), Some(resolve_service_port(endpoint)))
    }
}

fn resolve_service_port(token: &str) -> String {
    ports::port_for_service(token)
        .map(|p| p.to_string())
        .unwrap_or_else(|| token.to_string())
}

fn is_numeric_token(token: &str) -> bool {
    token.chars().next().is_some_and(|c| c.is_ascii_digit())
}

const PRIVATE_V4_PREFIXES: &[&str] = &[
    "10.", "172.16.", "172.17.", "172.18.", "172.19.", "172.20.", "172.21.",
    "172.22.", "172.23.", "172.24.", "172.25.", "172.26.", "172.27.", "172.28.",
    "172.29.", "172.30.", "172.31.", "192.168.", "127.", "169.254.",
];

/// RFC1918, loopback, link-local, and unique-local ranges are private;
/// wildcards and unspecified addresses are never public.
pub fn is_public_ip(ip: &str) -> bool {
    if ip.is_empty() || ip == "*" || ip == "0.0.0.0" || ip == "::" {
        return false;
    }
    let lower = ip.to_ascii_lowercase();
    if lower == "::1" || lower == "localhost" {
        return false;
    }
    if lower.starts_with("fe80:") || lower.starts_with("fc00:") || lower.starts_with("fd00:") {
        return false;
    }
    !PRIVATE_V4_PREFIXES.iter().any(|p| ip.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(endpoint: &str) -> (Option<String>, Option<String>) {
        extract_ip_port(endpoint)
    }

    #[test]
    fn test_wildcard_forms() {
        assert_eq!(extract("*"), (Some("*".into()), None));
        assert_eq!(extract("*.*"), (Some("*".into()), None));
        assert_eq!(extract("0.0.0.0:*"), (Some("0.0.0.0".into()), None));
        assert_eq!(extract("[::]:*"), (Some("[::]".into()), None));
        assert_eq!(extract(""), (None, None));
    }

    #[test]
    fn test_ipv4_colon_form() {
        assert_eq!(
            extract("192.168.1.10:443"),
            (Some("192.168.1.10".into()), Some("443".into()))
        );
    }

    #[test]
    fn test_bracketed_ipv6() {
        assert_eq!(
            extract("[::1]:8080"),
            (Some("::1".into()), Some("8080".into()))
        );
        // service name resolves through the port table
        assert_eq!(
            extract("[fe80::1]:https"),
            (Some("fe80::1".into()), Some("443".into()))
        );
        assert_eq!(extract("[::1]:*"), (Some("::1".into()), None));
    }

    #[test]
    fn test_bare_ipv6_splits_on_last_colon() {
        assert_eq!(
            extract("fe80::2e0:4cff:fe68:3:22"),
            (Some("fe80::2e0:4cff:fe68:3".into()), Some("22".into()))
        );
    }

    #[test]
    fn test_macos_dotted_form() {
        assert_eq!(
            extract("127.0.0.1.5432"),
            (Some("127.0.0.1".into()), Some("5432".into()))
        );
        assert_eq!(
            extract("localhost.ssh"),
            (Some("localhost".into()), Some("22".into()))
        );
    }

    #[test]
    fn test_unresolvable_service_passes_through() {
        assert_eq!(
            extract("10.0.0.1:kerberos"),
            (Some("10.0.0.1".into()), Some("kerberos".into()))
        );
    }

    #[test]
    fn test_bare_tokens() {
        assert_eq!(extract("8080"), (Some("*".into()), Some("8080".into())));
        assert_eq!(extract("https"), (Some("*".into()), Some("443".into())));
    }

    #[test]
    fn test_public_ip_classification() {
        assert!(is_public_ip("8.8.8.8"));
        assert!(is_public_ip("172.15.0.1"));
        assert!(!is_public_ip("10.1.2.3"));
        assert!(!is_public_ip("172.20.0.1"));
        assert!(!is_public_ip("192.168.0.1"));
        assert!(!is_public_ip("127.0.0.1"));
        assert!(!is_public_ip("169.254.1.1"));
        assert!(!is_public_ip("::1"));
        assert!(!is_public_ip("fe80::1"));
        assert!(!is_public_ip("localhost"));
        assert!(!is_public_ip("*"));
        assert!(!is_public_ip("0.0.0.0"));
        assert!(!is_public_ip("::"));
    }
}
