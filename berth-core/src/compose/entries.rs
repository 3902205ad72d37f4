//! Short-syntax entry parsing for service ports and volumes.

use crate::types::Protocol;
use std::net::IpAddr;

/// A parsed `ports` entry: `"[[ip:]host:]container[/protocol]"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortEntry {
    /// Host interface to publish on; all interfaces when absent
    pub host_ip: Option<String>,

    /// Published host port, absent for expose-only entries
    pub host_port: Option<u16>,

    /// Port inside the container
    pub container_port: u16,

    /// Transport protocol (defaults to tcp)
    pub protocol: Protocol,
}

impl PortEntry {
    /// Parse a short-syntax port entry.
    ///
    /// A leading host IP (`127.0.0.1:8080:80`) restricts publishing to that interface.
    pub fn parse(entry: &str) -> Result<Self, String> {
        let entry = entry.trim();
        let (ports, protocol) = match entry.rsplit_once('/') {
            Some((ports, proto)) => (ports, proto.parse::<Protocol>()?),
            None => (entry, Protocol::Tcp),
        };

        let parts: Vec<&str> = ports.split(':').collect();
        let (ip, host, container) = match parts.as_slice() {
            [container] => (None, None, *container),
            [host, container] => (None, Some(*host), *container),
            [ip, host, container] => (Some(*ip), Some(*host), *container),
            _ => return Err(format!("'{}' is not in HOST:CONTAINER form", entry)),
        };

        let host_ip = match ip {
            Some(ip) if ip.parse::<IpAddr>().is_err() => {
                return Err(format!("'{}' has invalid host IP '{}'", entry, ip))
            }
            Some(ip) => Some(ip.to_string()),
            None => None,
        };

        let host_port = match host {
            Some(h) if !h.is_empty() => Some(parse_port_number(h, entry)?),
            _ => None,
        };
        let container_port = parse_port_number(container, entry)?;

        Ok(Self { host_ip, host_port, container_port, protocol })
    }
}

fn parse_port_number(value: &str, entry: &str) -> Result<u16, String> {
    match value.parse::<u16>() {
        Ok(0) | Err(_) => Err(format!("'{}' has invalid port '{}'", entry, value)),
        Ok(port) => Ok(port),
    }
}

/// Where a volume entry's data comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountSource {
    /// Host filesystem path, used as-is
    Bind(String),

    /// Declared volume key, prefixed with the stack name before binding
    Named(String),
}

/// A parsed `volumes` entry: `"source:target[:mode]"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub source: MountSource,
    pub target: String,
    pub mode: Option<String>,
}

impl MountEntry {
    /// Parse a short-syntax volume entry.
    ///
    /// Sources beginning with `/` or `.` are bind mounts; anything else names a volume.
    pub fn parse(entry: &str) -> Result<Self, String> {
        let mut parts = entry.splitn(3, ':');
        let source = parts.next().unwrap_or_default();
        let Some(target) = parts.next() else {
            return Err(format!("'{}' is not in SOURCE:TARGET form", entry));
        };
        let mode = parts.next().map(str::to_string);

        if source.is_empty() {
            return Err(format!("'{}' has an empty source", entry));
        }
        if target.is_empty() {
            return Err(format!("'{}' has an empty target", entry));
        }

        let source = if is_bind_source(source) {
            MountSource::Bind(source.to_string())
        } else {
            MountSource::Named(source.to_string())
        };

        Ok(Self { source, target: target.to_string(), mode })
    }
}

/// Bind mounts are recognised by a leading `/` or `.`.
pub fn is_bind_source(source: &str) -> bool {
    source.starts_with('/') || source.starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_host_container() {
        let port = PortEntry::parse("8080:80").unwrap();
        assert_eq!(port.host_port, Some(8080));
        assert_eq!(port.container_port, 80);
        assert_eq!(port.protocol, Protocol::Tcp);
        assert_eq!(port.host_ip, None);
    }

    #[test]
    fn test_port_with_protocol_and_ip() {
        let port = PortEntry::parse("127.0.0.1:5353:53/udp").unwrap();
        assert_eq!(port.host_ip.as_deref(), Some("127.0.0.1"));
        assert_eq!(port.host_port, Some(5353));
        assert_eq!(port.container_port, 53);
        assert_eq!(port.protocol, Protocol::Udp);
    }

    #[test]
    fn test_port_expose_only() {
        let port = PortEntry::parse("9000").unwrap();
        assert_eq!(port.host_port, None);
        assert_eq!(port.container_port, 9000);
    }

    #[test]
    fn test_port_invalid() {
        assert!(PortEntry::parse("http:80").is_err());
        assert!(PortEntry::parse("8080:0").is_err());
        assert!(PortEntry::parse("80/icmp").is_err());
        assert!(PortEntry::parse("1:2:3:4").is_err());
        assert!(PortEntry::parse("localhost:8080:80").is_err());
    }

    #[test]
    fn test_mount_classification() {
        let named = MountEntry::parse("data:/var/lib/postgresql/data").unwrap();
        assert_eq!(named.source, MountSource::Named("data".to_string()));

        let abs = MountEntry::parse("/srv/www:/usr/share/nginx/html:ro").unwrap();
        assert_eq!(abs.source, MountSource::Bind("/srv/www".to_string()));
        assert_eq!(abs.mode.as_deref(), Some("ro"));

        let rel = MountEntry::parse("./conf:/etc/app").unwrap();
        assert_eq!(rel.source, MountSource::Bind("./conf".to_string()));
    }

    #[test]
    fn test_mount_missing_target() {
        assert!(MountEntry::parse("data").is_err());
        assert!(MountEntry::parse(":/data").is_err());
    }
}
