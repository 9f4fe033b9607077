//! Source address allow-list.

use crate::{IpWhitelistConfig, SecurityError, SecurityErrorKind, SecurityResult};
use std::collections::HashSet;
use std::net::IpAddr;
use tracing::{debug, instrument};

/// Parse an address literal into canonical form.
///
/// Accepts bracketed IPv6 (`[::1]`) and folds IPv4-mapped IPv6 to IPv4.
fn parse_canonical(address: &str) -> Option<IpAddr> {
    let trimmed = address.trim();
    let bare = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(trimmed);
    bare.parse::<IpAddr>().ok().map(|ip| ip.to_canonical())
}

/// Whether `address` passes the allow-list.
///
/// Always true when disabled. When enabled, malformed addresses are
/// rejected and malformed list entries never match.
pub fn check_ip<S: AsRef<str>>(
    address: &str,
    allow_list: impl IntoIterator<Item = S>,
    enabled: bool,
) -> bool {
    if !enabled {
        return true;
    }
    let Some(ip) = parse_canonical(address) else {
        return false;
    };
    allow_list
        .into_iter()
        .filter_map(|entry| parse_canonical(entry.as_ref()))
        .any(|allowed| allowed == ip)
}

/// Allow-list with entries parsed once at construction.
#[derive(Debug, Clone, Default)]
pub struct IpGate {
    enabled: bool,
    allowed: HashSet<IpAddr>,
}

impl IpGate {
    /// Build the gate, rejecting malformed entries.
    pub fn from_config(config: &IpWhitelistConfig) -> SecurityResult<Self> {
        let allowed = config
            .allowed_ips()
            .iter()
            .map(|entry| {
                parse_canonical(entry).ok_or_else(|| {
                    SecurityError::new(SecurityErrorKind::Configuration(format!(
                        "Invalid allow-list entry '{}'",
                        entry
                    )))
                })
            })
            .collect::<SecurityResult<HashSet<_>>>()?;

        Ok(Self {
            enabled: *config.enabled(),
            allowed,
        })
    }

    /// A gate that admits every address.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Whether the allow-list is enforced.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether `address` passes.
    pub fn is_allowed(&self, address: &str) -> bool {
        if !self.enabled {
            return true;
        }
        parse_canonical(address).is_some_and(|ip| self.allowed.contains(&ip))
    }

    /// Check `address`, naming the reason on rejection.
    #[instrument(skip(self))]
    pub fn check(&self, address: &str) -> SecurityResult<()> {
        debug!("Checking source address");

        if !self.enabled {
            debug!("Allow-list disabled");
            return Ok(());
        }

        let reason = match parse_canonical(address) {
            None => "not a valid IP address",
            Some(ip) if self.allowed.contains(&ip) => {
                debug!(%ip, "Source address permitted");
                return Ok(());
            }
            Some(_) => "not on the allow-list",
        };

        debug!(reason, "Source address rejected");
        Err(SecurityError::new(SecurityErrorKind::IpRejected {
            address: address.to_string(),
            reason: reason.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn gate(entries: &[&str]) -> IpGate {
        let allowed: BTreeSet<String> = entries.iter().map(|s| s.to_string()).collect();
        IpGate::from_config(
            &IpWhitelistConfig::default()
                .with_enabled(true)
                .with_allowed_ips(allowed),
        )
        .expect("valid allow-list")
    }

    #[test]
    fn test_disabled_never_rejects() {
        assert!(check_ip("10.0.0.2", ["10.0.0.1"], false));
        assert!(check_ip("garbage", Vec::<String>::new(), false));
        assert!(IpGate::disabled().check("not-an-ip").is_ok());
    }

    #[test]
    fn test_enabled_exact_match() {
        assert!(check_ip("10.0.0.1", ["10.0.0.1"], true));
        assert!(!check_ip("10.0.0.2", ["10.0.0.1"], true));

        let gate = gate(&["10.0.0.1"]);
        assert!(gate.check("10.0.0.1").is_ok());
        let err = gate.check("10.0.0.2").unwrap_err();
        assert!(matches!(err.kind(), SecurityErrorKind::IpRejected { .. }));
    }

    #[test]
    fn test_malformed_address_rejected() {
        let gate = gate(&["10.0.0.1"]);
        assert!(!gate.is_allowed("10.0.0"));
        assert!(!gate.is_allowed(""));
        assert!(!check_ip("10.0.0.1:8080", ["10.0.0.1"], true));
    }

    #[test]
    fn test_ipv4_mapped_ipv6_folds() {
        let gate = gate(&["10.0.0.1"]);
        assert!(gate.is_allowed("::ffff:10.0.0.1"));
        assert!(check_ip("10.0.0.1", ["::ffff:10.0.0.1"], true));
    }

    #[test]
    fn test_ipv6_forms_compare_canonically() {
        let gate = gate(&["2001:db8::1"]);
        assert!(gate.is_allowed("2001:0db8:0000:0000:0000:0000:0000:0001"));
        assert!(gate.is_allowed("[2001:db8::1]"));
    }

    #[test]
    fn test_malformed_entry_is_configuration_error() {
        let config = IpWhitelistConfig::default()
            .with_enabled(true)
            .with_allowed_ips(BTreeSet::from(["10.0.0.0/8".to_string()]));
        let err = IpGate::from_config(&config).unwrap_err();
        assert!(matches!(err.kind(), SecurityErrorKind::Configuration(_)));
    }
}
