//! Discovery of the per-host number embedded in every id.
//!
//! The host number is resolved from an ordered chain of sources and the
//! first usable one wins:
//!
//! 1. the host-id environment variable, last `-` separated token as an integer;
//! 2. the host-ip environment variable, or else the first up, non-loopback
//!    IPv4 interface address, last octet;
//! 3. the host name, last `-` separated token as an integer, or else a stable
//!    hash of that token;
//! 4. a random number.
//!
//! Resolution never fails. Hosts that land on the random fallback (or share a
//! hash bucket) lose the cross-host uniqueness guarantee, which is why the
//! winning [`HostSource`] is logged.

use dashmap::DashMap;
use std::env;
use std::net::Ipv4Addr;
use std::sync::OnceLock;

/// Environment variable holding an explicit host id, e.g. `worker-12`.
pub const DEFAULT_HOST_ID_VAR: &str = "PLANEFLAKE_HOST_ID";
/// Environment variable holding an explicit IPv4 address.
pub const DEFAULT_HOST_IP_VAR: &str = "PLANEFLAKE_HOST_IP";

const HOSTNAME_HASH_SEED: u64 = 0x5eed_f1a7_e000_0001;

/// Where a host number came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostSource {
    EnvId,
    EnvIp,
    Interface,
    HostnameNumber,
    HostnameHash,
    Random,
}

/// A resolved host number, already masked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolvedHost {
    pub id: u16,
    pub source: HostSource,
}

/// Names of the environment variables consulted during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostSources {
    pub id_var: String,
    pub ip_var: String,
}

impl Default for HostSources {
    fn default() -> Self {
        Self {
            id_var: DEFAULT_HOST_ID_VAR.to_owned(),
            ip_var: DEFAULT_HOST_IP_VAR.to_owned(),
        }
    }
}

impl HostSources {
    pub fn new(id_var: impl Into<String>, ip_var: impl Into<String>) -> Self {
        Self {
            id_var: id_var.into(),
            ip_var: ip_var.into(),
        }
    }

    /// Resolve against the real environment, network interfaces and host name.
    pub fn resolve(&self, mask: u16) -> ResolvedHost {
        let resolved = self.resolve_with(
            mask,
            |name| env::var(name).ok(),
            first_interface_ipv4,
            system_hostname,
        );
        tracing::info!(
            host_id = resolved.id,
            source = ?resolved.source,
            "resolved host id"
        );
        resolved
    }

    /// Resolve with injected lookups. `interface` and `hostname` are only
    /// called when every earlier source came up empty.
    pub fn resolve_with<E, I, H>(
        &self,
        mask: u16,
        env: E,
        interface: I,
        hostname: H,
    ) -> ResolvedHost
    where
        E: Fn(&str) -> Option<String>,
        I: FnOnce() -> Option<Ipv4Addr>,
        H: FnOnce() -> Option<String>,
    {
        let found = |id: u64, source| ResolvedHost {
            id: (id & u64::from(mask)) as u16,
            source,
        };

        if let Some(id) = env(self.id_var.as_str()).as_deref().and_then(parse_last_token) {
            return found(id, HostSource::EnvId);
        }
        if let Some(octet) = env(self.ip_var.as_str()).as_deref().and_then(last_octet) {
            return found(octet, HostSource::EnvIp);
        }
        if let Some(ip) = interface() {
            return found(u64::from(ip.octets()[3]), HostSource::Interface);
        }
        if let Some(name) = hostname() {
            let token = last_token(&name);
            if !token.is_empty() {
                return match token.parse::<u64>() {
                    Ok(id) => found(id, HostSource::HostnameNumber),
                    Err(_) => found(
                        museair::bfast::hash(token.as_bytes(), HOSTNAME_HASH_SEED),
                        HostSource::HostnameHash,
                    ),
                };
            }
        }
        found(u64::from(rand::random::<u16>()), HostSource::Random)
    }

    /// The host number for these sources, unmasked.
    ///
    /// Resolved on the first call for a given set of sources and frozen for
    /// the rest of the process, even if the environment or network
    /// configuration changes afterwards.
    pub fn resolved(&self) -> ResolvedHost {
        self.cached(|| self.resolve(u16::MAX))
    }

    fn cached(&self, resolve: impl FnOnce() -> ResolvedHost) -> ResolvedHost {
        static RESOLVED: OnceLock<DashMap<HostSources, ResolvedHost>> = OnceLock::new();
        *RESOLVED
            .get_or_init(DashMap::new)
            .entry(self.clone())
            .or_insert_with(resolve)
    }
}

/// The process-wide host number from the default sources, unmasked.
pub fn host_id() -> ResolvedHost {
    HostSources::default().resolved()
}

fn last_token(value: &str) -> &str {
    value.rsplit('-').next().unwrap_or(value).trim()
}

fn parse_last_token(value: &str) -> Option<u64> {
    last_token(value).parse().ok()
}

fn last_octet(value: &str) -> Option<u64> {
    let parts: Vec<&str> = value.trim().split('.').collect();
    if parts.len() != 4 {
        return None;
    }
    parts[3].parse().ok()
}

#[cfg(feature = "ip-fallback")]
fn first_interface_ipv4() -> Option<Ipv4Addr> {
    use std::net::IpAddr;

    pnet_datalink::interfaces()
        .iter()
        .filter(|iface| iface.is_up() && !iface.is_loopback() && !iface.ips.is_empty())
        .flat_map(|iface| iface.ips.iter())
        .find_map(|network| match network.ip() {
            IpAddr::V4(ipv4) if !ipv4.is_loopback() && !ipv4.is_unspecified() => Some(ipv4),
            _ => None,
        })
}

#[cfg(not(feature = "ip-fallback"))]
fn first_interface_ipv4() -> Option<Ipv4Addr> {
    None
}

#[cfg(unix)]
fn system_hostname() -> Option<String> {
    nix::unistd::gethostname()
        .ok()
        .and_then(|name| name.into_string().ok())
}

#[cfg(not(unix))]
fn system_hostname() -> Option<String> {
    env::var("COMPUTERNAME")
        .or_else(|_| env::var("HOSTNAME"))
        .ok()
}
