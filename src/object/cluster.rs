//! Cluster: a named set of routing targets.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::schema::{ClusterConfig, ClusterType, ResourceConfig};
use crate::net::Transport;
use crate::object::{Built, Object, ObjectError, Outcome};
use crate::observability::logging::LoggerFactory;

/// An IP prefix (`10.0.0.0/8`) or a single address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    addr: IpAddr,
    prefix_len: u8,
}

impl Endpoint {
    pub fn new(addr: IpAddr, prefix_len: u8) -> Option<Self> {
        (prefix_len <= max_prefix(addr)).then_some(Self { addr, prefix_len })
    }

    /// A single host.
    pub fn host(addr: IpAddr) -> Self {
        Self {
            addr,
            prefix_len: max_prefix(addr),
        }
    }

    /// Whether `ip` falls inside this prefix.
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.addr, ip) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let mask = u32::MAX.checked_shl(32 - self.prefix_len as u32).unwrap_or(0);
                u32::from(net) & mask == u32::from(ip) & mask
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let mask = u128::MAX.checked_shl(128 - self.prefix_len as u32).unwrap_or(0);
                u128::from(net) & mask == u128::from(ip) & mask
            }
            _ => false,
        }
    }
}

fn max_prefix(addr: IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

/// Error parsing an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointParseError(String);

impl fmt::Display for EndpointParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid endpoint \"{}\"", self.0)
    }
}

impl std::error::Error for EndpointParseError {}

impl FromStr for Endpoint {
    type Err = EndpointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || EndpointParseError(s.to_string());
        match s.split_once('/') {
            Some((addr, len)) => {
                let addr: IpAddr = addr.parse().map_err(|_| err())?;
                let len: u8 = len.parse().map_err(|_| err())?;
                Endpoint::new(addr, len).ok_or_else(err)
            }
            None => s.parse().map(Endpoint::host).map_err(|_| err()),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}

/// A live cluster. Every change, including the type, is applied in place.
#[derive(Debug)]
pub struct Cluster {
    config: ClusterConfig,
    endpoints: Vec<Endpoint>,
    net: Arc<dyn Transport>,
    span: tracing::Span,
}

impl Cluster {
    pub fn new(config: &ClusterConfig, net: Arc<dyn Transport>, logger: &LoggerFactory) -> Built<Self> {
        config.validate()?;
        let span = logger.new_logger("cluster");
        let endpoints = span.in_scope(|| resolve(config, net.as_ref()))?;
        span.in_scope(|| {
            tracing::debug!(
                name = %config.name,
                cluster_type = %config.cluster_type,
                endpoints = endpoints.len(),
                "Cluster created"
            )
        });
        Ok((
            Self {
                config: config.clone(),
                endpoints,
                net,
                span,
            },
            Outcome::Applied,
        ))
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Whether `ip` is one of this cluster's targets.
    pub fn contains(&self, ip: IpAddr) -> bool {
        self.endpoints.iter().any(|e| e.contains(ip))
    }
}

fn resolve(config: &ClusterConfig, net: &dyn Transport) -> Result<Vec<Endpoint>, ObjectError> {
    let mut endpoints = Vec::with_capacity(config.endpoints.len());
    for e in &config.endpoints {
        match config.cluster_type {
            ClusterType::Static => endpoints.push(
                e.parse()
                    .map_err(|err: EndpointParseError| ObjectError::Other(err.to_string()))?,
            ),
            ClusterType::StrictDns => {
                let ips = net.resolve(e)?;
                tracing::trace!(host = %e, addresses = ?ips, "Resolved cluster endpoint");
                endpoints.extend(ips.into_iter().map(Endpoint::host));
            }
        }
    }
    Ok(endpoints)
}

impl Object for Cluster {
    type Config = ClusterConfig;

    fn name(&self) -> &str {
        &self.config.name
    }

    fn config(&self) -> ClusterConfig {
        self.config.clone()
    }

    fn reconcile(&mut self, config: &ClusterConfig) -> Result<Outcome, ObjectError> {
        let _enter = self.span.enter();
        config.validate()?;

        // Resolve before committing so a failure leaves the old targets live.
        let endpoints = resolve(config, self.net.as_ref())?;
        tracing::debug!(
            name = %config.name,
            cluster_type = %config.cluster_type,
            endpoints = endpoints.len(),
            "Cluster reconciled"
        );
        self.endpoints = endpoints;
        self.config = config.clone();
        Ok(Outcome::Applied)
    }

    fn close(&mut self) -> Result<(), ObjectError> {
        self.endpoints.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::SystemNet;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn cluster(endpoints: &[&str]) -> Cluster {
        let config = ClusterConfig {
            name: "media".into(),
            cluster_type: ClusterType::Static,
            endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
        };
        Cluster::new(&config, Arc::new(SystemNet), &LoggerFactory::default())
            .unwrap()
            .0
    }

    #[test]
    fn parses_prefixes_and_hosts() {
        assert_eq!("10.0.0.0/8".parse::<Endpoint>().unwrap().to_string(), "10.0.0.0/8");
        assert_eq!("10.1.2.3".parse::<Endpoint>().unwrap().to_string(), "10.1.2.3/32");
        assert_eq!("::1".parse::<Endpoint>().unwrap().to_string(), "::1/128");
        assert!("10.0.0.0/33".parse::<Endpoint>().is_err());
        assert!("example.com".parse::<Endpoint>().is_err());
    }

    #[test]
    fn prefix_membership() {
        let e: Endpoint = "10.0.0.0/8".parse().unwrap();
        assert!(e.contains(ip("10.200.1.1")));
        assert!(!e.contains(ip("11.0.0.1")));
        assert!(!e.contains(ip("::1")));

        let any: Endpoint = "0.0.0.0/0".parse().unwrap();
        assert!(any.contains(ip("192.0.2.1")));
    }

    #[test]
    fn endpoint_change_is_hot() {
        let mut c = cluster(&["10.0.0.1"]);
        assert!(c.contains(ip("10.0.0.1")));

        let mut next = c.config();
        next.endpoints = vec!["192.168.0.0/16".into()];
        assert_eq!(c.reconcile(&next).unwrap(), Outcome::Applied);
        assert!(!c.contains(ip("10.0.0.1")));
        assert!(c.contains(ip("192.168.4.4")));
    }

    #[test]
    fn strict_dns_resolves_through_transport() {
        let config = ClusterConfig {
            name: "dns".into(),
            cluster_type: ClusterType::StrictDns,
            endpoints: vec!["127.0.0.1".into()],
        };
        let (c, _) = Cluster::new(&config, Arc::new(SystemNet), &LoggerFactory::default()).unwrap();
        assert_eq!(c.endpoints(), [Endpoint::host(ip("127.0.0.1"))]);
    }
}
