use super::capture;
use anyhow::{Context, Result};
use async_trait::async_trait;
use nodeup_shared::collaborators::{NetworkAddresses, NetworkProbe};
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::time::Duration;
use tracing::debug;

/// Address detection, DNS resolution and reverse-proxy detection against the live network.
pub struct HostProbe {
    external_ip_url: String,
    http: reqwest::Client,
}

impl HostProbe {
    pub fn new(external_ip_url: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            // Only response headers matter; certificates may not be issued yet.
            .danger_accept_invalid_certs(true)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            external_ip_url,
            http,
        })
    }

    fn internal_ip() -> Result<Ipv4Addr> {
        // Connecting a UDP socket sends nothing; it only selects the outbound interface.
        let socket = UdpSocket::bind("0.0.0.0:0").context("cannot bind UDP socket")?;
        socket
            .connect("1.1.1.1:80")
            .context("no route to the internet")?;
        match socket.local_addr()?.ip() {
            IpAddr::V4(ip) => Ok(ip),
            IpAddr::V6(ip) => anyhow::bail!("outbound address {ip} is not IPv4"),
        }
    }

    async fn external_ip(&self) -> Result<Ipv4Addr> {
        let body = self
            .http
            .get(&self.external_ip_url)
            .send()
            .await
            .with_context(|| format!("cannot reach {}", self.external_ip_url))?
            .error_for_status()?
            .text()
            .await?;
        let answer = body.trim();
        answer.parse().with_context(|| {
            format!("unexpected answer from {}: {:?}", self.external_ip_url, answer)
        })
    }
}

/// Network (in CIDR notation) of `ip`, read from `ip -o -f inet addr show` output.
pub fn cidr_for(ip_output: &str, ip: Ipv4Addr) -> Option<String> {
    ip_output.lines().find_map(|line| {
        let mut words = line.split_whitespace();
        words.find(|w| *w == "inet")?;
        let (addr, prefix) = words.next()?.split_once('/')?;
        if addr.parse::<Ipv4Addr>().ok()? != ip {
            return None;
        }
        let prefix: u32 = prefix.parse().ok().filter(|p| *p <= 32)?;
        let mask = if prefix == 0 { 0 } else { u32::MAX << (32 - prefix) };
        let network = Ipv4Addr::from(u32::from(ip) & mask);
        Some(format!("{network}/{prefix}"))
    })
}

#[async_trait]
impl NetworkProbe for HostProbe {
    async fn detect_addresses(&self) -> Result<NetworkAddresses> {
        let internal = Self::internal_ip()?;
        let external = self.external_ip().await?;
        let listing = capture("ip", &["-o", "-f", "inet", "addr", "show"]).await?;
        let cidr = cidr_for(&listing, internal)
            .with_context(|| format!("no interface carries {internal}"))?;
        Ok(NetworkAddresses {
            internal_ip: internal.to_string(),
            external_ip: external.to_string(),
            cidr,
        })
    }

    async fn resolves_to(&self, domain: &str, ip: &str) -> bool {
        match tokio::net::lookup_host((domain, 0)).await {
            Ok(addrs) => {
                let addrs: Vec<IpAddr> = addrs.map(|a| a.ip()).collect();
                debug!(domain, ?addrs, "resolved");
                addrs.iter().any(|a| a.to_string() == ip)
            }
            Err(err) => {
                debug!(domain, "lookup failed: {}", err);
                false
            }
        }
    }

    async fn is_behind_proxy(&self, domain: &str) -> bool {
        let response = match self.http.get(format!("https://{domain}")).send().await {
            Ok(response) => response,
            Err(err) => {
                debug!(domain, "proxy probe failed: {}", err);
                return false;
            }
        };
        let headers = response.headers();
        let server_is_cloudflare = headers
            .get(reqwest::header::SERVER)
            .and_then(|v| v.to_str().ok())
            .map_or(false, |v| v.to_ascii_lowercase().contains("cloudflare"));
        headers.contains_key("cf-ray") || server_is_cloudflare
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
1: lo    inet 127.0.0.1/8 scope host lo\\       valid_lft forever preferred_lft forever
2: eth0    inet 10.20.30.45/22 brd 10.20.31.255 scope global eth0\\       valid_lft forever preferred_lft forever
3: docker0    inet 172.17.0.1/16 brd 172.17.255.255 scope global docker0\\       valid_lft forever preferred_lft forever";

    #[test]
    fn cidr_masks_host_bits() {
        let ip: Ipv4Addr = "10.20.30.45".parse().unwrap();
        assert_eq!(cidr_for(LISTING, ip).as_deref(), Some("10.20.28.0/22"));
    }

    #[test]
    fn cidr_picks_matching_interface() {
        let ip: Ipv4Addr = "172.17.0.1".parse().unwrap();
        assert_eq!(cidr_for(LISTING, ip).as_deref(), Some("172.17.0.0/16"));
    }

    #[test]
    fn unknown_address_has_no_cidr() {
        let ip: Ipv4Addr = "192.168.1.2".parse().unwrap();
        assert_eq!(cidr_for(LISTING, ip), None);
        assert_eq!(cidr_for("", ip), None);
    }
}
