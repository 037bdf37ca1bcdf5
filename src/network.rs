// src/network.rs
use crate::error::{BootstrapError, Result};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// An IP network in CIDR notation with host bits cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cidr {
    network: IpAddr,
    prefix_len: u8,
}

impl Cidr {
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| BootstrapError::InvalidCidr {
            cidr: input.to_string(),
            reason: reason.to_string(),
        };

        let (addr, prefix) = input
            .trim()
            .split_once('/')
            .ok_or_else(|| invalid("missing prefix length"))?;
        let addr = IpAddr::from_str(addr).map_err(|_| invalid("address is not an IP"))?;
        if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("prefix length is not a number"));
        }
        let prefix_len: u8 = prefix
            .parse()
            .map_err(|_| invalid("prefix length is out of range"))?;

        let network = match addr {
            IpAddr::V4(v4) => {
                if prefix_len > 32 {
                    return Err(invalid("prefix length exceeds 32"));
                }
                let bits = u32::from(v4) & mask_u32(prefix_len);
                IpAddr::V4(Ipv4Addr::from(bits))
            }
            IpAddr::V6(v6) => {
                if prefix_len > 128 {
                    return Err(invalid("prefix length exceeds 128"));
                }
                let bits = u128::from(v6) & mask_u128(prefix_len);
                IpAddr::V6(Ipv6Addr::from(bits))
            }
        };

        Ok(Self {
            network,
            prefix_len,
        })
    }

    fn host_bits(&self) -> u32 {
        match self.network {
            IpAddr::V4(_) => 32 - u32::from(self.prefix_len),
            IpAddr::V6(_) => 128 - u32::from(self.prefix_len),
        }
    }

    /// Address at `index` past the network address, if it falls inside the range.
    pub fn nth(&self, index: u128) -> Option<IpAddr> {
        let host_bits = self.host_bits();
        if host_bits < 128 && index >= (1u128 << host_bits) {
            return None;
        }
        match self.network {
            IpAddr::V4(v4) => {
                let offset = u32::try_from(index).ok()?;
                u32::from(v4).checked_add(offset).map(|b| IpAddr::V4(Ipv4Addr::from(b)))
            }
            IpAddr::V6(v6) => u128::from(v6)
                .checked_add(index)
                .map(|b| IpAddr::V6(Ipv6Addr::from(b))),
        }
    }
}

impl FromStr for Cidr {
    type Err = BootstrapError;

    fn from_str(s: &str) -> Result<Self> {
        Cidr::parse(s)
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

fn mask_u32(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix_len))
    }
}

fn mask_u128(prefix_len: u8) -> u128 {
    if prefix_len == 0 {
        0
    } else {
        u128::MAX << (128 - u32::from(prefix_len))
    }
}

/// The in-cluster address of the `kubernetes` service: the first host after
/// the network address of the service CIDR.
pub fn derive_api_server_service_ip(service_cidr: &str) -> Result<IpAddr> {
    let cidr = Cidr::parse(service_cidr)?;
    cidr.nth(1).ok_or_else(|| BootstrapError::InvalidCidr {
        cidr: service_cidr.to_string(),
        reason: "range has no room for a service address".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_service_cidr_yields_dot_one() {
        let ip = derive_api_server_service_ip("10.43.0.0/16").unwrap();
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(10, 43, 0, 1)));
    }

    #[test]
    fn host_bits_are_cleared_before_offset() {
        let ip = derive_api_server_service_ip("10.96.12.7/12").unwrap();
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(10, 96, 0, 1)));
    }

    #[test]
    fn ipv6_service_cidr() {
        let ip = derive_api_server_service_ip("fd00:10:96::/112").unwrap();
        assert_eq!(ip, "fd00:10:96::1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn malformed_inputs_are_invalid_cidr() {
        for input in ["not-a-cidr", "10.43.0.0", "10.43.0.0/33", "10.43.0/16", "10.43.0.0/x"] {
            match derive_api_server_service_ip(input) {
                Err(BootstrapError::InvalidCidr { cidr, .. }) => assert_eq!(cidr, input),
                other => panic!("expected InvalidCidr for {input}, got {other:?}"),
            }
        }
    }

    #[test]
    fn single_address_range_has_no_service_ip() {
        assert!(matches!(
            derive_api_server_service_ip("10.43.0.5/32"),
            Err(BootstrapError::InvalidCidr { .. })
        ));
    }

    #[test]
    fn display_shows_the_normalized_network() {
        let cidr: Cidr = "10.42.7.9/16".parse().unwrap();
        assert_eq!(cidr.to_string(), "10.42.0.0/16");
    }

    #[test]
    fn prefix_must_be_plain_digits() {
        for input in ["10.43.0.0/+16", "10.43.0.0/ 16", "10.43.0.0/", "10.43.0.0/-1", "fd00::/+64"] {
            assert!(
                matches!(Cidr::parse(input), Err(BootstrapError::InvalidCidr { .. })),
                "{input} should be rejected"
            );
        }
    }
}
