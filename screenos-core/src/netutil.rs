//! IPv4 helpers shared by the parsers, the topology resolver and the converter.
//!
//! All functions take dotted-quad strings as they appear in configuration
//! text and never fail: unparsable input maps to `0`/`0.0.0.0` so callers can
//! degrade gracefully and raise their own incidents.

use std::net::Ipv4Addr;

/// Returns true when `text` is a dotted-quad IPv4 address.
pub fn is_valid_ipv4(text: &str) -> bool {
    text.parse::<Ipv4Addr>().is_ok()
}

/// Returns true when `text` is a contiguous netmask such as `255.255.255.0`.
pub fn is_valid_netmask(text: &str) -> bool {
    match text.parse::<Ipv4Addr>() {
        Ok(addr) => {
            let bits = u32::from(addr);
            bits.leading_ones() + bits.trailing_zeros() == 32
        }
        Err(_) => false,
    }
}

/// Returns true when `text` is an inverted contiguous mask such as `0.0.0.255`.
pub fn is_wildcard_mask(text: &str) -> bool {
    match text.parse::<Ipv4Addr>() {
        Ok(addr) => {
            let bits = u32::from(addr);
            bits.leading_zeros() + bits.trailing_ones() == 32
        }
        Err(_) => false,
    }
}

/// Converts a wildcard mask into the equivalent netmask.
pub fn wildcard_to_netmask(text: &str) -> String {
    number_to_ip(!ip_to_number(text))
}

/// Number of leading one bits of a netmask. Invalid input yields 0.
pub fn mask_length(mask: &str) -> u32 {
    ip_to_number(mask).leading_ones()
}

/// Builds a dotted netmask from a prefix length, clamping to 32.
pub fn length_to_netmask(length: u32) -> String {
    let length = length.min(32);
    let mask = if length == 0 {
        0
    } else {
        u32::MAX << (32 - length)
    };
    number_to_ip(mask)
}

/// Network address of `ip` under `mask`.
pub fn network_of(ip: &str, mask: &str) -> String {
    number_to_ip(ip_to_number(ip) & ip_to_number(mask))
}

pub fn ip_to_number(text: &str) -> u32 {
    text.parse::<Ipv4Addr>().map(u32::from).unwrap_or(0)
}

pub fn number_to_ip(number: u32) -> String {
    Ipv4Addr::from(number).to_string()
}

/// Last address of a range that starts at `start` and spans as many
/// addresses as `from..=to`.
pub fn shift_range_end(start: &str, from: &str, to: &str) -> String {
    let span = ip_to_number(to).saturating_sub(ip_to_number(from));
    number_to_ip(ip_to_number(start).saturating_add(span))
}

/// Splits `a.b.c.d/len` into address and prefix length.
pub fn split_cidr(text: &str) -> Option<(&str, u32)> {
    let (ip, len) = text.split_once('/')?;
    let len = len.parse::<u32>().ok()?;
    if len > 32 {
        return None;
    }
    Some((ip, len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn netmask_and_wildcard_detection() {
        assert!(is_valid_netmask("255.255.255.0"));
        assert!(is_valid_netmask("255.255.255.255"));
        assert!(is_valid_netmask("0.0.0.0"));
        assert!(!is_valid_netmask("255.0.255.0"));
        assert!(!is_valid_netmask("0.0.0.255"));
        assert!(is_wildcard_mask("0.0.0.255"));
        assert!(!is_wildcard_mask("0.255.0.255"));
        assert!(!is_valid_netmask("not-a-mask"));
    }

    #[test]
    fn wildcard_converts_to_netmask() {
        assert_eq!(wildcard_to_netmask("0.0.0.255"), "255.255.255.0");
        assert_eq!(wildcard_to_netmask("0.0.255.255"), "255.255.0.0");
    }

    #[test]
    fn mask_lengths_round_trip() {
        assert_eq!(mask_length("255.255.255.0"), 24);
        assert_eq!(mask_length("0.0.0.0"), 0);
        assert_eq!(mask_length("garbage"), 0);
        assert_eq!(length_to_netmask(0), "0.0.0.0");
        assert_eq!(length_to_netmask(20), "255.255.240.0");
        assert_eq!(length_to_netmask(40), "255.255.255.255");
    }

    #[test]
    fn network_and_ranges() {
        assert_eq!(network_of("10.1.1.77", "255.255.255.0"), "10.1.1.0");
        assert_eq!(shift_range_end("192.168.0.10", "1.1.1.1", "1.1.1.5"), "192.168.0.14");
        assert_eq!(split_cidr("10.0.0.0/8"), Some(("10.0.0.0", 8)));
        assert_eq!(split_cidr("10.0.0.0/33"), None);
        assert_eq!(split_cidr("10.0.0.0"), None);
    }
}
