// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators for abuse simulation.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Generate a pool of client IP addresses, alternating IPv4 and IPv6.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            if i % 2 == 0 {
                IpAddr::V4(Ipv4Addr::new(10, a, b, c))
            } else {
                IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, (u16::from(a) << 8) | u16::from(b), u16::from(c)))
            }
        })
        .collect()
}

/// Remote socket address for the `n`th request from `ip`; the source port
/// changes between requests like it does for fresh connections.
pub fn remote_addr(ip: IpAddr, n: usize) -> SocketAddr {
    SocketAddr::new(ip, 1024 + (n % 60000) as u16)
}

/// URL-encoded contact form bodies.
pub fn valid_form(i: usize) -> String {
    format!("name=Visitor+{i}&email=visitor{i}%40example.com&subject=Question+{i}&message=Hello")
}

/// Bodies that fail validation, mixing undecodable and bad sender input.
pub fn invalid_forms() -> Vec<&'static str> {
    vec![
        "name=x&email=&subject=s&message=m",
        "name=x&email=no-at-sign&subject=s&message=m",
        "name=x&email=%3Cscript%3E&subject=s&message=m",
        "name=x&email=%40example.com&subject=s&message=m",
    ]
}
