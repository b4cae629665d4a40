// General utility functions for the application
use crate::error::AppError;
use reqwest::Client;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

/// Create the HTTP client shared by discovery and probing.
///
/// Every call sets its own timeout; `timeout` here is only the upper bound
/// for anything that forgets to.
pub fn create_http_client(timeout: Duration) -> Result<Client, AppError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .user_agent(concat!("rpcscan/", env!("CARGO_PKG_VERSION")))
        // Scanned hosts are rarely contacted twice per port
        .pool_max_idle_per_host(1)
        .redirect(reqwest::redirect::Policy::limited(5))
        // Plenty of community nodes run self-signed certificates
        .danger_accept_invalid_certs(true)
        .build()
        .map_err(|e| AppError::RequestError(format!("Failed to create HTTP client: {}", e)))?;

    Ok(client)
}

/// Validates if a string represents a valid public IP address
pub fn is_valid_public_ip(ip: &str) -> bool {
    let parsed_ip = match IpAddr::from_str(ip) {
        Ok(addr) => addr,
        Err(_) => return false,
    };

    match parsed_ip {
        IpAddr::V4(addr) => {
            let octets = addr.octets();

            // RFC 1918 (Private Use)
            if octets[0] == 10
                || (octets[0] == 172 && (octets[1] >= 16 && octets[1] <= 31))
                || (octets[0] == 192 && octets[1] == 168)
            {
                return false;
            }

            // Carrier-grade NAT
            if octets[0] == 100 && (64..=127).contains(&octets[1]) {
                return false;
            }

            if octets[0] == 0 ||     // This network
               octets[0] == 127 ||   // Loopback
               (octets[0] == 169 && octets[1] == 254) || // Link-local
               (octets[0] == 192 && octets[1] == 0 && octets[2] == 0) || // IETF Protocol
               (octets[0] == 192 && octets[1] == 0 && octets[2] == 2) || // TEST-NET-1
               (octets[0] == 198 && octets[1] == 51 && octets[2] == 100) || // TEST-NET-2
               (octets[0] == 203 && octets[1] == 0 && octets[2] == 113) || // TEST-NET-3
               octets[0] >= 224
            // Multicast, reserved and broadcast
            {
                return false;
            }

            true
        }
        IpAddr::V6(addr) => {
            let first = addr.segments()[0];
            !addr.is_loopback()
                && !addr.is_unspecified()
                && (first & 0xfe00) != 0xfc00 // unique local
                && (first & 0xffc0) != 0xfe80 // link-local
        }
    }
}

/// Base URL of a port on a host, bracketing IPv6 literals
pub fn endpoint_url(ip: &str, port: u16) -> String {
    match IpAddr::from_str(ip) {
        Ok(IpAddr::V6(_)) => format!("http://[{}]:{}", ip, port),
        _ => format!("http://{}:{}", ip, port),
    }
}

/// Make sure we're pointing at the `/net_info` endpoint
pub fn net_info_url(base: &str) -> String {
    if base.ends_with("/net_info") {
        base.to_string()
    } else if base.ends_with('/') {
        format!("{}net_info", base)
    } else {
        format!("{}/net_info", base)
    }
}

/// Parse a JSON-RPC quantity such as `"0x1a"`. The prefix is optional.
pub fn parse_hex_quantity(value: &str) -> Option<u64> {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() {
        return None;
    }

    u64::from_str_radix(digits, 16).ok()
}
