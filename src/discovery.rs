//! KNX Gateway Discovery via SEARCH_REQUEST
//!
//! Implements the KNXnet/IP SEARCH protocol to automatically discover KNX
//! gateways on the local network, eliminating the need for hardcoded gateway
//! addresses.
//!
//! ## Protocol Flow
//!
//! ```text
//! Client                          Gateway
//!   |                                |
//!   |------- SEARCH_REQUEST -------->| (multicast 224.0.23.12:3671)
//!   |<------ SEARCH_RESPONSE --------|
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use knx_tunnel::discovery::discover_gateway;
//! use std::time::Duration;
//!
//! if let Some(gateway) = discover_gateway(Duration::from_secs(3))? {
//!     println!("Found gateway at {}:{}", gateway.ip_string(), gateway.port);
//! }
//! # Ok::<(), knx_tunnel::error::KnxError>(())
//! ```

use std::net::UdpSocket;
use std::time::Duration;

use crate::error::Result;

/// Discovered KNX gateway information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayInfo {
    /// Gateway IP address
    pub ip: [u8; 4],
    /// Gateway port (typically 3671)
    pub port: u16,
}

impl GatewayInfo {
    /// Format the gateway IP as a dotted-quad string
    pub fn ip_string(&self) -> String {
        format!("{}.{}.{}.{}", self.ip[0], self.ip[1], self.ip[2], self.ip[3])
    }
}

/// KNX multicast address for discovery
const KNX_MULTICAST_ADDR: &str = "224.0.23.12";

/// Standard KNX port
const KNX_PORT: u16 = 3671;

/// Build a SEARCH_REQUEST packet
///
/// ```text
/// Header (6 bytes): 06 10 02 01 00 0e
/// HPAI (8 bytes):   08 01 <ip:4> <port:2>
/// ```
fn build_search_request(local_ip: [u8; 4], local_port: u16, buffer: &mut [u8]) -> usize {
    buffer[0] = 0x06;
    buffer[1] = 0x10;
    buffer[2] = 0x02;
    buffer[3] = 0x01;
    buffer[4] = 0x00;
    buffer[5] = 0x0e;

    buffer[6] = 0x08;
    buffer[7] = 0x01;
    buffer[8..12].copy_from_slice(&local_ip);
    buffer[12..14].copy_from_slice(&local_port.to_be_bytes());

    14
}

/// Parse a SEARCH_RESPONSE packet
fn parse_search_response(data: &[u8]) -> Option<GatewayInfo> {
    if data.len() < 14 {
        return None;
    }

    if data[0] != 0x06 || data[1] != 0x10 {
        return None;
    }

    if data[2] != 0x02 || data[3] != 0x02 {
        return None;
    }

    let hpai_len = data[6];
    let protocol = data[7];

    if hpai_len != 0x08 || protocol != 0x01 {
        return None;
    }

    let ip = [data[8], data[9], data[10], data[11]];
    let port = u16::from_be_bytes([data[12], data[13]]);

    Some(GatewayInfo { ip, port })
}

/// Determine the local IPv4 address used to reach the outside network
///
/// Connects a throwaway UDP socket to an address that doesn't need to be
/// reachable -- the kernel still has to pick a route and therefore a source
/// address for it. Falls back to loopback if that fails for any reason.
fn local_ip() -> [u8; 4] {
    UdpSocket::bind("0.0.0.0:0")
        .and_then(|sock| {
            sock.connect("10.255.255.255:0")?;
            sock.local_addr()
        })
        .map(|addr| match addr.ip() {
            std::net::IpAddr::V4(ip) => ip.octets(),
            std::net::IpAddr::V6(_) => [127, 0, 0, 1],
        })
        .unwrap_or([127, 0, 0, 1])
}

/// Discover a KNX gateway on the local network
///
/// Binds a UDP socket to `0.0.0.0:0`, sends a `SEARCH_REQUEST` to the KNX
/// multicast group, and returns the first `SEARCH_RESPONSE` received before
/// `timeout` elapses.
///
/// # Errors
///
/// Returns `Io` if the socket cannot be created or bound. A timeout with no
/// response is not an error: it yields `Ok(None)`.
pub fn discover_gateway(timeout: Duration) -> Result<Option<GatewayInfo>> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.set_read_timeout(Some(timeout))?;

    let local_port = socket.local_addr()?.port();
    let local_ip = local_ip();

    let mut request_buf = [0u8; 14];
    let request_len = build_search_request(local_ip, local_port, &mut request_buf);

    socket.send_to(&request_buf[..request_len], (KNX_MULTICAST_ADDR, KNX_PORT))?;

    let mut response_buf = [0u8; 256];
    let deadline = std::time::Instant::now() + timeout;

    loop {
        let remaining = deadline.saturating_duration_since(std::time::Instant::now());
        if remaining.is_zero() {
            return Ok(None);
        }
        socket.set_read_timeout(Some(remaining))?;

        match socket.recv_from(&mut response_buf) {
            Ok((len, _remote)) => {
                if let Some(gateway) = parse_search_response(&response_buf[..len]) {
                    return Ok(Some(gateway));
                }
                // Not a SEARCH_RESPONSE we recognize; keep waiting.
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => {
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_search_request() {
        let mut buf = [0u8; 14];
        let len = build_search_request([192, 168, 1, 29], 12345, &mut buf);

        assert_eq!(len, 14);
        assert_eq!(buf[0], 0x06);
        assert_eq!(buf[1], 0x10);
        assert_eq!(buf[2], 0x02);
        assert_eq!(buf[3], 0x01);
        assert_eq!(buf[4], 0x00);
        assert_eq!(buf[5], 0x0e);
        assert_eq!(buf[6], 0x08);
        assert_eq!(buf[7], 0x01);
        assert_eq!(&buf[8..12], &[192, 168, 1, 29]);
        assert_eq!(u16::from_be_bytes([buf[12], buf[13]]), 12345);
    }

    #[test]
    fn test_parse_search_response() {
        let response = [
            0x06, 0x10, 0x02, 0x02, 0x00, 0x0e, 0x08, 0x01, 192, 168, 1, 250, 0x0e, 0x57,
        ];

        let gateway = parse_search_response(&response).unwrap();
        assert_eq!(gateway.ip, [192, 168, 1, 250]);
        assert_eq!(gateway.port, 3671);
        assert_eq!(gateway.ip_string(), "192.168.1.250");
    }

    #[test]
    fn test_parse_search_response_rejects_wrong_service_type() {
        let response = [
            0x06, 0x10, 0x02, 0x05, 0x00, 0x0e, 0x08, 0x01, 192, 168, 1, 250, 0x0e, 0x57,
        ];
        assert!(parse_search_response(&response).is_none());
    }

    #[test]
    fn test_parse_search_response_too_short() {
        assert!(parse_search_response(&[0x06, 0x10]).is_none());
    }

    #[test]
    fn test_discover_gateway_times_out_with_no_gateway() {
        // No gateway is listening in the test environment; this exercises
        // the timeout path without requiring real hardware.
        let result = discover_gateway(Duration::from_millis(200)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_local_ip_never_panics() {
        let ip = local_ip();
        assert_eq!(ip.len(), 4);
    }
}
