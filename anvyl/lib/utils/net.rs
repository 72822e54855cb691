use std::net::{IpAddr, Ipv4Addr, UdpSocket};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Returns the primary non-loopback IPv4 address of this machine.
///
/// Connects a UDP socket to a public address to let the kernel pick the
/// outbound interface; no packet is sent. Falls back to loopback when the
/// machine has no route.
pub fn primary_local_ip() -> IpAddr {
    let fallback = IpAddr::V4(Ipv4Addr::LOCALHOST);

    let Result::Ok(socket) = UdpSocket::bind(("0.0.0.0", 0)) else {
        return fallback;
    };

    if socket.connect(("8.8.8.8", 80)).is_err() {
        return fallback;
    }

    socket.local_addr().map(|addr| addr.ip()).unwrap_or(fallback)
}

/// Returns this machine's hostname, or `"localhost"` when unavailable.
pub fn local_hostname() -> String {
    sysinfo::System::host_name().unwrap_or_else(|| "localhost".to_string())
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_local_ip_is_v4() {
        // Whatever interface the kernel picks, the helper must not panic and
        // must return some address.
        let ip = primary_local_ip();
        assert!(ip.is_ipv4());
    }

    #[test]
    fn test_local_hostname_is_non_empty() {
        assert!(!local_hostname().is_empty());
    }
}
