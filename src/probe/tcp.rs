//! TCP connect check.

use std::time::Duration;

use tokio::net::TcpStream;

use super::ProbeError;

/// Attempt a TCP connection to the address. A successful connect means
/// reachable; the connection is dropped immediately.
pub async fn run_tcp_check(address: &str, timeout: Duration) -> Result<(), ProbeError> {
    let target = connect_target(address);

    match tokio::time::timeout(timeout, TcpStream::connect(&target)).await {
        Ok(Ok(_stream)) => Ok(()),
        Ok(Err(e)) => Err(ProbeError::Network(e.to_string())),
        Err(_) => Err(ProbeError::Timeout(timeout)),
    }
}

/// Normalize an address into a `host:port` connect target. Bare hosts get
/// port 80; bare IPv6 literals additionally get brackets.
fn connect_target(address: &str) -> String {
    if address.parse::<std::net::Ipv6Addr>().is_ok() {
        return format!("[{}]:80", address);
    }
    if address.contains(':') {
        return address.to_string();
    }
    format!("{}:80", address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_target() {
        assert_eq!(connect_target("db.internal:5432"), "db.internal:5432");
        assert_eq!(connect_target("db.internal"), "db.internal:80");
        assert_eq!(connect_target("10.1.2.3"), "10.1.2.3:80");
        assert_eq!(connect_target("::1"), "[::1]:80");
        assert_eq!(connect_target("[::1]:22"), "[::1]:22");
    }

    #[tokio::test]
    async fn test_tcp_check_unreachable_port() {
        // Port 1 on localhost is expected to refuse or time out
        let result = run_tcp_check("127.0.0.1:1", Duration::from_millis(200)).await;
        assert!(result.is_err());
    }
}
