//! UDP socket construction
//!
//! All sockets are built with socket2 so options can be applied before
//! bind, then handed out as non-blocking `std::net::UdpSocket`s.

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs, UdpSocket};

use crate::config::ReceiverConfig;
use crate::error::NetworkError;
use crate::protocol::Endpoint;

/// Bind a non-blocking socket to the receiver port and join its group.
///
/// The join is the last fallible step, so a failure anywhere leaves no
/// membership behind; the socket is closed when it drops.
pub fn create_multicast_socket(config: &ReceiverConfig) -> Result<UdpSocket, NetworkError> {
    if !config.group.is_multicast() {
        return Err(NetworkError::JoinFailed(format!(
            "{} is not a multicast address",
            config.group
        )));
    }

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(|e| NetworkError::BindFailed(e.to_string()))?;

    socket
        .set_reuse_address(true)
        .map_err(|e| NetworkError::BindFailed(format!("SO_REUSEADDR: {}", e)))?;

    #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
    socket
        .set_reuse_port(true)
        .map_err(|e| NetworkError::BindFailed(format!("SO_REUSEPORT: {}", e)))?;

    socket
        .set_nonblocking(true)
        .map_err(|e| NetworkError::BindFailed(e.to_string()))?;

    let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, config.port);
    socket
        .bind(&SockAddr::from(bind_addr))
        .map_err(|e| NetworkError::BindFailed(format!("{}: {}", bind_addr, e)))?;

    socket
        .join_multicast_v4(&config.group, &config.interface)
        .map_err(|e| NetworkError::JoinFailed(format!("{}: {}", config.group, e)))?;

    Ok(socket.into())
}

/// Open a non-blocking socket connected to `target`
pub fn create_sender_socket(target: SocketAddr) -> Result<UdpSocket, NetworkError> {
    let domain = Domain::for_address(target);
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))
        .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;

    socket
        .set_nonblocking(true)
        .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;

    let local: SocketAddr = match target {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (std::net::Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    socket
        .bind(&SockAddr::from(local))
        .map_err(|e| NetworkError::BindFailed(e.to_string()))?;

    socket
        .connect(&SockAddr::from(target))
        .map_err(|e| NetworkError::ConnectionFailed(format!("{}: {}", target, e)))?;

    Ok(socket.into())
}

/// Socket for publishing to a multicast group
pub fn create_multicast_sender(ttl: u32, loopback: bool) -> Result<UdpSocket, NetworkError> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(|e| NetworkError::BindFailed(e.to_string()))?;

    socket
        .set_multicast_ttl_v4(ttl)
        .map_err(|e| NetworkError::BindFailed(format!("IP_MULTICAST_TTL: {}", e)))?;
    socket
        .set_multicast_loop_v4(loopback)
        .map_err(|e| NetworkError::BindFailed(format!("IP_MULTICAST_LOOP: {}", e)))?;

    socket
        .bind(&SockAddr::from(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)))
        .map_err(|e| NetworkError::BindFailed(e.to_string()))?;

    Ok(socket.into())
}

/// Resolve a host name or IP literal; IPv4 results are preferred.
pub fn resolve(endpoint: &Endpoint) -> Result<SocketAddr, NetworkError> {
    let addrs: Vec<SocketAddr> = (endpoint.host.as_str(), endpoint.port)
        .to_socket_addrs()
        .map_err(|e| NetworkError::AddressResolution(format!("{}: {}", endpoint, e)))?
        .collect();

    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| NetworkError::AddressResolution(endpoint.to_string()))
}
