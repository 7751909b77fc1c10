//! UDP input for live streams.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

/// Creates and configures a UDP socket for TS packet reception.
/// Handles both unicast and multicast addresses.
pub fn create_udp_socket(addr: &SocketAddr) -> anyhow::Result<Socket> {
    let ip = match addr.ip() {
        IpAddr::V4(v4) => v4,
        _ => anyhow::bail!("only IPv4 is supported"),
    };

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&(*addr).into())?;

    if ip.is_multicast() {
        let iface = Ipv4Addr::UNSPECIFIED; // default interface
        socket.join_multicast_v4(&ip, &iface)?;
    }

    socket.set_nonblocking(true)?;
    Ok(socket)
}

/// Bound tokio socket ready for `recv`.
pub fn bind_udp(addr: &SocketAddr) -> anyhow::Result<UdpSocket> {
    let socket = create_udp_socket(addr)?;
    Ok(UdpSocket::from_std(socket.into())?)
}
