//! Transport factory: sockets bound to privileged source ports, UDP or
//! TCP dialing with portmap discovery, and loose-source-routed TCP
//! connections via the IP_OPTIONS socket option.

use crate::portmap;
use crate::result::{Error, Result};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::os::unix::io::AsRawFd;
use std::time::Duration;
use tokio::net::{TcpSocket, TcpStream, UdpSocket};

/// First non-privileged port.
const IPPORT_RESERVED: u16 = 1024;

const IPOPT_LSRR: u8 = 0x83;
const IPOPT_MINOFF: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proto {
    Tcp,
    Udp,
}

impl Proto {
    pub fn name(&self) -> &'static str {
        match self {
            Proto::Tcp => "TCP",
            Proto::Udp => "UDP",
        }
    }

    fn pmap_prot(&self) -> u32 {
        match self {
            Proto::Tcp => portmap::IPPROTO_TCP,
            Proto::Udp => portmap::IPPROTO_UDP,
        }
    }
}

/// An optional source route parsed from a `host` argument:
/// `[<localaddr>]@[<hop1>:<hop2>:…]<dest>` (or the same with a bare
/// `:` separating route and destination).
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RouteSpec {
    pub local: Option<String>,
    pub hops: Vec<String>,
}

/// Splits a `host` argument into an optional source route and the
/// destination host name.
pub fn parse_host_spec(spec: &str) -> (Option<RouteSpec>, &str) {
    let (local, rest) = match spec.find('@') {
        Some(at) => {
            let local = &spec[..at];
            (
                if local.is_empty() {
                    None
                } else {
                    Some(local.to_string())
                },
                &spec[at + 1..],
            )
        }
        None => {
            if !spec.contains(':') {
                return (None, spec);
            }
            (None, spec)
        }
    };

    let host_at = rest.rfind(':').map(|i| i + 1).unwrap_or(0);
    let host = &rest[host_at..];
    let hops = rest[..host_at.saturating_sub(1)]
        .split(':')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    (Some(RouteSpec { local, hops }), host)
}

/// Resolves a host name or dotted quad to an IPv4 address.
pub async fn resolve_ipv4(host: &str) -> Result<Ipv4Addr> {
    if let Ok(addr) = host.parse::<Ipv4Addr>() {
        return Ok(addr);
    }
    let mut addrs = tokio::net::lookup_host((host, 0))
        .await
        .map_err(|_| Error::UnknownHost(host.to_string()))?;
    addrs
        .find_map(|addr| match addr {
            SocketAddr::V4(v4) => Some(*v4.ip()),
            SocketAddr::V6(_) => None,
        })
        .ok_or_else(|| Error::UnknownHost(host.to_string()))
}

/// Bind failures that mean "try the next port down".
fn bind_retryable(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::AddrInUse | std::io::ErrorKind::AddrNotAvailable
    )
}

/// Walks the reserved port range from 1023 downward looking for a port
/// we can bind. Servers applying the "secure" heuristic only accept
/// calls from source ports below 1024. The walk gives up halfway down
/// the range, like the historical clients it imitates.
fn privileged_tcp_socket(local: Option<Ipv4Addr>) -> Result<TcpSocket> {
    let addr = local.unwrap_or(Ipv4Addr::UNSPECIFIED);
    let mut port = IPPORT_RESERVED - 1;
    loop {
        let socket = TcpSocket::new_v4()?;
        match socket.bind(SocketAddr::V4(SocketAddrV4::new(addr, port))) {
            Ok(()) => {
                tracing::debug!(port, "bound privileged tcp port");
                return Ok(socket);
            }
            Err(err) if bind_retryable(&err) => {
                port -= 1;
                if port == IPPORT_RESERVED / 2 {
                    return Err(Error::PortsExhausted);
                }
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn privileged_udp_socket() -> Result<std::net::UdpSocket> {
    let mut port = IPPORT_RESERVED - 1;
    loop {
        match std::net::UdpSocket::bind(SocketAddr::V4(SocketAddrV4::new(
            Ipv4Addr::UNSPECIFIED,
            port,
        ))) {
            Ok(socket) => {
                tracing::debug!(port, "bound privileged udp port");
                return Ok(socket);
            }
            Err(err) if bind_retryable(&err) => {
                port -= 1;
                if port == IPPORT_RESERVED / 2 {
                    return Err(Error::PortsExhausted);
                }
            }
            Err(err) => return Err(err.into()),
        }
    }
}

async fn resolve_service_port(
    server: Ipv4Addr,
    prog: u32,
    vers: u32,
    proto: Proto,
    port: Option<u16>,
    timeout: Duration,
) -> Result<u16> {
    match port {
        Some(port) => Ok(port),
        None => portmap::get_port(server, prog, vers, proto.pmap_prot(), timeout).await,
    }
}

/// Connects a privileged TCP socket to `prog`/`vers` on `server`,
/// resolving the service port through the portmapper unless one is
/// supplied.
pub async fn open_stream(
    server: Ipv4Addr,
    prog: u32,
    vers: u32,
    port: Option<u16>,
    timeout: Duration,
) -> Result<TcpStream> {
    let socket = privileged_tcp_socket(None)?;
    let port = resolve_service_port(server, prog, vers, Proto::Tcp, port, timeout).await?;
    let stream = socket
        .connect(SocketAddr::V4(SocketAddrV4::new(server, port)))
        .await?;
    Ok(stream)
}

/// As `open_stream`, for UDP.
pub async fn open_datagram(
    server: Ipv4Addr,
    prog: u32,
    vers: u32,
    port: Option<u16>,
    timeout: Duration,
) -> Result<UdpSocket> {
    let std_socket = privileged_udp_socket()?;
    std_socket.set_nonblocking(true)?;
    let socket = UdpSocket::from_std(std_socket)?;
    let port = resolve_service_port(server, prog, vers, Proto::Udp, port, timeout).await?;
    socket
        .connect(SocketAddr::V4(SocketAddrV4::new(server, port)))
        .await?;
    Ok(socket)
}

/// Builds the IP loose-source-route option buffer: type, length,
/// pointer (= IPOPT_MINOFF), the hop addresses, NUL padding to a
/// 4-byte multiple.
fn build_lsrr(hops: &[Ipv4Addr]) -> Vec<u8> {
    let len = 3 + 4 * hops.len();
    let mut opts = Vec::with_capacity(len + 3);
    opts.push(IPOPT_LSRR);
    opts.push(len as u8);
    opts.push(IPOPT_MINOFF);
    for hop in hops {
        opts.extend_from_slice(&hop.octets());
    }
    while opts.len() % 4 != 0 {
        opts.push(0);
    }
    opts
}

fn install_ip_options(socket: &TcpSocket, opts: &[u8]) -> Result<()> {
    let rc = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::IPPROTO_IP,
            libc::IP_OPTIONS,
            opts.as_ptr() as *const libc::c_void,
            opts.len() as libc::socklen_t,
        )
    };
    if rc == -1 {
        return Err(std::io::Error::last_os_error().into());
    }
    Ok(())
}

/// What `open_source_routed` ended up binding, so callers can report it.
pub struct SourceRouted {
    pub stream: TcpStream,
    pub privileged: bool,
}

/// Connects a TCP socket to `prog`/`vers` on `server` through the given
/// hops. A requested local address falls back to a non-privileged bind
/// when the whole reserved range is occupied; with no local address the
/// privileged bind is required.
pub async fn open_source_routed(
    local: Option<Ipv4Addr>,
    hops: &[Ipv4Addr],
    server: Ipv4Addr,
    prog: u32,
    vers: u32,
    timeout: Duration,
) -> Result<SourceRouted> {
    let (socket, privileged) = match local {
        None => (privileged_tcp_socket(None)?, true),
        Some(addr) => match privileged_tcp_socket(Some(addr)) {
            Ok(socket) => (socket, true),
            Err(Error::PortsExhausted) => {
                let socket = TcpSocket::new_v4()?;
                socket.bind(SocketAddr::V4(SocketAddrV4::new(addr, 0)))?;
                (socket, false)
            }
            Err(err) => return Err(err),
        },
    };

    if !hops.is_empty() {
        let opts = build_lsrr(hops);
        install_ip_options(&socket, &opts)?;
        tracing::debug!(hops = hops.len(), "installed loose source route");
    }

    let port = resolve_service_port(server, prog, vers, Proto::Tcp, None, timeout).await?;
    let stream = socket
        .connect(SocketAddr::V4(SocketAddrV4::new(server, port)))
        .await?;
    Ok(SourceRouted { stream, privileged })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_host_has_no_route() {
        assert_eq!(parse_host_spec("192.0.2.10"), (None, "192.0.2.10"));
        assert_eq!(parse_host_spec("fileserver"), (None, "fileserver"));
    }

    #[test]
    fn at_form_parses_local_and_hops() {
        let (route, host) = parse_host_spec("10.0.0.5@gw1:gw2:target");
        assert_eq!(host, "target");
        let route = route.unwrap();
        assert_eq!(route.local.as_deref(), Some("10.0.0.5"));
        assert_eq!(route.hops, vec!["gw1".to_string(), "gw2".to_string()]);
    }

    #[test]
    fn bare_at_means_anonymous_local() {
        let (route, host) = parse_host_spec("@target");
        assert_eq!(host, "target");
        let route = route.unwrap();
        assert_eq!(route.local, None);
        assert!(route.hops.is_empty());
    }

    #[test]
    fn colon_form_parses_hops_only() {
        let (route, host) = parse_host_spec("gw1:gw2:target");
        assert_eq!(host, "target");
        let route = route.unwrap();
        assert_eq!(route.local, None);
        assert_eq!(route.hops, vec!["gw1".to_string(), "gw2".to_string()]);
    }

    #[test]
    fn lsrr_layout_one_hop() {
        let opts = build_lsrr(&[Ipv4Addr::new(10, 1, 2, 3)]);
        // 3-byte header + one address, padded to 8
        assert_eq!(opts.len(), 8);
        assert_eq!(opts[0], IPOPT_LSRR);
        assert_eq!(opts[1], 7);
        assert_eq!(opts[2], IPOPT_MINOFF);
        assert_eq!(&opts[3..7], &[10, 1, 2, 3]);
        assert_eq!(opts[7], 0);
    }

    #[test]
    fn lsrr_layout_two_hops() {
        let opts = build_lsrr(&[Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2)]);
        // 3 + 8 = 11, padded to 12
        assert_eq!(opts.len(), 12);
        assert_eq!(opts[1], 11);
    }

    #[test]
    fn bind_errno_classification() {
        use std::io::{Error as IoError, ErrorKind};
        assert!(bind_retryable(&IoError::from(ErrorKind::AddrInUse)));
        assert!(bind_retryable(&IoError::from(ErrorKind::AddrNotAvailable)));
        assert!(!bind_retryable(&IoError::from(ErrorKind::PermissionDenied)));
    }
}
