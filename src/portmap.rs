//! Portmap v2 (RFC 1833) client: direct GETPORT lookups for service
//! discovery and indirect CALLIT relaying for calls that should appear
//! to originate from the portmapper itself.

use crate::result::{Error, Result};
use crate::rpc::{check_reply_header, OpaqueAuth};
use crate::xdr::{pack_struct, unpack_struct, PackTo, Packer, Unpacker};
use bytes::{Bytes, BytesMut};
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::net::UdpSocket;

/// TCP/UDP port number for the RPC port mapper service.
pub const PORT: u16 = 111;

pub const PMAP_PROG: u32 = 100000;
pub const PMAP_VERS: u32 = 2;

pub const PMAPPROC_NULL: u32 = 0;
pub const PMAPPROC_SET: u32 = 1;
pub const PMAPPROC_UNSET: u32 = 2;
pub const PMAPPROC_GETPORT: u32 = 3;
pub const PMAPPROC_DUMP: u32 = 4;
pub const PMAPPROC_CALLIT: u32 = 5;

pub const IPPROTO_TCP: u32 = 6;
pub const IPPROTO_UDP: u32 = 17;

#[derive(Debug, Clone, Copy)]
pub struct Mapping {
    pub prog: u32,
    pub vers: u32,
    pub prot: u32,
    pub port: u32,
}

pack_struct!(Mapping, prog, vers, prot, port);
unpack_struct!(Mapping, prog, vers, prot, port);

/// One shot UDP exchange with the portmapper. The portmapper does not
/// care about our source port, so a transient unprivileged socket is
/// fine here; the privileged-port dance only matters for the services
/// the portmapper points us at.
async fn exchange(
    server: Ipv4Addr,
    proc: u32,
    pack_args: impl FnOnce(&mut BytesMut),
    timeout: Duration,
) -> Result<Bytes> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect((server, PORT)).await?;

    let xid = std::process::id().wrapping_add(proc);
    let mut buf = BytesMut::new();
    buf.pack_uint(xid);
    crate::rpc::CallHeader {
        prog: PMAP_PROG,
        vers: PMAP_VERS,
        proc,
        cred: OpaqueAuth::new_none(),
        verf: OpaqueAuth::new_none(),
    }
    .pack_to(&mut buf);
    pack_args(&mut buf);

    tokio::time::timeout(timeout, async {
        socket.send(&buf).await?;
        loop {
            let mut reply = vec![0u8; 65536];
            let n = socket.recv(&mut reply).await?;
            reply.truncate(n);
            let mut reply = Bytes::from(reply);
            if reply.unpack_uint()? != xid {
                tracing::debug!("discarding portmap reply with stale xid");
                continue;
            }
            check_reply_header(&mut reply)?;
            return Ok(reply);
        }
    })
    .await
    .map_err(|_| Error::Timeout)?
}

/// Resolves (program, version, protocol) to a port via PMAPPROC_GETPORT.
pub async fn get_port(
    server: Ipv4Addr,
    prog: u32,
    vers: u32,
    prot: u32,
    timeout: Duration,
) -> Result<u16> {
    let mapping = Mapping {
        prog,
        vers,
        prot,
        port: 0,
    };
    let mut reply = exchange(
        server,
        PMAPPROC_GETPORT,
        |buf| mapping.pack_to(buf),
        timeout,
    )
    .await?;
    let port = reply.unpack_uint()?;
    if port == 0 || port > u16::MAX as u32 {
        return Err(Error::NotRegistered);
    }
    tracing::debug!(prog, vers, prot, port, "portmap resolved");
    Ok(port as u16)
}

/// Issues PMAPPROC_CALLIT, asking the portmapper to forward `args` to
/// (prog, vers, proc) on its own host and relay the reply. Returns the
/// embedded result bytes; the port the service answered on is logged.
pub async fn call_indirect(
    server: Ipv4Addr,
    prog: u32,
    vers: u32,
    proc: u32,
    args: Bytes,
    timeout: Duration,
) -> Result<Bytes> {
    let mut reply = exchange(
        server,
        PMAPPROC_CALLIT,
        |buf| {
            buf.pack_uint(prog);
            buf.pack_uint(vers);
            buf.pack_uint(proc);
            buf.pack_opaque(&args);
        },
        timeout,
    )
    .await?;
    let port = reply.unpack_uint()?;
    tracing::debug!(prog, vers, proc, port, "indirect call answered");
    let body = reply.unpack_opaque()?;
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xdr::UnpackFrom;

    #[test]
    fn mapping_roundtrip() {
        let mapping = Mapping {
            prog: 100005,
            vers: 3,
            prot: IPPROTO_TCP,
            port: 0,
        };
        let mut buf = BytesMut::new();
        mapping.pack_to(&mut buf);
        assert_eq!(buf.len(), 16);
        let mut buf = buf.freeze();
        let back = Mapping::unpack_from(&mut buf).unwrap();
        assert_eq!(back.prog, 100005);
        assert_eq!(back.vers, 3);
        assert_eq!(back.prot, IPPROTO_TCP);
        assert_eq!(back.port, 0);
    }
}
