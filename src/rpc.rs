//! ONC RPC v2 (RFC 5531) client plumbing: call/reply headers, AUTH_NONE
//! and AUTH_UNIX credentials, TCP record marking, and a client handle
//! that owns its transport, authenticator and timeout. One call is in
//! flight at a time; there is no xid demultiplexer.

use crate::result::{Error, Result};
use crate::xdr::{PackTo, Packer, UnpackFrom, Unpacker};
use bytes::{Buf, Bytes, BytesMut};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};

/// Largest reply we are willing to reassemble.
const MAX_PACKET_SIZE: u32 = 1024 * 1024;

const LAST_FRAGMENT: u32 = 0x8000_0000;
const CALL: u32 = 0;
const REPLY: u32 = 1;
const RPC_VERS: u32 = 2;

const MSG_ACCEPTED: u32 = 0;
const MSG_DENIED: u32 = 1;

pub const AUTH_NONE: u32 = 0;
pub const AUTH_UNIX: u32 = 1;
pub const AUTH_DES: u32 = 3;

/// RFC 5531 `authsys_parms`.
#[derive(Debug, Clone)]
pub struct AuthUnix {
    pub stamp: u32,
    pub machine_name: String,
    pub uid: u32,
    pub gid: u32,
    pub gids: Vec<u32>,
}

/// RFC 5531 `opaque_auth`, restricted to the flavors this client emits.
#[derive(Debug, Clone)]
pub enum OpaqueAuth {
    None,
    Unix(AuthUnix),
}

impl OpaqueAuth {
    pub fn new_none() -> OpaqueAuth {
        OpaqueAuth::None
    }

    pub fn new_unix(
        stamp: u32,
        machine_name: String,
        uid: u32,
        gid: u32,
        gids: Vec<u32>,
    ) -> OpaqueAuth {
        OpaqueAuth::Unix(AuthUnix {
            stamp,
            machine_name,
            uid,
            gid,
            gids,
        })
    }
}

impl<B: Packer> PackTo<B> for OpaqueAuth {
    fn pack_to(&self, buf: &mut B) {
        match self {
            OpaqueAuth::None => {
                buf.pack_uint(AUTH_NONE);
                buf.pack_uint(0);
            }
            OpaqueAuth::Unix(sys) => {
                let mut body = BytesMut::new();
                body.pack_uint(sys.stamp);
                body.pack_string(&sys.machine_name);
                body.pack_uint(sys.uid);
                body.pack_uint(sys.gid);
                sys.gids.pack_to(&mut body);
                buf.pack_uint(AUTH_UNIX);
                buf.pack_opaque(&body);
            }
        }
    }
}

/// Corresponds to RFC 5531 `call_body`; rpcvers is hardcoded 2.
pub struct CallHeader {
    pub prog: u32,
    pub vers: u32,
    pub proc: u32,
    pub cred: OpaqueAuth,
    pub verf: OpaqueAuth,
}

impl<B: Packer> PackTo<B> for CallHeader {
    fn pack_to(&self, buf: &mut B) {
        buf.pack_uint(CALL);
        buf.pack_uint(RPC_VERS);
        buf.pack_uint(self.prog);
        buf.pack_uint(self.vers);
        buf.pack_uint(self.proc);
        self.cred.pack_to(buf);
        self.verf.pack_to(buf);
    }
}

/// Consumes the reply body header after the xid: message type, reply
/// status, the server's verifier, and the accept status. Leaves `buf`
/// positioned at the procedure results on success.
pub fn check_reply_header(buf: &mut Bytes) -> Result<()> {
    let msg_type = buf.unpack_uint()?;
    if msg_type != REPLY {
        return Err(Error::Rpc(format!("unexpected message type {msg_type}")));
    }
    match buf.unpack_uint()? {
        MSG_ACCEPTED => {
            let _verf_flavor = buf.unpack_uint()?;
            let _verf_body = buf.unpack_opaque()?;
            match buf.unpack_uint()? {
                0 => Ok(()),
                1 => Err(Error::Rpc("program unavailable".into())),
                2 => {
                    let low = buf.unpack_uint()?;
                    let high = buf.unpack_uint()?;
                    Err(Error::Rpc(format!(
                        "program version mismatch (server supports {low}-{high})"
                    )))
                }
                3 => Err(Error::Rpc("procedure unavailable".into())),
                4 => Err(Error::Rpc("server cannot decode arguments".into())),
                5 => Err(Error::Rpc("system error on server".into())),
                value => Err(Error::Rpc(format!("unknown accept status {value}"))),
            }
        }
        MSG_DENIED => match buf.unpack_uint()? {
            0 => {
                let low = buf.unpack_uint()?;
                let high = buf.unpack_uint()?;
                Err(Error::Rpc(format!(
                    "rpc version mismatch (server supports {low}-{high})"
                )))
            }
            1 => {
                let stat = buf.unpack_uint()?;
                Err(Error::Rpc(format!("authentication error {stat}")))
            }
            value => Err(Error::Rpc(format!("unknown rejection status {value}"))),
        },
        value => Err(Error::Rpc(format!("unknown reply status {value}"))),
    }
}

/// Reads one record-marked RPC message, reassembling fragments.
pub async fn read_record<S>(stream: &mut S) -> Result<Bytes>
where
    S: tokio::io::AsyncRead + Unpin,
{
    let mut out = BytesMut::new();
    loop {
        let mut mark = [0u8; 4];
        stream.read_exact(&mut mark).await?;
        let mark = u32::from_be_bytes(mark);
        let last = mark & LAST_FRAGMENT != 0;
        let frag_size = mark & !LAST_FRAGMENT;
        if frag_size as u64 + out.len() as u64 > MAX_PACKET_SIZE as u64 {
            return Err(Error::Rpc("reply exceeds maximum packet size".into()));
        }
        let mut fragment = vec![0u8; frag_size as usize];
        stream.read_exact(&mut fragment).await?;
        out.extend_from_slice(&fragment);
        if last {
            return Ok(out.freeze());
        }
    }
}

/// The transport under an RPC client. TCP messages are record-marked,
/// UDP messages are one datagram each.
pub enum Transport {
    Tcp(TcpStream),
    Udp(UdpSocket),
}

impl Transport {
    pub fn is_tcp(&self) -> bool {
        matches!(self, Transport::Tcp(_))
    }

    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        Ok(match self {
            Transport::Tcp(s) => s.local_addr()?,
            Transport::Udp(s) => s.local_addr()?,
        })
    }

    async fn send(&mut self, message: &[u8]) -> Result<()> {
        match self {
            Transport::Tcp(stream) => {
                let mark = (message.len() as u32 | LAST_FRAGMENT).to_be_bytes();
                stream.write_all(&mark).await?;
                stream.write_all(message).await?;
                stream.flush().await?;
            }
            Transport::Udp(socket) => {
                socket.send(message).await?;
            }
        }
        Ok(())
    }

    async fn recv(&mut self) -> Result<Bytes> {
        match self {
            Transport::Tcp(stream) => read_record(stream).await,
            Transport::Udp(socket) => {
                let mut buf = vec![0u8; 65536];
                let n = socket.recv(&mut buf).await?;
                buf.truncate(n);
                Ok(Bytes::from(buf))
            }
        }
    }
}

/// A long-lived RPC client handle: transport, program identity,
/// authenticator and timeout. Dropping the handle closes the socket.
pub struct RpcClient {
    transport: Transport,
    prog: u32,
    vers: u32,
    auth: OpaqueAuth,
    timeout: Duration,
    xid: u32,
}

impl RpcClient {
    pub fn new(transport: Transport, prog: u32, vers: u32, auth: OpaqueAuth) -> RpcClient {
        // Seed the xid away from other processes talking to the same server.
        let pid = std::process::id();
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);
        RpcClient {
            transport,
            prog,
            vers,
            auth,
            timeout: Duration::from_secs(60),
            xid: pid.wrapping_mul(0x9e37).wrapping_add(now),
        }
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Replaces the authenticator; the previous one is dropped first.
    pub fn set_auth(&mut self, auth: OpaqueAuth) {
        self.auth = auth;
    }

    pub fn is_tcp(&self) -> bool {
        self.transport.is_tcp()
    }

    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    fn next_xid(&mut self) -> u32 {
        self.xid = self.xid.wrapping_add(1);
        self.xid
    }

    /// Issues one call and returns the reply positioned at the results.
    /// Replies whose xid does not match are discarded (a previous call
    /// may have been abandoned at a SIGINT).
    pub async fn call<F>(&mut self, proc: u32, pack_args: F) -> Result<Bytes>
    where
        F: FnOnce(&mut BytesMut),
    {
        let xid = self.next_xid();
        let mut buf = BytesMut::new();
        buf.pack_uint(xid);
        CallHeader {
            prog: self.prog,
            vers: self.vers,
            proc,
            cred: self.auth.clone(),
            verf: OpaqueAuth::new_none(),
        }
        .pack_to(&mut buf);
        pack_args(&mut buf);

        let deadline = self.timeout;
        tokio::time::timeout(deadline, async {
            self.transport.send(&buf).await?;
            loop {
                let mut reply = self.transport.recv().await?;
                if reply.remaining() < 8 {
                    tracing::debug!("discarding short packet");
                    continue;
                }
                let reply_xid = reply.unpack_uint()?;
                if reply_xid != xid {
                    tracing::debug!(reply_xid, expected = xid, "discarding stale reply");
                    continue;
                }
                check_reply_header(&mut reply)?;
                return Ok(reply);
            }
        })
        .await
        .map_err(|_| Error::Timeout)?
    }

    /// Like `call`, but decodes the results with `UnpackFrom`.
    pub async fn call_decode<F, R>(&mut self, proc: u32, pack_args: F) -> Result<R>
    where
        F: FnOnce(&mut BytesMut),
        R: UnpackFrom<Bytes>,
    {
        let mut reply = self.call(proc, pack_args).await?;
        R::unpack_from(&mut reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xdr::Unpacker;

    #[test]
    fn auth_unix_body_layout() {
        let auth = OpaqueAuth::new_unix(7, "host".into(), 1000, 100, vec![100]);
        let mut buf = BytesMut::new();
        auth.pack_to(&mut buf);
        let mut buf = buf.freeze();

        assert_eq!(buf.unpack_uint().unwrap(), AUTH_UNIX);
        let mut body = buf.unpack_opaque().unwrap();
        assert_eq!(buf.remaining(), 0, "no trailing bytes after auth");
        // stamp, name, uid, gid, one-element gid list
        assert_eq!(body.unpack_uint().unwrap(), 7);
        assert_eq!(body.unpack_opaque().unwrap().as_ref(), b"host");
        assert_eq!(body.unpack_uint().unwrap(), 1000);
        assert_eq!(body.unpack_uint().unwrap(), 100);
        assert_eq!(body.unpack_uint().unwrap(), 1);
        assert_eq!(body.unpack_uint().unwrap(), 100);
        assert_eq!(body.remaining(), 0);
    }

    #[test]
    fn call_header_layout() {
        let header = CallHeader {
            prog: 100003,
            vers: 3,
            proc: 6,
            cred: OpaqueAuth::new_none(),
            verf: OpaqueAuth::new_none(),
        };
        let mut buf = BytesMut::new();
        header.pack_to(&mut buf);
        let mut buf = buf.freeze();
        assert_eq!(buf.unpack_uint().unwrap(), CALL);
        assert_eq!(buf.unpack_uint().unwrap(), RPC_VERS);
        assert_eq!(buf.unpack_uint().unwrap(), 100003);
        assert_eq!(buf.unpack_uint().unwrap(), 3);
        assert_eq!(buf.unpack_uint().unwrap(), 6);
    }

    #[tokio::test]
    async fn read_record_reassembles_fragments() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        tokio::spawn(async move {
            // two fragments: "abcd" then "ef" with the last-fragment bit
            server.write_all(&4u32.to_be_bytes()).await.unwrap();
            server.write_all(b"abcd").await.unwrap();
            server
                .write_all(&(2u32 | LAST_FRAGMENT).to_be_bytes())
                .await
                .unwrap();
            server.write_all(b"ef").await.unwrap();
        });
        let record = read_record(&mut client).await.unwrap();
        assert_eq!(record.as_ref(), b"abcdef");
    }

    #[tokio::test]
    async fn tcp_call_roundtrip_with_stale_reply() {
        use tokio::net::{TcpListener, TcpStream};

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let request = read_record(&mut sock).await.unwrap();
            let xid = u32::from_be_bytes(request[0..4].try_into().unwrap());

            let reply_for = |xid: u32, payload: u32| {
                let mut reply = BytesMut::new();
                reply.pack_uint(xid);
                reply.pack_uint(REPLY);
                reply.pack_uint(MSG_ACCEPTED);
                reply.pack_uint(AUTH_NONE);
                reply.pack_uint(0);
                reply.pack_uint(0); // SUCCESS
                reply.pack_uint(payload);
                reply.freeze()
            };

            // a stale reply first, then the real one
            for reply in [reply_for(xid.wrapping_sub(9), 0), reply_for(xid, 0xbeef)] {
                let mark = (reply.len() as u32 | LAST_FRAGMENT).to_be_bytes();
                sock.write_all(&mark).await.unwrap();
                sock.write_all(&reply).await.unwrap();
            }
        });

        let stream = TcpStream::connect(addr).await.unwrap();
        let mut client = RpcClient::new(
            Transport::Tcp(stream),
            100003,
            3,
            OpaqueAuth::new_none(),
        );
        let mut reply = client.call(0, |_| {}).await.unwrap();
        assert_eq!(reply.unpack_uint().unwrap(), 0xbeef);
    }
}
