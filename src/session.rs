//! Session state and the MOUNT/NFS drivers behind every shell verb.
//!
//! A session owns at most two RPC client handles: one to the MOUNT
//! daemon (opened by `host`) and one to the NFS server (opened by
//! `mount` or `handle`). All state transitions that replace a handle
//! drop the previous one first, which closes its socket and discards
//! its authenticator.

use crate::mount::{self, ExportEntry, MountEntry, MountResult};
use crate::net::{self, Proto};
use crate::nfs3::{self, procs::*, DirOpArgs3, FileAttributes, FileType3, NfsFh3, SetAttributes};
use crate::portmap;
use crate::result::{nfs_error_str, Error, Result};
use crate::rpc::{OpaqueAuth, RpcClient, Transport};
use crate::xdr::{PackTo, Packer, UnpackFrom};
use bytes::{Bytes, BytesMut};
use std::net::Ipv4Addr;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// The traditional "nobody" identity (-2).
pub const NOBODY: u32 = 0xffff_fffe;

const DEFAULT_TRANSFER_SIZE: u32 = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlavor {
    Unix,
    Des,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub flavor: AuthFlavor,
    pub uid: u32,
    pub gid: u32,
    pub secret_key: Option<String>,
}

impl Default for Credentials {
    fn default() -> Credentials {
        Credentials {
            flavor: AuthFlavor::Unix,
            uid: NOBODY,
            gid: NOBODY,
            secret_key: None,
        }
    }
}

/// Options shared by `mount` and `handle`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MountOpts {
    /// Send UMNT right after MNT but keep the handle.
    pub umount: bool,
    /// Route the MNT call through the portmapper's CALLIT.
    pub via_portmap: bool,
    /// Force a transport; the default is TCP with a UDP fallback.
    pub proto: Option<Proto>,
    /// Skip portmap discovery for the NFS channel and use this port.
    pub port: Option<u16>,
}

enum MountTarget<'a> {
    Path(&'a str),
    RawHandle(NfsFh3),
}

pub struct Session {
    pub remote_host: Option<String>,
    pub server_addr: Option<Ipv4Addr>,
    mnt_client: Option<RpcClient>,
    nfs_client: Option<RpcClient>,
    pub mount_path: Option<String>,
    pub root_handle: Option<NfsFh3>,
    pub cwd_handle: Option<NfsFh3>,
    pub transfer_size: u32,
    pub creds: Credentials,
    pub verbose: bool,
    timeout: Duration,
}

impl Session {
    pub fn new(verbose: bool) -> Session {
        Session {
            remote_host: None,
            server_addr: None,
            mnt_client: None,
            nfs_client: None,
            mount_path: None,
            root_handle: None,
            cwd_handle: None,
            transfer_size: DEFAULT_TRANSFER_SIZE,
            creds: Credentials::default(),
            verbose,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn mounted(&self) -> bool {
        self.mount_path.is_some()
    }

    pub fn has_host(&self) -> bool {
        self.remote_host.is_some()
    }

    fn nfs(&mut self) -> Result<&mut RpcClient> {
        self.nfs_client.as_mut().ok_or(Error::NotMounted)
    }

    fn mnt(&mut self) -> Result<&mut RpcClient> {
        self.mnt_client.as_mut().ok_or(Error::NoHost)
    }

    /// Builds an authenticator from the session credentials. Only
    /// AUTH_UNIX can actually be built; the group list carries exactly
    /// the session gid.
    fn make_auth(&self) -> Result<OpaqueAuth> {
        match self.creds.flavor {
            AuthFlavor::Des => Err(Error::NoSecureNfs),
            AuthFlavor::Unix => {
                let stamp = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_secs() as u32)
                    .unwrap_or(0);
                Ok(OpaqueAuth::new_unix(
                    stamp,
                    local_hostname(),
                    self.creds.uid,
                    self.creds.gid,
                    vec![self.creds.gid],
                ))
            }
        }
    }

    /// Re-derives the NFS authenticator after a credential change. On
    /// failure the previous authenticator stays in place.
    pub fn apply_auth(&mut self) -> Result<()> {
        let auth = self.make_auth()?;
        if let Some(client) = self.nfs_client.as_mut() {
            client.set_auth(auth);
        }
        Ok(())
    }

    fn report_port(&self, transport: &Transport) {
        if !self.verbose {
            return;
        }
        if let Ok(addr) = transport.local_addr() {
            if addr.port() < 1024 {
                eprintln!("Using a privileged port ({})", addr.port());
            }
        }
    }

    /// `host`: resolve the argument (which may carry a source route),
    /// open a channel to the MOUNT daemon and remember the peer. Any
    /// previous session is torn down first.
    pub async fn open_mount(&mut self, spec: &str) -> Result<()> {
        let (route, host) = net::parse_host_spec(spec);
        if self.remote_host.is_some() {
            self.close_mount().await;
        }
        let addr = net::resolve_ipv4(host).await?;
        let auth = self.make_auth()?;

        let transport = match route {
            Some(route) => {
                let local = match &route.local {
                    Some(name) => Some(net::resolve_ipv4(name).await?),
                    None => None,
                };
                let mut hops = Vec::new();
                for hop in &route.hops {
                    let hop = net::resolve_ipv4(hop).await?;
                    if self.verbose {
                        println!("Routed through {hop}");
                    }
                    hops.push(hop);
                }
                let routed = net::open_source_routed(
                    local,
                    &hops,
                    addr,
                    mount::PROGRAM,
                    mount::VERSION,
                    self.timeout,
                )
                .await?;
                if self.verbose && routed.privileged {
                    if let Some(local) = local {
                        println!("Bound to {local}");
                    }
                }
                Transport::Tcp(routed.stream)
            }
            None => {
                match net::open_stream(addr, mount::PROGRAM, mount::VERSION, None, self.timeout)
                    .await
                {
                    Ok(stream) => Transport::Tcp(stream),
                    Err(err) => {
                        tracing::debug!(%err, "mount channel over tcp failed, trying udp");
                        Transport::Udp(
                            net::open_datagram(
                                addr,
                                mount::PROGRAM,
                                mount::VERSION,
                                None,
                                self.timeout,
                            )
                            .await?,
                        )
                    }
                }
            }
        };

        self.report_port(&transport);
        let proto = if transport.is_tcp() {
            Proto::Tcp
        } else {
            Proto::Udp
        };
        let mut client = RpcClient::new(transport, mount::PROGRAM, mount::VERSION, auth);
        client.set_timeout(self.timeout);
        self.mnt_client = Some(client);
        self.server_addr = Some(addr);
        self.remote_host = Some(host.to_string());
        if self.verbose {
            println!("Open {host} ({addr}) {}", proto.name());
        }
        Ok(())
    }

    /// Tears the whole session down, unmounting first when needed.
    pub async fn close_mount(&mut self) {
        if self.mount_path.is_some() {
            self.close_nfs().await;
        }
        if let Some(host) = self.remote_host.take() {
            if self.verbose {
                println!("Close `{host}'");
            }
        }
        self.mnt_client = None;
        self.server_addr = None;
    }

    /// Drops the NFS channel and tells the MOUNT daemon we are gone.
    /// The UMNT is advisory; its failure is not interesting.
    pub async fn close_nfs(&mut self) {
        let Some(path) = self.mount_path.take() else {
            return;
        };
        if self.verbose {
            println!("Unmount `{path}'");
        }
        if let Some(client) = self.mnt_client.as_mut() {
            let _ = client
                .call(mount::MOUNTPROC3_UMNT, |buf| buf.pack_string(&path))
                .await;
        }
        self.root_handle = None;
        self.cwd_handle = None;
        self.nfs_client = None;
    }

    /// `mount <path>`: open the NFS channel and obtain the export's
    /// root handle from the MOUNT daemon.
    pub async fn mount_export(&mut self, path: &str, opts: MountOpts) -> Result<()> {
        self.open_nfs(MountTarget::Path(path), opts).await
    }

    /// `handle <bytes>`: open the NFS channel against a handle the
    /// operator already knows, bypassing the MOUNT daemon entirely.
    pub async fn mount_raw_handle(&mut self, handle: NfsFh3, opts: MountOpts) -> Result<()> {
        self.open_nfs(MountTarget::RawHandle(handle), opts).await
    }

    async fn open_nfs(&mut self, target: MountTarget<'_>, opts: MountOpts) -> Result<()> {
        let server = self.server_addr.ok_or(Error::NoHost)?;
        if self.mount_path.is_some() {
            self.close_nfs().await;
        }
        let auth = self.make_auth()?;

        let transport = match opts.proto {
            Some(Proto::Udp) => Transport::Udp(
                net::open_datagram(server, nfs3::PROG_NFS, nfs3::NFS_V3, opts.port, self.timeout)
                    .await?,
            ),
            Some(Proto::Tcp) => Transport::Tcp(
                net::open_stream(server, nfs3::PROG_NFS, nfs3::NFS_V3, opts.port, self.timeout)
                    .await?,
            ),
            None => {
                match net::open_stream(
                    server,
                    nfs3::PROG_NFS,
                    nfs3::NFS_V3,
                    opts.port,
                    self.timeout,
                )
                .await
                {
                    Ok(stream) => Transport::Tcp(stream),
                    Err(err) => {
                        tracing::debug!(%err, "nfs channel over tcp failed, trying udp");
                        Transport::Udp(
                            net::open_datagram(
                                server,
                                nfs3::PROG_NFS,
                                nfs3::NFS_V3,
                                opts.port,
                                self.timeout,
                            )
                            .await?,
                        )
                    }
                }
            }
        };

        self.report_port(&transport);
        let proto = if transport.is_tcp() {
            Proto::Tcp
        } else {
            Proto::Udp
        };
        let mut client = RpcClient::new(transport, nfs3::PROG_NFS, nfs3::NFS_V3, auth);
        client.set_timeout(self.timeout);
        self.nfs_client = Some(client);

        match target {
            MountTarget::Path(path) => {
                if let Err(err) = self.fetch_root_handle(server, path, &opts).await {
                    self.nfs_client = None;
                    return Err(err);
                }
                self.mount_path = Some(path.to_string());
            }
            MountTarget::RawHandle(handle) => {
                self.root_handle = None;
                self.cwd_handle = Some(handle);
                self.mount_path = Some("<handle>".to_string());
            }
        }

        self.transfer_size = self.determine_transfer_size().await;

        if self.verbose {
            let path = self.mount_path.as_deref().unwrap_or("");
            print!("Mount `{path}'");
            if opts.umount {
                print!(" (unmount)");
            }
            print!(", {}, ", proto.name());
            if let Some(port) = opts.port {
                print!("port {port}, ");
            }
            println!("transfer size {} bytes.", self.transfer_size);
        }
        Ok(())
    }

    async fn fetch_root_handle(
        &mut self,
        server: Ipv4Addr,
        path: &str,
        opts: &MountOpts,
    ) -> Result<()> {
        let res: MountResult = if opts.via_portmap {
            self.pmap_mnt(server, path).await?
        } else {
            self.mnt()?
                .call_decode(mount::MOUNTPROC3_MNT, |buf| buf.pack_string(path))
                .await?
        };
        let ok = res.map_err(Error::Mount)?;
        let handle = ok.handle.to_nfs_fh3();
        self.root_handle = Some(handle.clone());
        self.cwd_handle = Some(handle);

        // We have the handle; unmounting now clears the server's mount
        // table entry while the handle keeps working.
        if opts.umount {
            let _ = self
                .mnt()?
                .call(mount::MOUNTPROC3_UMNT, |buf| buf.pack_string(path))
                .await;
        }
        Ok(())
    }

    /// Sends the MNT request inside a portmap CALLIT so the call
    /// reaches the MOUNT daemon from the portmapper.
    async fn pmap_mnt(&self, server: Ipv4Addr, path: &str) -> Result<MountResult> {
        let mut args = BytesMut::new();
        args.pack_string(path);
        let mut body = portmap::call_indirect(
            server,
            mount::PROGRAM,
            mount::VERSION,
            mount::MOUNTPROC3_MNT,
            args.freeze(),
            self.timeout,
        )
        .await?;
        MountResult::unpack_from(&mut body)
    }

    /// FSINFO's preferred write size, with the historical fallback on
    /// any failure whatsoever.
    async fn determine_transfer_size(&mut self) -> u32 {
        let Some(root) = self.cwd_handle.clone() else {
            return DEFAULT_TRANSFER_SIZE;
        };
        match self.call_fsinfo(&root).await {
            Ok(info) => info.wtmax,
            Err(_) => DEFAULT_TRANSFER_SIZE,
        }
    }

    pub async fn call_lookup(&mut self, dir: &NfsFh3, name: &str) -> Result<Lookup3ResOk> {
        let args = Lookup3Args {
            what: DirOpArgs3 {
                dir: dir.clone(),
                name: name.to_string(),
            },
        };
        let res: LookupResult = self
            .nfs()?
            .call_decode(nfs3::NFSPROC3_LOOKUP, |buf| args.pack_to(buf))
            .await?;
        res.map_err(|(status, _)| Error::Nfs(status))
    }

    async fn call_fsinfo(&mut self, root: &NfsFh3) -> Result<Fsinfo3ResOk> {
        let args = Fsinfo3Args { root: root.clone() };
        let res: FsinfoResult = self
            .nfs()?
            .call_decode(nfs3::NFSPROC3_FSINFO, |buf| args.pack_to(buf))
            .await?;
        res.map_err(|(status, _)| Error::Nfs(status))
    }

    /// Looks `name` up in the current directory and insists the server
    /// sent attributes back; their absence after a successful call is a
    /// protocol anomaly, not something to paper over.
    pub async fn lookup_entry(&mut self, name: &str) -> Result<(NfsFh3, FileAttributes)> {
        let dir = self.cwd_handle.clone().ok_or(Error::NotMounted)?;
        let res = self.call_lookup(&dir, name).await?;
        let attrs = res.obj_attributes.ok_or(Error::MissingAttributes)?;
        Ok((res.object, attrs))
    }

    /// `cd`: walk the path one LOOKUP per component, requiring a
    /// directory at every step. The current directory only moves when
    /// the whole walk succeeds.
    pub async fn change_dir(&mut self, path: Option<&str>) -> Result<()> {
        if !self.mounted() {
            return Err(Error::NotMounted);
        }
        let Some(path) = path else {
            self.cwd_handle = Some(self.root_handle.clone().ok_or(Error::NoRootHandle)?);
            return Ok(());
        };

        let (mut handle, rest) = match path.strip_prefix('/') {
            Some(rest) => (
                self.root_handle.clone().ok_or(Error::NoRootHandle)?,
                rest,
            ),
            None => (self.cwd_handle.clone().ok_or(Error::NotMounted)?, path),
        };

        for component in rest.split('/').filter(|c| !c.is_empty()) {
            let res = self
                .call_lookup(&handle, component)
                .await
                .map_err(|err| Error::named(component, err))?;
            let attrs = res.obj_attributes.ok_or(Error::MissingAttributes)?;
            if attrs.file_type != FileType3::Dir {
                return Err(Error::NotDirectory {
                    name: component.to_string(),
                });
            }
            handle = res.object;
        }
        self.cwd_handle = Some(handle);
        Ok(())
    }

    /// Reads every name in the current directory, paging with the
    /// cookie of the last entry of each reply, and returns the names
    /// sorted. READDIR replies carry no attributes; callers that want
    /// them do a LOOKUP per name.
    pub async fn read_dir_names(&mut self) -> Result<Vec<String>> {
        let dir = self.cwd_handle.clone().ok_or(Error::NotMounted)?;
        let mut names = Vec::new();
        let mut cookie = 0u64;
        loop {
            let args = Readdir3Args {
                dir: dir.clone(),
                cookie,
                verifier: 0,
                count: 8192,
            };
            let res: ReaddirResult = self
                .nfs()?
                .call_decode(nfs3::NFSPROC3_READDIR, |buf| args.pack_to(buf))
                .await?;
            let ok = res.map_err(|(status, _)| Error::Nfs(status))?;
            let last_cookie = ok.reply.entries.last().map(|e| e.cookie);
            names.extend(ok.reply.entries.into_iter().map(|e| e.name));
            if ok.reply.eof {
                break;
            }
            match last_cookie {
                Some(c) => cookie = c,
                // no entries and no eof would never terminate
                None => break,
            }
        }
        names.sort();
        Ok(names)
    }

    /// Streams a regular file into `sink` in transfer-size chunks.
    /// Returns (bytes read, size the server reported at LOOKUP time);
    /// the two can disagree and the caller decides whether to complain.
    pub async fn read_file(
        &mut self,
        name: &str,
        sink: &mut dyn std::io::Write,
    ) -> Result<(u64, u64)> {
        let (fh, attrs) = self
            .lookup_entry(name)
            .await
            .map_err(|err| err.rename(name))?;
        if attrs.file_type != FileType3::Reg {
            return Err(Error::NotRegular {
                name: name.to_string(),
            });
        }
        let read = self.read_file_handle(name, &fh, attrs.size, sink).await?;
        Ok((read, attrs.size))
    }

    /// The READ loop for a handle the caller already resolved. The
    /// offset advances by what the server actually returned, and eof
    /// cuts the loop short even before the expected size.
    pub async fn read_file_handle(
        &mut self,
        name: &str,
        fh: &NfsFh3,
        size: u64,
        sink: &mut dyn std::io::Write,
    ) -> Result<u64> {
        let mut offset = 0u64;
        while offset < size {
            let args = Read3Args {
                file: fh.clone(),
                offset,
                count: self.transfer_size,
            };
            let res: ReadResult = self
                .nfs()?
                .call_decode(nfs3::NFSPROC3_READ, |buf| args.pack_to(buf))
                .await?;
            let ok = res.map_err(|(status, _)| Error::named(name, Error::Nfs(status)))?;
            sink.write_all(&ok.data)?;
            offset += ok.data.len() as u64;
            if ok.eof || ok.data.is_empty() {
                break;
            }
        }
        Ok(offset)
    }

    /// `put`: CREATE (exclusive, but a failure is only a warning so
    /// existing files can be overwritten), LOOKUP for the handle, then
    /// a chunked unstable WRITE loop closed out by a COMMIT.
    pub async fn write_file(
        &mut self,
        local: &mut dyn std::io::Read,
        remote: &str,
    ) -> Result<u64> {
        let dir = self.cwd_handle.clone().ok_or(Error::NotMounted)?;
        let create_args = Create3Args {
            create_where: DirOpArgs3 {
                dir,
                name: remote.to_string(),
            },
            how: CreateHow3::Exclusive(0),
        };
        let created: CreateResult = self
            .nfs()?
            .call_decode(nfs3::NFSPROC3_CREATE, |buf| create_args.pack_to(buf))
            .await?;
        if let Err((status, _)) = created {
            eprintln!("WARNING: Create failed: {}", nfs_error_str(status));
        }

        let (fh, _) = self
            .lookup_entry(remote)
            .await
            .map_err(|err| err.rename(remote))?;

        let mut buf = [0u8; 8192];
        let mut offset = 0u64;
        loop {
            let n = local.read(&mut buf)?;
            if n == 0 {
                break;
            }
            let args = Write3Args {
                file: fh.clone(),
                offset,
                count: n as u32,
                stable: StableHow::Unstable,
                data: Bytes::copy_from_slice(&buf[..n]),
            };
            let res: WriteResult = self
                .nfs()?
                .call_decode(nfs3::NFSPROC3_WRITE, |buf| args.pack_to(buf))
                .await?;
            res.map_err(|(status, _)| Error::Nfs(status))?;
            offset += n as u64;
        }

        let commit_args = Commit3Args {
            file: fh,
            offset: 0,
            count: 0,
        };
        let res: CommitResult = self
            .nfs()?
            .call_decode(nfs3::NFSPROC3_COMMIT, |buf| commit_args.pack_to(buf))
            .await?;
        if let Err((status, _)) = res {
            eprintln!("WARNING: Commit failed: {}", nfs_error_str(status));
        }
        Ok(offset)
    }

    async fn setattr(&mut self, name: &str, new_attributes: SetAttributes) -> Result<()> {
        let (fh, _) = self.lookup_entry(name).await.map_err(|err| err.rename(name))?;
        let args = SetAttr3Args {
            object: fh,
            new_attributes,
            guard: None,
        };
        let res: SetAttrResult = self
            .nfs()?
            .call_decode(nfs3::NFSPROC3_SETATTR, |buf| args.pack_to(buf))
            .await?;
        res.map(|_| ()).map_err(|(status, _)| Error::Nfs(status))
    }

    pub async fn set_mode(&mut self, name: &str, mode: u32) -> Result<()> {
        self.setattr(
            name,
            SetAttributes {
                mode: Some(mode),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn set_owner(&mut self, name: &str, uid: u32, gid: u32) -> Result<()> {
        self.setattr(
            name,
            SetAttributes {
                uid: Some(uid),
                gid: Some(gid),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn make_dir(&mut self, name: &str) -> Result<()> {
        let dir = self.cwd_handle.clone().ok_or(Error::NotMounted)?;
        let args = Mkdir3Args {
            mkdir_where: DirOpArgs3 {
                dir,
                name: name.to_string(),
            },
            attributes: SetAttributes::with_mode_owner(0o40755, self.creds.uid, self.creds.gid),
        };
        let res: MkdirResult = self
            .nfs()?
            .call_decode(nfs3::NFSPROC3_MKDIR, |buf| args.pack_to(buf))
            .await?;
        res.map(|_| ()).map_err(|(status, _)| Error::Nfs(status))
    }

    pub async fn make_node(&mut self, name: &str, what: MknodData3) -> Result<()> {
        let dir = self.cwd_handle.clone().ok_or(Error::NotMounted)?;
        let args = Mknod3Args {
            mknod_where: DirOpArgs3 {
                dir,
                name: name.to_string(),
            },
            what,
        };
        let res: MknodResult = self
            .nfs()?
            .call_decode(nfs3::NFSPROC3_MKNOD, |buf| args.pack_to(buf))
            .await?;
        res.map(|_| ()).map_err(|(status, _)| Error::Nfs(status))
    }

    pub async fn remove_file(&mut self, name: &str) -> Result<()> {
        let dir = self.cwd_handle.clone().ok_or(Error::NotMounted)?;
        let args = Remove3Args {
            object: DirOpArgs3 {
                dir,
                name: name.to_string(),
            },
        };
        let res: RemoveResult = self
            .nfs()?
            .call_decode(nfs3::NFSPROC3_REMOVE, |buf| args.pack_to(buf))
            .await?;
        res.map(|_| ()).map_err(|(status, _)| Error::Nfs(status))
    }

    pub async fn remove_dir(&mut self, name: &str) -> Result<()> {
        let dir = self.cwd_handle.clone().ok_or(Error::NotMounted)?;
        let args = Rmdir3Args {
            object: DirOpArgs3 {
                dir,
                name: name.to_string(),
            },
        };
        let res: RmdirResult = self
            .nfs()?
            .call_decode(nfs3::NFSPROC3_RMDIR, |buf| args.pack_to(buf))
            .await?;
        res.map(|_| ()).map_err(|(status, _)| Error::Nfs(status))
    }

    pub async fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let dir = self.cwd_handle.clone().ok_or(Error::NotMounted)?;
        let args = Rename3Args {
            from: DirOpArgs3 {
                dir: dir.clone(),
                name: from.to_string(),
            },
            to: DirOpArgs3 {
                dir,
                name: to.to_string(),
            },
        };
        let res: RenameResult = self
            .nfs()?
            .call_decode(nfs3::NFSPROC3_RENAME, |buf| args.pack_to(buf))
            .await?;
        res.map(|_| ()).map_err(|(status, _)| Error::Nfs(status))
    }

    /// Hard link: resolve the existing file, then LINK it under the
    /// new name in the current directory.
    pub async fn link(&mut self, existing: &str, link_name: &str) -> Result<()> {
        let dir = self.cwd_handle.clone().ok_or(Error::NotMounted)?;
        let (fh, _) = self
            .lookup_entry(existing)
            .await
            .map_err(|err| err.rename(existing))?;
        let args = Link3Args {
            file: fh,
            link: DirOpArgs3 {
                dir,
                name: link_name.to_string(),
            },
        };
        let res: LinkResult = self
            .nfs()?
            .call_decode(nfs3::NFSPROC3_LINK, |buf| args.pack_to(buf))
            .await?;
        res.map(|_| ()).map_err(|(status, _)| Error::Nfs(status))
    }

    pub async fn read_link(&mut self, fh: &NfsFh3) -> Result<String> {
        let args = ReadLink3Args { symlink: fh.clone() };
        let res: ReadLinkResult = self
            .nfs()?
            .call_decode(nfs3::NFSPROC3_READLINK, |buf| args.pack_to(buf))
            .await?;
        res.map(|ok| ok.data).map_err(|(status, _)| Error::Nfs(status))
    }

    /// `df`: FSSTAT against the export root.
    pub async fn fs_stat(&mut self) -> Result<Fsstat3ResOk> {
        if !self.mounted() {
            return Err(Error::NotMounted);
        }
        let root = self
            .root_handle
            .clone()
            .or_else(|| self.cwd_handle.clone())
            .ok_or(Error::NoRootHandle)?;
        let args = Fsstat3Args { root };
        let res: FsstatResult = self
            .nfs()?
            .call_decode(nfs3::NFSPROC3_FSSTAT, |buf| args.pack_to(buf))
            .await?;
        res.map_err(|(status, _)| Error::Nfs(status))
    }

    pub async fn export_list(&mut self) -> Result<Vec<ExportEntry>> {
        let mut reply = self.mnt()?.call(mount::MOUNTPROC3_EXPORT, |_| {}).await?;
        mount::unpack_exports(&mut reply)
    }

    pub async fn dump_list(&mut self) -> Result<Vec<MountEntry>> {
        let mut reply = self.mnt()?.call(mount::MOUNTPROC3_DUMP, |_| {}).await?;
        mount::unpack_mount_list(&mut reply)
    }

    /// UMNTALL carries no argument; the server identifies the caller
    /// by the RPC credentials.
    pub async fn umount_all(&mut self) -> Result<()> {
        if self.mount_path.is_some() {
            self.close_nfs().await;
        }
        self.mnt()?
            .call(mount::MOUNTPROC3_UMNTALL, |_| {})
            .await
            .map(|_| ())
    }
}

impl Error {
    /// Re-labels a `Named` error (or wraps a bare one) with the name
    /// the user typed rather than an internal one.
    fn rename(self, name: &str) -> Error {
        match self {
            Error::Named { source, .. } => Error::named(name, *source),
            other => Error::named(name, other),
        }
    }
}

fn local_hostname() -> String {
    let mut buf = [0u8; 256];
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len() - 1) };
    if rc != 0 {
        return "localhost".to_string();
    }
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..len]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfs3::{NfsTime3, SpecData3};
    use crate::rpc::read_record;
    use crate::xdr::Packer;
    use tokio::io::AsyncWriteExt;
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::mpsc;

    fn attrs(file_type: FileType3, size: u64) -> FileAttributes {
        FileAttributes {
            file_type,
            mode: 0o755,
            num_links: 1,
            uid: 0,
            gid: 0,
            size,
            used: size,
            rdev: SpecData3::default(),
            fsid: 1,
            file_id: 99,
            atime: NfsTime3::default(),
            mtime: NfsTime3::default(),
            ctime: NfsTime3::default(),
        }
    }

    /// A scripted RPC server: answers each call in order with a canned
    /// result body wrapped in a successful reply, and forwards the raw
    /// requests for inspection.
    async fn script_server(replies: Vec<Bytes>) -> (std::net::SocketAddr, mpsc::UnboundedReceiver<Bytes>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            for body in replies {
                let request = match read_record(&mut sock).await {
                    Ok(r) => r,
                    Err(_) => return,
                };
                let xid = u32::from_be_bytes(request[0..4].try_into().unwrap());
                let _ = tx.send(request);

                let mut reply = BytesMut::new();
                reply.pack_uint(xid);
                reply.pack_uint(1); // REPLY
                reply.pack_uint(0); // MSG_ACCEPTED
                reply.pack_uint(0); // verf AUTH_NONE
                reply.pack_uint(0);
                reply.pack_uint(0); // SUCCESS
                reply.extend_from_slice(&body);
                let mark = (reply.len() as u32 | 0x8000_0000).to_be_bytes();
                sock.write_all(&mark).await.unwrap();
                sock.write_all(&reply).await.unwrap();
            }
        });
        (addr, rx)
    }

    async fn client_for(addr: std::net::SocketAddr, prog: u32) -> RpcClient {
        let stream = TcpStream::connect(addr).await.unwrap();
        RpcClient::new(Transport::Tcp(stream), prog, 3, OpaqueAuth::new_none())
    }

    fn fh(byte: u8) -> NfsFh3 {
        NfsFh3 {
            data: vec![byte; 8],
        }
    }

    async fn mounted_session(replies: Vec<Bytes>) -> (Session, mpsc::UnboundedReceiver<Bytes>) {
        let (addr, rx) = script_server(replies).await;
        let mut session = Session::new(false);
        session.nfs_client = Some(client_for(addr, nfs3::PROG_NFS).await);
        session.remote_host = Some("testhost".to_string());
        session.mount_path = Some("/export/test".to_string());
        session.root_handle = Some(fh(1));
        session.cwd_handle = Some(fh(1));
        (session, rx)
    }

    fn lookup_ok(object: NfsFh3, a: FileAttributes) -> Bytes {
        let mut body = BytesMut::new();
        body.pack_uint(0);
        object.pack_to(&mut body);
        Some(a).pack_to(&mut body);
        None::<FileAttributes>.pack_to(&mut body);
        body.freeze()
    }

    #[tokio::test]
    async fn cd_stops_at_a_regular_file_and_keeps_cwd() {
        let replies = vec![
            lookup_ok(fh(2), attrs(FileType3::Dir, 0)),
            lookup_ok(fh(3), attrs(FileType3::Reg, 10)),
        ];
        let (mut session, _rx) = mounted_session(replies).await;

        let err = session.change_dir(Some("a/b")).await.unwrap_err();
        assert_eq!(err.to_string(), "b: is not a directory");
        assert_eq!(session.cwd_handle, Some(fh(1)));
    }

    #[tokio::test]
    async fn cd_commits_only_on_full_success() {
        let replies = vec![
            lookup_ok(fh(2), attrs(FileType3::Dir, 0)),
            lookup_ok(fh(3), attrs(FileType3::Dir, 0)),
        ];
        let (mut session, _rx) = mounted_session(replies).await;

        session.change_dir(Some("a/b")).await.unwrap();
        assert_eq!(session.cwd_handle, Some(fh(3)));

        // leading slash restarts from the root handle
        assert_eq!(session.root_handle, Some(fh(1)));
    }

    #[tokio::test]
    async fn readdir_pages_with_last_entry_cookie_and_sorts() {
        let page = |entries: Vec<(&str, u64)>, eof: bool| {
            let mut body = BytesMut::new();
            body.pack_uint(0);
            None::<FileAttributes>.pack_to(&mut body); // dir_attributes
            body.pack_uhyper(0); // cookieverf
            let list = DirList3 {
                entries: entries
                    .into_iter()
                    .map(|(name, cookie)| Entry3 {
                        fileid: 1,
                        name: name.to_string(),
                        cookie,
                    })
                    .collect(),
                eof,
            };
            list.pack_to(&mut body);
            body.freeze()
        };
        let replies = vec![
            page(vec![("zeta", 11), ("beta", 37)], false),
            page(vec![("alpha", 99)], true),
        ];
        let (mut session, mut rx) = mounted_session(replies).await;

        let names = session.read_dir_names().await.unwrap();
        assert_eq!(names, vec!["alpha", "beta", "zeta"]);

        // second request resumes from the last entry's cookie (37),
        // not the reply verifier
        let _first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        // xid(4) + rpc header with null auth (36) + fh opaque (4+8) = 52
        let cookie = u64::from_be_bytes(second[52..60].try_into().unwrap());
        assert_eq!(cookie, 37);
    }

    #[tokio::test]
    async fn read_file_advances_by_data_len_until_eof() {
        let read_ok = |data: &[u8], eof: bool| {
            let mut body = BytesMut::new();
            body.pack_uint(0);
            None::<FileAttributes>.pack_to(&mut body);
            body.pack_uint(data.len() as u32);
            body.pack_bool(eof);
            body.pack_opaque(data);
            body.freeze()
        };
        let replies = vec![
            lookup_ok(fh(5), attrs(FileType3::Reg, 10)),
            read_ok(b"abcdef", false),
            read_ok(b"ghij", true),
        ];
        let (mut session, _rx) = mounted_session(replies).await;

        let mut sink = Vec::new();
        let (read, expected) = session.read_file("data.bin", &mut sink).await.unwrap();
        assert_eq!(read, 10);
        assert_eq!(expected, 10);
        assert_eq!(sink, b"abcdefghij");
    }

    #[tokio::test]
    async fn read_file_refuses_directories() {
        let replies = vec![lookup_ok(fh(5), attrs(FileType3::Dir, 0))];
        let (mut session, _rx) = mounted_session(replies).await;
        let mut sink = Vec::new();
        let err = session.read_file("somedir", &mut sink).await.unwrap_err();
        assert_eq!(err.to_string(), "somedir: is not a regular file");
    }

    #[tokio::test]
    async fn write_file_creates_writes_and_commits() {
        let create_ok = {
            let mut body = BytesMut::new();
            body.pack_uint(0);
            None::<NfsFh3>.pack_to(&mut body);
            None::<FileAttributes>.pack_to(&mut body);
            body.pack_bool(false);
            body.pack_bool(false);
            body.freeze()
        };
        let write_ok = |count: u32| {
            let mut body = BytesMut::new();
            body.pack_uint(0);
            body.pack_bool(false);
            body.pack_bool(false);
            body.pack_uint(count);
            body.pack_uint(1); // committed DATA_SYNC
            body.pack_uhyper(7);
            body.freeze()
        };
        let commit_ok = {
            let mut body = BytesMut::new();
            body.pack_uint(0);
            body.pack_bool(false);
            body.pack_bool(false);
            body.pack_uhyper(7);
            body.freeze()
        };

        let payload = vec![0x5a_u8; 10_000]; // spans two 8192-byte chunks
        let replies = vec![
            create_ok,
            lookup_ok(fh(9), attrs(FileType3::Reg, 0)),
            write_ok(8192),
            write_ok(10_000 - 8192),
            commit_ok,
        ];
        let (mut session, _rx) = mounted_session(replies).await;

        let mut src = std::io::Cursor::new(payload);
        let written = session.write_file(&mut src, "blob").await.unwrap();
        assert_eq!(written, 10_000);
    }

    #[tokio::test]
    async fn close_nfs_clears_mount_state() {
        // the mount client gets the advisory UMNT; reply is void
        let (mnt_addr, _mnt_rx) = script_server(vec![Bytes::new()]).await;
        let (mut session, _rx) = mounted_session(vec![]).await;
        session.mnt_client = Some(client_for(mnt_addr, mount::PROGRAM).await);

        session.close_nfs().await;
        assert!(session.mount_path.is_none());
        assert!(session.cwd_handle.is_none());
        assert!(session.root_handle.is_none());
        assert!(session.nfs_client.is_none());
        assert!(!session.mounted());
    }

    #[tokio::test]
    async fn des_credentials_cannot_build_an_authenticator() {
        let mut session = Session::new(false);
        session.creds.flavor = AuthFlavor::Des;
        session.creds.secret_key = Some("00112233".to_string());
        let err = session.apply_auth().unwrap_err();
        assert_eq!(err.to_string(), "no secure nfs support");
    }
}
