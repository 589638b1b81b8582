//! Constants and structures for encoding and decoding the NFS MOUNT
//! protocol, version 3 (RFC 1813 appendix I).
//!
//! MOUNT has its own handle shape, `Fhandle3`, distinct from the NFS
//! `nfs_fh3`; the two never alias and conversion always copies.

use crate::nfs3::NfsFh3;
use crate::result::{Error, Result};
use crate::xdr::{PackTo, Packer, UnpackFrom, Unpacker};

pub const PROGRAM: u32 = 100005;
pub const VERSION: u32 = 3;

pub const MOUNTPROC3_NULL: u32 = 0;
pub const MOUNTPROC3_MNT: u32 = 1;
pub const MOUNTPROC3_DUMP: u32 = 2;
pub const MOUNTPROC3_UMNT: u32 = 3;
pub const MOUNTPROC3_UMNTALL: u32 = 4;
pub const MOUNTPROC3_EXPORT: u32 = 5;

pub const MNT3_OK: u32 = 0;

/// Wire cap on a MOUNT handle body.
pub const FHSIZE3: usize = 64;

/// The MOUNT protocol's file handle: a length-prefixed opaque capped at
/// 64 bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fhandle3 {
    pub data: Vec<u8>,
}

impl Fhandle3 {
    /// Copies this handle into the NFS handle shape.
    pub fn to_nfs_fh3(&self) -> NfsFh3 {
        NfsFh3 {
            data: self.data.clone(),
        }
    }
}

impl<B: Packer> PackTo<B> for Fhandle3 {
    fn pack_to(&self, buf: &mut B) {
        buf.pack_opaque(&self.data);
    }
}

impl<B: Unpacker> UnpackFrom<B> for Fhandle3 {
    fn unpack_from(buf: &mut B) -> Result<Self> {
        let data = buf.unpack_opaque()?;
        if data.len() > FHSIZE3 {
            return Err(Error::Decode("mount file handle exceeds 64 bytes"));
        }
        Ok(Fhandle3 {
            data: data.to_vec(),
        })
    }
}

#[derive(Debug)]
pub struct MountRes3Ok {
    pub handle: Fhandle3,
    pub auth_flavors: Vec<u32>,
}

crate::xdr::pack_struct!(MountRes3Ok, handle, auth_flavors);
crate::xdr::unpack_struct!(MountRes3Ok, handle, auth_flavors);

pub type MountResult = std::result::Result<MountRes3Ok, u32>;

/// One export and the groups allowed to reach it. An empty group list
/// means the export is world-mountable.
#[derive(Debug, PartialEq, Eq)]
pub struct ExportEntry {
    pub dir: String,
    pub groups: Vec<String>,
}

/// The wire form of `exports` and `groups` is a recursive optional-next
/// linked list; decode it iteratively into a flat table.
pub fn unpack_exports<B: Unpacker>(buf: &mut B) -> Result<Vec<ExportEntry>> {
    let mut entries = Vec::new();
    while buf.unpack_bool()? {
        let dir = buf.unpack_string()?;
        let mut groups = Vec::new();
        while buf.unpack_bool()? {
            groups.push(buf.unpack_string()?);
        }
        entries.push(ExportEntry { dir, groups });
    }
    Ok(entries)
}

/// One server-side mount table record.
#[derive(Debug, PartialEq, Eq)]
pub struct MountEntry {
    pub hostname: String,
    pub directory: String,
}

pub fn unpack_mount_list<B: Unpacker>(buf: &mut B) -> Result<Vec<MountEntry>> {
    let mut entries = Vec::new();
    while buf.unpack_bool()? {
        entries.push(MountEntry {
            hostname: buf.unpack_string()?,
            directory: buf.unpack_string()?,
        });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn handle_conversion_copies() {
        let mnt = Fhandle3 {
            data: vec![0xab; 32],
        };
        let nfs = mnt.to_nfs_fh3();
        assert_eq!(nfs.data, mnt.data);
    }

    #[test]
    fn mount_result_decodes_both_arms() {
        let mut buf = BytesMut::new();
        buf.pack_uint(0);
        buf.pack_opaque(&[1, 2, 3, 4]);
        buf.pack_uint(1); // one auth flavor
        buf.pack_uint(crate::rpc::AUTH_UNIX);
        let mut buf = buf.freeze();
        let res = MountResult::unpack_from(&mut buf).unwrap().unwrap();
        assert_eq!(res.handle.data, vec![1, 2, 3, 4]);
        assert_eq!(res.auth_flavors, vec![crate::rpc::AUTH_UNIX]);

        let mut buf = BytesMut::new();
        buf.pack_uint(13);
        let mut buf = buf.freeze();
        let err = MountResult::unpack_from(&mut buf).unwrap().unwrap_err();
        assert_eq!(err, 13);
    }

    #[test]
    fn oversized_handle_is_rejected() {
        let mut buf = BytesMut::new();
        buf.pack_opaque(&vec![0u8; 65]);
        let mut buf = buf.freeze();
        assert!(Fhandle3::unpack_from(&mut buf).is_err());
    }

    #[test]
    fn export_list_decodes_iteratively() {
        let mut buf = BytesMut::new();
        // /export/pub -> netgroup "trusted", "10.0.0.0/8"
        buf.pack_bool(true);
        buf.pack_string("/export/pub");
        buf.pack_bool(true);
        buf.pack_string("trusted");
        buf.pack_bool(true);
        buf.pack_string("10.0.0.0/8");
        buf.pack_bool(false);
        // /export/scratch -> everyone
        buf.pack_bool(true);
        buf.pack_string("/export/scratch");
        buf.pack_bool(false);
        buf.pack_bool(false);

        let mut buf = buf.freeze();
        let exports = unpack_exports(&mut buf).unwrap();
        assert_eq!(
            exports,
            vec![
                ExportEntry {
                    dir: "/export/pub".into(),
                    groups: vec!["trusted".into(), "10.0.0.0/8".into()],
                },
                ExportEntry {
                    dir: "/export/scratch".into(),
                    groups: vec![],
                },
            ]
        );
    }

    #[test]
    fn mount_list_decodes_iteratively() {
        let mut buf = BytesMut::new();
        buf.pack_bool(true);
        buf.pack_string("client.example");
        buf.pack_string("/export/pub");
        buf.pack_bool(false);
        let mut buf = buf.freeze();
        let list = unpack_mount_list(&mut buf).unwrap();
        assert_eq!(
            list,
            vec![MountEntry {
                hostname: "client.example".into(),
                directory: "/export/pub".into(),
            }]
        );
    }
}
