use crate::nfs3::NFS3_FHSIZE;
use crate::result::{Error, Result};
use crate::xdr::{pack_struct, unpack_struct, PackTo, Packer, UnpackFrom, Unpacker};

pub type Filename3 = String;
pub type FileId3 = u64;
pub type Cookie3 = u64;
// Used here for cookieverf3, createverf3 and writeverf3, all technically
// defined as opaque[8]
pub type Verifier3 = u64;
pub type Uid3 = u32;
pub type Gid3 = u32;
pub type Size3 = u64;
pub type Count3 = u32;
pub type Mode3 = u32;
pub type Offset3 = u64;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FileType3 {
    Reg = 1,
    Dir = 2,
    Blk = 3,
    Chr = 4,
    Lnk = 5,
    Sock = 6,
    Fifo = 7,
}

impl<B: Packer> PackTo<B> for FileType3 {
    fn pack_to(&self, buf: &mut B) {
        buf.pack_uint(*self as u32);
    }
}

impl<B: Unpacker> UnpackFrom<B> for FileType3 {
    fn unpack_from(buf: &mut B) -> Result<Self> {
        match buf.unpack_uint()? {
            1 => Ok(FileType3::Reg),
            2 => Ok(FileType3::Dir),
            3 => Ok(FileType3::Blk),
            4 => Ok(FileType3::Chr),
            5 => Ok(FileType3::Lnk),
            6 => Ok(FileType3::Sock),
            7 => Ok(FileType3::Fifo),
            value => Err(Error::BadDiscriminant {
                what: "ftype3",
                value,
            }),
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SpecData3 {
    pub data1: u32,
    pub data2: u32,
}

pack_struct!(SpecData3, data1, data2);
unpack_struct!(SpecData3, data1, data2);

/// The NFSv3 file handle: a length-prefixed opaque capped at 64 bytes.
/// Handle bodies are always copied, never aliased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NfsFh3 {
    pub data: Vec<u8>,
}

impl<B: Packer> PackTo<B> for NfsFh3 {
    fn pack_to(&self, buf: &mut B) {
        buf.pack_opaque(&self.data);
    }
}

impl<B: Unpacker> UnpackFrom<B> for NfsFh3 {
    fn unpack_from(buf: &mut B) -> Result<Self> {
        let data = buf.unpack_opaque()?;
        if data.len() > NFS3_FHSIZE {
            return Err(Error::Decode("nfs file handle exceeds 64 bytes"));
        }
        Ok(NfsFh3 {
            data: data.to_vec(),
        })
    }
}

/// Seconds and nanoseconds since the epoch, UTC.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct NfsTime3 {
    pub seconds: u32,
    pub nano_seconds: u32,
}

pack_struct!(NfsTime3, seconds, nano_seconds);
unpack_struct!(NfsTime3, seconds, nano_seconds);

/// RFC 1813 `fattr3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttributes {
    pub file_type: FileType3,
    pub mode: Mode3,
    pub num_links: u32,
    pub uid: Uid3,
    pub gid: Gid3,
    pub size: Size3,
    pub used: Size3,
    pub rdev: SpecData3,
    pub fsid: u64,
    pub file_id: FileId3,
    pub atime: NfsTime3,
    pub mtime: NfsTime3,
    pub ctime: NfsTime3,
}

pack_struct!(
    FileAttributes,
    file_type,
    mode,
    num_links,
    uid,
    gid,
    size,
    used,
    rdev,
    fsid,
    file_id,
    atime,
    mtime,
    ctime,
);
unpack_struct!(
    FileAttributes,
    file_type,
    mode,
    num_links,
    uid,
    gid,
    size,
    used,
    rdev,
    fsid,
    file_id,
    atime,
    mtime,
    ctime,
);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TimeHow {
    #[default]
    DontChange,
    SetToServerTime,
    SetToClientTime(NfsTime3),
}

impl<B: Packer> PackTo<B> for TimeHow {
    fn pack_to(&self, buf: &mut B) {
        match self {
            TimeHow::DontChange => buf.pack_uint(0),
            TimeHow::SetToServerTime => buf.pack_uint(1),
            TimeHow::SetToClientTime(time) => {
                buf.pack_uint(2);
                time.pack_to(buf);
            }
        }
    }
}

impl<B: Unpacker> UnpackFrom<B> for TimeHow {
    fn unpack_from(buf: &mut B) -> Result<Self> {
        match buf.unpack_uint()? {
            0 => Ok(TimeHow::DontChange),
            1 => Ok(TimeHow::SetToServerTime),
            2 => Ok(TimeHow::SetToClientTime(NfsTime3::unpack_from(buf)?)),
            value => Err(Error::BadDiscriminant {
                what: "time_how",
                value,
            }),
        }
    }
}

/// RFC 1813 `sattr3`: each member is set-or-leave.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetAttributes {
    pub mode: Option<Mode3>,
    pub uid: Option<Uid3>,
    pub gid: Option<Gid3>,
    pub size: Option<Size3>,
    pub atime: TimeHow,
    pub mtime: TimeHow,
}

impl SetAttributes {
    /// Attributes the shell attaches to objects it creates: a mode plus
    /// the session identity, everything else left to the server.
    pub fn with_mode_owner(mode: Mode3, uid: Uid3, gid: Gid3) -> SetAttributes {
        SetAttributes {
            mode: Some(mode),
            uid: Some(uid),
            gid: Some(gid),
            ..Default::default()
        }
    }
}

pack_struct!(SetAttributes, mode, uid, gid, size, atime, mtime);
unpack_struct!(SetAttributes, mode, uid, gid, size, atime, mtime);

/// Subset of pre-operation attributes used for weak cache consistency
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WccAttributes {
    pub size: Size3,
    pub mtime: NfsTime3,
    pub ctime: NfsTime3,
}

pack_struct!(WccAttributes, size, mtime, ctime);
unpack_struct!(WccAttributes, size, mtime, ctime);

pub type PostOpAttributes = Option<FileAttributes>;
pub type PreOpAttributes = Option<WccAttributes>;
pub type PostOpFh3 = Option<NfsFh3>;

#[derive(Debug, Clone)]
pub struct DirOpArgs3 {
    pub dir: NfsFh3,
    pub name: Filename3,
}

pack_struct!(DirOpArgs3, dir, name);
unpack_struct!(DirOpArgs3, dir, name);

/// Weak Cache Consistency data
#[derive(Debug, Clone, Default)]
pub struct WccData {
    pub before: PreOpAttributes,
    pub after: PostOpAttributes,
}

pack_struct!(WccData, before, after);
unpack_struct!(WccData, before, after);

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    pub(crate) fn sample_attrs(file_type: FileType3, size: u64) -> FileAttributes {
        FileAttributes {
            file_type,
            mode: 0o644,
            num_links: 1,
            uid: 1000,
            gid: 100,
            size,
            used: size,
            rdev: SpecData3::default(),
            fsid: 0x10,
            file_id: 42,
            atime: NfsTime3::default(),
            mtime: NfsTime3::default(),
            ctime: NfsTime3 {
                seconds: 1_700_000_000,
                nano_seconds: 0,
            },
        }
    }

    #[test]
    fn fattr3_roundtrip() {
        let attrs = sample_attrs(FileType3::Reg, 1234);
        let mut buf = BytesMut::new();
        attrs.pack_to(&mut buf);
        assert_eq!(buf.len(), 84);
        let mut buf = buf.freeze();
        assert_eq!(FileAttributes::unpack_from(&mut buf).unwrap(), attrs);
    }

    #[test]
    fn sattr3_packs_discriminated_members() {
        let attrs = SetAttributes::with_mode_owner(0o40755, 0, 0);
        let mut buf = BytesMut::new();
        attrs.pack_to(&mut buf);
        let mut buf = buf.freeze();
        assert_eq!(SetAttributes::unpack_from(&mut buf).unwrap(), attrs);
    }

    #[test]
    fn file_type_rejects_out_of_range() {
        let mut buf = BytesMut::new();
        buf.pack_uint(9);
        let mut buf = buf.freeze();
        assert!(FileType3::unpack_from(&mut buf).is_err());
    }
}
