use crate::nfs3::{Cookie3, Count3, FileId3, Filename3, NfsFh3, PostOpAttributes, Verifier3};
use crate::result::Result;
use crate::xdr::{pack_struct, unpack_struct, PackTo, Packer, UnpackFrom, Unpacker};

#[derive(Debug)]
pub struct Readdir3Args {
    pub dir: NfsFh3,
    pub cookie: Cookie3,
    pub verifier: Verifier3,
    pub count: Count3,
}

pack_struct!(Readdir3Args, dir, cookie, verifier, count);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry3 {
    pub fileid: FileId3,
    pub name: Filename3,
    pub cookie: Cookie3,
}

/// On the wire this is a recursive optional-next chain; it is decoded
/// iteratively into a flat entry table.
#[derive(Debug, Default)]
pub struct DirList3 {
    pub entries: Vec<Entry3>,
    pub eof: bool,
}

impl<B: Packer> PackTo<B> for DirList3 {
    fn pack_to(&self, buf: &mut B) {
        for entry in &self.entries {
            buf.pack_bool(true);
            buf.pack_uhyper(entry.fileid);
            buf.pack_string(&entry.name);
            buf.pack_uhyper(entry.cookie);
        }
        buf.pack_bool(false);
        buf.pack_bool(self.eof);
    }
}

impl<B: Unpacker> UnpackFrom<B> for DirList3 {
    fn unpack_from(buf: &mut B) -> Result<Self> {
        let mut entries = Vec::new();
        while buf.unpack_bool()? {
            entries.push(Entry3 {
                fileid: buf.unpack_uhyper()?,
                name: buf.unpack_string()?,
                cookie: buf.unpack_uhyper()?,
            });
        }
        let eof = buf.unpack_bool()?;
        Ok(DirList3 { entries, eof })
    }
}

#[derive(Debug)]
pub struct Readdir3ResOk {
    pub dir_attributes: PostOpAttributes,
    pub verifier: Verifier3,
    pub reply: DirList3,
}

pack_struct!(Readdir3ResOk, dir_attributes, verifier, reply);
unpack_struct!(Readdir3ResOk, dir_attributes, verifier, reply);

#[derive(Debug)]
pub struct Readdir3ResFail {
    pub dir_attributes: PostOpAttributes,
}

pack_struct!(Readdir3ResFail, dir_attributes);
unpack_struct!(Readdir3ResFail, dir_attributes);

pub type ReaddirResult = std::result::Result<Readdir3ResOk, (u32, Readdir3ResFail)>;

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn dir_list_roundtrip() {
        let list = DirList3 {
            entries: vec![
                Entry3 {
                    fileid: 2,
                    name: ".".into(),
                    cookie: 1,
                },
                Entry3 {
                    fileid: 7,
                    name: "file1".into(),
                    cookie: 2,
                },
            ],
            eof: true,
        };
        let mut buf = BytesMut::new();
        list.pack_to(&mut buf);
        let mut buf = buf.freeze();
        let back = DirList3::unpack_from(&mut buf).unwrap();
        assert_eq!(back.entries, list.entries);
        assert!(back.eof);
    }

    #[test]
    fn empty_dir_list() {
        let mut buf = BytesMut::new();
        buf.pack_bool(false);
        buf.pack_bool(true);
        let mut buf = buf.freeze();
        let list = DirList3::unpack_from(&mut buf).unwrap();
        assert!(list.entries.is_empty());
        assert!(list.eof);
    }
}
