use crate::nfs3::{NfsFh3, PostOpAttributes, Size3};
use crate::xdr::{pack_struct, unpack_struct};

#[derive(Debug)]
pub struct Fsstat3Args {
    pub root: NfsFh3,
}

pack_struct!(Fsstat3Args, root);

#[derive(Debug)]
pub struct Fsstat3ResOk {
    pub obj_attributes: PostOpAttributes,
    /// Total size in bytes of the file system
    pub tbytes: Size3,
    /// Free space in bytes
    pub fbytes: Size3,
    /// Free space, in bytes, available to the user
    pub abytes: Size3,
    /// Total number of file slots
    pub tfiles: Size3,
    /// Number of free file slots
    pub ffiles: Size3,
    /// Number of free file slots available to the user
    pub afiles: Size3,
    /// A measure of file system volatility in seconds
    pub invarsec: u32,
}

pack_struct!(
    Fsstat3ResOk,
    obj_attributes,
    tbytes,
    fbytes,
    abytes,
    tfiles,
    ffiles,
    afiles,
    invarsec,
);
unpack_struct!(
    Fsstat3ResOk,
    obj_attributes,
    tbytes,
    fbytes,
    abytes,
    tfiles,
    ffiles,
    afiles,
    invarsec,
);

#[derive(Debug)]
pub struct Fsstat3ResFail {
    pub obj_attributes: PostOpAttributes,
}

pack_struct!(Fsstat3ResFail, obj_attributes);
unpack_struct!(Fsstat3ResFail, obj_attributes);

pub type FsstatResult = Result<Fsstat3ResOk, (u32, Fsstat3ResFail)>;
