use crate::nfs3::{NfsFh3, PostOpAttributes};
use crate::xdr::{pack_struct, unpack_struct};

#[derive(Debug)]
pub struct ReadLink3Args {
    pub symlink: NfsFh3,
}

pack_struct!(ReadLink3Args, symlink);

#[derive(Debug)]
pub struct ReadLink3ResOk {
    pub symlink_attributes: PostOpAttributes,
    pub data: String,
}

pack_struct!(ReadLink3ResOk, symlink_attributes, data);
unpack_struct!(ReadLink3ResOk, symlink_attributes, data);

#[derive(Debug)]
pub struct ReadLink3ResFail {
    pub symlink_attributes: PostOpAttributes,
}

pack_struct!(ReadLink3ResFail, symlink_attributes);
unpack_struct!(ReadLink3ResFail, symlink_attributes);

pub type ReadLinkResult = Result<ReadLink3ResOk, (u32, ReadLink3ResFail)>;
