use crate::nfs3::{DirOpArgs3, NfsFh3, PostOpAttributes, WccData};
use crate::xdr::{pack_struct, unpack_struct};

#[derive(Debug)]
pub struct Link3Args {
    pub file: NfsFh3,
    pub link: DirOpArgs3,
}

pack_struct!(Link3Args, file, link);

#[derive(Debug)]
pub struct Link3ResOk {
    pub attributes: PostOpAttributes,
    pub linkdir_wcc: WccData,
}

pack_struct!(Link3ResOk, attributes, linkdir_wcc);
unpack_struct!(Link3ResOk, attributes, linkdir_wcc);

#[derive(Debug)]
pub struct Link3ResFail {
    pub attributes: PostOpAttributes,
    pub linkdir_wcc: WccData,
}

pack_struct!(Link3ResFail, attributes, linkdir_wcc);
unpack_struct!(Link3ResFail, attributes, linkdir_wcc);

pub type LinkResult = Result<Link3ResOk, (u32, Link3ResFail)>;
