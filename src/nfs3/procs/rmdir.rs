use crate::nfs3::{DirOpArgs3, WccData};
use crate::xdr::{pack_struct, unpack_struct};

#[derive(Debug)]
pub struct Rmdir3Args {
    pub object: DirOpArgs3,
}

pack_struct!(Rmdir3Args, object);

#[derive(Debug)]
pub struct Rmdir3ResOk {
    pub dir_wcc: WccData,
}

pack_struct!(Rmdir3ResOk, dir_wcc);
unpack_struct!(Rmdir3ResOk, dir_wcc);

#[derive(Debug)]
pub struct Rmdir3ResFail {
    pub dir_wcc: WccData,
}

pack_struct!(Rmdir3ResFail, dir_wcc);
unpack_struct!(Rmdir3ResFail, dir_wcc);

pub type RmdirResult = Result<Rmdir3ResOk, (u32, Rmdir3ResFail)>;
