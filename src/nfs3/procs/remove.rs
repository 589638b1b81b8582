use crate::nfs3::{DirOpArgs3, WccData};
use crate::xdr::{pack_struct, unpack_struct};

#[derive(Debug)]
pub struct Remove3Args {
    pub object: DirOpArgs3,
}

pack_struct!(Remove3Args, object);

#[derive(Debug)]
pub struct Remove3ResOk {
    pub dir_wcc: WccData,
}

pack_struct!(Remove3ResOk, dir_wcc);
unpack_struct!(Remove3ResOk, dir_wcc);

#[derive(Debug)]
pub struct Remove3ResFail {
    pub dir_wcc: WccData,
}

pack_struct!(Remove3ResFail, dir_wcc);
unpack_struct!(Remove3ResFail, dir_wcc);

pub type RemoveResult = Result<Remove3ResOk, (u32, Remove3ResFail)>;
