use crate::nfs3::{DirOpArgs3, WccData};
use crate::xdr::{pack_struct, unpack_struct};

#[derive(Debug)]
pub struct Rename3Args {
    pub from: DirOpArgs3,
    pub to: DirOpArgs3,
}

pack_struct!(Rename3Args, from, to);

#[derive(Debug)]
pub struct Rename3ResOk {
    pub fromdir_wcc: WccData,
    pub todir_wcc: WccData,
}

pack_struct!(Rename3ResOk, fromdir_wcc, todir_wcc);
unpack_struct!(Rename3ResOk, fromdir_wcc, todir_wcc);

#[derive(Debug)]
pub struct Rename3ResFail {
    pub fromdir_wcc: WccData,
    pub todir_wcc: WccData,
}

pack_struct!(Rename3ResFail, fromdir_wcc, todir_wcc);
unpack_struct!(Rename3ResFail, fromdir_wcc, todir_wcc);

pub type RenameResult = Result<Rename3ResOk, (u32, Rename3ResFail)>;
