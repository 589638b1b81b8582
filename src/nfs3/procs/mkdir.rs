use crate::nfs3::{DirOpArgs3, PostOpAttributes, PostOpFh3, SetAttributes, WccData};
use crate::xdr::{pack_struct, unpack_struct};

#[derive(Debug)]
pub struct Mkdir3Args {
    pub mkdir_where: DirOpArgs3,
    pub attributes: SetAttributes,
}

pack_struct!(Mkdir3Args, mkdir_where, attributes);

#[derive(Debug)]
pub struct Mkdir3ResOk {
    pub obj: PostOpFh3,
    pub attributes: PostOpAttributes,
    pub wcc_data: WccData,
}

pack_struct!(Mkdir3ResOk, obj, attributes, wcc_data);
unpack_struct!(Mkdir3ResOk, obj, attributes, wcc_data);

#[derive(Debug)]
pub struct Mkdir3ResFail {
    pub dir_wcc: WccData,
}

pack_struct!(Mkdir3ResFail, dir_wcc);
unpack_struct!(Mkdir3ResFail, dir_wcc);

pub type MkdirResult = Result<Mkdir3ResOk, (u32, Mkdir3ResFail)>;
