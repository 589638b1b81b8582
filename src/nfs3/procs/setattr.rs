use crate::nfs3::{NfsFh3, NfsTime3, SetAttributes, WccData};
use crate::xdr::{pack_struct, unpack_struct};

#[derive(Debug)]
pub struct SetAttr3Args {
    pub object: NfsFh3,
    pub new_attributes: SetAttributes,
    /// Guard, if present is compared to object ctime
    pub guard: Option<NfsTime3>,
}

pack_struct!(SetAttr3Args, object, new_attributes, guard);

#[derive(Debug)]
pub struct SetAttr3ResOk {
    pub obj_wcc: WccData,
}

pack_struct!(SetAttr3ResOk, obj_wcc);
unpack_struct!(SetAttr3ResOk, obj_wcc);

#[derive(Debug)]
pub struct SetAttr3ResFail {
    pub obj_wcc: WccData,
}

pack_struct!(SetAttr3ResFail, obj_wcc);
unpack_struct!(SetAttr3ResFail, obj_wcc);

pub type SetAttrResult = Result<SetAttr3ResOk, (u32, SetAttr3ResFail)>;
