use crate::nfs3::{DirOpArgs3, NfsFh3, PostOpAttributes};
use crate::xdr::{pack_struct, unpack_struct};

#[derive(Debug)]
pub struct Lookup3Args {
    pub what: DirOpArgs3,
}

pack_struct!(Lookup3Args, what);

#[derive(Debug)]
pub struct Lookup3ResOk {
    pub object: NfsFh3,
    pub obj_attributes: PostOpAttributes,
    pub dir_attributes: PostOpAttributes,
}

pack_struct!(Lookup3ResOk, object, obj_attributes, dir_attributes);
unpack_struct!(Lookup3ResOk, object, obj_attributes, dir_attributes);

#[derive(Debug)]
pub struct Lookup3ResFail {
    pub dir_attributes: PostOpAttributes,
}

pack_struct!(Lookup3ResFail, dir_attributes);
unpack_struct!(Lookup3ResFail, dir_attributes);

pub type LookupResult = Result<Lookup3ResOk, (u32, Lookup3ResFail)>;
