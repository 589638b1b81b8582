use crate::nfs3::{NfsFh3, NfsTime3, PostOpAttributes, Size3};
use crate::xdr::{pack_struct, unpack_struct};

#[derive(Debug)]
pub struct Fsinfo3Args {
    pub root: NfsFh3,
}

pack_struct!(Fsinfo3Args, root);

#[derive(Debug)]
pub struct Fsinfo3ResOk {
    pub obj_attributes: PostOpAttributes,
    pub rtmax: u32,
    pub rtpref: u32,
    pub rtmult: u32,
    pub wtmax: u32,
    pub wtpref: u32,
    pub wtmult: u32,
    pub dtpref: u32,
    pub maxfilesize: Size3,
    pub time_delta: NfsTime3,
    pub properties: u32,
}

pack_struct!(
    Fsinfo3ResOk,
    obj_attributes,
    rtmax,
    rtpref,
    rtmult,
    wtmax,
    wtpref,
    wtmult,
    dtpref,
    maxfilesize,
    time_delta,
    properties,
);
unpack_struct!(
    Fsinfo3ResOk,
    obj_attributes,
    rtmax,
    rtpref,
    rtmult,
    wtmax,
    wtpref,
    wtmult,
    dtpref,
    maxfilesize,
    time_delta,
    properties,
);

#[derive(Debug)]
pub struct Fsinfo3ResFail {
    pub obj_attributes: PostOpAttributes,
}

pack_struct!(Fsinfo3ResFail, obj_attributes);
unpack_struct!(Fsinfo3ResFail, obj_attributes);

pub type FsinfoResult = Result<Fsinfo3ResOk, (u32, Fsinfo3ResFail)>;
