use crate::nfs3::{Count3, NfsFh3, Offset3, PostOpAttributes};
use crate::xdr::{pack_struct, unpack_struct};
use bytes::Bytes;

#[derive(Debug)]
pub struct Read3Args {
    pub file: NfsFh3,
    pub offset: Offset3,
    pub count: Count3,
}

pack_struct!(Read3Args, file, offset, count);

#[derive(Debug)]
pub struct Read3ResOk {
    pub file_attributes: PostOpAttributes,
    pub count: Count3,
    pub eof: bool,
    pub data: Bytes,
}

pack_struct!(Read3ResOk, file_attributes, count, eof, data);
unpack_struct!(Read3ResOk, file_attributes, count, eof, data);

#[derive(Debug)]
pub struct Read3ResFail {
    pub file_attributes: PostOpAttributes,
}

pack_struct!(Read3ResFail, file_attributes);
unpack_struct!(Read3ResFail, file_attributes);

pub type ReadResult = Result<Read3ResOk, (u32, Read3ResFail)>;
