use crate::nfs3::{Count3, NfsFh3, Offset3, Verifier3, WccData};
use crate::xdr::{pack_struct, unpack_struct};

#[derive(Debug)]
pub struct Commit3Args {
    pub file: NfsFh3,
    pub offset: Offset3,
    pub count: Count3,
}

pack_struct!(Commit3Args, file, offset, count);

#[derive(Debug)]
pub struct Commit3ResOk {
    pub file_wcc: WccData,
    pub verifier: Verifier3,
}

pack_struct!(Commit3ResOk, file_wcc, verifier);
unpack_struct!(Commit3ResOk, file_wcc, verifier);

#[derive(Debug)]
pub struct Commit3ResFail {
    pub file_wcc: WccData,
}

pack_struct!(Commit3ResFail, file_wcc);
unpack_struct!(Commit3ResFail, file_wcc);

pub type CommitResult = Result<Commit3ResOk, (u32, Commit3ResFail)>;
