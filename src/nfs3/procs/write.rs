use crate::nfs3::{Count3, NfsFh3, Offset3, Verifier3, WccData};
use crate::result::Error;
use crate::xdr::{pack_struct, unpack_struct, PackTo, Packer, UnpackFrom, Unpacker};
use bytes::Bytes;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StableHow {
    Unstable,
    DataSync,
    FileSync,
}

impl<B: Packer> PackTo<B> for StableHow {
    fn pack_to(&self, buf: &mut B) {
        buf.pack_uint(match self {
            StableHow::Unstable => 0,
            StableHow::DataSync => 1,
            StableHow::FileSync => 2,
        });
    }
}

impl<B: Unpacker> UnpackFrom<B> for StableHow {
    fn unpack_from(buf: &mut B) -> crate::result::Result<Self> {
        match buf.unpack_uint()? {
            0 => Ok(StableHow::Unstable),
            1 => Ok(StableHow::DataSync),
            2 => Ok(StableHow::FileSync),
            value => Err(Error::BadDiscriminant {
                what: "stable_how",
                value,
            }),
        }
    }
}

#[derive(Debug)]
pub struct Write3Args {
    pub file: NfsFh3,
    pub offset: Offset3,
    pub count: Count3,
    pub stable: StableHow,
    pub data: Bytes,
}

pack_struct!(Write3Args, file, offset, count, stable, data);

#[derive(Debug)]
pub struct Write3ResOk {
    pub file_wcc: WccData,
    pub count: Count3,
    pub committed: StableHow,
    pub verifier: Verifier3,
}

pack_struct!(Write3ResOk, file_wcc, count, committed, verifier);
unpack_struct!(Write3ResOk, file_wcc, count, committed, verifier);

#[derive(Debug)]
pub struct Write3ResFail {
    pub file_wcc: WccData,
}

pack_struct!(Write3ResFail, file_wcc);
unpack_struct!(Write3ResFail, file_wcc);

pub type WriteResult = Result<Write3ResOk, (u32, Write3ResFail)>;
