use crate::nfs3::{DirOpArgs3, PostOpAttributes, PostOpFh3, SetAttributes, Verifier3, WccData};
use crate::xdr::{pack_struct, unpack_struct, PackTo, Packer};

#[derive(Debug)]
pub enum CreateHow3 {
    /// Create the file without checking for existence of a duplicate
    /// file in the same directory
    Unchecked(SetAttributes),
    /// Check if the file exists, operation will fail with NFS3ERR_EXIST
    /// if the file exists
    Guarded(SetAttributes),
    /// Use exclusive creation semantics
    Exclusive(Verifier3),
}

impl<B: Packer> PackTo<B> for CreateHow3 {
    fn pack_to(&self, buf: &mut B) {
        match self {
            CreateHow3::Unchecked(attrs) => {
                buf.pack_uint(0);
                attrs.pack_to(buf);
            }
            CreateHow3::Guarded(attrs) => {
                buf.pack_uint(1);
                attrs.pack_to(buf);
            }
            CreateHow3::Exclusive(verf) => {
                buf.pack_uint(2);
                verf.pack_to(buf);
            }
        }
    }
}

#[derive(Debug)]
pub struct Create3Args {
    pub create_where: DirOpArgs3,
    pub how: CreateHow3,
}

pack_struct!(Create3Args, create_where, how);

#[derive(Debug)]
pub struct Create3ResOk {
    pub obj: PostOpFh3,
    pub attributes: PostOpAttributes,
    pub wcc_data: WccData,
}

pack_struct!(Create3ResOk, obj, attributes, wcc_data);
unpack_struct!(Create3ResOk, obj, attributes, wcc_data);

#[derive(Debug)]
pub struct Create3ResFail {
    pub dir_wcc: WccData,
}

pack_struct!(Create3ResFail, dir_wcc);
unpack_struct!(Create3ResFail, dir_wcc);

pub type CreateResult = Result<Create3ResOk, (u32, Create3ResFail)>;
