use crate::nfs3::{DirOpArgs3, PostOpAttributes, PostOpFh3, SetAttributes, SpecData3, WccData};
use crate::xdr::{pack_struct, unpack_struct, PackTo, Packer};

#[derive(Debug)]
pub struct DeviceData3 {
    pub attributes: SetAttributes,
    pub spec: SpecData3,
}

pack_struct!(DeviceData3, attributes, spec);

/// The `mknoddata3` union, discriminated by `ftype3`. Regular files,
/// directories and symlinks have their own procedures.
#[derive(Debug)]
pub enum MknodData3 {
    Blk(DeviceData3),
    Chr(DeviceData3),
    Sock(SetAttributes),
    Fifo(SetAttributes),
}

impl<B: Packer> PackTo<B> for MknodData3 {
    fn pack_to(&self, buf: &mut B) {
        match self {
            MknodData3::Blk(dev) => {
                buf.pack_uint(3);
                dev.pack_to(buf);
            }
            MknodData3::Chr(dev) => {
                buf.pack_uint(4);
                dev.pack_to(buf);
            }
            MknodData3::Sock(attrs) => {
                buf.pack_uint(6);
                attrs.pack_to(buf);
            }
            MknodData3::Fifo(attrs) => {
                buf.pack_uint(7);
                attrs.pack_to(buf);
            }
        }
    }
}

#[derive(Debug)]
pub struct Mknod3Args {
    pub mknod_where: DirOpArgs3,
    pub what: MknodData3,
}

pack_struct!(Mknod3Args, mknod_where, what);

#[derive(Debug)]
pub struct Mknod3ResOk {
    pub obj: PostOpFh3,
    pub attributes: PostOpAttributes,
    pub wcc_data: WccData,
}

pack_struct!(Mknod3ResOk, obj, attributes, wcc_data);
unpack_struct!(Mknod3ResOk, obj, attributes, wcc_data);

#[derive(Debug)]
pub struct Mknod3ResFail {
    pub dir_wcc: WccData,
}

pack_struct!(Mknod3ResFail, dir_wcc);
unpack_struct!(Mknod3ResFail, dir_wcc);

pub type MknodResult = Result<Mknod3ResOk, (u32, Mknod3ResFail)>;
