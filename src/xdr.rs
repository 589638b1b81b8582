//! Helper traits for packing and unpacking packets in XDR standard
//! (RFC 4506). Packing is infallible; unpacking checks the buffer on
//! every read so a truncated or hostile reply surfaces as an error
//! instead of a panic.

use crate::result::{Error, Result};
use bytes::{Buf, BufMut, Bytes};

const PAD_ZERO: [u8; 4] = [0; 4];

/// A trait for packing data in XDR format into a buffer.
pub trait Packer {
    fn pack_uint(&mut self, value: u32);

    fn pack_int(&mut self, value: i32);

    fn pack_hyper(&mut self, value: i64);

    fn pack_uhyper(&mut self, value: u64);

    fn pack_bool(&mut self, value: bool);

    fn pack_opaque(&mut self, value: &[u8]);

    fn pack_opaque_fixed(&mut self, value: &[u8]);

    fn pack_string(&mut self, value: &str);
}

impl<B: BufMut> Packer for B {
    #[inline]
    fn pack_uint(&mut self, value: u32) {
        self.put_u32(value)
    }

    #[inline]
    fn pack_int(&mut self, value: i32) {
        self.put_i32(value)
    }

    #[inline]
    fn pack_hyper(&mut self, value: i64) {
        self.put_i64(value)
    }

    #[inline]
    fn pack_uhyper(&mut self, value: u64) {
        self.put_u64(value)
    }

    #[inline]
    fn pack_bool(&mut self, value: bool) {
        self.put_u32(value as u32)
    }

    #[inline]
    fn pack_opaque(&mut self, value: &[u8]) {
        self.put_u32(value.len() as u32);
        self.pack_opaque_fixed(value);
    }

    #[inline]
    fn pack_opaque_fixed(&mut self, value: &[u8]) {
        let len = value.len();
        self.put_slice(value);
        self.put_slice(&PAD_ZERO[..(4 - len % 4) % 4])
    }

    #[inline]
    fn pack_string(&mut self, value: &str) {
        self.pack_opaque(value.as_bytes())
    }
}

/// A trait for unpacking XDR from a buffer.
pub trait Unpacker {
    fn unpack_uint(&mut self) -> Result<u32>;

    fn unpack_int(&mut self) -> Result<i32>;

    fn unpack_hyper(&mut self) -> Result<i64>;

    fn unpack_uhyper(&mut self) -> Result<u64>;

    fn unpack_bool(&mut self) -> Result<bool>;

    fn unpack_opaque(&mut self) -> Result<Bytes>;

    fn unpack_opaque_fixed(&mut self, nbytes: usize) -> Result<Bytes>;

    fn unpack_string(&mut self) -> Result<String>;
}

impl<B: Buf> Unpacker for B {
    #[inline]
    fn unpack_uint(&mut self) -> Result<u32> {
        if self.remaining() < 4 {
            return Err(Error::Truncated);
        }
        Ok(self.get_u32())
    }

    #[inline]
    fn unpack_int(&mut self) -> Result<i32> {
        if self.remaining() < 4 {
            return Err(Error::Truncated);
        }
        Ok(self.get_i32())
    }

    #[inline]
    fn unpack_hyper(&mut self) -> Result<i64> {
        if self.remaining() < 8 {
            return Err(Error::Truncated);
        }
        Ok(self.get_i64())
    }

    #[inline]
    fn unpack_uhyper(&mut self) -> Result<u64> {
        if self.remaining() < 8 {
            return Err(Error::Truncated);
        }
        Ok(self.get_u64())
    }

    #[inline]
    fn unpack_bool(&mut self) -> Result<bool> {
        Ok(self.unpack_uint()? != 0)
    }

    #[inline]
    fn unpack_opaque(&mut self) -> Result<Bytes> {
        let len = self.unpack_uint()? as usize;
        self.unpack_opaque_fixed(len)
    }

    #[inline]
    fn unpack_opaque_fixed(&mut self, nbytes: usize) -> Result<Bytes> {
        let padded = nbytes + (4 - nbytes % 4) % 4;
        if self.remaining() < padded {
            return Err(Error::Truncated);
        }
        let ret = self.copy_to_bytes(nbytes);
        self.advance(padded - nbytes);
        Ok(ret)
    }

    #[inline]
    fn unpack_string(&mut self) -> Result<String> {
        let raw = self.unpack_opaque()?;
        String::from_utf8(raw.to_vec()).map_err(|_| Error::Decode("string is not valid UTF-8"))
    }
}

/// Trait that allows packing objects into a buffer.
pub trait PackTo<B> {
    fn pack_to(&self, buf: &mut B);
}

/// Trait that allows unpacking objects from a buffer.
pub trait UnpackFrom<B>: Sized {
    fn unpack_from(buf: &mut B) -> Result<Self>;
}

macro_rules! impl_pack_to (
    ($type:ty, $method:ident) => {
        impl<B: Packer> PackTo<B> for $type {
            fn pack_to(&self, buf: &mut B) {
                buf.$method(*self)
            }
        }
    }
);

macro_rules! impl_unpack_from (
    ($type:ty, $method:ident) => {
        impl<B: Unpacker> UnpackFrom<B> for $type {
            fn unpack_from(buf: &mut B) -> Result<Self> {
                buf.$method()
            }
        }
    }
);

impl_pack_to!(u32, pack_uint);
impl_pack_to!(i32, pack_int);
impl_pack_to!(i64, pack_hyper);
impl_pack_to!(u64, pack_uhyper);
impl_pack_to!(bool, pack_bool);

impl_unpack_from!(u32, unpack_uint);
impl_unpack_from!(i32, unpack_int);
impl_unpack_from!(i64, unpack_hyper);
impl_unpack_from!(u64, unpack_uhyper);
impl_unpack_from!(bool, unpack_bool);
impl_unpack_from!(Bytes, unpack_opaque);
impl_unpack_from!(String, unpack_string);

impl<B: Packer> PackTo<B> for String {
    fn pack_to(&self, buf: &mut B) {
        buf.pack_string(self);
    }
}

impl<B: Packer> PackTo<B> for &str {
    fn pack_to(&self, buf: &mut B) {
        buf.pack_string(self);
    }
}

impl<B: Packer> PackTo<B> for Bytes {
    fn pack_to(&self, buf: &mut B) {
        buf.pack_opaque(self.as_ref());
    }
}

impl<B: Packer> PackTo<B> for Vec<u8> {
    fn pack_to(&self, buf: &mut B) {
        buf.pack_opaque(self);
    }
}

impl<B: Unpacker> UnpackFrom<B> for Vec<u8> {
    fn unpack_from(buf: &mut B) -> Result<Self> {
        Ok(buf.unpack_opaque()?.to_vec())
    }
}

impl<B: Packer> PackTo<B> for Vec<u32> {
    fn pack_to(&self, buf: &mut B) {
        buf.pack_uint(self.len() as u32);
        for item in self {
            buf.pack_uint(*item);
        }
    }
}

impl<B: Unpacker> UnpackFrom<B> for Vec<u32> {
    fn unpack_from(buf: &mut B) -> Result<Self> {
        let len = buf.unpack_uint()? as usize;
        let mut result = Vec::with_capacity(len.min(4096));
        for _ in 0..len {
            result.push(buf.unpack_uint()?);
        }
        Ok(result)
    }
}

/// XDR optional data: a bool discriminant followed by the payload.
impl<T: PackTo<B>, B: Packer> PackTo<B> for Option<T> {
    fn pack_to(&self, buf: &mut B) {
        match self {
            Some(t) => {
                buf.pack_bool(true);
                t.pack_to(buf);
            }
            None => {
                buf.pack_bool(false);
            }
        }
    }
}

impl<T: UnpackFrom<B>, B: Unpacker> UnpackFrom<B> for Option<T> {
    fn unpack_from(buf: &mut B) -> Result<Self> {
        match buf.unpack_uint()? {
            0 => Ok(None),
            1 => Ok(Some(T::unpack_from(buf)?)),
            value => Err(Error::BadDiscriminant {
                what: "optional",
                value,
            }),
        }
    }
}

/// Protocol results are a status discriminant followed by one of two
/// bodies. Status zero selects the success arm.
impl<T, F, B> UnpackFrom<B> for std::result::Result<T, (u32, F)>
where
    T: UnpackFrom<B>,
    F: UnpackFrom<B>,
    B: Unpacker,
{
    fn unpack_from(buf: &mut B) -> Result<Self> {
        match buf.unpack_uint()? {
            0 => Ok(Ok(T::unpack_from(buf)?)),
            n => Ok(Err((n, F::unpack_from(buf)?))),
        }
    }
}

/// Results whose failure arm is just the status value.
impl<T, B> UnpackFrom<B> for std::result::Result<T, u32>
where
    T: UnpackFrom<B>,
    B: Unpacker,
{
    fn unpack_from(buf: &mut B) -> Result<Self> {
        match buf.unpack_uint()? {
            0 => Ok(Ok(T::unpack_from(buf)?)),
            n => Ok(Err(n)),
        }
    }
}

/// Generates a `PackTo` impl that packs the named fields in order.
macro_rules! pack_struct {
    ($name:ident, $($field:ident),+ $(,)?) => {
        impl<B: $crate::xdr::Packer> $crate::xdr::PackTo<B> for $name {
            fn pack_to(&self, buf: &mut B) {
                $( $crate::xdr::PackTo::pack_to(&self.$field, buf); )+
            }
        }
    };
}

/// Generates an `UnpackFrom` impl that unpacks the named fields in order.
macro_rules! unpack_struct {
    ($name:ident, $($field:ident),+ $(,)?) => {
        impl<B: $crate::xdr::Unpacker> $crate::xdr::UnpackFrom<B> for $name {
            fn unpack_from(buf: &mut B) -> $crate::result::Result<Self> {
                Ok($name {
                    $( $field: $crate::xdr::UnpackFrom::unpack_from(buf)?, )+
                })
            }
        }
    };
}

pub(crate) use pack_struct;
pub(crate) use unpack_struct;

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_pack_unpack() {
        let mut buf = BytesMut::new();

        buf.pack_uint(0x01020304);
        buf.pack_uhyper(0x0506070809101112);
        buf.pack_int(-1234567);
        buf.pack_hyper(-1234567890111213);
        buf.pack_bool(true);
        buf.pack_bool(false);
        buf.pack_opaque_fixed(&[0x14, 0x15, 0x16, 0x17, 0x18]);
        buf.pack_opaque(&[0x19, 0x20, 0x21, 0x22, 0x23]);
        buf.pack_string("The quick brown fox jumps over the lazy dog");

        let mut buf = buf.freeze();

        assert_eq!(buf.unpack_uint().unwrap(), 0x01020304);
        assert_eq!(buf.unpack_uhyper().unwrap(), 0x0506070809101112);
        assert_eq!(buf.unpack_int().unwrap(), -1234567);
        assert_eq!(buf.unpack_hyper().unwrap(), -1234567890111213);
        assert_eq!(buf.unpack_bool().unwrap(), true);
        assert_eq!(buf.unpack_bool().unwrap(), false);
        assert_eq!(
            buf.unpack_opaque_fixed(5).unwrap().as_ref(),
            &[0x14, 0x15, 0x16, 0x17, 0x18]
        );
        assert_eq!(
            buf.unpack_opaque().unwrap().as_ref(),
            &[0x19, 0x20, 0x21, 0x22, 0x23]
        );
        assert_eq!(
            buf.unpack_opaque().unwrap().as_ref(),
            b"The quick brown fox jumps over the lazy dog"
        );
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn opaque_padding_is_nul_and_skipped() {
        let mut buf = BytesMut::new();
        buf.pack_opaque(b"abcde");
        assert_eq!(buf.len(), 4 + 8);
        assert_eq!(&buf[9..12], &[0, 0, 0]);

        let mut buf = buf.freeze();
        assert_eq!(buf.unpack_opaque().unwrap().as_ref(), b"abcde");
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn truncated_reads_error_instead_of_panicking() {
        let mut short = Bytes::from_static(&[0, 0]);
        assert!(matches!(
            short.unpack_uint(),
            Err(crate::result::Error::Truncated)
        ));

        // length claims more bytes than the buffer holds
        let mut lying = BytesMut::new();
        lying.pack_uint(64);
        lying.put_slice(b"only-a-few");
        let mut lying = lying.freeze();
        assert!(matches!(
            lying.unpack_opaque(),
            Err(crate::result::Error::Truncated)
        ));
    }

    #[test]
    fn option_roundtrip_and_bad_discriminant() {
        let mut buf = BytesMut::new();
        Some(7u32).pack_to(&mut buf);
        None::<u32>.pack_to(&mut buf);
        let mut buf = buf.freeze();
        assert_eq!(Option::<u32>::unpack_from(&mut buf).unwrap(), Some(7));
        assert_eq!(Option::<u32>::unpack_from(&mut buf).unwrap(), None);

        let mut bad = BytesMut::new();
        bad.pack_uint(2);
        let mut bad = bad.freeze();
        assert!(Option::<u32>::unpack_from(&mut bad).is_err());
    }
}
