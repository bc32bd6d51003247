//! Decoding primitives for the binary wire format.

use bytes::Buf;

use super::{
    Result, WireError, WireRead, WireVersion, TAG_BOOL, TAG_F64, TAG_I64, TAG_MAP, TAG_NULL,
    TAG_STRING,
};

/// Reads wire primitives off a caller-supplied buffer.
///
/// Scalars are big-endian and fixed width; strings and sequences carry a u32
/// length prefix. Every read checks the remaining length first, so a
/// truncated buffer yields [`WireError::UnexpectedEof`] rather than a panic.
pub struct WireReader<B> {
    buf: B,
}

impl<B: Buf> WireReader<B> {
    pub fn new(buf: B) -> Self {
        Self { buf }
    }

    /// Bytes left unread.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn ensure(&self, n: usize, what: &'static str) -> Result<()> {
        let have = self.buf.remaining();
        if have < n {
            return Err(WireError::UnexpectedEof {
                what,
                needed: n - have,
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self, what: &'static str) -> Result<u8> {
        self.ensure(1, what)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_i32(&mut self, what: &'static str) -> Result<i32> {
        self.ensure(4, what)?;
        Ok(self.buf.get_i32())
    }

    pub fn read_u32(&mut self, what: &'static str) -> Result<u32> {
        self.ensure(4, what)?;
        Ok(self.buf.get_u32())
    }

    pub fn read_i64(&mut self, what: &'static str) -> Result<i64> {
        self.ensure(8, what)?;
        Ok(self.buf.get_i64())
    }

    pub fn read_f64(&mut self, what: &'static str) -> Result<f64> {
        self.ensure(8, what)?;
        Ok(self.buf.get_f64())
    }

    /// Booleans are a single byte, strictly 0 or 1.
    pub fn read_bool(&mut self, what: &'static str) -> Result<bool> {
        match self.read_u8(what)? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(WireError::InvalidBool { value }),
        }
    }

    pub fn read_string(&mut self, what: &'static str) -> Result<String> {
        let len = self.read_u32(what)? as usize;
        self.ensure(len, what)?;
        let raw = self.buf.copy_to_bytes(len);
        String::from_utf8(raw.to_vec()).map_err(|_| WireError::InvalidUtf8)
    }

    /// Sequence of nested entities, each decoded at the same version.
    pub fn read_seq<T: WireRead>(
        &mut self,
        version: WireVersion,
        what: &'static str,
    ) -> Result<Vec<T>> {
        let count = self.read_u32(what)? as usize;
        // Each element occupies at least one byte, so a count beyond the
        // remaining input is a corrupt or misaligned stream.
        self.ensure(count, what)?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(T::read_from(self, version)?);
        }
        Ok(items)
    }

    pub fn read_string_seq(&mut self, what: &'static str) -> Result<Vec<String>> {
        let count = self.read_u32(what)? as usize;
        self.ensure(count, what)?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(self.read_string(what)?);
        }
        Ok(items)
    }

    /// Consume one tagged generic value without materializing it.
    ///
    /// Used to stay positionally aligned when reading a stream from a peer
    /// that still wrote since-retired fields.
    pub fn skip_generic(&mut self) -> Result<()> {
        let tag = self.read_u8("generic value tag")?;
        match tag {
            TAG_NULL => Ok(()),
            TAG_BOOL => {
                self.read_u8("generic bool")?;
                Ok(())
            }
            TAG_I64 => {
                self.ensure(8, "generic i64")?;
                self.buf.advance(8);
                Ok(())
            }
            TAG_F64 => {
                self.ensure(8, "generic f64")?;
                self.buf.advance(8);
                Ok(())
            }
            TAG_STRING => {
                let len = self.read_u32("generic string")? as usize;
                self.ensure(len, "generic string")?;
                self.buf.advance(len);
                Ok(())
            }
            TAG_MAP => {
                let count = self.read_u32("generic map")? as usize;
                for _ in 0..count {
                    let len = self.read_u32("generic map key")? as usize;
                    self.ensure(len, "generic map key")?;
                    self.buf.advance(len);
                    self.skip_generic()?;
                }
                Ok(())
            }
            tag => Err(WireError::UnknownTag { tag }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::WireWriter;

    #[test]
    fn truncated_scalar_reports_eof() {
        let bytes = [0u8, 0, 0];
        let mut reader = WireReader::new(&bytes[..]);
        let err = reader.read_i64("test field").unwrap_err();
        assert!(matches!(
            err,
            WireError::UnexpectedEof { needed: 5, .. }
        ));
    }

    #[test]
    fn truncated_string_body_reports_eof() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&10u32.to_be_bytes());
        buf.extend_from_slice(b"abc");
        let mut reader = WireReader::new(&buf[..]);
        assert!(matches!(
            reader.read_string("test field"),
            Err(WireError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn bool_byte_must_be_zero_or_one() {
        let bytes = [7u8];
        let mut reader = WireReader::new(&bytes[..]);
        assert!(matches!(
            reader.read_bool("flag"),
            Err(WireError::InvalidBool { value: 7 })
        ));
    }

    #[test]
    fn skip_generic_consumes_empty_map_placeholder() {
        let mut writer = WireWriter::new(Vec::new());
        writer.write_empty_generic_map();
        writer.write_i64(42);
        let buf = writer.into_inner();

        let mut reader = WireReader::new(&buf[..]);
        reader.skip_generic().unwrap();
        assert_eq!(reader.read_i64("trailing").unwrap(), 42);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn skip_generic_handles_nested_values() {
        // A map an old peer could have written: {"a": 1.5, "b": {"c": "x"}}
        let mut buf = Vec::new();
        buf.push(super::TAG_MAP);
        buf.extend_from_slice(&2u32.to_be_bytes());
        buf.extend_from_slice(&1u32.to_be_bytes());
        buf.push(b'a');
        buf.push(super::TAG_F64);
        buf.extend_from_slice(&1.5f64.to_be_bytes());
        buf.extend_from_slice(&1u32.to_be_bytes());
        buf.push(b'b');
        buf.push(super::TAG_MAP);
        buf.extend_from_slice(&1u32.to_be_bytes());
        buf.extend_from_slice(&1u32.to_be_bytes());
        buf.push(b'c');
        buf.push(super::TAG_STRING);
        buf.extend_from_slice(&1u32.to_be_bytes());
        buf.push(b'x');

        let mut reader = WireReader::new(&buf[..]);
        reader.skip_generic().unwrap();
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn unknown_generic_tag_is_rejected() {
        let bytes = [99u8];
        let mut reader = WireReader::new(&bytes[..]);
        assert!(matches!(
            reader.skip_generic(),
            Err(WireError::UnknownTag { tag: 99 })
        ));
    }
}
