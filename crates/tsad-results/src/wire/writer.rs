//! Encoding primitives for the binary wire format.

use bytes::BufMut;

use super::{WireVersion, WireWrite, TAG_MAP};

/// Writes wire primitives into a caller-supplied buffer.
///
/// Writing is infallible; the usual buffer is a growable `Vec<u8>`. A caller
/// handing in a fixed-capacity buffer owns making it large enough.
pub struct WireWriter<B> {
    buf: B,
}

impl<B: BufMut> WireWriter<B> {
    pub fn new(buf: B) -> Self {
        Self { buf }
    }

    /// Hand back the underlying buffer.
    pub fn into_inner(self) -> B {
        self.buf
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.put_i32(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.put_u32(value);
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.put_i64(value);
    }

    pub fn write_f64(&mut self, value: f64) {
        self.buf.put_f64(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.put_u8(value as u8);
    }

    pub fn write_string(&mut self, value: &str) {
        self.buf.put_u32(value.len() as u32);
        self.buf.put_slice(value.as_bytes());
    }

    /// Sequence of nested entities, each encoded at the same version.
    pub fn write_seq<T: WireWrite>(&mut self, items: &[T], version: WireVersion) {
        self.buf.put_u32(items.len() as u32);
        for item in items {
            item.write_to(self, version);
        }
    }

    pub fn write_string_seq(&mut self, items: &[String]) {
        self.buf.put_u32(items.len() as u32);
        for item in items {
            self.write_string(item);
        }
    }

    /// Placeholder for a retired generic-value field: an empty tagged map,
    /// which is what current-era data legitimately carried there.
    pub fn write_empty_generic_map(&mut self) {
        self.buf.put_u8(TAG_MAP);
        self.buf.put_u32(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::WireReader;

    #[test]
    fn string_roundtrips_through_length_prefix() {
        let mut writer = WireWriter::new(Vec::new());
        writer.write_string("partition-a");
        let buf = writer.into_inner();
        assert_eq!(buf.len(), 4 + 11);

        let mut reader = WireReader::new(&buf[..]);
        assert_eq!(reader.read_string("s").unwrap(), "partition-a");
    }

    #[test]
    fn string_seq_roundtrips() {
        let events = vec!["maintenance".to_string(), "holiday".to_string()];
        let mut writer = WireWriter::new(Vec::new());
        writer.write_string_seq(&events);
        let buf = writer.into_inner();

        let mut reader = WireReader::new(&buf[..]);
        assert_eq!(reader.read_string_seq("events").unwrap(), events);
    }
}
