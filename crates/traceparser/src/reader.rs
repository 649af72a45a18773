/// A cursor-based reader over a byte slice for parsing trace data.
///
/// Uses "sticky error" semantics: once a read runs past the end of the
/// data, all subsequent reads return zero/default values. The error is
/// checked after a parse step completes.
pub(crate) struct EventReader<'a> {
    data: &'a [u8],
    pos: usize,
    err: bool,
}

impl<'a> EventReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            err: false,
        }
    }

    pub fn has_error(&self) -> bool {
        self.err
    }

    /// True if the cursor sits exactly at the end of the data.
    pub fn at_end(&self) -> bool {
        self.pos == self.data.len()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn set_err(&mut self) {
        self.err = true;
    }

    fn ensure(&mut self, n: usize) -> bool {
        if self.err || n > self.remaining() {
            self.set_err();
            false
        } else {
            true
        }
    }

    /// Read n bytes as a slice from the data.
    fn read_bytes_slice(&mut self, n: usize) -> &'a [u8] {
        if !self.ensure(n) {
            return &[];
        }
        let start = self.pos;
        self.pos += n;
        &self.data[start..self.pos]
    }

    /// Read a single byte.
    pub fn byte(&mut self) -> u8 {
        if !self.ensure(1) {
            return 0;
        }
        let b = self.data[self.pos];
        self.pos += 1;
        b
    }

    /// Read n bytes into a new Vec.
    pub fn bytes(&mut self, n: usize) -> Vec<u8> {
        self.read_bytes_slice(n).to_vec()
    }

    /// Read a fixed sequence of bytes, erroring if they do not match.
    pub fn expect_bytes(&mut self, expected: &[u8]) -> bool {
        let actual = self.read_bytes_slice(expected.len());
        if self.err || actual != expected {
            self.set_err();
            false
        } else {
            true
        }
    }

    /// Read a little-endian u64.
    pub fn u64_le(&mut self) -> u64 {
        let b = self.read_bytes_slice(8);
        if b.len() < 8 {
            return 0;
        }
        u64::from_le_bytes(b.try_into().unwrap())
    }

    /// Read a u64 LE length, narrowed to usize and bounded by the
    /// remaining data so corrupt lengths fail fast instead of allocating.
    pub fn length(&mut self) -> usize {
        let len = self.u64_le();
        match usize::try_from(len) {
            Ok(len) if len <= self.remaining() => len,
            _ => {
                self.set_err();
                0
            }
        }
    }

    /// Read a length-prefixed UTF-8 string: u64 LE length, then that many
    /// bytes. Invalid UTF-8 is replaced.
    pub fn utf8_string(&mut self) -> String {
        let len = self.length();
        if len == 0 {
            return String::new();
        }
        let bytes = self.read_bytes_slice(len);
        if self.err {
            return String::new();
        }
        String::from_utf8_lossy(bytes).into_owned()
    }

    /// Read a nul-terminated UTF-8 string: bytes up to (not including) the
    /// first 0x00. The terminator is consumed. Invalid UTF-8 is replaced.
    pub fn nul_terminated_string(&mut self) -> String {
        if self.err {
            return String::new();
        }
        let rest = &self.data[self.pos..];
        let Some(nul) = rest.iter().position(|&b| b == 0) else {
            self.set_err();
            return String::new();
        };
        let bytes = &rest[..nul];
        self.pos += nul + 1;
        String::from_utf8_lossy(bytes).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_byte() {
        let data = [0x42, 0xFF];
        let mut r = EventReader::new(&data);
        assert_eq!(r.byte(), 0x42);
        assert_eq!(r.byte(), 0xFF);
        assert!(!r.has_error());
        assert!(r.at_end());
        // Reading past end sets error
        assert_eq!(r.byte(), 0);
        assert!(r.has_error());
    }

    #[test]
    fn test_reader_u64_le() {
        let data = 123456789u64.to_le_bytes();
        let mut r = EventReader::new(&data);
        assert_eq!(r.u64_le(), 123456789);
        assert!(!r.has_error());
    }

    #[test]
    fn test_reader_u64_le_truncated() {
        let data = [0x01, 0x02, 0x03];
        let mut r = EventReader::new(&data);
        assert_eq!(r.u64_le(), 0);
        assert!(r.has_error());
    }

    #[test]
    fn test_reader_utf8_string() {
        // Length 5 as u64 LE, then "hello"
        let mut data = Vec::from(5u64.to_le_bytes());
        data.extend_from_slice(b"hello");
        let mut r = EventReader::new(&data);
        assert_eq!(r.utf8_string(), "hello");
        assert!(!r.has_error());

        // Empty string (length 0)
        let data = 0u64.to_le_bytes();
        let mut r = EventReader::new(&data);
        assert_eq!(r.utf8_string(), "");
        assert!(!r.has_error());
    }

    #[test]
    fn test_reader_utf8_string_embedded_nul() {
        let mut data = Vec::from(3u64.to_le_bytes());
        data.extend_from_slice(b"a\0b");
        let mut r = EventReader::new(&data);
        assert_eq!(r.utf8_string(), "a\0b");
    }

    #[test]
    fn test_reader_utf8_string_invalid_utf8() {
        let mut data = Vec::from(3u64.to_le_bytes());
        data.extend_from_slice(&[0xFF, 0xFE, 0xFD]);
        let mut r = EventReader::new(&data);
        let s = r.utf8_string();
        assert!(!r.has_error());
        // Should contain replacement characters
        assert!(s.contains('\u{FFFD}'));
    }

    #[test]
    fn test_reader_utf8_string_length_past_end() {
        let mut data = Vec::from(100u64.to_le_bytes());
        data.extend_from_slice(b"short");
        let mut r = EventReader::new(&data);
        assert_eq!(r.utf8_string(), "");
        assert!(r.has_error());
    }

    #[test]
    fn test_reader_bogus_huge_length_fails_fast() {
        let data = u64::MAX.to_le_bytes();
        let mut r = EventReader::new(&data);
        assert_eq!(r.length(), 0);
        assert!(r.has_error());
    }

    #[test]
    fn test_reader_nul_terminated_string() {
        let data = b"owner\0rest";
        let mut r = EventReader::new(data);
        assert_eq!(r.nul_terminated_string(), "owner");
        assert!(!r.has_error());
        assert_eq!(r.byte(), b'r');
    }

    #[test]
    fn test_reader_nul_terminated_string_empty() {
        let data = [0x00];
        let mut r = EventReader::new(&data);
        assert_eq!(r.nul_terminated_string(), "");
        assert!(!r.has_error());
        assert!(r.at_end());
    }

    #[test]
    fn test_reader_nul_terminated_string_missing_terminator() {
        let data = b"no terminator";
        let mut r = EventReader::new(data);
        assert_eq!(r.nul_terminated_string(), "");
        assert!(r.has_error());
    }

    #[test]
    fn test_reader_expect_bytes() {
        let data = [0xc1, 0x1f, 0xfc, 0xc1, 0x99];
        let mut r = EventReader::new(&data);
        assert!(r.expect_bytes(&[0xc1, 0x1f, 0xfc, 0xc1]));
        assert_eq!(r.byte(), 0x99);

        let mut r = EventReader::new(&data);
        assert!(!r.expect_bytes(&[0xde, 0xad, 0xbe, 0xef]));
        assert!(r.has_error());
    }

    #[test]
    fn test_sticky_error() {
        let data = [0x42];
        let mut r = EventReader::new(&data);
        assert_eq!(r.byte(), 0x42);
        assert!(!r.has_error());

        // This should fail and set sticky error
        assert_eq!(r.byte(), 0);
        assert!(r.has_error());

        // All subsequent reads should also return defaults
        assert_eq!(r.u64_le(), 0);
        assert!(r.has_error());
        assert_eq!(r.utf8_string(), "");
    }
}
