use std::fmt;

use crate::pdu_parse_error::PduParseErr;

/// Bit-addressable view over a byte buffer, MSB first, as used by MAC PDUs.
/// Reads are bounded by a window [0, end); writes beyond `end` grow the buffer
/// when the buffer was created with `new_autoexpand`.
pub struct BitBuffer {
    buffer: Vec<u8>,
    pos: usize,         // next bit offset for read/write
    end: usize,         // bits at or after this are out of window
    flag_autoexpand: bool,
}

impl BitBuffer {
    /// Create a zeroed buffer capable of holding exactly `len_bits` bits.
    pub fn new(len_bits: usize) -> Self {
        BitBuffer {
            buffer: vec![0; len_bits.div_ceil(8)],
            pos: 0,
            end: len_bits,
            flag_autoexpand: false,
        }
    }

    /// Create an empty buffer that grows on writes. Used for building PDUs.
    pub fn new_autoexpand(initial_cap_bits: usize) -> Self {
        BitBuffer {
            buffer: Vec::with_capacity(initial_cap_bits.div_ceil(8)),
            pos: 0,
            end: 0,
            flag_autoexpand: true,
        }
    }

    pub fn from_bytes(data: &[u8]) -> Self {
        BitBuffer {
            buffer: data.to_vec(),
            pos: 0,
            end: data.len() * 8,
            flag_autoexpand: false,
        }
    }

    /// Construct a BitBuffer directly from a string of '0'/'1' characters.
    /// Panics if any other character is encountered.
    pub fn from_bitstr(bitstr: &str) -> Self {
        let mut buf = BitBuffer::new(bitstr.len());
        for c in bitstr.chars() {
            match c {
                '0' => buf.write_bits(0, 1),
                '1' => buf.write_bits(1, 1),
                other => panic!("from_bitstr: invalid character `{}`; only '0' or '1' allowed", other),
            }
        }
        buf.pos = 0;
        buf
    }

    /// Peek `num_bits` at the current pos, without advancing.
    /// Returns None on overflow or if `num_bits>64`.
    pub fn peek_bits(&self, num_bits: usize) -> Option<u64> {
        if num_bits > 64 || self.pos + num_bits > self.end {
            return None;
        }
        Some(self.read_bits_at_unchecked(self.pos, num_bits))
    }

    /// Read `num_bits` at the current pos, advancing on success.
    pub fn read_bits(&mut self, num_bits: usize) -> Option<u64> {
        let v = self.peek_bits(num_bits)?;
        self.pos += num_bits;
        Some(v)
    }

    /// Similar to read_bits, but returns a PduParseErr::BufferEnded naming the field if not enough bits are available.
    pub fn read_field(&mut self, num_bits: usize, field: &'static str) -> Result<u64, PduParseErr> {
        self.read_bits(num_bits).ok_or(PduParseErr::BufferEnded { field: Some(field) })
    }

    /// Read `num_bytes` whole octets. Pos must be octet-aligned.
    pub fn read_bytes(&mut self, num_bytes: usize, field: &'static str) -> Result<Vec<u8>, PduParseErr> {
        if !self.is_octet_aligned() {
            return Err(PduParseErr::Inconsistency { field, reason: "not octet aligned" });
        }
        if self.get_len_remaining() < num_bytes * 8 {
            return Err(PduParseErr::BufferEnded { field: Some(field) });
        }
        let start = self.pos / 8;
        self.pos += num_bytes * 8;
        Ok(self.buffer[start..start + num_bytes].to_vec())
    }

    /// Write up to 64 bits, advancing pos.
    /// With autoexpand, grows the window; otherwise panics when exceeding end.
    pub fn write_bits(&mut self, value: u64, num_bits: usize) {
        assert!(num_bits <= 64, "can only write up to 64 bits");
        assert!(num_bits == 64 || value >> num_bits == 0, "value exceeds num_bits {} {}", value, num_bits);

        if self.pos + num_bits > self.end {
            if self.flag_autoexpand {
                self.end = self.pos + num_bits;
                let needed_bytes = self.end.div_ceil(8);
                if needed_bytes > self.buffer.len() {
                    self.buffer.resize(needed_bytes, 0);
                }
            } else {
                panic!("write would exceed buffer end");
            }
        }

        for i in 0..num_bits {
            let bit = ((value >> (num_bits - 1 - i)) & 1) as u8;
            let abs = self.pos + i;
            let shift = 7 - (abs % 8);
            self.buffer[abs / 8] = (self.buffer[abs / 8] & !(1 << shift)) | (bit << shift);
        }
        self.pos += num_bits;
    }

    /// Write whole octets
    pub fn write_bytes(&mut self, data: &[u8]) {
        for b in data {
            self.write_bits(*b as u64, 8);
        }
    }

    /// Extract the internal byte-vector (all bytes, including any unused bits).
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Window length in bits
    pub fn get_len(&self) -> usize {
        self.end
    }

    /// Number of bits left in the window, from pos to end.
    pub fn get_len_remaining(&self) -> usize {
        self.end - self.pos
    }

    pub fn is_octet_aligned(&self) -> bool {
        self.pos % 8 == 0
    }

    /// Bits in window as uppercase hex, one digit per nibble
    fn dump_hex(&self) -> String {
        let n_nibbles = self.end.div_ceil(4);
        let mut s = String::with_capacity(n_nibbles);
        for i in 0..n_nibbles {
            let take = usize::min(4, self.end - i * 4);
            let v = self.read_bits_at_unchecked(i * 4, take) as u8;
            let digit = if take < 4 { v << (4 - take) } else { v };
            s.push_str(&format!("{:X}", digit));
        }
        s
    }

    /// Caller must ensure `num_bits <= 64` and `bit_pos + num_bits <= end`.
    fn read_bits_at_unchecked(&self, bit_pos: usize, num_bits: usize) -> u64 {
        let mut result = 0u64;
        for abs in bit_pos..bit_pos + num_bits {
            let bit = (self.buffer[abs / 8] >> (7 - (abs % 8))) & 1;
            result = (result << 1) | bit as u64;
        }
        result
    }
}

impl fmt::Debug for BitBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitBuffer {{ ^{} >{} {} }}", self.pos, self.end, self.dump_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_byte_read_write() {
        let mut bb = BitBuffer::new(16);
        bb.write_bits(0xAB, 8);
        bb.write_bits(0xCD, 8);
        let mut bb = BitBuffer::from_bytes(&bb.into_bytes());
        assert_eq!(bb.read_bits(8).unwrap(), 0xAB);
        assert_eq!(bb.read_bits(8).unwrap(), 0xCD);
        assert_eq!(bb.get_len_remaining(), 0);
    }

    #[test]
    fn test_unaligned_fields() {
        // R(1) TA(11) grant(20) as laid out in a MAC RAR
        let mut bb = BitBuffer::new(32);
        bb.write_bits(0, 1);
        bb.write_bits(0x4D2, 11);
        bb.write_bits(0xABCDE, 20);
        let bytes = bb.into_bytes();
        assert_eq!(bytes, vec![0x4D, 0x2A, 0xBC, 0xDE]);

        let mut bb = BitBuffer::from_bytes(&bytes);
        assert_eq!(bb.read_bits(1).unwrap(), 0);
        assert_eq!(bb.read_bits(11).unwrap(), 0x4D2);
        assert_eq!(bb.read_bits(20).unwrap(), 0xABCDE);
    }

    #[test]
    fn test_read_overflow() {
        let mut bb = BitBuffer::new(10);
        assert!(bb.read_bits(11).is_none());
        assert_eq!(bb.read_bits(0).unwrap(), 0);
        assert_eq!(bb.read_field(11, "ta_cmd"), Err(PduParseErr::BufferEnded { field: Some("ta_cmd") }));
    }

    #[test]
    #[should_panic(expected = "write would exceed buffer end")]
    fn test_write_overflow() {
        let mut bb = BitBuffer::new(10);
        bb.write_bits(1, 11);
    }

    #[test]
    fn test_write_autoexpand() {
        let mut bb = BitBuffer::new_autoexpand(8);
        bb.write_bits(0b101, 3);
        assert_eq!(bb.get_len(), 3);
        bb.write_bytes(&[0xFF, 0x00]);
        assert_eq!(bb.get_len(), 19);
        assert_eq!(bb.into_bytes().len(), 3);
    }

    #[test]
    fn test_read_bytes_requires_alignment() {
        let mut bb = BitBuffer::from_bytes(&[0x12, 0x34, 0x56]);
        assert_eq!(bb.read_bytes(2, "payload").unwrap(), vec![0x12, 0x34]);
        bb.read_bits(1).unwrap();
        assert!(matches!(bb.read_bytes(1, "payload"), Err(PduParseErr::Inconsistency { .. })));

        let mut bb = BitBuffer::from_bytes(&[0x12, 0x34, 0x56]);
        bb.read_bits(16).unwrap();
        assert!(matches!(bb.read_bytes(2, "payload"), Err(PduParseErr::BufferEnded { .. })));
    }

    #[test]
    fn test_from_bitstr_and_debug() {
        let mut bb = BitBuffer::from_bitstr("10100000");
        assert_eq!(bb.dump_hex(), "A0");
        assert_eq!(bb.read_bits(3).unwrap(), 0b101);
        assert_eq!(format!("{:?}", bb), "BitBuffer { ^3 >8 A0 }");
    }
}
