//! CRC-16/CCITT frame check sequence.
//!
//! Polynomial 0x1021 processed MSB-first from an initial value of 0xFFFF, via
//! a 256-entry lookup table built at compile time. This is the variant the
//! controller firmware and its hosts have always used on the wire (check
//! value for `"123456789"` is `0x29B1`).

/// Initial CRC accumulator value.
pub const CRC16_CCITT_INIT: u16 = 0xFFFF;

const POLYNOMIAL: u16 = 0x1021;

static TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Fold one byte into a running CRC.
#[inline]
pub fn crc16_update(crc: u16, byte: u8) -> u16 {
    (crc << 8) ^ TABLE[usize::from((crc >> 8) as u8 ^ byte)]
}

/// Fold a slice into a running CRC.
pub fn crc16_update_slice(crc: u16, data: &[u8]) -> u16 {
    data.iter().fold(crc, |acc, &b| crc16_update(acc, b))
}

/// CRC of a complete buffer.
pub fn crc16(data: &[u8]) -> u16 {
    crc16_update_slice(CRC16_CCITT_INIT, data)
}

/// Byte order of the CRC on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrcOrder {
    /// High byte first.
    #[default]
    BigEndian,
    /// Low byte first.
    LittleEndian,
}

impl CrcOrder {
    /// Split a CRC into the two bytes in transmission order.
    pub fn to_bytes(self, crc: u16) -> [u8; 2] {
        match self {
            CrcOrder::BigEndian => crc.to_be_bytes(),
            CrcOrder::LittleEndian => crc.to_le_bytes(),
        }
    }

    /// Reassemble a CRC from the two trailing frame bytes.
    pub fn from_bytes(self, bytes: [u8; 2]) -> u16 {
        match self {
            CrcOrder::BigEndian => u16::from_be_bytes(bytes),
            CrcOrder::LittleEndian => u16::from_le_bytes(bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_value() {
        assert_eq!(crc16(b"123456789"), 0x29B1);
    }

    #[test]
    fn empty_input_is_init_value() {
        assert_eq!(crc16(&[]), CRC16_CCITT_INIT);
    }

    #[test]
    fn table_matches_known_entries() {
        assert_eq!(TABLE[0], 0x0000);
        assert_eq!(TABLE[1], 0x1021);
        assert_eq!(TABLE[0x10], 0x1231);
        assert_eq!(TABLE[0xFF], 0x1EF0);
    }

    #[test]
    fn incremental_matches_one_shot() {
        let data = b"split across several updates";
        let mut crc = CRC16_CCITT_INIT;
        for chunk in data.chunks(5) {
            crc = crc16_update_slice(crc, chunk);
        }
        assert_eq!(crc, crc16(data));
    }

    #[test]
    fn order_roundtrip() {
        for order in [CrcOrder::BigEndian, CrcOrder::LittleEndian] {
            assert_eq!(order.from_bytes(order.to_bytes(0xA1B2)), 0xA1B2);
        }
        assert_eq!(CrcOrder::BigEndian.to_bytes(0xA1B2), [0xA1, 0xB2]);
        assert_eq!(CrcOrder::LittleEndian.to_bytes(0xA1B2), [0xB2, 0xA1]);
    }
}
