//! CRC-16 used by the frame check words.
//!
//! Both the legacy and the enhanced framings protect everything after the
//! sync word with the same polynomial, so a frame is intact when the CRC over
//! `frame[2..]` (check words included) comes out as zero.

/// CRC polynomial and initial register value.
pub struct Algorithm<T> {
    poly: T,
    init: T,
}

/// x^16 + x^15 + x^2 + 1, MSB first.
pub const CRC_FRAME_ALG: Algorithm<u16> = Algorithm {
    poly: 0x8005,
    init: 0x0000,
};

/// Shifts `len` zero bits through a CRC-16 register holding `value` in its top byte.
#[inline(always)]
pub const fn crc16(poly: u16, mut value: u16, len: usize) -> u16 {
    value <<= 8;

    let mut i = 0;
    while i < len {
        value = (value << 1) ^ (((value >> 15) & 1) * poly);
        i += 1;
    }

    value
}

#[inline(always)]
const fn crc16_table(poly: u16) -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < table.len() {
        table[i] = crc16(poly, i as u16, 8);
        i += 1;
    }

    table
}

#[derive(Debug)]
pub struct Crc16 {
    pub poly: u16,
    pub init: u16,
    table: [u16; 256],
}

impl Crc16 {
    pub const fn new(algorithm: &Algorithm<u16>) -> Self {
        Self {
            poly: algorithm.poly,
            init: algorithm.init,
            table: crc16_table(algorithm.poly),
        }
    }

    #[inline(always)]
    pub const fn update(&self, mut crc: u16, bytes: &[u8]) -> u16 {
        let mut i = 0;

        while i < bytes.len() {
            crc = (crc << 8) ^ self.table[((crc >> 8) as u8 ^ bytes[i]) as usize];
            i += 1;
        }

        crc
    }

    /// CRC over a whole frame, sync word excluded. Zero for an intact frame.
    pub const fn frame_residue(&self, frame: &[u8]) -> u16 {
        if frame.len() < 2 {
            return self.init;
        }

        let (_, body) = frame.split_at(2);
        self.update(self.init, body)
    }
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new(&CRC_FRAME_ALG)
    }
}
