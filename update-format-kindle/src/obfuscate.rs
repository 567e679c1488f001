//! The reversible byte transform applied to bundle headers and payloads.
//!
//! Forward ("munge") swaps the nibbles of each byte and XORs with 0x7A;
//! the inverse undoes the XOR first. The two directions are distinct
//! functions, not an involution. The transform is per-byte, so streaming in
//! 64-byte blocks is purely an I/O granularity choice.

use std::io::{Read, Write};

pub const BLOCK_LEN: usize = 64;

#[inline(always)]
fn munge_byte(b: u8) -> u8 {
    ((b >> 4) | (b << 4)) ^ 0x7A
}

#[inline(always)]
fn demunge_byte(b: u8) -> u8 {
    let x = b ^ 0x7A;
    (x >> 4) | (x << 4)
}

pub fn munge(data: &mut [u8]) {
    for b in data.iter_mut() {
        *b = munge_byte(*b);
    }
}

pub fn demunge(data: &mut [u8]) {
    for b in data.iter_mut() {
        *b = demunge_byte(*b);
    }
}

/// Write adapter applying the forward transform block-at-a-time.
pub struct ObfuscatingWriter<W: Write> {
    inner: W,
}

impl<W: Write> ObfuscatingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
        }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for ObfuscatingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut block = [0u8; BLOCK_LEN];
        for chunk in buf.chunks(BLOCK_LEN) {
            let block = &mut block[..chunk.len()];
            block.copy_from_slice(chunk);
            munge(block);
            self.inner.write_all(block)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Read adapter applying the forward transform to whatever it pulls from
/// the underlying reader.
pub struct ObfuscatingReader<R: Read> {
    inner: R,
}

impl<R: Read> ObfuscatingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
        }
    }
}

impl<R: Read> Read for ObfuscatingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        munge(&mut buf[..n]);
        Ok(n)
    }
}

/// Read adapter applying the inverse transform.
pub struct DeobfuscatingReader<R: Read> {
    inner: R,
}

impl<R: Read> DeobfuscatingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
        }
    }
}

impl<R: Read> Read for DeobfuscatingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        demunge(&mut buf[..n]);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One full block of ascending bytes through the forward transform.
    #[rustfmt::skip]
    const ASCENDING_MUNGED: [u8; BLOCK_LEN] = [
        0x7A, 0x6A, 0x5A, 0x4A, 0x3A, 0x2A, 0x1A, 0x0A,
        0xFA, 0xEA, 0xDA, 0xCA, 0xBA, 0xAA, 0x9A, 0x8A,
        0x7B, 0x6B, 0x5B, 0x4B, 0x3B, 0x2B, 0x1B, 0x0B,
        0xFB, 0xEB, 0xDB, 0xCB, 0xBB, 0xAB, 0x9B, 0x8B,
        0x78, 0x68, 0x58, 0x48, 0x38, 0x28, 0x18, 0x08,
        0xF8, 0xE8, 0xD8, 0xC8, 0xB8, 0xA8, 0x98, 0x88,
        0x79, 0x69, 0x59, 0x49, 0x39, 0x29, 0x19, 0x09,
        0xF9, 0xE9, 0xD9, 0xC9, 0xB9, 0xA9, 0x99, 0x89,
    ];

    #[test]
    fn test_known_vector() {
        let mut block: Vec<u8> = (0u8..BLOCK_LEN as u8).collect();
        munge(&mut block);
        assert_eq!(block, ASCENDING_MUNGED);
        demunge(&mut block);
        assert_eq!(block, (0u8..BLOCK_LEN as u8).collect::<Vec<u8>>());
    }

    #[test]
    fn test_round_trip_both_ways() {
        for value in 0u16..=255 {
            let b = value as u8;
            assert_eq!(demunge_byte(munge_byte(b)), b);
            assert_eq!(munge_byte(demunge_byte(b)), b);
        }
        // The scheme is not its own inverse.
        assert_ne!(munge_byte(0x00), demunge_byte(0x00));
    }

    #[test]
    fn test_writer_matches_in_place() {
        let data: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        let mut expected = data.clone();
        munge(&mut expected);

        let mut writer = ObfuscatingWriter::new(Vec::new());
        writer.write_all(&data).unwrap();
        assert_eq!(writer.into_inner(), expected);
    }

    #[test]
    fn test_reader_round_trip() {
        let data: Vec<u8> = (0..777u32).map(|i| (i * 7 % 256) as u8).collect();
        let mut munged = Vec::new();
        ObfuscatingReader::new(&data[..]).read_to_end(&mut munged).unwrap();

        let mut recovered = Vec::new();
        DeobfuscatingReader::new(&munged[..]).read_to_end(&mut recovered).unwrap();
        assert_eq!(recovered, data);
    }

    #[test]
    fn test_partial_trailing_block() {
        let data = [0xFFu8; 3];
        let mut writer = ObfuscatingWriter::new(Vec::new());
        writer.write_all(&data).unwrap();
        let out = writer.into_inner();
        assert_eq!(out.len(), 3);
        let mut expected = data;
        munge(&mut expected);
        assert_eq!(out, expected);
    }
}
