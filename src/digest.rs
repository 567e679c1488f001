//! Digest types and tee adapters.
//!
//! `Hash<A>` wraps a finished digest and renders as lowercase hex, which is
//! the form the bundle headers carry. The writer/reader tees fan a byte
//! stream into MD5 and SHA-256 contexts and a byte counter while forwarding
//! it unchanged, so payloads are hashed as they stream without a second
//! buffer.

use std::fmt;
use std::io::{Read, Write};
use std::str;

#[rustfmt::skip]
use ct_codecs::{
    Error as CodecError,

    Hex,

    Encoder,
    Decoder
};
use md5::Md5 as Md5Context;
use sha2::{Digest, Sha256 as Sha256Context};

#[derive(PartialEq, Eq, Clone)]
pub struct Md5;

#[derive(PartialEq, Eq, Clone)]
pub struct Sha256;

pub trait HashAlgo {
    const HASH_NAME: &'static str;

    type Output: AsRef<[u8]> + AsMut<[u8]> + Default + Sized + Eq;
}

impl HashAlgo for Md5 {
    const HASH_NAME: &'static str = "Md5";
    type Output = [u8; 16];
}

impl HashAlgo for Sha256 {
    const HASH_NAME: &'static str = "Sha256";
    type Output = [u8; 32];
}

#[derive(PartialEq, Eq, Clone)]
pub struct Hash<T: HashAlgo>(T::Output);

impl<T: HashAlgo> Hash<T> {
    pub fn from_bytes(digest: T::Output) -> Self {
        Self(digest)
    }

    pub fn from_hex(hash_hex: &str) -> Result<Self, CodecError> {
        let mut digest = T::Output::default();
        let decoded = Hex::decode(digest.as_mut(), hash_hex, None)?.len();
        if decoded != digest.as_ref().len() {
            return Err(CodecError::InvalidInput);
        }
        Ok(Self(digest))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl<T: HashAlgo> fmt::Debug for Hash<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tn = format!("Hash<{}>", T::HASH_NAME);
        #[rustfmt::skip]
        let hash_hex = Hex::encode_to_string(self.0.as_ref())
            .map_err(|_| fmt::Error)?;

        f.debug_tuple(&*tn).field(&hash_hex).finish()
    }
}

impl<T: HashAlgo> fmt::Display for Hash<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[rustfmt::skip]
        let hash_hex = Hex::encode_to_string(self.0.as_ref())
            .map_err(|_| fmt::Error)?;

        f.write_str(&hash_hex)
    }
}

impl<T: HashAlgo> str::FromStr for Hash<T> {
    type Err = CodecError;

    fn from_str(hash_hex: &str) -> Result<Self, Self::Err> {
        Self::from_hex(hash_hex)
    }
}

pub struct DigestSummary {
    pub md5: Hash<Md5>,
    pub sha256: Hash<Sha256>,
    pub len: u64,
}

pub struct DigestWriter<W: Write> {
    inner: W,
    md5: Md5Context,
    sha256: Sha256Context,
    len: u64,
}

impl<W: Write> DigestWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            md5: Md5Context::new(),
            sha256: Sha256Context::new(),
            len: 0,
        }
    }

    pub fn finish(self) -> (W, DigestSummary) {
        let summary = DigestSummary {
            md5: Hash::from_bytes(self.md5.finalize().into()),
            sha256: Hash::from_bytes(self.sha256.finalize().into()),
            len: self.len,
        };
        (self.inner, summary)
    }
}

impl<W: Write> Write for DigestWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.md5.update(&buf[..written]);
        self.sha256.update(&buf[..written]);
        self.len += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

pub struct DigestReader<R: Read> {
    inner: R,
    md5: Md5Context,
    sha256: Sha256Context,
    len: u64,
}

impl<R: Read> DigestReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            md5: Md5Context::new(),
            sha256: Sha256Context::new(),
            len: 0,
        }
    }

    pub fn finish(self) -> (R, DigestSummary) {
        let summary = DigestSummary {
            md5: Hash::from_bytes(self.md5.finalize().into()),
            sha256: Hash::from_bytes(self.sha256.finalize().into()),
            len: self.len,
        };
        (self.inner, summary)
    }
}

impl<R: Read> Read for DigestReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.md5.update(&buf[..n]);
        self.sha256.update(&buf[..n]);
        self.len += n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_vectors() {
        let mut writer = DigestWriter::new(Vec::new());
        writer.write_all(b"").unwrap();
        let (_, empty) = writer.finish();
        assert_eq!(empty.md5.to_string(), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(empty.sha256.to_string(), "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
        assert_eq!(empty.len, 0);

        let mut writer = DigestWriter::new(Vec::new());
        writer.write_all(b"abc").unwrap();
        let (passed, abc) = writer.finish();
        assert_eq!(passed, b"abc");
        assert_eq!(abc.md5.to_string(), "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(abc.sha256.to_string(), "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
        assert_eq!(abc.len, 3);
    }

    #[test]
    fn test_reader_matches_writer() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 255) as u8).collect();

        let mut writer = DigestWriter::new(Vec::new());
        writer.write_all(&data).unwrap();
        let (_, from_write) = writer.finish();

        let mut reader = DigestReader::new(&data[..]);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        let (_, from_read) = reader.finish();

        assert_eq!(out, data);
        assert_eq!(from_read.md5, from_write.md5);
        assert_eq!(from_read.sha256, from_write.sha256);
        assert_eq!(from_read.len, data.len() as u64);
    }

    #[test]
    fn test_hex_round_trip() {
        let hash: Hash<Md5> = "d41d8cd98f00b204e9800998ecf8427e".parse().unwrap();
        assert_eq!(hash.to_string(), "d41d8cd98f00b204e9800998ecf8427e");
        assert!(Hash::<Md5>::from_hex("not hex").is_err());
        assert!(Hash::<Md5>::from_hex("abcd").is_err());
    }
}
