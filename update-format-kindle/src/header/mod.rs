//! On-wire bundle headers.
//!
//! A bundle starts with a 4-byte ASCII magic naming its kind, followed by a
//! fixed-size header block: 60 bytes for OTA, component and signature
//! bundles, 131068 bytes (mostly zero) for recovery bundles. All integers
//! are little-endian and all offsets are explicit; nothing here relies on
//! struct layout. Most header blocks travel obfuscated — the exception is
//! recovery v1, whose block is plain while its payload is not.

mod error;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

use std::io::{Read, Write};

use log::{debug, warn};

use crate::obfuscate::{demunge, munge};
use crate::sign::CertNumber;

pub const MAGIC_LEN: usize = 4;
pub const OTA_BLOCK_LEN: usize = 60;
pub const SIGNATURE_BLOCK_LEN: usize = 60;
pub const RECOVERY_BLOCK_LEN: usize = 131068;
pub const MD5_HEX_LEN: usize = 32;

pub const RECOVERY_MAGIC_1: u32 = 1;
pub const RECOVERY_MAGIC_2: u32 = 2;
/// Header revisions recognised as the "H2" recovery layout.
pub const RECOVERY_H2_HEADER_REVS: &[u32] = &[2];

const RECOVERY_H2_REV_OFFSET: usize = 60;
const RECOVERY_H2_FIELDS_LEN: usize = 68;

const MAX_HEADER_DEVICES: usize = 1024;
const MAX_HEADER_METADATA: usize = 1024;
const MAX_METADATA_LEN: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleKind {
    OtaV1,
    OtaV2,
    RecoveryV1,
    RecoveryV2,
    Component,
    Signature,
    UserData,
    Android,
}

impl BundleKind {
    pub fn description(self) -> &'static str {
        match self {
            BundleKind::OtaV1 => "OTA update (v1)",
            BundleKind::OtaV2 => "OTA update (v2)",
            BundleKind::RecoveryV1 => "recovery update (v1)",
            BundleKind::RecoveryV2 => "recovery update (H2)",
            BundleKind::Component => "component update",
            BundleKind::Signature => "signature envelope",
            BundleKind::UserData => "user data package",
            BundleKind::Android => "Android update",
        }
    }
}

impl std::fmt::Display for BundleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

#[derive(Debug, Clone)]
pub struct OtaV1Header {
    pub magic: [u8; MAGIC_LEN],
    pub source_revision: u32,
    pub target_revision: u32,
    pub device: u16,
    pub optional: u8,
    pub md5: [u8; MD5_HEX_LEN],
}

#[derive(Debug, Clone)]
pub struct OtaV2Header {
    pub magic: [u8; MAGIC_LEN],
    pub source_revision: u64,
    pub target_revision: u64,
    pub md5: [u8; MD5_HEX_LEN],
    pub devices: Vec<u16>,
    pub metadata: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RecoveryV1Header {
    pub magic: [u8; MAGIC_LEN],
    pub md5: [u8; MD5_HEX_LEN],
    pub magic1: u32,
    pub magic2: u32,
    pub minor: u32,
    pub device: u32,
}

#[derive(Debug, Clone)]
pub struct RecoveryV2Header {
    pub magic: [u8; MAGIC_LEN],
    pub target_revision: u64,
    pub md5: [u8; MD5_HEX_LEN],
    pub magic1: u32,
    pub magic2: u32,
    pub minor: u32,
    pub platform: u32,
    pub header_rev: u32,
    pub board: u32,
}

#[derive(Debug, Clone)]
pub struct SignatureHeader {
    pub magic: [u8; MAGIC_LEN],
    pub cert: CertNumber,
}

#[derive(Debug, Clone)]
pub enum Header {
    OtaV1(OtaV1Header),
    OtaV2(OtaV2Header),
    RecoveryV1(RecoveryV1Header),
    RecoveryV2(RecoveryV2Header),
    Component(OtaV1Header),
    Signature(SignatureHeader),
}

impl Header {
    pub fn kind(&self) -> BundleKind {
        match self {
            Header::OtaV1(_) => BundleKind::OtaV1,
            Header::OtaV2(_) => BundleKind::OtaV2,
            Header::RecoveryV1(_) => BundleKind::RecoveryV1,
            Header::RecoveryV2(_) => BundleKind::RecoveryV2,
            Header::Component(_) => BundleKind::Component,
            Header::Signature(_) => BundleKind::Signature,
        }
    }

    pub fn magic(&self) -> &[u8; MAGIC_LEN] {
        match self {
            Header::OtaV1(h) | Header::Component(h) => &h.magic,
            Header::OtaV2(h) => &h.magic,
            Header::RecoveryV1(h) => &h.magic,
            Header::RecoveryV2(h) => &h.magic,
            Header::Signature(h) => &h.magic,
        }
    }

    /// The expected payload MD5 (32 ASCII hex chars), for the kinds that
    /// carry one.
    pub fn md5(&self) -> Option<&[u8; MD5_HEX_LEN]> {
        match self {
            Header::OtaV1(h) | Header::Component(h) => Some(&h.md5),
            Header::OtaV2(h) => Some(&h.md5),
            Header::RecoveryV1(h) => Some(&h.md5),
            Header::RecoveryV2(h) => Some(&h.md5),
            Header::Signature(_) => None,
        }
    }

    /// Whether the payload after the header travels obfuscated.
    pub fn body_obfuscated(&self) -> bool {
        !matches!(self, Header::Signature(_))
    }
}

pub fn read_magic<R: Read>(reader: &mut R) -> Result<[u8; MAGIC_LEN]> {
    let mut magic = [0u8; MAGIC_LEN];
    reader.read_exact(&mut magic).map_err(Error::ReadMagic)?;
    Ok(magic)
}

/// Dispatch on the 4-byte prefix. `FB02` is provisionally recovery v1;
/// `read_header` refines it to H2 when the obfuscated header revision
/// matches. Magic-less containers are sniffed by their gzip / zip prefixes.
pub fn detect(prefix: &[u8; MAGIC_LEN]) -> Result<BundleKind> {
    match prefix {
        b"SP01" => Ok(BundleKind::Signature),
        b"FC04" | b"FD04" | b"FL01" => Ok(BundleKind::OtaV2),
        b"FC02" | b"FD03" => Ok(BundleKind::OtaV1),
        b"FB01" | b"FB02" => Ok(BundleKind::RecoveryV1),
        b"FB03" => Ok(BundleKind::Component),
        [0x1F, 0x8B, _, _] => Ok(BundleKind::UserData),
        [b'P', b'K', 0x03, 0x04] => Ok(BundleKind::Android),
        other => Err(Error::BadMagic(*other)),
    }
}

pub fn read_header<R: Read>(reader: &mut R, magic: [u8; MAGIC_LEN], kind: BundleKind) -> Result<Header> {
    match kind {
        BundleKind::OtaV1 | BundleKind::Component => {
            let mut block = read_block(reader, OTA_BLOCK_LEN)?;
            demunge(&mut block);
            let header = parse_ota_v1(&block, magic);
            if kind == BundleKind::Component {
                Ok(Header::Component(header))
            } else {
                Ok(Header::OtaV1(header))
            }
        }
        BundleKind::OtaV2 => read_ota_v2(reader, magic).map(Header::OtaV2),
        BundleKind::RecoveryV1 | BundleKind::RecoveryV2 => read_recovery(reader, magic),
        BundleKind::Signature => {
            let mut block = read_block(reader, SIGNATURE_BLOCK_LEN)?;
            demunge(&mut block);
            let cert = CertNumber::try_from(block[0]).map_err(|_| Error::BadCertNumber(block[0]))?;
            Ok(Header::Signature(SignatureHeader {
                magic,
                cert,
            }))
        }
        BundleKind::UserData | BundleKind::Android => Err(Error::HeaderlessKind(kind.description())),
    }
}

pub fn write_header<W: Write>(writer: &mut W, header: &Header) -> Result<()> {
    let block = match header {
        Header::OtaV1(h) | Header::Component(h) => {
            let mut block = vec![0u8; OTA_BLOCK_LEN];
            put_u32(&mut block, 0, h.source_revision);
            put_u32(&mut block, 4, h.target_revision);
            put_u16(&mut block, 8, h.device);
            block[10] = h.optional;
            block[12..44].copy_from_slice(&h.md5);
            munge(&mut block);
            block
        }
        Header::OtaV2(h) => {
            if h.devices.len() > MAX_HEADER_DEVICES {
                return Err(Error::DeviceCountOutOfRange(h.devices.len()));
            }
            if h.metadata.len() > MAX_HEADER_METADATA {
                return Err(Error::MetadataCountOutOfRange(h.metadata.len()));
            }
            let meta_len: usize = h.metadata.iter().map(|m| 2 + m.len()).sum();
            let need = 54 + 2 * h.devices.len() + meta_len;
            let mut block = vec![0u8; need.max(OTA_BLOCK_LEN)];
            put_u64(&mut block, 0, h.source_revision);
            put_u64(&mut block, 8, h.target_revision);
            block[18..50].copy_from_slice(&h.md5);
            put_u16(&mut block, 50, h.metadata.len() as u16);
            put_u16(&mut block, 52, h.devices.len() as u16);
            for (i, device) in h.devices.iter().enumerate() {
                put_u16(&mut block, 54 + 2 * i, *device);
            }
            let mut off = 54 + 2 * h.devices.len();
            for meta in &h.metadata {
                if meta.len() > MAX_METADATA_LEN {
                    return Err(Error::MetadataTooLong(meta.len()));
                }
                put_u16(&mut block, off, meta.len() as u16);
                block[off + 2..off + 2 + meta.len()].copy_from_slice(meta.as_bytes());
                off += 2 + meta.len();
            }
            munge(&mut block);
            block
        }
        Header::RecoveryV1(h) => {
            // Plain block; only the payload of a v1 recovery is obfuscated.
            let mut block = vec![0u8; RECOVERY_BLOCK_LEN];
            block[12..44].copy_from_slice(&h.md5);
            put_u32(&mut block, 44, h.magic1);
            put_u32(&mut block, 48, h.magic2);
            put_u32(&mut block, 52, h.minor);
            put_u32(&mut block, 56, h.device);
            block
        }
        Header::RecoveryV2(h) => {
            let mut block = vec![0u8; RECOVERY_BLOCK_LEN];
            put_u64(&mut block, 4, h.target_revision);
            block[12..44].copy_from_slice(&h.md5);
            put_u32(&mut block, 44, h.magic1);
            put_u32(&mut block, 48, h.magic2);
            put_u32(&mut block, 52, h.minor);
            put_u32(&mut block, 56, h.platform);
            put_u32(&mut block, 60, h.header_rev);
            put_u32(&mut block, 64, h.board);
            munge(&mut block);
            block
        }
        Header::Signature(h) => {
            let mut block = vec![0u8; SIGNATURE_BLOCK_LEN];
            block[0] = h.cert.as_u8();
            munge(&mut block);
            block
        }
    };

    writer.write_all(header.magic()).map_err(Error::WriteHeader)?;
    writer.write_all(&block).map_err(Error::WriteHeader)?;
    Ok(())
}

fn parse_ota_v1(block: &[u8], magic: [u8; MAGIC_LEN]) -> OtaV1Header {
    let mut md5 = [0u8; MD5_HEX_LEN];
    md5.copy_from_slice(&block[12..44]);
    OtaV1Header {
        magic,
        source_revision: get_u32(block, 0),
        target_revision: get_u32(block, 4),
        device: get_u16(block, 8),
        optional: block[10],
        md5,
    }
}

// The v2 block is logically variable-sized: the device list and the
// metadata records may spill past the 60-byte minimum, in which case the
// header region simply extends and the payload starts later.
fn read_ota_v2<R: Read>(reader: &mut R, magic: [u8; MAGIC_LEN]) -> Result<OtaV2Header> {
    let mut block = read_block(reader, OTA_BLOCK_LEN)?;
    demunge(&mut block);

    let source_revision = get_u64(&block, 0);
    let target_revision = get_u64(&block, 8);
    let mut md5 = [0u8; MD5_HEX_LEN];
    md5.copy_from_slice(&block[18..50]);
    let num_metadata = get_u16(&block, 50) as usize;
    let num_devices = get_u16(&block, 52) as usize;

    if num_devices > MAX_HEADER_DEVICES {
        return Err(Error::DeviceCountOutOfRange(num_devices));
    }
    if num_metadata > MAX_HEADER_METADATA {
        return Err(Error::MetadataCountOutOfRange(num_metadata));
    }

    extend_block(reader, &mut block, 54 + 2 * num_devices)?;
    let devices = (0..num_devices).map(|i| get_u16(&block, 54 + 2 * i)).collect();

    let mut off = 54 + 2 * num_devices;
    let mut metadata = Vec::with_capacity(num_metadata);
    for _ in 0..num_metadata {
        extend_block(reader, &mut block, off + 2)?;
        let len = get_u16(&block, off) as usize;
        if len > MAX_METADATA_LEN {
            return Err(Error::MetadataTooLong(len));
        }
        extend_block(reader, &mut block, off + 2 + len)?;
        let text = std::str::from_utf8(&block[off + 2..off + 2 + len]).map_err(|_| Error::MetadataNotUtf8)?;
        metadata.push(text.to_string());
        off += 2 + len;
    }

    debug!("OTA v2 header: {num_devices} devices, {num_metadata} metadata records, {} block bytes", block.len());

    Ok(OtaV2Header {
        magic,
        source_revision,
        target_revision,
        md5,
        devices,
        metadata,
    })
}

fn read_recovery<R: Read>(reader: &mut R, magic: [u8; MAGIC_LEN]) -> Result<Header> {
    let block = read_block(reader, RECOVERY_BLOCK_LEN)?;

    // H2 blocks travel obfuscated, v1 blocks travel plain. Deobfuscating
    // the field region and checking the header revision tells them apart:
    // in a v1 block that region is zero and deobfuscates to garbage.
    let mut probe = [0u8; RECOVERY_H2_FIELDS_LEN];
    probe.copy_from_slice(&block[..RECOVERY_H2_FIELDS_LEN]);
    demunge(&mut probe);
    let header_rev = get_u32(&probe, RECOVERY_H2_REV_OFFSET);

    if RECOVERY_H2_HEADER_REVS.contains(&header_rev) {
        let mut md5 = [0u8; MD5_HEX_LEN];
        md5.copy_from_slice(&probe[12..44]);
        return Ok(Header::RecoveryV2(RecoveryV2Header {
            magic,
            target_revision: get_u64(&probe, 4),
            md5,
            magic1: get_u32(&probe, 44),
            magic2: get_u32(&probe, 48),
            minor: get_u32(&probe, 52),
            platform: get_u32(&probe, 56),
            header_rev,
            board: get_u32(&probe, 64),
        }));
    }

    let mut md5 = [0u8; MD5_HEX_LEN];
    md5.copy_from_slice(&block[12..44]);
    let header = RecoveryV1Header {
        magic,
        md5,
        magic1: get_u32(&block, 44),
        magic2: get_u32(&block, 48),
        minor: get_u32(&block, 52),
        device: get_u32(&block, 56),
    };
    if header.magic1 != RECOVERY_MAGIC_1 || header.magic2 != RECOVERY_MAGIC_2 {
        // Vendor bundles disagree on these; report, don't reject.
        warn!("recovery header magics {}/{} differ from the expected {}/{}", header.magic1, header.magic2, RECOVERY_MAGIC_1, RECOVERY_MAGIC_2);
    }
    Ok(Header::RecoveryV1(header))
}

fn read_block<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut block = vec![0u8; len];
    reader.read_exact(&mut block).map_err(map_read_err)?;
    Ok(block)
}

fn extend_block<R: Read>(reader: &mut R, block: &mut Vec<u8>, need: usize) -> Result<()> {
    if need <= block.len() {
        return Ok(());
    }
    let start = block.len();
    block.resize(need, 0);
    reader.read_exact(&mut block[start..]).map_err(map_read_err)?;
    demunge(&mut block[start..]);
    Ok(())
}

fn map_read_err(err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::HeaderTooShort
    } else {
        Error::ReadBlock(err)
    }
}

fn get_u16(buf: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([buf[off], buf[off + 1]])
}

fn get_u32(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

fn get_u64(buf: &[u8], off: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[off..off + 8]);
    u64::from_le_bytes(bytes)
}

fn put_u16(buf: &mut [u8], off: usize, value: u16) {
    buf[off..off + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(buf: &mut [u8], off: usize, value: u32) {
    buf[off..off + 4].copy_from_slice(&value.to_le_bytes());
}

fn put_u64(buf: &mut [u8], off: usize, value: u64) {
    buf[off..off + 8].copy_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn round_trip(header: &Header) -> Header {
        let mut wire = Vec::new();
        write_header(&mut wire, header).unwrap();
        let mut cursor = Cursor::new(wire);
        let magic = read_magic(&mut cursor).unwrap();
        let kind = detect(&magic).unwrap();
        read_header(&mut cursor, magic, kind).unwrap()
    }

    fn fake_md5() -> [u8; MD5_HEX_LEN] {
        *b"0123456789abcdef0123456789abcdef"
    }

    #[test]
    fn test_ota_v1_round_trip() {
        let header = Header::OtaV1(OtaV1Header {
            magic: *b"FC02",
            source_revision: 1,
            target_revision: 2441380002,
            device: 0x0E,
            optional: 1,
            md5: fake_md5(),
        });
        match round_trip(&header) {
            Header::OtaV1(h) => {
                assert_eq!(h.magic, *b"FC02");
                assert_eq!(h.source_revision, 1);
                assert_eq!(h.target_revision, 2441380002);
                assert_eq!(h.device, 0x0E);
                assert_eq!(h.optional, 1);
                assert_eq!(h.md5, fake_md5());
            }
            other => panic!("wrong header kind: {:?}", other),
        }
    }

    #[test]
    fn test_ota_v2_round_trip_padded() {
        // One device, no metadata: the block stays at the 60-byte minimum.
        let header = Header::OtaV2(OtaV2Header {
            magic: *b"FC04",
            source_revision: 0,
            target_revision: u64::MAX,
            md5: fake_md5(),
            devices: vec![0x201],
            metadata: Vec::new(),
        });
        let mut wire = Vec::new();
        write_header(&mut wire, &header).unwrap();
        assert_eq!(wire.len(), MAGIC_LEN + OTA_BLOCK_LEN);

        match round_trip(&header) {
            Header::OtaV2(h) => {
                assert_eq!(h.devices, vec![0x201]);
                assert_eq!(h.target_revision, u64::MAX);
                assert!(h.metadata.is_empty());
            }
            other => panic!("wrong header kind: {:?}", other),
        }
    }

    #[test]
    fn test_ota_v2_round_trip_extended() {
        let header = Header::OtaV2(OtaV2Header {
            magic: *b"FD04",
            source_revision: 3,
            target_revision: 4,
            md5: fake_md5(),
            devices: vec![0x201, 0x202, 0x204, 0x205, 0x206],
            metadata: vec!["lang=en".to_string(), "channel=stable".to_string()],
        });
        let mut wire = Vec::new();
        write_header(&mut wire, &header).unwrap();
        assert!(wire.len() > MAGIC_LEN + OTA_BLOCK_LEN);

        match round_trip(&header) {
            Header::OtaV2(h) => {
                assert_eq!(h.devices.len(), 5);
                assert_eq!(h.metadata, vec!["lang=en", "channel=stable"]);
            }
            other => panic!("wrong header kind: {:?}", other),
        }
    }

    #[test]
    fn test_recovery_dispatch() {
        // An H2 block behind the shared FB02 magic is recognised by its
        // deobfuscated header revision.
        let h2 = Header::RecoveryV2(RecoveryV2Header {
            magic: *b"FB02",
            target_revision: 77,
            md5: fake_md5(),
            magic1: RECOVERY_MAGIC_1,
            magic2: RECOVERY_MAGIC_2,
            minor: 1,
            platform: 0x07,
            header_rev: 2,
            board: 0,
        });
        match round_trip(&h2) {
            Header::RecoveryV2(h) => {
                assert_eq!(h.target_revision, 77);
                assert_eq!(h.platform, 0x07);
                assert_eq!(h.header_rev, 2);
            }
            other => panic!("wrong header kind: {:?}", other),
        }

        // A v1 block behind the same magic stays v1.
        let v1 = Header::RecoveryV1(RecoveryV1Header {
            magic: *b"FB02",
            md5: fake_md5(),
            magic1: RECOVERY_MAGIC_1,
            magic2: RECOVERY_MAGIC_2,
            minor: 0,
            device: 0x0E,
        });
        match round_trip(&v1) {
            Header::RecoveryV1(h) => assert_eq!(h.device, 0x0E),
            other => panic!("wrong header kind: {:?}", other),
        }
    }

    #[test]
    fn test_signature_round_trip() {
        let header = Header::Signature(SignatureHeader {
            magic: *b"SP01",
            cert: CertNumber::Prod2K,
        });
        match round_trip(&header) {
            Header::Signature(h) => assert_eq!(h.cert, CertNumber::Prod2K),
            other => panic!("wrong header kind: {:?}", other),
        }
    }

    #[test]
    fn test_signature_bad_cert() {
        let mut block = vec![0u8; SIGNATURE_BLOCK_LEN];
        block[0] = 9;
        munge(&mut block);
        let mut wire = b"SP01".to_vec();
        wire.extend_from_slice(&block);

        let mut cursor = Cursor::new(wire);
        let magic = read_magic(&mut cursor).unwrap();
        let kind = detect(&magic).unwrap();
        assert!(matches!(read_header(&mut cursor, magic, kind), Err(Error::BadCertNumber(9))));
    }

    #[test]
    fn test_detect() {
        assert_eq!(detect(b"FC02").unwrap(), BundleKind::OtaV1);
        assert_eq!(detect(b"FD03").unwrap(), BundleKind::OtaV1);
        assert_eq!(detect(b"FL01").unwrap(), BundleKind::OtaV2);
        assert_eq!(detect(b"FB01").unwrap(), BundleKind::RecoveryV1);
        assert_eq!(detect(b"FB03").unwrap(), BundleKind::Component);
        assert_eq!(detect(&[0x1F, 0x8B, 0x08, 0x00]).unwrap(), BundleKind::UserData);
        assert_eq!(detect(b"PK\x03\x04").unwrap(), BundleKind::Android);
        assert!(matches!(detect(b"XXXX"), Err(Error::BadMagic(_))));
    }

    #[test]
    fn test_truncated_header() {
        let mut cursor = Cursor::new(b"FC02abcdef".to_vec());
        let magic = read_magic(&mut cursor).unwrap();
        let kind = detect(&magic).unwrap();
        assert!(matches!(read_header(&mut cursor, magic, kind), Err(Error::HeaderTooShort)));
    }
}
