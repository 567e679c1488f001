//! Payload archive streaming.
//!
//! A payload is a gzip-compressed tar. On the way out the pipeline is
//! `tar -> gzip -> obfuscation -> digests -> sink`, so the summary digests
//! cover exactly the bytes that land after the bundle header. File contents
//! are obfuscated before they enter the tar; in a signed payload every
//! content entry is immediately followed by a `<name>.sig` entry holding
//! the RSA signature over the obfuscated content bytes.
//!
//! The read side yields entries lazily and verifies each `.sig` against
//! the entry just before it.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use log::{debug, info, warn};
use md5::Md5 as Md5Context;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256 as Sha256Context};

use update_format_kindle::filelist::{self, FileListEntry, FILELIST_NAME};
use update_format_kindle::obfuscate::{demunge, munge, ObfuscatingReader, ObfuscatingWriter};
use update_format_kindle::sign;

use crate::digest::{DigestWriter, Hash, Md5, Sha256};
use crate::error::Error;
use crate::Result;

const IO_BUF_LEN: usize = 4096;
const MAX_SIG_ENTRY_LEN: u64 = 4096;

pub struct PayloadEntry {
    pub archive_path: String,
    pub source: PathBuf,
    pub mode: u32,
}

pub struct PayloadOptions<'a> {
    /// Obfuscate both the container stream and the entry contents.
    pub obfuscate: bool,
    pub signing_key: Option<&'a RsaPrivateKey>,
    pub with_filelist: bool,
}

/// Digests and length of the finished (post-obfuscation) payload stream.
pub struct PayloadSummary {
    pub md5: Hash<Md5>,
    pub sha256: Hash<Sha256>,
    pub len: u64,
}

pub fn write_payload<W: Write>(entries: &[PayloadEntry], opts: &PayloadOptions, sink: W) -> Result<PayloadSummary> {
    let mut digest_writer = DigestWriter::new(sink);

    {
        let inner: Box<dyn Write + '_> = if opts.obfuscate {
            Box::new(ObfuscatingWriter::new(&mut digest_writer))
        } else {
            Box::new(&mut digest_writer)
        };
        let gz = GzEncoder::new(inner, Compression::default());
        let mut builder = tar::Builder::new(gz);

        let mut listed = Vec::with_capacity(entries.len());
        for entry in entries {
            listed.push(append_file(&mut builder, entry, opts)?);
        }

        if opts.with_filelist {
            let mut data = filelist::render(&listed);
            debug!("adding {} with {} records", FILELIST_NAME, listed.len());
            if opts.obfuscate {
                munge(&mut data);
            }
            append_bytes(&mut builder, FILELIST_NAME, 0o644, &data)?;
            if let Some(key) = opts.signing_key {
                let digest = Sha256Context::digest(&data);
                let signature = sign::sign_digest(&digest, key)?;
                append_bytes(&mut builder, &format!("{FILELIST_NAME}.sig"), 0o644, &signature)?;
            }
        }

        let gz = builder.into_inner().map_err(|err| Error::Io("failed to finish payload archive".to_string(), err))?;
        gz.finish().map_err(|err| Error::Io("failed to finish payload compression".to_string(), err))?;
    }

    let (mut sink, summary) = digest_writer.finish();
    sink.flush().map_err(|err| Error::Io("failed to flush payload".to_string(), err))?;

    info!("payload: {} bytes, md5 {}", summary.len, summary.md5);
    Ok(PayloadSummary {
        md5: summary.md5,
        sha256: summary.sha256,
        len: summary.len,
    })
}

// Two passes over the input: the first computes the plaintext hashes for
// the file list and the digest the signature is made over, the second
// streams the (obfuscated) content into the tar.
fn append_file<W: Write>(builder: &mut tar::Builder<W>, entry: &PayloadEntry, opts: &PayloadOptions) -> Result<FileListEntry> {
    let file = open_input(&entry.source)?;
    let len = file.metadata().map_err(|err| Error::Io(format!("failed to get metadata of {}", entry.source.display()), err))?.len();

    let mut reader = io::BufReader::new(file);
    let mut plain_md5 = Md5Context::new();
    let mut plain_sha256 = Sha256Context::new();
    let mut stored_sha256 = Sha256Context::new();
    let mut buf = [0u8; IO_BUF_LEN];
    loop {
        let n = reader.read(&mut buf).map_err(|err| Error::Io(format!("failed to read {}", entry.source.display()), err))?;
        if n == 0 {
            break;
        }
        let chunk = &mut buf[..n];
        plain_md5.update(&chunk[..]);
        plain_sha256.update(&chunk[..]);
        if opts.obfuscate {
            munge(chunk);
        }
        stored_sha256.update(&chunk[..]);
    }

    let mut header = tar::Header::new_gnu();
    header.set_size(len);
    header.set_mode(entry.mode);
    header.set_mtime(0);
    header.set_entry_type(tar::EntryType::Regular);

    let file = io::BufReader::new(open_input(&entry.source)?);
    let append = if opts.obfuscate {
        builder.append_data(&mut header, &entry.archive_path, ObfuscatingReader::new(file))
    } else {
        builder.append_data(&mut header, &entry.archive_path, file)
    };
    append.map_err(|err| Error::Io(format!("failed to archive {}", entry.archive_path), err))?;

    if let Some(key) = opts.signing_key {
        let signature = sign::sign_digest(&stored_sha256.finalize(), key)?;
        append_bytes(builder, &format!("{}.sig", entry.archive_path), 0o644, &signature)?;
        debug!("signed {} ({} byte signature)", entry.archive_path, signature.len());
    }

    Ok(FileListEntry {
        path: entry.archive_path.clone(),
        mode: entry.mode,
        md5: Hash::<Md5>::from_bytes(plain_md5.finalize().into()).to_string(),
        sha256: Hash::<Sha256>::from_bytes(plain_sha256.finalize().into()).to_string(),
    })
}

fn append_bytes<W: Write>(builder: &mut tar::Builder<W>, path: &str, mode: u32, data: &[u8]) -> Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(mode);
    header.set_mtime(0);
    header.set_entry_type(tar::EntryType::Regular);
    builder.append_data(&mut header, path, data).map_err(|err| Error::Io(format!("failed to archive {path}"), err))
}

fn open_input(path: &Path) -> Result<File> {
    File::open(path).map_err(|err| Error::Io(format!("failed to open {}", path.display()), err))
}

pub struct UnpackOptions<'a> {
    /// Entry contents travel obfuscated and must be undone on emission.
    pub deobfuscate: bool,
    /// Verify each entry against its `.sig` sibling. When unset, `.sig`
    /// entries are dropped without checking.
    pub verify: Option<&'a RsaPublicKey>,
    pub tempdir: &'a Path,
}

pub enum UnpackDest<'a, W: Write> {
    Directory(&'a Path),
    Repack(&'a mut tar::Builder<W>),
}

#[derive(Debug)]
pub struct UnpackedEntry {
    pub path: String,
    pub len: u64,
}

/// Stream a tar out of `reader`, emitting content entries to `dest`.
/// Entries come out deobfuscated; `.sig` entries are consumed for
/// verification rather than emitted. With verification on, every content
/// entry must be directly followed by its signature.
pub fn unpack_payload<R: Read, W: Write>(reader: R, dest: &mut UnpackDest<'_, W>, opts: &UnpackOptions, unpacked: &mut Vec<UnpackedEntry>) -> Result<()> {
    let mut archive = tar::Archive::new(reader);
    let mut pending: Option<(String, [u8; 32])> = None;

    let entries = archive.entries().map_err(|err| Error::Format(format!("failed to read payload archive: {err}")))?;
    for entry in entries {
        let mut entry = entry.map_err(|err| Error::Format(format!("truncated payload archive: {err}")))?;
        let name = entry.path().map_err(|err| Error::Format(format!("bad entry path in payload archive: {err}")))?.to_string_lossy().into_owned();
        let entry_type = entry.header().entry_type();
        let mode = entry.header().mode().unwrap_or(0o644);
        let size = entry.size();

        if entry_type == tar::EntryType::Directory {
            if let UnpackDest::Directory(dir) = dest {
                let path = dir.join(sanitize_entry_path(&name)?);
                std::fs::create_dir_all(&path).map_err(|err| Error::Io(format!("failed to create {}", path.display()), err))?;
            }
            continue;
        }
        if !entry_type.is_file() {
            warn!("skipping non-file entry {name} ({entry_type:?})");
            continue;
        }

        if name.ends_with(".sig") {
            match pending.take() {
                Some((content_name, digest)) if name == format!("{content_name}.sig") => {
                    if size > MAX_SIG_ENTRY_LEN {
                        return Err(Error::Format(format!("oversized signature entry {name}")));
                    }
                    let mut signature = Vec::with_capacity(size as usize);
                    entry.read_to_end(&mut signature).map_err(|err| Error::Io(format!("failed to read {name}"), err))?;
                    if let Some(key) = opts.verify {
                        sign::verify_digest(&digest, &signature, key).map_err(|err| Error::Signature(format!("bad signature for {content_name}: {err}")))?;
                        debug!("verified signature for {content_name}");
                    }
                }
                Some((content_name, _)) => {
                    return Err(Error::Signature(format!("signature entry {name} does not follow its content entry (pending: {content_name})")));
                }
                None => {
                    if opts.verify.is_some() {
                        return Err(Error::Signature(format!("orphan signature entry {name}")));
                    }
                    debug!("dropping signature entry {name}");
                }
            }
            continue;
        }

        if let Some((orphan, _)) = pending.take() {
            return Err(Error::Signature(format!("missing signature for {orphan}")));
        }

        let digest = emit_entry(&mut entry, &name, mode, size, dest, opts)?;
        if opts.verify.is_some() {
            pending = Some((name.clone(), digest));
        }
        unpacked.push(UnpackedEntry {
            path: name,
            len: size,
        });
    }

    if let Some((orphan, _)) = pending {
        return Err(Error::Signature(format!("missing signature for {orphan}")));
    }

    Ok(())
}

// Streams one content entry out, returning the digest of its stored
// (pre-deobfuscation) bytes for signature verification.
fn emit_entry<R: Read, W: Write>(entry: &mut tar::Entry<R>, name: &str, mode: u32, size: u64, dest: &mut UnpackDest<'_, W>, opts: &UnpackOptions) -> Result<[u8; 32]> {
    let mut stored_sha256 = Sha256Context::new();
    let mut buf = [0u8; IO_BUF_LEN];

    match dest {
        UnpackDest::Directory(dir) => {
            let path = dir.join(sanitize_entry_path(name)?);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|err| Error::Io(format!("failed to create {}", parent.display()), err))?;
            }
            let mut out = File::create(&path).map_err(|err| Error::Io(format!("failed to create {}", path.display()), err))?;
            copy_entry(entry, name, &mut out, &mut stored_sha256, &mut buf, opts.deobfuscate)?;
            set_mode(&path, mode);
        }
        UnpackDest::Repack(builder) => {
            let mut spool = tempfile::tempfile_in(opts.tempdir).map_err(|err| Error::Io("failed to create spool file".to_string(), err))?;
            copy_entry(entry, name, &mut spool, &mut stored_sha256, &mut buf, opts.deobfuscate)?;
            spool.seek(SeekFrom::Start(0)).map_err(|err| Error::Io("failed to rewind spool file".to_string(), err))?;

            let mut header = tar::Header::new_gnu();
            header.set_size(size);
            header.set_mode(mode);
            header.set_mtime(0);
            header.set_entry_type(tar::EntryType::Regular);
            builder.append_data(&mut header, name, spool).map_err(|err| Error::Io(format!("failed to repack {name}"), err))?;
        }
    }

    Ok(stored_sha256.finalize().into())
}

fn copy_entry<R: Read, W: Write>(entry: &mut tar::Entry<R>, name: &str, out: &mut W, stored_sha256: &mut Sha256Context, buf: &mut [u8], deobfuscate: bool) -> Result<()> {
    loop {
        let n = entry.read(buf).map_err(|err| Error::Format(format!("truncated payload entry {name}: {err}")))?;
        if n == 0 {
            return Ok(());
        }
        let chunk = &mut buf[..n];
        stored_sha256.update(&chunk[..]);
        if deobfuscate {
            demunge(chunk);
        }
        out.write_all(chunk).map_err(|err| Error::Io(format!("failed to write {name}"), err))?;
    }
}

fn sanitize_entry_path(name: &str) -> Result<PathBuf> {
    let mut clean = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return Err(Error::Format(format!("unsafe path in payload archive: {name}"))),
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(Error::Format(format!("empty path in payload archive: {name}")));
    }
    Ok(clean)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(err) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)) {
        warn!("failed to set permissions on {}: {err}", path.display());
    }
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) {}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use update_format_kindle::obfuscate::DeobfuscatingReader;

    fn test_key() -> RsaPrivateKey {
        let mut rng = rand::thread_rng();
        RsaPrivateKey::new(&mut rng, 1024).unwrap_or_else(|error| {
            panic!("failed to generate test key: {:?}", error);
        })
    }

    fn stage_inputs(dir: &Path) -> Vec<PayloadEntry> {
        let a = dir.join("alpha.txt");
        let b = dir.join("beta.bin");
        std::fs::write(&a, b"alpha contents\n").unwrap();
        std::fs::write(&b, (0..=255u8).collect::<Vec<u8>>()).unwrap();
        vec![
            PayloadEntry {
                archive_path: "alpha.txt".to_string(),
                source: a,
                mode: 0o644,
            },
            PayloadEntry {
                archive_path: "beta.bin".to_string(),
                source: b,
                mode: 0o755,
            },
        ]
    }

    #[test]
    fn test_signed_payload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let entries = stage_inputs(dir.path());
        let key = test_key();
        let public_key = key.to_public_key();

        let mut payload = Vec::new();
        let summary = write_payload(
            &entries,
            &PayloadOptions {
                obfuscate: true,
                signing_key: Some(&key),
                with_filelist: true,
            },
            &mut payload,
        )
        .unwrap();
        assert_eq!(summary.len, payload.len() as u64);

        // The stream itself is obfuscated: it must not look like gzip.
        assert_ne!(&payload[..2], &[0x1F, 0x8B][..]);

        let outdir = dir.path().join("out");
        let mut unpacked = Vec::new();
        unpack_payload(
            GzDecoder::new(DeobfuscatingReader::new(&payload[..])),
            &mut UnpackDest::Directory::<std::fs::File>(&outdir),
            &UnpackOptions {
                deobfuscate: true,
                verify: Some(&public_key),
                tempdir: dir.path(),
            },
            &mut unpacked,
        )
        .unwrap();

        assert_eq!(std::fs::read(outdir.join("alpha.txt")).unwrap(), b"alpha contents\n");
        assert_eq!(std::fs::read(outdir.join("beta.bin")).unwrap(), (0..=255u8).collect::<Vec<u8>>());

        let names: Vec<&str> = unpacked.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(names, vec!["alpha.txt", "beta.bin", FILELIST_NAME]);

        let listed = filelist::parse(&std::fs::read(outdir.join(FILELIST_NAME)).unwrap()).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].path, "alpha.txt");
        let expected_md5 = Hash::<Md5>::from_bytes(Md5Context::digest(b"alpha contents\n").into());
        assert_eq!(listed[0].md5, expected_md5.to_string());
        assert_eq!(listed[1].mode, 0o755);
    }

    #[test]
    fn test_unsigned_payload_fails_verification() {
        let dir = tempfile::tempdir().unwrap();
        let entries = stage_inputs(dir.path());
        let key = test_key();

        let mut payload = Vec::new();
        write_payload(
            &entries,
            &PayloadOptions {
                obfuscate: true,
                signing_key: None,
                with_filelist: false,
            },
            &mut payload,
        )
        .unwrap();

        let outdir = dir.path().join("out");
        let mut unpacked = Vec::new();
        let err = unpack_payload(
            GzDecoder::new(DeobfuscatingReader::new(&payload[..])),
            &mut UnpackDest::Directory::<std::fs::File>(&outdir),
            &UnpackOptions {
                deobfuscate: true,
                verify: Some(&key.to_public_key()),
                tempdir: dir.path(),
            },
            &mut unpacked,
        )
        .unwrap_err();
        match err {
            Error::Signature(msg) => assert!(msg.contains("alpha.txt"), "message: {msg}"),
            other => panic!("expected Signature error, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_key_fails_verification() {
        let dir = tempfile::tempdir().unwrap();
        let entries = stage_inputs(dir.path());
        let signing = test_key();
        let other = test_key();

        let mut payload = Vec::new();
        write_payload(
            &entries,
            &PayloadOptions {
                obfuscate: true,
                signing_key: Some(&signing),
                with_filelist: false,
            },
            &mut payload,
        )
        .unwrap();

        let outdir = dir.path().join("out");
        let mut unpacked = Vec::new();
        let err = unpack_payload(
            GzDecoder::new(DeobfuscatingReader::new(&payload[..])),
            &mut UnpackDest::Directory::<std::fs::File>(&outdir),
            &UnpackOptions {
                deobfuscate: true,
                verify: Some(&other.to_public_key()),
                tempdir: dir.path(),
            },
            &mut unpacked,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Signature(_)));
    }

    #[test]
    fn test_sanitize_entry_path() {
        assert_eq!(sanitize_entry_path("a/b/c.txt").unwrap(), PathBuf::from("a/b/c.txt"));
        assert_eq!(sanitize_entry_path("./a.txt").unwrap(), PathBuf::from("a.txt"));
        assert!(sanitize_entry_path("../escape").is_err());
        assert!(sanitize_entry_path("/etc/passwd").is_err());
    }
}
