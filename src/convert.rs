//! Bundle disassembly: identify, strip and check the header, deobfuscate
//! and unpack the payload, verify what can be verified.
//!
//! The body digest is computed over the wire bytes as they stream past, so
//! the MD5 in the header is checked without a second pass; when both a
//! stream error and a digest mismatch are present, the digest mismatch
//! wins, since a corrupted stream is exactly what the digest protects
//! against.

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::{debug, info, warn};
use rsa::RsaPublicKey;
use sha2::{Digest, Sha256 as Sha256Context};
use tempfile::NamedTempFile;

use update_format_kindle::header::{self, BundleKind, Header, SignatureHeader};
use update_format_kindle::obfuscate::DeobfuscatingReader;
use update_format_kindle::sign;

use crate::archive::{unpack_payload, UnpackDest, UnpackOptions, UnpackedEntry};
use crate::context::Context;
use crate::digest::{DigestReader, Hash, Md5};
use crate::error::Error;
use crate::Result;

const MAX_SIGNATURE_NESTING: u32 = 4;

/// Disassemble a bundle into a plain tar.gz; returns the output path.
pub fn convert(ctx: &Context, input: &Path, output: Option<&Path>, verify: Option<&RsaPublicKey>) -> Result<PathBuf> {
    let out = disassemble(ctx, input, Dest::Archive(output), verify, 0)?;
    Ok(out.expect("archive disassembly always yields an output path"))
}

/// Disassemble a bundle into a directory of files.
pub fn extract(ctx: &Context, input: &Path, outdir: &Path, verify: Option<&RsaPublicKey>) -> Result<()> {
    disassemble(ctx, input, Dest::Directory(outdir), verify, 0)?;
    Ok(())
}

/// Render the header description without unpacking anything.
pub fn info(input: &Path) -> Result<String> {
    let file = File::open(input).map_err(|err| Error::Io(format!("failed to open {}", input.display()), err))?;
    let mut reader = BufReader::new(file);
    let magic = header::read_magic(&mut reader)?;
    let kind = header::detect(&magic)?;
    match kind {
        BundleKind::UserData | BundleKind::Android => Ok(format!("{:<14} {}\n", "Bundle Type:", kind)),
        _ => {
            let parsed = header::read_header(&mut reader, magic, kind)?;
            Ok(describe(&parsed))
        }
    }
}

#[derive(Clone, Copy)]
enum Dest<'a> {
    Archive(Option<&'a Path>),
    Directory(&'a Path),
}

fn disassemble(ctx: &Context, input: &Path, dest: Dest, verify: Option<&RsaPublicKey>, depth: u32) -> Result<Option<PathBuf>> {
    let file = File::open(input).map_err(|err| Error::Io(format!("failed to open {}", input.display()), err))?;
    let mut reader = BufReader::new(file);
    let magic = header::read_magic(&mut reader)?;
    let kind = header::detect(&magic)?;
    debug!("magic read: {} bundle", kind);

    match kind {
        BundleKind::UserData => {
            drop(reader);
            dump_description(ctx, &format!("{:<14} {}\n", "Bundle Type:", kind))?;
            handle_userdata(ctx, input, dest)
        }
        BundleKind::Android => {
            drop(reader);
            dump_description(ctx, &format!("{:<14} {}\n", "Bundle Type:", kind))?;
            handle_android(input, dest)
        }
        BundleKind::Signature => {
            let parsed = header::read_header(&mut reader, magic, kind)?;
            dump_description(ctx, &describe(&parsed))?;
            let Header::Signature(sig_header) = parsed else {
                return Err(Error::Format("signature magic yielded a non-signature header".to_string()));
            };
            handle_signature(ctx, &mut reader, &sig_header, input, dest, verify, depth)
        }
        _ => {
            let parsed = header::read_header(&mut reader, magic, kind)?;
            debug!("header read: {}", parsed.kind());
            dump_description(ctx, &describe(&parsed))?;

            match dest {
                Dest::Directory(outdir) => {
                    fs::create_dir_all(outdir).map_err(|err| Error::Io(format!("failed to create {}", outdir.display()), err))?;
                    let mut created = Vec::new();
                    if let Err(err) = stream_body(ctx, &mut reader, &parsed, &mut UnpackDest::Directory::<File>(outdir), verify, &mut created) {
                        for entry in &created {
                            let _ = fs::remove_file(outdir.join(&entry.path));
                        }
                        return Err(err);
                    }
                    info!("extracted {} entries into {}", created.len(), outdir.display());
                    Ok(None)
                }
                Dest::Archive(output) => {
                    let out_path = output.map(Path::to_path_buf).unwrap_or_else(|| input.with_extension("tar.gz"));
                    if out_path == input {
                        return Err(Error::Usage(format!("output path {} equals the input", out_path.display())));
                    }
                    let result = repack_body(ctx, &mut reader, &parsed, &out_path, verify);
                    match result {
                        Ok(count) => {
                            info!("converted {} entries into {}", count, out_path.display());
                            Ok(Some(out_path))
                        }
                        Err(err) => {
                            let _ = fs::remove_file(&out_path);
                            Err(err)
                        }
                    }
                }
            }
        }
    }
}

fn repack_body<R: Read>(ctx: &Context, reader: &mut R, parsed: &Header, out_path: &Path, verify: Option<&RsaPublicKey>) -> Result<usize> {
    let file = File::create(out_path).map_err(|err| Error::Io(format!("failed to create {}", out_path.display()), err))?;
    let gz = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = tar::Builder::new(gz);

    let mut created = Vec::new();
    stream_body(ctx, reader, parsed, &mut UnpackDest::Repack(&mut builder), verify, &mut created)?;

    let gz = builder.into_inner().map_err(|err| Error::Io(format!("failed to finish {}", out_path.display()), err))?;
    let mut out = gz.finish().map_err(|err| Error::Io(format!("failed to finish {}", out_path.display()), err))?;
    out.flush().map_err(|err| Error::Io(format!("failed to finish {}", out_path.display()), err))?;
    Ok(created.len())
}

fn stream_body<R: Read, W: Write>(
    ctx: &Context,
    reader: &mut R,
    parsed: &Header,
    dest: &mut UnpackDest<'_, W>,
    verify: Option<&RsaPublicKey>,
    unpacked: &mut Vec<UnpackedEntry>,
) -> Result<()> {
    let mut digest_reader = DigestReader::new(reader);
    debug!("streaming bundle body");

    let unpack_result = {
        let body: Box<dyn Read + '_> = if parsed.body_obfuscated() {
            Box::new(DeobfuscatingReader::new(&mut digest_reader))
        } else {
            Box::new(&mut digest_reader)
        };
        unpack_payload(
            GzDecoder::new(body),
            dest,
            &UnpackOptions {
                deobfuscate: parsed.body_obfuscated(),
                verify,
                tempdir: &ctx.tempdir,
            },
            unpacked,
        )
    };

    // Drain whatever the decompressor left unread so the digest covers the
    // complete body, then settle the verdict: a digest mismatch outranks a
    // stream error.
    let mut sink = [0u8; 4096];
    loop {
        let n = digest_reader.read(&mut sink).map_err(|err| Error::Io("failed to drain bundle body".to_string(), err))?;
        if n == 0 {
            break;
        }
    }
    let (_, summary) = digest_reader.finish();
    debug!("digest checked over {} body bytes", summary.len);

    if let Some(expected) = parsed.md5() {
        check_md5(expected, &summary.md5)?;
    }
    unpack_result?;
    debug!("archive consumed: {} entries", unpacked.len());
    Ok(())
}

fn check_md5(expected_hex: &[u8; header::MD5_HEX_LEN], actual: &Hash<Md5>) -> Result<()> {
    let expected = std::str::from_utf8(expected_hex)
        .ok()
        .and_then(|hex| Hash::<Md5>::from_hex(&hex.to_ascii_lowercase()).ok())
        .ok_or_else(|| Error::Format("header md5 field is not ASCII hex".to_string()))?;
    if &expected != actual {
        return Err(Error::Integrity {
            field: "md5",
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

// A user data package is a bare tar.gz with plain contents and no
// signatures; conversion is a copy, extraction is a plain untar.
fn handle_userdata(ctx: &Context, input: &Path, dest: Dest) -> Result<Option<PathBuf>> {
    match dest {
        Dest::Archive(output) => {
            let out_path = output.map(Path::to_path_buf).unwrap_or_else(|| input.with_extension("tar.gz"));
            if out_path == input {
                return Err(Error::Usage(format!("output path {} equals the input", out_path.display())));
            }
            fs::copy(input, &out_path).map_err(|err| Error::Io(format!("failed to copy {}", input.display()), err))?;
            info!("copied user data package to {}", out_path.display());
            Ok(Some(out_path))
        }
        Dest::Directory(outdir) => {
            fs::create_dir_all(outdir).map_err(|err| Error::Io(format!("failed to create {}", outdir.display()), err))?;
            let file = File::open(input).map_err(|err| Error::Io(format!("failed to open {}", input.display()), err))?;
            let mut created = Vec::new();
            let result = unpack_payload(
                GzDecoder::new(BufReader::new(file)),
                &mut UnpackDest::Directory::<File>(outdir),
                &UnpackOptions {
                    deobfuscate: false,
                    verify: None,
                    tempdir: &ctx.tempdir,
                },
                &mut created,
            );
            if let Err(err) = result {
                for entry in &created {
                    let _ = fs::remove_file(outdir.join(&entry.path));
                }
                return Err(err);
            }
            info!("extracted {} entries into {}", created.len(), outdir.display());
            Ok(None)
        }
    }
}

fn handle_android(input: &Path, dest: Dest) -> Result<Option<PathBuf>> {
    let out_path = match dest {
        Dest::Archive(output) => output.map(Path::to_path_buf).unwrap_or_else(|| input.with_extension("jar")),
        Dest::Directory(outdir) => {
            fs::create_dir_all(outdir).map_err(|err| Error::Io(format!("failed to create {}", outdir.display()), err))?;
            outdir.join(input.file_name().unwrap_or_else(|| "update.jar".as_ref()))
        }
    };
    if out_path == input {
        return Err(Error::Usage(format!("output path {} equals the input", out_path.display())));
    }
    fs::copy(input, &out_path).map_err(|err| Error::Io(format!("failed to copy {}", input.display()), err))?;
    info!("passed Android update through to {}", out_path.display());
    match dest {
        Dest::Archive(_) => Ok(Some(out_path)),
        Dest::Directory(_) => Ok(None),
    }
}

// A signature bundle is a header plus one raw RSA blob. Anything after the
// blob is a wrapped inner bundle: the blob signs those bytes, and the inner
// bundle is processed recursively once they are staged.
fn handle_signature<R: Read>(
    ctx: &Context,
    reader: &mut R,
    sig_header: &SignatureHeader,
    input: &Path,
    dest: Dest,
    verify: Option<&RsaPublicKey>,
    depth: u32,
) -> Result<Option<PathBuf>> {
    if depth >= MAX_SIGNATURE_NESTING {
        return Err(Error::Format("signature envelopes nested too deeply".to_string()));
    }

    let mut signature = vec![0u8; sig_header.cert.signature_len()];
    reader.read_exact(&mut signature).map_err(|err| Error::Format(format!("truncated signature payload: {err}")))?;

    let mut probe = [0u8; 1];
    let probed = reader.read(&mut probe).map_err(|err| Error::Io("failed to read signature bundle".to_string(), err))?;
    if probed == 0 {
        // Standalone signature bundle: the blob is the whole payload.
        let out_path = match dest {
            Dest::Archive(output) => output.map(Path::to_path_buf).unwrap_or_else(|| input.with_extension("sig")),
            Dest::Directory(outdir) => {
                fs::create_dir_all(outdir).map_err(|err| Error::Io(format!("failed to create {}", outdir.display()), err))?;
                outdir.join(input.with_extension("sig").file_name().unwrap_or_else(|| "bundle.sig".as_ref()))
            }
        };
        fs::write(&out_path, &signature).map_err(|err| Error::Io(format!("failed to write {}", out_path.display()), err))?;
        info!("wrote signature blob to {}", out_path.display());
        return match dest {
            Dest::Archive(_) => Ok(Some(out_path)),
            Dest::Directory(_) => Ok(None),
        };
    }

    let mut staged = NamedTempFile::new_in(&ctx.tempdir).map_err(|err| Error::Io("failed to create staging file".to_string(), err))?;
    let mut sha256 = Sha256Context::new();
    sha256.update(&probe[..probed]);
    staged.as_file_mut().write_all(&probe[..probed]).map_err(|err| Error::Io("failed to stage wrapped bundle".to_string(), err))?;
    let mut buf = [0u8; 4096];
    loop {
        let n = reader.read(&mut buf).map_err(|err| Error::Io("failed to read wrapped bundle".to_string(), err))?;
        if n == 0 {
            break;
        }
        sha256.update(&buf[..n]);
        staged.as_file_mut().write_all(&buf[..n]).map_err(|err| Error::Io("failed to stage wrapped bundle".to_string(), err))?;
    }

    match verify {
        Some(key) => {
            sign::verify_digest(&sha256.finalize(), &signature, key).map_err(|err| Error::Signature(format!("bad envelope signature: {err}")))?;
            info!("envelope signature verified (certificate {})", sig_header.cert.key_name());
        }
        None => warn!("no key available, skipping envelope signature check"),
    }

    let derived;
    let inner_dest = match dest {
        Dest::Archive(None) => {
            derived = input.with_extension("tar.gz");
            Dest::Archive(Some(&derived))
        }
        other => other,
    };
    disassemble(ctx, staged.path(), inner_dest, verify, depth + 1)
}

/// Human-readable header description, used by `info` and the metadata dump
/// sidecar.
pub fn describe(parsed: &Header) -> String {
    let mut out = String::new();
    let magic = String::from_utf8_lossy(parsed.magic());
    let _ = writeln!(out, "{:<14} {} ({})", "Bundle Type:", parsed.kind(), magic);
    match parsed {
        Header::OtaV1(h) | Header::Component(h) => {
            let _ = writeln!(out, "{:<14} {}", "Minimum OTA:", h.source_revision);
            let _ = writeln!(out, "{:<14} {}", "Target OTA:", h.target_revision);
            let _ = writeln!(out, "{:<14} {}", "Device:", device_line(h.device as u32));
            let _ = writeln!(out, "{:<14} {}", "Optional:", h.optional);
            let _ = writeln!(out, "{:<14} {}", "MD5 Hash:", String::from_utf8_lossy(&h.md5));
        }
        Header::OtaV2(h) => {
            let _ = writeln!(out, "{:<14} {}", "Minimum OTA:", h.source_revision);
            let _ = writeln!(out, "{:<14} {}", "Target OTA:", h.target_revision);
            let _ = writeln!(out, "{:<14} {}", "MD5 Hash:", String::from_utf8_lossy(&h.md5));
            let _ = writeln!(out, "{:<14} {}", "Devices:", h.devices.len());
            for &device in &h.devices {
                let _ = writeln!(out, "  - {}", device_line(device as u32));
            }
            let _ = writeln!(out, "{:<14} {}", "Metadata:", h.metadata.len());
            for meta in &h.metadata {
                let _ = writeln!(out, "  - {meta}");
            }
        }
        Header::RecoveryV1(h) => {
            let _ = writeln!(out, "{:<14} {}", "MD5 Hash:", String::from_utf8_lossy(&h.md5));
            let _ = writeln!(out, "{:<14} {}", "Magic 1:", h.magic1);
            let _ = writeln!(out, "{:<14} {}", "Magic 2:", h.magic2);
            let _ = writeln!(out, "{:<14} {}", "Minor:", h.minor);
            let _ = writeln!(out, "{:<14} {}", "Device:", device_line(h.device));
        }
        Header::RecoveryV2(h) => {
            let _ = writeln!(out, "{:<14} {}", "Target OTA:", h.target_revision);
            let _ = writeln!(out, "{:<14} {}", "MD5 Hash:", String::from_utf8_lossy(&h.md5));
            let _ = writeln!(out, "{:<14} {}", "Magic 1:", h.magic1);
            let _ = writeln!(out, "{:<14} {}", "Magic 2:", h.magic2);
            let _ = writeln!(out, "{:<14} {}", "Minor:", h.minor);
            let _ = writeln!(out, "{:<14} {} (0x{:02X})", "Platform:", devices::platform_name(h.platform).unwrap_or("Unknown"), h.platform);
            let _ = writeln!(out, "{:<14} {}", "Header Rev:", h.header_rev);
            let _ = writeln!(out, "{:<14} 0x{:02X}", "Board:", h.board);
        }
        Header::Signature(h) => {
            let _ = writeln!(out, "{:<14} {}", "Cert Number:", h.cert.as_u8());
            let _ = writeln!(out, "{:<14} {}", "Cert File:", h.cert.key_name());
        }
    }
    out
}

fn device_line(code: u32) -> String {
    let name = devices::device_name(code).unwrap_or("Unknown device");
    format!("{} ({}, 0x{:04X})", name, devices::encode_device(code), code)
}

fn dump_description(ctx: &Context, text: &str) -> Result<()> {
    if let Some(path) = &ctx.metadata_dump {
        fs::write(path, text).map_err(|err| Error::Io(format!("failed to write metadata dump {}", path.display()), err))?;
        debug!("wrote metadata dump to {}", path.display());
    }
    Ok(())
}
