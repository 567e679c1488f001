//! Bundle creation.
//!
//! The payload is staged into a temporary file first so its digest and
//! length are known before a single header byte is written; the final
//! bundle is then magic + header + staged payload. Partial outputs are
//! removed when anything fails.

use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, info, warn};
use rsa::RsaPrivateKey;
use sha2::{Digest, Sha256 as Sha256Context};
use tempfile::NamedTempFile;

use update_format_kindle::header::{self, Header, OtaV1Header, OtaV2Header, RecoveryV1Header, RecoveryV2Header, SignatureHeader};
use update_format_kindle::sign::{self, CertNumber};

use crate::archive::{write_payload, PayloadEntry, PayloadOptions, PayloadSummary};
use crate::context::Context;
use crate::error::Error;
use crate::extension::{classify, FileKind};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateKind {
    Ota,
    Ota2,
    OtaUpdateData,
    Recovery,
    Recovery2,
    Sig,
    UserData,
    Android,
}

impl FromStr for CreateKind {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self> {
        match token.to_ascii_lowercase().as_str() {
            "ota" => Ok(CreateKind::Ota),
            "ota2" => Ok(CreateKind::Ota2),
            "ota_update_data" => Ok(CreateKind::OtaUpdateData),
            "recovery" => Ok(CreateKind::Recovery),
            "recovery2" => Ok(CreateKind::Recovery2),
            "sig" => Ok(CreateKind::Sig),
            "userdata" => Ok(CreateKind::UserData),
            "android" => Ok(CreateKind::Android),
            other => Err(Error::Usage(format!("unknown bundle kind: {other}"))),
        }
    }
}

pub struct CreateParams {
    pub kind: CreateKind,
    pub devices: Vec<u32>,
    pub signing_key: Option<RsaPrivateKey>,
    pub source_revision: u64,
    pub target_revision: u64,
    pub legacy_source_revision: Option<u32>,
    pub minor: u8,
    pub platform: Option<u32>,
    pub board: Option<u32>,
    pub cert: CertNumber,
    pub optional: bool,
    pub metadata: Vec<String>,
}

pub fn create(ctx: &Context, params: &CreateParams, inputs: &[PathBuf], output: &Path) -> Result<()> {
    if inputs.is_empty() {
        return Err(Error::Usage("no input files given".to_string()));
    }

    let output_existed = output.exists();
    let result = create_inner(ctx, params, inputs, output);
    if result.is_err() && !output_existed {
        if fs::remove_file(output).is_ok() {
            debug!("removed partial output {}", output.display());
        }
    }
    result
}

fn create_inner(ctx: &Context, params: &CreateParams, inputs: &[PathBuf], output: &Path) -> Result<()> {
    match params.kind {
        CreateKind::Ota => {
            let device = fits_u16(single_device(params)?, "device code")?;
            let source_revision = match params.legacy_source_revision {
                Some(rev) => rev,
                None => fits_u32(params.source_revision, "source revision")?,
            };
            let target_revision = fits_u32(params.target_revision, "target revision")?;
            let (summary, staged) = stage_payload(ctx, params, inputs, false)?;
            let header = Header::OtaV1(OtaV1Header {
                magic: *b"FC02",
                source_revision,
                target_revision,
                device,
                optional: params.optional as u8,
                md5: md5_field(&summary),
            });
            write_bundle(output, &header, staged)
        }
        CreateKind::Ota2 | CreateKind::OtaUpdateData => {
            if params.devices.is_empty() {
                return Err(Error::Usage("at least one target device (-d) is required".to_string()));
            }
            let devices = params.devices.iter().map(|&code| fits_u16(code, "device code")).collect::<Result<Vec<u16>>>()?;
            if params.optional {
                warn!("the optional flag is ignored for OTA v2 bundles");
            }
            let magic = if params.kind == CreateKind::Ota2 { *b"FC04" } else { *b"FD04" };
            let (summary, staged) = stage_payload(ctx, params, inputs, true)?;
            let header = Header::OtaV2(OtaV2Header {
                magic,
                source_revision: params.source_revision,
                target_revision: params.target_revision,
                md5: md5_field(&summary),
                devices,
                metadata: params.metadata.clone(),
            });
            write_bundle(output, &header, staged)
        }
        CreateKind::Recovery => {
            let device = single_device(params)?;
            let (summary, staged) = stage_payload(ctx, params, inputs, false)?;
            let header = Header::RecoveryV1(RecoveryV1Header {
                magic: *b"FB02",
                md5: md5_field(&summary),
                magic1: header::RECOVERY_MAGIC_1,
                magic2: header::RECOVERY_MAGIC_2,
                minor: params.minor as u32,
                device,
            });
            write_bundle(output, &header, staged)
        }
        CreateKind::Recovery2 => {
            let platform = params.platform.ok_or_else(|| Error::Usage("recovery2 requires a target platform (-p)".to_string()))?;
            let board = params.board.ok_or_else(|| Error::Usage("recovery2 requires a target board (-b)".to_string()))?;
            let (summary, staged) = stage_payload(ctx, params, inputs, false)?;
            let header = Header::RecoveryV2(RecoveryV2Header {
                magic: *b"FB02",
                target_revision: params.target_revision,
                md5: md5_field(&summary),
                magic1: header::RECOVERY_MAGIC_1,
                magic2: header::RECOVERY_MAGIC_2,
                minor: params.minor as u32,
                platform,
                header_rev: 2,
                board,
            });
            write_bundle(output, &header, staged)
        }
        CreateKind::Sig => create_signature(params, single_input(inputs)?, output),
        CreateKind::UserData => create_userdata(inputs, output),
        CreateKind::Android => {
            let input = single_input(inputs)?;
            if classify(input) != FileKind::JarArchive {
                return Err(Error::Unsupported(format!("Android update input must be a .jar or .zip, got {}", input.display())));
            }
            fs::copy(input, output).map_err(|err| Error::Io(format!("failed to copy {}", input.display()), err))?;
            info!("passed {} through to {}", input.display(), output.display());
            Ok(())
        }
    }
}

fn create_signature(params: &CreateParams, input: &Path, output: &Path) -> Result<()> {
    let key = params.signing_key.as_ref().ok_or_else(|| Error::Usage("create sig requires a private key (-k)".to_string()))?;
    sign::check_key_matches_cert(key, params.cert)?;

    let file = File::open(input).map_err(|err| Error::Io(format!("failed to open {}", input.display()), err))?;
    let mut reader = BufReader::new(file);
    let mut sha256 = Sha256Context::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = reader.read(&mut buf).map_err(|err| Error::Io(format!("failed to read {}", input.display()), err))?;
        if n == 0 {
            break;
        }
        sha256.update(&buf[..n]);
    }
    let signature = sign::sign_digest(&sha256.finalize(), key)?;

    let file = File::create(output).map_err(|err| Error::Io(format!("failed to create {}", output.display()), err))?;
    let mut out = BufWriter::new(file);
    header::write_header(
        &mut out,
        &Header::Signature(SignatureHeader {
            magic: *b"SP01",
            cert: params.cert,
        }),
    )?;
    out.write_all(&signature).map_err(|err| Error::Io(format!("failed to write {}", output.display()), err))?;
    out.flush().map_err(|err| Error::Io(format!("failed to write {}", output.display()), err))?;
    info!("signed {} ({} byte signature) into {}", input.display(), signature.len(), output.display());
    Ok(())
}

// A user data package is a bare tar.gz: no header, no obfuscation, no
// signatures. An input that already is a tarball is copied through.
fn create_userdata(inputs: &[PathBuf], output: &Path) -> Result<()> {
    if let [input] = inputs {
        if classify(input) == FileKind::GzippedTarball {
            fs::copy(input, output).map_err(|err| Error::Io(format!("failed to copy {}", input.display()), err))?;
            info!("passed {} through to {}", input.display(), output.display());
            return Ok(());
        }
    }

    let entries = collect_entries(inputs)?;
    let file = File::create(output).map_err(|err| Error::Io(format!("failed to create {}", output.display()), err))?;
    write_payload(
        &entries,
        &PayloadOptions {
            obfuscate: false,
            signing_key: None,
            with_filelist: false,
        },
        BufWriter::new(file),
    )?;
    info!("packed {} entries into {}", entries.len(), output.display());
    Ok(())
}

fn stage_payload(ctx: &Context, params: &CreateParams, inputs: &[PathBuf], with_filelist: bool) -> Result<(PayloadSummary, NamedTempFile)> {
    let entries = collect_entries(inputs)?;
    let mut staged = NamedTempFile::new_in(&ctx.tempdir).map_err(|err| Error::Io("failed to create staging file".to_string(), err))?;
    let summary = write_payload(
        &entries,
        &PayloadOptions {
            obfuscate: true,
            signing_key: params.signing_key.as_ref(),
            with_filelist,
        },
        BufWriter::new(staged.as_file_mut()),
    )?;
    Ok((summary, staged))
}

fn write_bundle(output: &Path, header: &Header, mut staged: NamedTempFile) -> Result<()> {
    let file = File::create(output).map_err(|err| Error::Io(format!("failed to create {}", output.display()), err))?;
    let mut out = BufWriter::new(file);
    header::write_header(&mut out, header)?;

    let staged = staged.as_file_mut();
    staged.seek(SeekFrom::Start(0)).map_err(|err| Error::Io("failed to rewind staging file".to_string(), err))?;
    io::copy(staged, &mut out).map_err(|err| Error::Io(format!("failed to write {}", output.display()), err))?;
    out.flush().map_err(|err| Error::Io(format!("failed to write {}", output.display()), err))?;

    info!("wrote {} bundle to {}", header.kind(), output.display());
    Ok(())
}

fn collect_entries(inputs: &[PathBuf]) -> Result<Vec<PayloadEntry>> {
    let mut entries = Vec::new();
    for input in inputs {
        let meta = fs::metadata(input).map_err(|err| Error::Io(format!("failed to stat {}", input.display()), err))?;
        if meta.is_dir() {
            let prefix = input.file_name().and_then(OsStr::to_str).unwrap_or("").to_string();
            walk_dir(input, &prefix, &mut entries)?;
        } else {
            let name = input
                .file_name()
                .and_then(OsStr::to_str)
                .ok_or_else(|| Error::Usage(format!("input path {} has no usable file name", input.display())))?;
            entries.push(PayloadEntry {
                archive_path: name.to_string(),
                source: input.clone(),
                mode: file_mode(&meta),
            });
        }
    }
    if entries.is_empty() {
        return Err(Error::Usage("no payload files found".to_string()));
    }
    Ok(entries)
}

fn walk_dir(dir: &Path, prefix: &str, entries: &mut Vec<PayloadEntry>) -> Result<()> {
    let mut children: Vec<_> = fs::read_dir(dir)
        .map_err(|err| Error::Io(format!("failed to read directory {}", dir.display()), err))?
        .collect::<io::Result<Vec<_>>>()
        .map_err(|err| Error::Io(format!("failed to read directory {}", dir.display()), err))?;
    children.sort_by_key(|child| child.file_name());

    for child in children {
        let path = child.path();
        let name = child.file_name().to_string_lossy().into_owned();
        let child_path = if prefix.is_empty() { name } else { format!("{prefix}/{name}") };
        let meta = child.metadata().map_err(|err| Error::Io(format!("failed to stat {}", path.display()), err))?;
        if meta.is_dir() {
            walk_dir(&path, &child_path, entries)?;
        } else if meta.is_file() {
            entries.push(PayloadEntry {
                archive_path: child_path,
                source: path,
                mode: file_mode(&meta),
            });
        } else {
            warn!("skipping special file {}", path.display());
        }
    }
    Ok(())
}

#[cfg(unix)]
fn file_mode(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(_meta: &fs::Metadata) -> u32 {
    0o644
}

fn single_input(inputs: &[PathBuf]) -> Result<&Path> {
    match inputs {
        [one] => Ok(one),
        _ => Err(Error::Usage(format!("exactly one input file expected, got {}", inputs.len()))),
    }
}

fn single_device(params: &CreateParams) -> Result<u32> {
    match params.devices.as_slice() {
        [] => Err(Error::Usage("at least one target device (-d) is required".to_string())),
        [device] => Ok(*device),
        [first, ..] => {
            warn!("this bundle kind carries a single device code, using the first of {}", params.devices.len());
            Ok(*first)
        }
    }
}

fn md5_field(summary: &PayloadSummary) -> [u8; header::MD5_HEX_LEN] {
    let mut field = [0u8; header::MD5_HEX_LEN];
    field.copy_from_slice(summary.md5.to_string().as_bytes());
    field
}

fn fits_u32(value: u64, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::Usage(format!("{what} {value} does not fit the v1 header")))
}

fn fits_u16(value: u32, what: &str) -> Result<u16> {
    u16::try_from(value).map_err(|_| Error::Usage(format!("{what} 0x{value:X} does not fit a 16-bit header field")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tokens() {
        assert_eq!(CreateKind::from_str("ota").unwrap(), CreateKind::Ota);
        assert_eq!(CreateKind::from_str("OTA2").unwrap(), CreateKind::Ota2);
        assert_eq!(CreateKind::from_str("ota_update_data").unwrap(), CreateKind::OtaUpdateData);
        assert_eq!(CreateKind::from_str("recovery2").unwrap(), CreateKind::Recovery2);
        assert!(matches!(CreateKind::from_str("firmware"), Err(Error::Usage(_))));
    }

    #[test]
    fn test_collect_entries_walks_directories() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("tree");
        fs::create_dir_all(tree.join("nested")).unwrap();
        fs::write(tree.join("b.txt"), b"b").unwrap();
        fs::write(tree.join("a.txt"), b"a").unwrap();
        fs::write(tree.join("nested/c.txt"), b"c").unwrap();

        let entries = collect_entries(&[tree]).unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.archive_path.as_str()).collect();
        assert_eq!(paths, vec!["tree/a.txt", "tree/b.txt", "tree/nested/c.txt"]);
    }

    #[test]
    fn test_recovery2_requires_platform_and_board() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("rootfs.img");
        fs::write(&input, b"image").unwrap();
        let ctx = Context {
            accept_unknown_devcodes: false,
            metadata_dump: None,
            tempdir: dir.path().to_path_buf(),
        };
        let mut params = CreateParams {
            kind: CreateKind::Recovery2,
            devices: vec![0x201],
            signing_key: None,
            source_revision: 0,
            target_revision: 1,
            legacy_source_revision: None,
            minor: 0,
            platform: None,
            board: None,
            cert: CertNumber::Dev,
            optional: false,
            metadata: Vec::new(),
        };
        let output = dir.path().join("out.bin");

        match create(&ctx, &params, std::slice::from_ref(&input), &output) {
            Err(Error::Usage(msg)) => assert!(msg.contains("platform"), "message: {msg}"),
            other => panic!("expected Usage error, got {:?}", other),
        }

        params.platform = Some(0x07);
        match create(&ctx, &params, std::slice::from_ref(&input), &output) {
            Err(Error::Usage(msg)) => assert!(msg.contains("board"), "message: {msg}"),
            other => panic!("expected Usage error, got {:?}", other),
        }

        params.board = Some(0);
        create(&ctx, &params, std::slice::from_ref(&input), &output).unwrap();
        assert!(output.exists());
    }

    #[test]
    fn test_range_checks() {
        assert_eq!(fits_u32(7, "rev").unwrap(), 7);
        assert!(matches!(fits_u32(u64::MAX, "rev"), Err(Error::Usage(_))));
        assert!(matches!(fits_u16(0x2909, "dev"), Ok(0x2909)));
        assert!(matches!(fits_u16(0x6F7B1, "dev"), Err(Error::Usage(_))));
    }
}
