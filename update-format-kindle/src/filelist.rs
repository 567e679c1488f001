//! The `update-filelist.dat` index carried by OTA v2 payloads.
//!
//! One record per installed file: `mode<TAB>md5<TAB>sha256<TAB>path`, the
//! hashes being those of the plaintext content. The path field comes last
//! so embedded spaces survive.

pub const FILELIST_NAME: &str = "update-filelist.dat";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileListEntry {
    pub path: String,
    pub mode: u32,
    pub md5: String,
    pub sha256: String,
}

#[derive(Debug)]
pub enum Error {
    NotUtf8,
    MalformedRecord(usize),
    BadMode(String),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::NotUtf8 => write!(f, "file list is not valid UTF-8"),
            Error::MalformedRecord(line) => write!(f, "malformed file list record on line {line}"),
            Error::BadMode(mode) => write!(f, "bad file mode in file list: {mode}"),
        }
    }
}

pub fn render(entries: &[FileListEntry]) -> Vec<u8> {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!("{:o}\t{}\t{}\t{}\n", entry.mode, entry.md5, entry.sha256, entry.path));
    }
    out.into_bytes()
}

pub fn parse(data: &[u8]) -> Result<Vec<FileListEntry>, Error> {
    let text = std::str::from_utf8(data).map_err(|_| Error::NotUtf8)?;
    let mut entries = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let mut fields = line.splitn(4, '\t');
        let (mode, md5, sha256, path) = match (fields.next(), fields.next(), fields.next(), fields.next()) {
            (Some(mode), Some(md5), Some(sha256), Some(path)) => (mode, md5, sha256, path),
            _ => return Err(Error::MalformedRecord(idx + 1)),
        };
        let mode = u32::from_str_radix(mode, 8).map_err(|_| Error::BadMode(mode.to_string()))?;
        entries.push(FileListEntry {
            path: path.to_string(),
            mode,
            md5: md5.to_string(),
            sha256: sha256.to_string(),
        });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let entries = vec![
            FileListEntry {
                path: "opt/firmware/hello.txt".to_string(),
                mode: 0o644,
                md5: "d41d8cd98f00b204e9800998ecf8427e".to_string(),
                sha256: "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855".to_string(),
            },
            FileListEntry {
                path: "bin/with space.sh".to_string(),
                mode: 0o755,
                md5: "0".repeat(32),
                sha256: "0".repeat(64),
            },
        ];
        let rendered = render(&entries);
        assert_eq!(parse(&rendered).unwrap(), entries);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(parse(b"644\tonly-two-fields\n"), Err(Error::MalformedRecord(1))));
        assert!(matches!(parse(b"9z9\ta\tb\tc\n"), Err(Error::BadMode(_))));
        assert!(matches!(parse(&[0xFF, 0xFE]), Err(Error::NotUtf8)));
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        assert!(parse(b"\n\n").unwrap().is_empty());
    }
}
