use std::ffi::OsStr;
use std::path::Path;

/// What a filename claims to hold, from its case-insensitive suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    UpdateBundle,
    GzippedTarball,
    Tarball,
    SignatureFile,
    DataFile,
    JarArchive,
    Other,
}

pub fn classify(path: &Path) -> FileKind {
    let name = path.file_name().and_then(OsStr::to_str).unwrap_or("").to_ascii_lowercase();

    if name.ends_with(".tar.gz") || name.ends_with(".tgz") || name.ends_with(".stgz") {
        FileKind::GzippedTarball
    } else if name.ends_with(".tar") {
        FileKind::Tarball
    } else if name.ends_with(".bin") {
        FileKind::UpdateBundle
    } else if name.ends_with(".sig") {
        FileKind::SignatureFile
    } else if name.ends_with(".dat") {
        FileKind::DataFile
    } else if name.ends_with(".jar") || name.ends_with(".zip") {
        FileKind::JarArchive
    } else {
        FileKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify(Path::new("update.bin")), FileKind::UpdateBundle);
        assert_eq!(classify(Path::new("Update.BIN")), FileKind::UpdateBundle);
        assert_eq!(classify(Path::new("payload.tar.gz")), FileKind::GzippedTarball);
        assert_eq!(classify(Path::new("payload.TGZ")), FileKind::GzippedTarball);
        assert_eq!(classify(Path::new("payload.tar")), FileKind::Tarball);
        assert_eq!(classify(Path::new("file.sig")), FileKind::SignatureFile);
        assert_eq!(classify(Path::new("update-filelist.dat")), FileKind::DataFile);
        assert_eq!(classify(Path::new("app.jar")), FileKind::JarArchive);
        assert_eq!(classify(Path::new("README")), FileKind::Other);
    }
}
