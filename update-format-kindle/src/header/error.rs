#[derive(Debug)]
pub enum Error {
    ReadMagic(std::io::Error),
    BadMagic([u8; 4]),
    HeaderTooShort,
    ReadBlock(std::io::Error),
    WriteHeader(std::io::Error),
    BadCertNumber(u8),
    DeviceCountOutOfRange(usize),
    MetadataCountOutOfRange(usize),
    MetadataTooLong(usize),
    MetadataNotUtf8,
    HeaderlessKind(&'static str),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::ReadMagic(err) => write!(f, "failed to read magic: {err}"),
            Error::BadMagic(magic) => write!(f, "unknown magic: {magic:?}"),
            Error::HeaderTooShort => write!(f, "header too short"),
            Error::ReadBlock(err) => write!(f, "failed to read header block: {err}"),
            Error::WriteHeader(err) => write!(f, "failed to write header: {err}"),
            Error::BadCertNumber(num) => write!(f, "bad certificate number: {num}"),
            Error::DeviceCountOutOfRange(count) => write!(f, "device count out of range: {count}"),
            Error::MetadataCountOutOfRange(count) => write!(f, "metadata count out of range: {count}"),
            Error::MetadataTooLong(len) => write!(f, "metadata record too long: {len} bytes"),
            Error::MetadataNotUtf8 => write!(f, "metadata record is not valid UTF-8"),
            Error::HeaderlessKind(kind) => write!(f, "bundle kind {kind} carries no header"),
        }
    }
}
