use update_format_kindle::{filelist, header, sign};

/// The closed error set of the tool. Every failure surfaces as one of
/// these kinds, with the exit code derived from the kind alone.
#[derive(Debug)]
pub enum Error {
    Usage(String),
    Io(String, std::io::Error),
    Format(String),
    Integrity {
        field: &'static str,
        expected: String,
        actual: String,
    },
    Signature(String),
    Crypto(sign::Error),
    UnknownDevice(String),
    Unsupported(String),
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Usage(_) => 1,
            Error::Io(..) => 2,
            Error::Format(_) | Error::UnknownDevice(_) | Error::Unsupported(_) => 3,
            Error::Integrity {
                ..
            }
            | Error::Signature(_)
            | Error::Crypto(_) => 4,
        }
    }
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Usage(msg) => write!(f, "usage: {msg}"),
            Error::Io(what, err) => write!(f, "i/o: {what}: {err}"),
            Error::Format(msg) => write!(f, "format: {msg}"),
            Error::Integrity {
                field,
                expected,
                actual,
            } => {
                write!(f, "integrity: {field} mismatch: expected {expected}, got {actual}")
            }
            Error::Signature(msg) => write!(f, "signature: {msg}"),
            Error::Crypto(err) => write!(f, "crypto: {err}"),
            Error::UnknownDevice(token) => write!(f, "unknown device: {token}"),
            Error::Unsupported(msg) => write!(f, "unsupported: {msg}"),
        }
    }
}

impl From<header::Error> for Error {
    fn from(err: header::Error) -> Self {
        Error::Format(err.to_string())
    }
}

impl From<filelist::Error> for Error {
    fn from(err: filelist::Error) -> Self {
        Error::Format(err.to_string())
    }
}

impl From<devices::Error> for Error {
    fn from(err: devices::Error) -> Self {
        match err {
            devices::Error::UnknownDevice(token) => Error::UnknownDevice(token),
            other => Error::Format(other.to_string()),
        }
    }
}

impl From<sign::Error> for Error {
    fn from(err: sign::Error) -> Self {
        match err {
            sign::Error::BadSignature(_) | sign::Error::InvalidSignatureEncoding(_) => Error::Signature(err.to_string()),
            other => Error::Crypto(other),
        }
    }
}
