#[derive(Debug)]
pub enum Error {
    UnknownDevice(String),
    MalformedDeviceCode(String),
    UnknownPlatform(String),
    UnknownBoard(String),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::UnknownDevice(token) => write!(f, "unknown device code: {token}"),
            Error::MalformedDeviceCode(token) => write!(f, "malformed device code: {token}"),
            Error::UnknownPlatform(name) => write!(f, "unknown platform: {name}"),
            Error::UnknownBoard(name) => write!(f, "unknown board: {name}"),
        }
    }
}
