#[derive(Debug)]
pub enum Error {
    ReadKeyFile(std::io::Error),
    DecodePrivateKey(rsa::pkcs8::Error),
    DecodePublicKey(rsa::pkcs8::spki::Error),
    SignDigest(rsa::signature::Error),
    InvalidSignatureEncoding(rsa::signature::Error),
    BadSignature(rsa::signature::Error),
    BadCertNumber(u8),
    KeyLengthMismatch {
        expected: usize,
        actual: usize,
    },
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::ReadKeyFile(err) => write!(f, "failed to read key file: {err}"),
            Error::DecodePrivateKey(err) => write!(f, "failed to decode private key: {err}"),
            Error::DecodePublicKey(err) => write!(f, "failed to decode public key: {err}"),
            Error::SignDigest(err) => write!(f, "failed to sign digest: {err}"),
            Error::InvalidSignatureEncoding(err) => write!(f, "invalid signature encoding: {err}"),
            Error::BadSignature(err) => write!(f, "failed to verify signature: {err}"),
            Error::BadCertNumber(num) => write!(f, "bad certificate number: {num}"),
            Error::KeyLengthMismatch {
                expected,
                actual,
            } => {
                write!(f, "key length mismatch: certificate expects a {expected} byte signature, key produces {actual}")
            }
        }
    }
}
