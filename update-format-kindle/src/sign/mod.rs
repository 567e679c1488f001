mod error;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs1v15;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::sha2::Sha256;
use rsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use rsa::signature::SignatureEncoding;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fs;
use std::path::Path;

// RSA-PKCS#1 v1.5 over SHA-256 throughout; the loaders accept both PKCS1
// and PKCS8 PEM. Signing works from a precomputed digest so callers can
// hash arbitrarily large streams first.

/// Selects which public key the device will use to check the bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertNumber {
    Dev,
    Prod1K,
    Prod2K,
}

impl CertNumber {
    pub fn as_u8(self) -> u8 {
        match self {
            CertNumber::Dev => 0,
            CertNumber::Prod1K => 1,
            CertNumber::Prod2K => 2,
        }
    }

    pub fn signature_len(self) -> usize {
        match self {
            CertNumber::Dev | CertNumber::Prod1K => 128,
            CertNumber::Prod2K => 256,
        }
    }

    pub fn key_name(self) -> &'static str {
        match self {
            CertNumber::Dev => "pubdevkey01.pem",
            CertNumber::Prod1K => "pubprodkey01.pem",
            CertNumber::Prod2K => "pubprodkey02.pem",
        }
    }
}

impl TryFrom<u8> for CertNumber {
    type Error = Error;

    fn try_from(num: u8) -> Result<Self> {
        match num {
            0 => Ok(CertNumber::Dev),
            1 => Ok(CertNumber::Prod1K),
            2 => Ok(CertNumber::Prod2K),
            other => Err(Error::BadCertNumber(other)),
        }
    }
}

/// Sign a precomputed SHA-256 digest; the output length equals the modulus
/// byte length.
pub fn sign_digest(digest: &[u8], private_key: &RsaPrivateKey) -> Result<Vec<u8>> {
    let signing_key = pkcs1v15::SigningKey::<Sha256>::new(private_key.clone());
    let signature = signing_key.sign_prehash(digest).map_err(Error::SignDigest)?;
    Ok(signature.to_vec())
}

/// Verify a signature against a precomputed SHA-256 digest.
pub fn verify_digest(digest: &[u8], signature: &[u8], public_key: &RsaPublicKey) -> Result<()> {
    let verifying_key = pkcs1v15::VerifyingKey::<Sha256>::new(public_key.clone());

    verifying_key
        .verify_prehash(
            digest,
            &pkcs1v15::Signature::try_from(signature).map_err(Error::InvalidSignatureEncoding)?,
        )
        .map_err(Error::BadSignature)
}

/// Check that a private key produces signatures of the length the given
/// certificate slot promises to the device loader.
pub fn check_key_matches_cert(private_key: &RsaPrivateKey, cert: CertNumber) -> Result<()> {
    let actual = private_key.size();
    if actual != cert.signature_len() {
        return Err(Error::KeyLengthMismatch {
            expected: cert.signature_len(),
            actual,
        });
    }
    Ok(())
}

pub fn load_private_key(path: &Path) -> Result<RsaPrivateKey> {
    let pem = fs::read_to_string(path).map_err(Error::ReadKeyFile)?;
    RsaPrivateKey::from_pkcs1_pem(&pem).or_else(|_| RsaPrivateKey::from_pkcs8_pem(&pem).map_err(Error::DecodePrivateKey))
}

/// Load a key usable for signature checks: a public key PEM, or a private
/// key PEM from which the public half is derived.
pub fn load_verification_key(path: &Path) -> Result<RsaPublicKey> {
    let pem = fs::read_to_string(path).map_err(Error::ReadKeyFile)?;
    if let Ok(key) = RsaPublicKey::from_pkcs1_pem(&pem) {
        return Ok(key);
    }
    if let Ok(key) = RsaPublicKey::from_public_key_pem(&pem) {
        return Ok(key);
    }
    load_private_key(path).map(|key| key.to_public_key())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::sha2::Digest;

    fn test_key() -> RsaPrivateKey {
        let mut rng = rand::thread_rng();
        RsaPrivateKey::new(&mut rng, 1024).unwrap_or_else(|error| {
            panic!("failed to generate test key: {:?}", error);
        })
    }

    #[test]
    fn test_sign_verify_round_trip() {
        let private_key = test_key();
        let public_key = private_key.to_public_key();

        let digest = Sha256::digest(b"test data for verifying signature");
        let signature = sign_digest(&digest, &private_key).unwrap();
        assert_eq!(signature.len(), 128);

        verify_digest(&digest, &signature, &public_key).unwrap_or_else(|error| {
            panic!("failed to verify signature: {:?}", error);
        });
    }

    #[test]
    fn test_verify_rejects_tampered_digest() {
        let private_key = test_key();
        let public_key = private_key.to_public_key();

        let digest = Sha256::digest(b"some payload bytes");
        let signature = sign_digest(&digest, &private_key).unwrap();

        let mut tampered = digest;
        tampered[0] ^= 0x01;
        assert!(matches!(verify_digest(&tampered, &signature, &public_key), Err(Error::BadSignature(_))));
    }

    #[test]
    fn test_cert_numbers() {
        assert_eq!(CertNumber::try_from(0).unwrap(), CertNumber::Dev);
        assert_eq!(CertNumber::try_from(2).unwrap().signature_len(), 256);
        assert!(matches!(CertNumber::try_from(7), Err(Error::BadCertNumber(7))));

        let key = test_key();
        check_key_matches_cert(&key, CertNumber::Dev).unwrap();
        assert!(matches!(
            check_key_matches_cert(&key, CertNumber::Prod2K),
            Err(Error::KeyLengthMismatch {
                expected: 256,
                actual: 128
            })
        ));
    }
}
