mod digest;
pub use digest::{DigestReader, DigestSummary, DigestWriter, Hash, HashAlgo, Md5, Sha256};

mod context;
pub use context::Context;

mod error;
pub use error::Error;

pub type Result<T> = std::result::Result<T, Error>;

mod extension;
pub use extension::{classify, FileKind};

pub mod archive;
pub mod assemble;
pub mod convert;
