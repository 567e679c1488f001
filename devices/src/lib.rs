mod codec;
pub use self::codec::*;

mod tables;
pub use self::tables::*;

mod error;
pub use self::error::Error;

pub type Result<T> = std::result::Result<T, Error>;
