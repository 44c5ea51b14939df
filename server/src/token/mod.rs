pub mod codec;
pub mod key;

pub use codec::{CodecError, EncodedToken, decode, encode, verify};
pub use key::{KeyError, SigningKey};
