mod bytes;
mod string;

pub use bytes::BytesCow;
pub use string::StringCow;
