//! Small helpers layered on top of [`bytes`]: copy-on-write byte/string wrappers, a
//! zero-copy reader abstraction, and a cursor extension for pulling fixed-size chunks
//! out of a [`bytes::Bytes`] without an intermediate copy.
#![doc(html_logo_url = "https://scuffle.cloud/favicon.svg")]
#![doc(html_favicon_url = "https://scuffle.cloud/favicon.svg")]

mod bytes_cursor;
mod cow;
pub mod zero_copy;

pub use bytes_cursor::BytesCursorExt;
pub use cow::{BytesCow, StringCow};
pub use zero_copy::{BytesBuf, IoRead, Slice, ZeroCopyReader};
