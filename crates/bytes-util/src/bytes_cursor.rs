use std::io;

use bytes::Bytes;

/// Extends [`io::Cursor<Bytes>`] with a zero-copy slice extraction method.
pub trait BytesCursorExt {
    /// Reads `size` bytes from the cursor and advances its position past them,
    /// returning them as a cheaply-cloned [`Bytes`] slice rather than copying into a
    /// `Vec`.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::UnexpectedEof`] if fewer than `size` bytes remain.
    fn extract_bytes(&mut self, size: usize) -> io::Result<Bytes>;

    /// Extracts every remaining byte in the cursor.
    fn extract_remaining(&mut self) -> Bytes;
}

impl BytesCursorExt for io::Cursor<Bytes> {
    fn extract_bytes(&mut self, size: usize) -> io::Result<Bytes> {
        let start = self.position() as usize;
        let end = start
            .checked_add(size)
            .filter(|&end| end <= self.get_ref().len())
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "not enough data"))?;

        let slice = self.get_ref().slice(start..end);
        self.set_position(end as u64);
        Ok(slice)
    }

    fn extract_remaining(&mut self) -> Bytes {
        let start = self.position() as usize;
        let end = self.get_ref().len();
        self.set_position(end as u64);
        self.get_ref().slice(start..end)
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use bytes::Bytes;

    use super::BytesCursorExt;

    #[test]
    fn extract_bytes_advances_position() {
        let mut cursor = io::Cursor::new(Bytes::from_static(b"hello world"));
        assert_eq!(cursor.extract_bytes(5).unwrap(), Bytes::from_static(b"hello"));
        assert_eq!(cursor.position(), 5);
        assert_eq!(cursor.extract_remaining(), Bytes::from_static(b" world"));
    }

    #[test]
    fn extract_bytes_errors_on_short_buffer() {
        let mut cursor = io::Cursor::new(Bytes::from_static(b"hi"));
        assert!(cursor.extract_bytes(10).is_err());
    }
}
