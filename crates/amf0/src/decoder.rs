//! AMF0 decoder

use num_traits::FromPrimitive;
use scuffle_bytes_util::StringCow;
use scuffle_bytes_util::zero_copy::{BytesBuf, IoRead, Slice, ZeroCopyReader};

use crate::{Amf0Array, Amf0Error, Amf0Marker, Amf0Object, Amf0Value};

/// AMF0 decoder.
///
/// Generic over the underlying [`ZeroCopyReader`], so the same decoding logic works whether the
/// source is a `bytes::Buf`, a `std::io::Read`, or a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct Amf0Decoder<R> {
    buf: R,
    pub(crate) next_marker: Option<Amf0Marker>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ObjectHeader<'a> {
    Object,
    TypedObject { name: StringCow<'a> },
    EcmaArray { size: u32 },
}

impl<B: bytes::Buf> Amf0Decoder<BytesBuf<B>> {
    /// Create a new decoder from a [`bytes::Buf`].
    pub fn from_buf(buf: B) -> Self {
        Self {
            buf: BytesBuf::from(buf),
            next_marker: None,
        }
    }
}

impl<IR: std::io::Read> Amf0Decoder<IoRead<IR>> {
    /// Create a new decoder from a [`std::io::Read`].
    pub fn from_reader(reader: IR) -> Self {
        Self {
            buf: IoRead::from(reader),
            next_marker: None,
        }
    }
}

impl<'a> Amf0Decoder<Slice<'a>> {
    /// Create a new decoder from a borrowed byte slice.
    pub fn from_slice(bytes: &'a [u8]) -> Self {
        Self {
            buf: Slice::from(bytes),
            next_marker: None,
        }
    }
}

impl<R> Amf0Decoder<R> {
    fn read_bytes<'de>(&mut self, size: usize) -> Result<scuffle_bytes_util::BytesCow<'de>, Amf0Error>
    where
        R: ZeroCopyReader<'de>,
    {
        Ok(self.buf.try_read(size)?)
    }

    fn read_array<'de, const N: usize>(&mut self) -> Result<[u8; N], Amf0Error>
    where
        R: ZeroCopyReader<'de>,
    {
        let bytes = self.read_bytes::<'de>(N)?;
        Ok(bytes.as_bytes().try_into().expect("ZeroCopyReader returned the wrong number of bytes"))
    }

    /// Check if there are remaining bytes to read.
    pub fn has_remaining<'de>(&mut self) -> Result<bool, Amf0Error>
    where
        R: ZeroCopyReader<'de>,
    {
        match self.peek_marker::<'de>() {
            Ok(_) => Ok(true),
            Err(Amf0Error::Io(err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Decode a [`Amf0Value`] from the buffer.
    pub fn decode_value<'de>(&mut self) -> Result<Amf0Value<'static>, Amf0Error>
    where
        R: ZeroCopyReader<'de>,
    {
        let marker = self.peek_marker::<'de>()?;

        match marker {
            Amf0Marker::Boolean => self.decode_boolean::<'de>().map(Into::into),
            Amf0Marker::Number | Amf0Marker::Date => self.decode_number::<'de>().map(Into::into),
            Amf0Marker::String | Amf0Marker::LongString | Amf0Marker::XmlDocument => {
                self.decode_string::<'de>().map(Into::into)
            }
            Amf0Marker::Null | Amf0Marker::Undefined => self.decode_null::<'de>().map(|()| Amf0Value::Null),
            Amf0Marker::Object | Amf0Marker::TypedObject | Amf0Marker::EcmaArray => {
                self.decode_object::<'de>().map(Into::into)
            }
            Amf0Marker::StrictArray => self.decode_strict_array::<'de>().map(Into::into),
            _ => Err(Amf0Error::UnsupportedMarker(marker)),
        }
    }

    /// Decode all values from the buffer until the end.
    pub fn decode_all<'de>(&mut self) -> Result<Vec<Amf0Value<'static>>, Amf0Error>
    where
        R: ZeroCopyReader<'de>,
    {
        let mut values = Vec::new();

        while self.has_remaining::<'de>()? {
            values.push(self.decode_value::<'de>()?);
        }

        Ok(values)
    }

    /// Returns an iterator that lazily deserializes a series of individual top-level values.
    pub fn deserialize_stream<T>(&mut self) -> crate::de::Amf0DeserializerStream<'_, R, T> {
        crate::de::Amf0DeserializerStream::new(self)
    }

    /// Peek the next marker in the buffer without consuming it.
    pub fn peek_marker<'de>(&mut self) -> Result<Amf0Marker, Amf0Error>
    where
        R: ZeroCopyReader<'de>,
    {
        let marker = self.read_marker::<'de>()?;
        // Buffer the marker for the next read
        self.next_marker = Some(marker);

        Ok(marker)
    }

    fn read_marker<'de>(&mut self) -> Result<Amf0Marker, Amf0Error>
    where
        R: ZeroCopyReader<'de>,
    {
        if let Some(marker) = self.next_marker.take() {
            return Ok(marker);
        }

        let marker = self.read_array::<'de, 1>()?[0];
        Amf0Marker::from_u8(marker).ok_or(Amf0Error::UnknownMarker(marker))
    }

    fn expect_marker<'de>(&mut self, expect: &'static [Amf0Marker]) -> Result<Amf0Marker, Amf0Error>
    where
        R: ZeroCopyReader<'de>,
    {
        let marker = self.read_marker::<'de>()?;

        if !expect.contains(&marker) {
            Err(Amf0Error::UnexpectedType {
                expected: expect,
                got: marker,
            })
        } else {
            Ok(marker)
        }
    }

    /// Decode a number from the buffer.
    pub fn decode_number<'de>(&mut self) -> Result<f64, Amf0Error>
    where
        R: ZeroCopyReader<'de>,
    {
        let marker = self.expect_marker::<'de>(&[Amf0Marker::Number, Amf0Marker::Date])?;

        let number = f64::from_be_bytes(self.read_array::<'de, 8>()?);

        if marker == Amf0Marker::Date {
            // Skip the timezone
            self.read_array::<'de, 2>()?;
        }

        Ok(number)
    }

    /// Decode a boolean from the buffer.
    pub fn decode_boolean<'de>(&mut self) -> Result<bool, Amf0Error>
    where
        R: ZeroCopyReader<'de>,
    {
        self.expect_marker::<'de>(&[Amf0Marker::Boolean])?;
        let value = self.read_array::<'de, 1>()?[0];
        Ok(value != 0)
    }

    pub(crate) fn decode_normal_string<'de>(&mut self) -> Result<StringCow<'static>, Amf0Error>
    where
        R: ZeroCopyReader<'de>,
    {
        let len = u16::from_be_bytes(self.read_array::<'de, 2>()?) as usize;

        let bytes = self.read_bytes::<'de>(len)?.into_bytes();
        Ok(StringCow::from_bytes(bytes.try_into()?))
    }

    /// Decode a string from the buffer.
    ///
    /// This function can decode both normal strings and long strings.
    pub fn decode_string<'de>(&mut self) -> Result<StringCow<'static>, Amf0Error>
    where
        R: ZeroCopyReader<'de>,
    {
        let marker = self.expect_marker::<'de>(&[Amf0Marker::String, Amf0Marker::LongString, Amf0Marker::XmlDocument])?;

        let len = if marker == Amf0Marker::String {
            u16::from_be_bytes(self.read_array::<'de, 2>()?) as usize
        } else {
            // LongString or XmlDocument
            u32::from_be_bytes(self.read_array::<'de, 4>()?) as usize
        };

        let bytes = self.read_bytes::<'de>(len)?.into_bytes();
        Ok(StringCow::from_bytes(bytes.try_into()?))
    }

    /// Decode a null value from the buffer.
    ///
    /// This function can also decode undefined values.
    pub fn decode_null<'de>(&mut self) -> Result<(), Amf0Error>
    where
        R: ZeroCopyReader<'de>,
    {
        self.expect_marker::<'de>(&[Amf0Marker::Null, Amf0Marker::Undefined])?;
        Ok(())
    }

    /// Deserialize a value from the buffer using [serde].
    #[cfg(feature = "serde")]
    #[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
    pub fn deserialize<'de, T>(&mut self) -> Result<T, Amf0Error>
    where
        T: serde::de::Deserialize<'de>,
        R: ZeroCopyReader<'de>,
    {
        T::deserialize(self)
    }

    // --- Object and Ecma array ---

    pub(crate) fn decode_object_header<'de>(&mut self) -> Result<ObjectHeader<'static>, Amf0Error>
    where
        R: ZeroCopyReader<'de>,
    {
        let marker = self.expect_marker::<'de>(&[Amf0Marker::Object, Amf0Marker::TypedObject, Amf0Marker::EcmaArray])?;

        if marker == Amf0Marker::Object {
            Ok(ObjectHeader::Object)
        } else if marker == Amf0Marker::TypedObject {
            let name = self.decode_normal_string::<'de>()?;
            Ok(ObjectHeader::TypedObject { name })
        } else {
            // EcmaArray
            let size = u32::from_be_bytes(self.read_array::<'de, 4>()?);
            Ok(ObjectHeader::EcmaArray { size })
        }
    }

    pub(crate) fn decode_object_key<'de>(&mut self) -> Result<Option<StringCow<'static>>, Amf0Error>
    where
        R: ZeroCopyReader<'de>,
    {
        // Object keys are not preceeded with a marker and are always normal strings
        let key = self.decode_normal_string::<'de>()?;

        // The object end marker is preceeded by an empty string
        if key.as_str().is_empty() {
            // Check if the next marker is an object end marker
            if self.peek_marker::<'de>()? == Amf0Marker::ObjectEnd {
                // Clear the next marker buffer
                self.next_marker = None;

                return Ok(None);
            }
        }

        Ok(Some(key))
    }

    /// Decode an object from the buffer.
    ///
    /// This function can decode normal objects, typed objects and ECMA arrays.
    pub fn decode_object<'de>(&mut self) -> Result<Amf0Object<'static>, Amf0Error>
    where
        R: ZeroCopyReader<'de>,
    {
        let header = self.decode_object_header::<'de>()?;

        match header {
            ObjectHeader::Object | ObjectHeader::TypedObject { .. } => {
                let mut object = Vec::new();

                while let Some(key) = self.decode_object_key::<'de>()? {
                    let value = self.decode_value::<'de>()?;
                    object.push((key, value));
                }

                Ok(object.into())
            }
            ObjectHeader::EcmaArray { size } => {
                let mut object = Vec::with_capacity(size as usize);

                for _ in 0..size {
                    // Object keys are not preceeded with a marker and are always normal strings
                    let key = self.decode_normal_string::<'de>()?;
                    let value = self.decode_value::<'de>()?;
                    object.push((key, value));
                }

                // There might be an object end marker after the last key
                if self.has_remaining::<'de>()? && self.peek_marker::<'de>()? == Amf0Marker::ObjectEnd {
                    // Clear the next marker buffer
                    self.next_marker = None;
                }

                Ok(object.into())
            }
        }
    }

    // --- Strict array ---

    pub(crate) fn decode_strict_array_header<'de>(&mut self) -> Result<u32, Amf0Error>
    where
        R: ZeroCopyReader<'de>,
    {
        self.expect_marker::<'de>(&[Amf0Marker::StrictArray])?;
        let size = u32::from_be_bytes(self.read_array::<'de, 4>()?);

        Ok(size)
    }

    /// Decode a strict array from the buffer.
    pub fn decode_strict_array<'de>(&mut self) -> Result<Amf0Array<'static>, Amf0Error>
    where
        R: ZeroCopyReader<'de>,
    {
        let size = self.decode_strict_array_header::<'de>()? as usize;

        let mut array = Vec::with_capacity(size);

        for _ in 0..size {
            let value = self.decode_value::<'de>()?;
            array.push(value);
        }

        Ok(array.into())
    }
}
