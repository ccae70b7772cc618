//! Caps: the self-describing binary field format used for every datagram.
//!
//! Wire format:
//! ```text
//! [magic:2 = "AN"][version:1][field_count:2][field]*
//! field := [tag:1][value]
//!   0x01  u32     4 bytes
//!   0x02  u64     8 bytes
//!   0x03  string  [len:4][UTF-8 bytes]
//! ```
//! Total header size: 5 bytes. All multi-byte integers are big-endian.
//!
//! # Why self-describing? (for beginners)
//!
//! A datagram arriving on the discovery port can come from anything on the
//! LAN: an old firmware, a port scanner, a buggy peer.  Because every field
//! carries a type tag, the decoder can tell "this is not a string" apart from
//! "this is a string that happens to look odd", and reject the datagram with
//! a precise [`CapsError`] instead of misreading it.
//!
//! Fields are read back in the order they were written, using a
//! [`CapsReader`] cursor:
//!
//! ```rust
//! use autonet_core::protocol::caps::Caps;
//!
//! let mut caps = Caps::new();
//! caps.write_string("dev1").write_u32(0);
//! let bytes = caps.serialize().unwrap();
//!
//! let parsed = Caps::parse(&bytes).unwrap();
//! let mut reader = parsed.reader();
//! assert_eq!(reader.read_string().unwrap(), "dev1");
//! assert_eq!(reader.read_u32().unwrap(), 0);
//! ```

use std::fmt;

use thiserror::Error;

/// Two-byte marker at the start of every caps payload.
pub const CAPS_MAGIC: [u8; 2] = *b"AN";

/// Current caps format version.
pub const CAPS_VERSION: u8 = 1;

/// Size of the fixed caps header (magic + version + field count).
pub const CAPS_HEADER_SIZE: usize = 5;

/// Errors that can occur while serializing, parsing, or reading caps fields.
#[derive(Debug, Error, PartialEq)]
pub enum CapsError {
    /// The byte slice ended before the structure it announces.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The payload does not start with [`CAPS_MAGIC`].
    #[error("not a caps payload: magic {0:02X?}")]
    BadMagic([u8; 2]),

    /// The version byte is not supported by this decoder.
    #[error("unsupported caps version: {0}")]
    UnsupportedVersion(u8),

    /// A field tag byte is not a recognized [`FieldKind`].
    #[error("unknown field tag 0x{tag:02X} at field {index}")]
    UnknownTag { index: usize, tag: u8 },

    /// A string field does not contain valid UTF-8.
    #[error("field {index} is not valid UTF-8")]
    InvalidUtf8 { index: usize },

    /// Bytes remain after the last declared field.
    #[error("{0} trailing bytes after last field")]
    TrailingBytes(usize),

    /// A field was read with the wrong type.
    #[error("field {index}: expected {expected}, found {found}")]
    TypeMismatch {
        index: usize,
        expected: FieldKind,
        found: FieldKind,
    },

    /// A field was read past the end of the payload.
    #[error("missing field {index}: expected {expected}")]
    MissingField { index: usize, expected: FieldKind },

    /// A payload or field is too large to be represented on the wire.
    #[error("{0} too large to encode")]
    TooLarge(&'static str),
}

/// The type tag carried by each field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FieldKind {
    U32 = 0x01,
    U64 = 0x02,
    String = 0x03,
}

impl TryFrom<u8> for FieldKind {
    type Error = u8;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0x01 => Ok(FieldKind::U32),
            0x02 => Ok(FieldKind::U64),
            0x03 => Ok(FieldKind::String),
            other => Err(other),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::U32 => "u32",
            FieldKind::U64 => "u64",
            FieldKind::String => "string",
        };
        f.write_str(name)
    }
}

/// A single typed field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    U32(u32),
    U64(u64),
    String(String),
}

impl Value {
    /// Returns the wire tag for this value.
    pub fn kind(&self) -> FieldKind {
        match self {
            Value::U32(_) => FieldKind::U32,
            Value::U64(_) => FieldKind::U64,
            Value::String(_) => FieldKind::String,
        }
    }
}

/// An ordered list of typed fields.
///
/// Build one with the `write_*` methods and [`Caps::serialize`] it, or obtain
/// one from [`Caps::parse`] and walk it with [`Caps::reader`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caps {
    fields: Vec<Value>,
}

impl Caps {
    /// Creates an empty field list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a `u32` field.
    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        self.fields.push(Value::U32(value));
        self
    }

    /// Appends a `u64` field.
    pub fn write_u64(&mut self, value: u64) -> &mut Self {
        self.fields.push(Value::U64(value));
        self
    }

    /// Appends a string field.
    pub fn write_string(&mut self, value: impl Into<String>) -> &mut Self {
        self.fields.push(Value::String(value.into()));
        self
    }

    /// Returns the fields in write order.
    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` when no field has been written.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns a cursor that reads fields in order.
    pub fn reader(&self) -> CapsReader<'_> {
        CapsReader {
            fields: &self.fields,
            pos: 0,
        }
    }

    /// Serializes the fields into a caps payload.
    ///
    /// # Errors
    ///
    /// Returns [`CapsError::TooLarge`] if there are more than `u16::MAX`
    /// fields or a string is longer than `u32::MAX` bytes.
    pub fn serialize(&self) -> Result<Vec<u8>, CapsError> {
        let count =
            u16::try_from(self.fields.len()).map_err(|_| CapsError::TooLarge("field count"))?;

        let mut buf = Vec::with_capacity(CAPS_HEADER_SIZE + self.encoded_fields_len());
        buf.extend_from_slice(&CAPS_MAGIC);
        buf.push(CAPS_VERSION);
        buf.extend_from_slice(&count.to_be_bytes());

        for field in &self.fields {
            buf.push(field.kind() as u8);
            match field {
                Value::U32(v) => buf.extend_from_slice(&v.to_be_bytes()),
                Value::U64(v) => buf.extend_from_slice(&v.to_be_bytes()),
                Value::String(s) => {
                    let len =
                        u32::try_from(s.len()).map_err(|_| CapsError::TooLarge("string field"))?;
                    buf.extend_from_slice(&len.to_be_bytes());
                    buf.extend_from_slice(s.as_bytes());
                }
            }
        }
        Ok(buf)
    }

    /// Parses a complete caps payload.
    ///
    /// # Errors
    ///
    /// Returns [`CapsError`] if the bytes are truncated, carry the wrong magic
    /// or version, contain an unknown tag or invalid UTF-8, or have bytes left
    /// over after the declared field count.
    pub fn parse(bytes: &[u8]) -> Result<Caps, CapsError> {
        require(bytes, CAPS_HEADER_SIZE)?;

        let magic = [bytes[0], bytes[1]];
        if magic != CAPS_MAGIC {
            return Err(CapsError::BadMagic(magic));
        }
        if bytes[2] != CAPS_VERSION {
            return Err(CapsError::UnsupportedVersion(bytes[2]));
        }
        let count = u16::from_be_bytes([bytes[3], bytes[4]]) as usize;

        // Every field needs at least its tag byte, so a lying count cannot
        // make us reserve more than the datagram could hold.
        let mut fields = Vec::with_capacity(count.min(bytes.len() - CAPS_HEADER_SIZE));
        let mut offset = CAPS_HEADER_SIZE;

        for index in 0..count {
            require(bytes, offset + 1)?;
            let tag = bytes[offset];
            let kind = FieldKind::try_from(tag).map_err(|tag| CapsError::UnknownTag { index, tag })?;
            offset += 1;

            let value = match kind {
                FieldKind::U32 => {
                    let raw = read_array::<4>(bytes, offset)?;
                    offset += 4;
                    Value::U32(u32::from_be_bytes(raw))
                }
                FieldKind::U64 => {
                    let raw = read_array::<8>(bytes, offset)?;
                    offset += 8;
                    Value::U64(u64::from_be_bytes(raw))
                }
                FieldKind::String => {
                    let len = u32::from_be_bytes(read_array::<4>(bytes, offset)?) as usize;
                    offset += 4;
                    let end = offset
                        .checked_add(len)
                        .ok_or(CapsError::TooLarge("string field"))?;
                    require(bytes, end)?;
                    let text = std::str::from_utf8(&bytes[offset..end])
                        .map_err(|_| CapsError::InvalidUtf8 { index })?;
                    offset = end;
                    Value::String(text.to_owned())
                }
            };
            fields.push(value);
        }

        if offset != bytes.len() {
            return Err(CapsError::TrailingBytes(bytes.len() - offset));
        }
        Ok(Caps { fields })
    }

    fn encoded_fields_len(&self) -> usize {
        self.fields
            .iter()
            .map(|f| match f {
                Value::U32(_) => 5,
                Value::U64(_) => 9,
                Value::String(s) => 5 + s.len(),
            })
            .sum()
    }
}

/// Sequential reader over the fields of a [`Caps`].
#[derive(Debug)]
pub struct CapsReader<'a> {
    fields: &'a [Value],
    pos: usize,
}

impl<'a> CapsReader<'a> {
    /// Reads the next field as a `u32`.
    ///
    /// # Errors
    ///
    /// [`CapsError::MissingField`] when no field is left,
    /// [`CapsError::TypeMismatch`] when the next field is not a `u32`.
    pub fn read_u32(&mut self) -> Result<u32, CapsError> {
        match self.next(FieldKind::U32)? {
            Value::U32(v) => Ok(*v),
            other => Err(self.mismatch(FieldKind::U32, other)),
        }
    }

    /// Reads the next field as a `u64`.
    ///
    /// # Errors
    ///
    /// See [`CapsReader::read_u32`].
    pub fn read_u64(&mut self) -> Result<u64, CapsError> {
        match self.next(FieldKind::U64)? {
            Value::U64(v) => Ok(*v),
            other => Err(self.mismatch(FieldKind::U64, other)),
        }
    }

    /// Reads the next field as a string.
    ///
    /// # Errors
    ///
    /// See [`CapsReader::read_u32`].
    pub fn read_string(&mut self) -> Result<&'a str, CapsError> {
        match self.next(FieldKind::String)? {
            Value::String(s) => Ok(s.as_str()),
            other => Err(self.mismatch(FieldKind::String, other)),
        }
    }

    /// Number of fields not yet read.
    pub fn remaining(&self) -> usize {
        self.fields.len() - self.pos
    }

    fn next(&mut self, expected: FieldKind) -> Result<&'a Value, CapsError> {
        let value = self.fields.get(self.pos).ok_or(CapsError::MissingField {
            index: self.pos,
            expected,
        })?;
        self.pos += 1;
        Ok(value)
    }

    // Called after `next` advanced, so the offending field is at `pos - 1`.
    fn mismatch(&self, expected: FieldKind, found: &Value) -> CapsError {
        CapsError::TypeMismatch {
            index: self.pos - 1,
            expected,
            found: found.kind(),
        }
    }
}

// ── Utility helpers ───────────────────────────────────────────────────────────

fn require(buf: &[u8], needed: usize) -> Result<(), CapsError> {
    if buf.len() < needed {
        Err(CapsError::InsufficientData {
            needed,
            available: buf.len(),
        })
    } else {
        Ok(())
    }
}

fn read_array<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N], CapsError> {
    require(buf, offset + N)?;
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[offset..offset + N]);
    Ok(out)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
