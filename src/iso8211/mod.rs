//! Generic reader for ISO/IEC 8211 data descriptive files.
//!
//! A DDF file opens with a data descriptive record (DDR) that describes its
//! own payload: field definitions carrying format controls such as
//! `(2A,I(5),R(10),b14)`. [`Module::open`] digests the DDR into a schema of
//! [`FieldDef`]/[`SubfieldDef`] trees, after which [`Module::read_record`]
//! decodes the data records (DR) one by one against that schema.

use snafu::{prelude::*, Backtrace};

mod field_def;
mod module;
mod record;
mod subfield;

pub use field_def::{DataStructureCode, DataTypeCode, FieldDef, TruncatedEscape};
pub use module::{Leader, Module};
pub use record::{Field, Record};
pub use subfield::{BinaryFormat, SubfieldDef, SubfieldKind};

/// Terminates a field's data and the record directory.
pub const FIELD_TERMINATOR: u8 = 0x1E;
/// Separates variable width subfields within a field.
pub const UNIT_TERMINATOR: u8 = 0x1F;
/// Number of bytes in a record leader, DDR and DR alike.
pub const LEADER_SIZE: usize = 24;

pub type Result<T> = std::result::Result<T, EncError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EncError {
    #[snafu(display("Could not open DDF file: {description}"))]
    Open {
        description: String,
        backtrace: Backtrace,
    },
    #[snafu(display("Malformed data descriptive record: {description}"))]
    Schema {
        description: String,
        backtrace: Backtrace,
    },
    #[snafu(display("Malformed data record: {description}"))]
    Record {
        description: String,
        backtrace: Backtrace,
    },
    #[snafu(display("Could not decode subfield: {description}"))]
    Decode {
        description: String,
        backtrace: Backtrace,
    },
    #[snafu(display("S-57 format violation: {description}"))]
    Domain {
        description: String,
        backtrace: Backtrace,
    },
    #[snafu(display("Error reading bytes: {source}"))]
    Io {
        source: std::io::Error,
        backtrace: Backtrace,
    },
}

impl From<std::io::Error> for EncError {
    fn from(source: std::io::Error) -> Self {
        EncError::Io {
            source,
            backtrace: Backtrace::capture(),
        }
    }
}

/// Read at most `byte_read` bytes from `src` and interpret them as a base-10
/// integer. `byte_read` of zero (or anything above 32) coerces to 32.
///
/// The scan is lenient: leading ASCII whitespace and an optional sign are
/// accepted, and the first non-digit ends the number. Input without any
/// digits yields zero; callers validate the result against their own
/// invariants where that matters.
pub(crate) fn scan_int(src: &[u8], byte_read: usize) -> i64 {
    let limit = if byte_read == 0 || byte_read > 32 {
        32
    } else {
        byte_read
    };
    let window = &src[..src.len().min(limit)];
    let mut bytes = window
        .iter()
        .copied()
        .skip_while(u8::is_ascii_whitespace)
        .peekable();
    let negative = match bytes.peek() {
        Some(b'-') => {
            bytes.next();
            true
        }
        Some(b'+') => {
            bytes.next();
            false
        }
        _ => false,
    };
    let mut value = 0i64;
    for b in bytes {
        if !b.is_ascii_digit() {
            break;
        }
        value = value * 10 + i64::from(b - b'0');
    }
    if negative {
        -value
    } else {
        value
    }
}

/// Interpret `text` as a base-10 real number, stopping at the first byte that
/// cannot belong to one. Input without a parseable prefix yields zero.
pub(crate) fn scan_float(text: &str) -> f64 {
    let trimmed = text.trim_start();
    let mut end = 0usize;
    for (idx, c) in trimmed.char_indices() {
        if c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E') {
            end = idx + c.len_utf8();
        } else {
            break;
        }
    }
    trimmed[..end].parse().unwrap_or(0.0)
}

/// Fetch a variable length token from the head of `src`.
///
/// Returns the bytes up to (excluding) the first occurrence of either
/// delimiter, together with the number of bytes consumed: one more than the
/// token length when a delimiter was found, the token length otherwise.
pub(crate) fn fetch_var(src: &[u8], delim_one: u8, delim_two: u8) -> (&[u8], usize) {
    let end = src
        .iter()
        .position(|b| *b == delim_one || *b == delim_two)
        .unwrap_or(src.len());
    let consumed = if end < src.len() { end + 1 } else { end };
    (&src[..end], consumed)
}

/// Decode raw field bytes as text.
///
/// ENC cells mark their strings as ASCII or Latin 1; WINDOWS_1252 covers both
/// and never fails, so decode errors cannot poison a surrounding record.
pub(crate) fn decode_text(bytes: &[u8]) -> String {
    let (cow, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    cow.into_owned()
}
