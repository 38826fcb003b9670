use super::{decode_text, scan_float, scan_int, Result, SchemaSnafu};
use super::{FIELD_TERMINATOR, UNIT_TERMINATOR};
use byteorder::{ByteOrder, LittleEndian};
use log::warn;
use snafu::prelude::*;

/// Logical kind of a decoded subfield value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubfieldKind {
    Int,
    Float,
    String,
    BinaryString,
}

/// Encoding of a packed `b` format subfield, taken from the digit following
/// the format letter (`b14` is an unsigned little-endian integer of 4 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryFormat {
    UInt,
    SInt,
    FpReal,
    FloatReal,
    FloatComplex,
}

impl BinaryFormat {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::UInt),
            2 => Some(Self::SInt),
            3 => Some(Self::FpReal),
            4 => Some(Self::FloatReal),
            5 => Some(Self::FloatComplex),
            _ => None,
        }
    }
}

/// One leaf of the DDR schema: a named, typed value within a field.
///
/// Built from a single format control atom such as `A(3)`, `I(5)`, `R`,
/// `B(40)` or `b24`. A definition may instead carry a nested group of child
/// definitions; S-57 never uses that 8211 generality, but the schema has to
/// represent it. Immutable once the schema is built.
#[derive(Clone, Debug)]
pub struct SubfieldDef {
    label: String,
    format: u8,
    width: usize,
    variable: bool,
    kind: SubfieldKind,
    binary: Option<BinaryFormat>,
    children: Vec<SubfieldDef>,
}

impl SubfieldDef {
    /// Build a leaf definition from one format control atom.
    pub(crate) fn from_format(label: &str, atom: &[u8]) -> Result<Self> {
        ensure!(
            !atom.is_empty(),
            SchemaSnafu {
                description: format!("Empty format control for subfield '{label}'"),
            }
        );
        let format = atom[0];
        let mut def = SubfieldDef {
            label: label.to_ascii_uppercase(),
            format,
            width: 0,
            variable: true,
            kind: SubfieldKind::Int,
            binary: None,
            children: Vec::new(),
        };
        // A `(n)` suffix carries the width: bytes for text formats, bits for `B`.
        if atom.len() > 1 && atom[1] == b'(' {
            def.width = scan_int(&atom[2..], 0).max(0) as usize;
            def.variable = def.width == 0;
        }
        match format {
            b'A' | b'S' | b'C' => def.kind = SubfieldKind::String,
            b'I' => def.kind = SubfieldKind::Int,
            b'R' => def.kind = SubfieldKind::Float,
            b'B' => {
                def.kind = SubfieldKind::BinaryString;
                def.variable = false;
                def.width /= 8;
            }
            b'b' => {
                ensure!(
                    atom.len() >= 3,
                    SchemaSnafu {
                        description: format!(
                            "Truncated packed binary format control for subfield '{label}'"
                        ),
                    }
                );
                def.variable = false;
                def.binary = BinaryFormat::from_code(atom[1].wrapping_sub(b'0'));
                def.width = scan_int(&atom[2..], 0).max(0) as usize;
                def.kind = match def.binary {
                    Some(BinaryFormat::UInt) | Some(BinaryFormat::SInt) => SubfieldKind::Int,
                    _ => SubfieldKind::Float,
                };
            }
            other => {
                return SchemaSnafu {
                    description: format!(
                        "Format type '{}' of subfield '{}' not recognised",
                        char::from(other),
                        def.label
                    ),
                }
                .fail()
            }
        }
        Ok(def)
    }

    /// Build an intermediate node whose value is a nested group of subfields.
    pub(crate) fn with_children(label: &str, children: Vec<SubfieldDef>) -> Self {
        SubfieldDef {
            label: label.to_ascii_uppercase(),
            format: 0,
            width: 0,
            variable: true,
            kind: SubfieldKind::BinaryString,
            binary: None,
            children,
        }
    }

    /// Mnemonic name, upper case.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Width in bytes; zero for variable width subfields.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_variable(&self) -> bool {
        self.variable
    }

    /// General type of the value, selecting which extractor applies.
    pub fn kind(&self) -> SubfieldKind {
        self.kind
    }

    pub fn binary_format(&self) -> Option<BinaryFormat> {
        self.binary
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn children(&self) -> &[SubfieldDef] {
        &self.children
    }

    /// Number of payload bytes this subfield occupies at the head of `data`,
    /// and the bytes consumed including any terminator.
    ///
    /// Fixed width subfields consume exactly their width (clamped, with a
    /// warning, when the field runs short). Variable subfields scan for the
    /// first UT or FT byte; strings of two-byte characters instead end on a
    /// UT/FT followed by 0x00, recognised by inspecting the tail of the
    /// available data, with one extra byte consumed when the byte after the
    /// terminator pair is FT.
    pub fn data_length(&self, data: &[u8]) -> (usize, usize) {
        if !self.variable {
            if self.width > data.len() {
                warn!(
                    "Only {} bytes available for subfield {}",
                    data.len(),
                    self.label
                );
                return (data.len(), data.len());
            }
            return (self.width, self.width);
        }
        let wide = data.len() > 1
            && (data[data.len() - 2] == UNIT_TERMINATOR || data[data.len() - 2] == FIELD_TERMINATOR)
            && data[data.len() - 1] == 0;
        let mut length = 0usize;
        let mut extra = 0usize;
        while length < data.len() {
            if !wide && (data[length] == UNIT_TERMINATOR || data[length] == FIELD_TERMINATOR) {
                break;
            }
            if length > 0
                && (data[length - 1] == UNIT_TERMINATOR || data[length - 1] == FIELD_TERMINATOR)
                && data[length] == 0
            {
                if length + 1 < data.len() && data[length + 1] == FIELD_TERMINATOR {
                    extra = 1;
                }
                break;
            }
            length += 1;
        }
        (length, length + extra + 1)
    }

    /// Extract the subfield value as text, reporting the bytes consumed.
    pub fn extract_string(&self, data: &[u8]) -> (String, usize) {
        let (length, consumed) = self.data_length(data);
        (decode_text(&data[..length]), consumed)
    }

    /// Extract the raw bytes of the subfield value, reporting the bytes
    /// consumed. This is the way to read `B` formatted bit strings such as
    /// the 5 byte NAME of S-57.
    pub fn extract_binary<'a>(&self, data: &'a [u8]) -> (&'a [u8], usize) {
        let (length, consumed) = self.data_length(data);
        (&data[..length], consumed)
    }

    /// Extract the subfield value as a long, reporting the bytes consumed.
    ///
    /// Text formats are parsed leniently in base 10; malformed digits yield
    /// zero. Raw `B` bit strings have no long projection and yield zero.
    /// Packed `b` values are reinterpreted little-endian according to their
    /// binary format code and width; a width with no defined interpretation,
    /// or one exceeding the available bytes, warns and yields zero.
    pub fn extract_long(&self, data: &[u8]) -> (i64, usize) {
        match self.format {
            b'A' | b'I' | b'R' | b'S' | b'C' => {
                let (text, consumed) = self.extract_string(data);
                (scan_int(text.as_bytes(), 0), consumed)
            }
            b'b' => match self.packed_bytes(data) {
                Some(raw) => (self.packed_long(raw), self.width),
                None => (0, 0),
            },
            _ => {
                let (_, consumed) = self.data_length(data);
                (0, consumed)
            }
        }
    }

    /// Extract the subfield value as a double; integer encodings are widened.
    pub fn extract_double(&self, data: &[u8]) -> (f64, usize) {
        match self.format {
            b'A' | b'I' | b'R' | b'S' | b'C' => {
                let (text, consumed) = self.extract_string(data);
                (scan_float(&text), consumed)
            }
            b'b' => match self.packed_bytes(data) {
                Some(raw) => (self.packed_double(raw), self.width),
                None => (0.0, 0),
            },
            _ => {
                let (_, consumed) = self.data_length(data);
                (0.0, consumed)
            }
        }
    }

    /// The raw little-endian bytes of a packed value, or `None` (with a
    /// warning) when the field is too short or the width exceeds 8 bytes.
    fn packed_bytes<'a>(&self, data: &'a [u8]) -> Option<&'a [u8]> {
        if self.width > data.len() || self.width > 8 {
            warn!(
                "Attempt to extract packed subfield {} failed as only {} bytes are available, using zero",
                self.label,
                data.len().min(8)
            );
            return None;
        }
        Some(&data[..self.width])
    }

    fn packed_long(&self, raw: &[u8]) -> i64 {
        let Some(binary) = self.binary else { return 0 };
        match (binary, raw.len()) {
            (BinaryFormat::UInt, 1) => i64::from(raw[0]),
            (BinaryFormat::UInt, 2) => i64::from(LittleEndian::read_u16(raw)),
            (BinaryFormat::UInt, 4) => i64::from(LittleEndian::read_u32(raw)),
            (BinaryFormat::SInt, 1) => i64::from(raw[0] as i8),
            (BinaryFormat::SInt, 2) => i64::from(LittleEndian::read_i16(raw)),
            (BinaryFormat::SInt, 4) => i64::from(LittleEndian::read_i32(raw)),
            (BinaryFormat::FloatReal, 4) => LittleEndian::read_f32(raw) as i64,
            (BinaryFormat::FloatReal, 8) => LittleEndian::read_f64(raw) as i64,
            _ => 0,
        }
    }

    fn packed_double(&self, raw: &[u8]) -> f64 {
        let Some(binary) = self.binary else { return 0.0 };
        match (binary, raw.len()) {
            (BinaryFormat::UInt, 1) => f64::from(raw[0]),
            (BinaryFormat::UInt, 2) => f64::from(LittleEndian::read_u16(raw)),
            (BinaryFormat::UInt, 4) => f64::from(LittleEndian::read_u32(raw)),
            (BinaryFormat::SInt, 1) => f64::from(raw[0] as i8),
            (BinaryFormat::SInt, 2) => f64::from(LittleEndian::read_i16(raw)),
            (BinaryFormat::SInt, 4) => f64::from(LittleEndian::read_i32(raw)),
            (BinaryFormat::FloatReal, 4) => f64::from(LittleEndian::read_f32(raw)),
            (BinaryFormat::FloatReal, 8) => LittleEndian::read_f64(raw),
            _ => 0.0,
        }
    }
}
