use super::field_def::FieldDef;
use super::module::Leader;
use super::subfield::SubfieldDef;
use super::{decode_text, scan_int, RecordSnafu, Result};
use super::{FIELD_TERMINATOR, LEADER_SIZE};
use log::debug;
use snafu::prelude::*;

/// One data record (DR): the owned body bytes plus the field views the
/// record's directory carves out of them.
///
/// Field views are kept as offsets into the owned buffer, so a [`Clone`]
/// yields a deep copy whose views land at the same relative positions.
#[derive(Clone, Debug)]
pub struct Record<'a> {
    data: Vec<u8>,
    entries: Vec<FieldEntry<'a>>,
    reuse_header: bool,
}

#[derive(Clone, Debug)]
struct FieldEntry<'a> {
    def: &'a FieldDef,
    offset: usize,
    length: usize,
}

/// Decode the next record from `buffer` at `*position`, resolving directory
/// tags against `field_defs`.
///
/// The position always advances past the record being read, so a rejected
/// record does not derail the stream; a leader too corrupt to frame the
/// record poisons the remainder of the stream instead.
pub(crate) fn read_from<'a>(
    buffer: &[u8],
    position: &mut usize,
    field_defs: &'a [FieldDef],
) -> Result<Option<Record<'a>>> {
    if *position >= buffer.len() {
        return Ok(None);
    }
    let remaining = &buffer[*position..];
    if remaining.len() < LEADER_SIZE {
        *position = buffer.len();
        return RecordSnafu {
            description: "Data record leader is short".to_string(),
        }
        .fail();
    }
    let leader = Leader::from_bytes(&remaining[..LEADER_SIZE]);
    if leader.record_length < LEADER_SIZE
        || leader.field_area_start < LEADER_SIZE
        || leader.size_field_length == 0
        || leader.size_field_position == 0
        || leader.size_field_tag == 0
    {
        // Without a trustworthy record length there is no next record to
        // resynchronise on.
        *position = buffer.len();
        return RecordSnafu {
            description: "Data record leader appears to be corrupt".to_string(),
        }
        .fail();
    }
    if remaining.len() < leader.record_length {
        *position = buffer.len();
        return RecordSnafu {
            description: "Data record is short".to_string(),
        }
        .fail();
    }
    *position += leader.record_length;

    let body = remaining[LEADER_SIZE..leader.record_length].to_vec();
    let entry_width = leader.entry_width();
    let mut entries = Vec::new();
    let mut idx = 0usize;
    while idx + entry_width <= body.len() && body[idx] != FIELD_TERMINATOR {
        let entry = &body[idx..idx + entry_width];
        let tag = decode_text(&entry[..leader.size_field_tag]).to_ascii_uppercase();
        let length_at = leader.size_field_tag;
        let position_at = length_at + leader.size_field_length;
        let field_length =
            scan_int(&entry[length_at..position_at], leader.size_field_length).max(0) as usize;
        let field_position =
            scan_int(&entry[position_at..], leader.size_field_position).max(0) as usize;
        let def = field_defs
            .iter()
            .find(|def| def.tag() == tag)
            .with_context(|| RecordSnafu {
                description: format!("Undefined field '{tag}' encountered in data record"),
            })?;
        let field_offset = (leader.field_area_start + field_position).saturating_sub(LEADER_SIZE);
        ensure!(
            field_offset + field_length <= body.len(),
            RecordSnafu {
                description: format!("Not enough bytes to initialize field '{tag}'"),
            }
        );
        entries.push(FieldEntry {
            def,
            offset: field_offset,
            length: field_length,
        });
        idx += entry_width;
    }

    Ok(Some(Record {
        data: body,
        entries,
        reuse_header: leader.identifier == 'R',
    }))
}

impl<'a> Record<'a> {
    pub fn field_count(&self) -> usize {
        self.entries.len()
    }

    /// Fetch a field view by directory position.
    pub fn field(&self, idx: usize) -> Option<Field<'_>> {
        self.entries.get(idx).map(|entry| self.view(entry))
    }

    /// Find the first field with the given definition tag.
    pub fn find_field(&self, tag: &str) -> Option<Field<'_>> {
        self.entries
            .iter()
            .find(|entry| entry.def.tag() == tag)
            .map(|entry| self.view(entry))
    }

    pub fn fields(&self) -> impl Iterator<Item = Field<'_>> {
        self.entries.iter().map(|entry| self.view(entry))
    }

    fn view(&self, entry: &FieldEntry<'a>) -> Field<'_> {
        Field {
            def: entry.def,
            data: &self.data[entry.offset..entry.offset + entry.length],
        }
    }

    /// Size of the record's raw data area in bytes.
    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    pub fn binary_data(&self) -> &[u8] {
        &self.data
    }

    /// True when the leader marked this record as carrying data only, to be
    /// interpreted against the previous record's directory.
    pub fn is_reuse_header(&self) -> bool {
        self.reuse_header
    }
}

/// A borrowed view tying one field definition to its slice of record bytes.
///
/// To extract subfield values use the typed getters, which locate the
/// occurrence within the field and run the matching [`SubfieldDef`]
/// extractor.
#[derive(Clone, Copy, Debug)]
pub struct Field<'r> {
    def: &'r FieldDef,
    data: &'r [u8],
}

impl<'r> Field<'r> {
    pub fn def(&self) -> &'r FieldDef {
        self.def
    }

    pub fn data(&self) -> &'r [u8] {
        self.data
    }

    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    /// How many times the subfield group occurs in this field. Always one
    /// for non-repeating fields; for repeating fields of fixed width the
    /// count follows from the data size.
    pub fn repeat_count(&self) -> usize {
        if !self.def.is_repeating() {
            return 1;
        }
        if self.def.fixed_width() > 0 {
            return self.data.len() / self.def.fixed_width();
        }
        1
    }

    /// Value of the named subfield as a long, or zero if it is missing.
    pub fn subfield_as_long(&self, mnemonic: &str, occurrence: usize) -> i64 {
        match self.locate(mnemonic, occurrence) {
            Some((sub, data)) => sub.extract_long(data).0,
            None => 0,
        }
    }

    /// Value of the named subfield as a double, or zero if it is missing.
    pub fn subfield_as_double(&self, mnemonic: &str, occurrence: usize) -> f64 {
        match self.locate(mnemonic, occurrence) {
            Some((sub, data)) => sub.extract_double(data).0,
            None => 0.0,
        }
    }

    /// Value of the named subfield as text, or empty if it is missing.
    pub fn subfield_as_string(&self, mnemonic: &str, occurrence: usize) -> String {
        match self.locate(mnemonic, occurrence) {
            Some((sub, data)) => sub.extract_string(data).0,
            None => String::new(),
        }
    }

    /// Raw bytes of the named subfield, or empty if it is missing.
    pub fn subfield_as_binary(&self, mnemonic: &str, occurrence: usize) -> &'r [u8] {
        match self.locate(mnemonic, occurrence) {
            Some((sub, data)) => sub.extract_binary(data).0,
            None => &[],
        }
    }

    fn locate(&self, mnemonic: &str, occurrence: usize) -> Option<(&'r SubfieldDef, &'r [u8])> {
        let Some((index, sub)) = self.def.find_subfield(mnemonic) else {
            debug!(
                "Field {} has no subfield '{mnemonic}'",
                self.def.tag()
            );
            return None;
        };
        let data = self.subfield_bytes(index, occurrence)?;
        Some((sub, data))
    }

    /// Locate the raw bytes of the subfield at `sub_index` within the given
    /// occurrence of the subfield group. Subfields are matched by position;
    /// earlier subfields are skipped by their consumed byte counts.
    fn subfield_bytes(&self, sub_index: usize, occurrence: usize) -> Option<&'r [u8]> {
        let subfields = self.def.subfields();
        if sub_index >= subfields.len() {
            return None;
        }
        let mut offset = 0usize;
        if self.def.fixed_width() > 0 {
            offset = occurrence * self.def.fixed_width();
        } else {
            for _ in 0..occurrence {
                for sub in subfields {
                    if offset >= self.data.len() {
                        return None;
                    }
                    offset += sub.data_length(&self.data[offset..]).1;
                }
            }
        }
        for sub in &subfields[..sub_index] {
            if offset >= self.data.len() {
                return None;
            }
            offset += sub.data_length(&self.data[offset..]).1;
        }
        if offset < self.data.len() {
            Some(&self.data[offset..])
        } else {
            None
        }
    }
}
