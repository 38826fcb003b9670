use super::field_def::FieldDef;
use super::record::{self, Record};
use super::{decode_text, scan_int, OpenSnafu, Result, SchemaSnafu};
use super::{FIELD_TERMINATOR, LEADER_SIZE};
use snafu::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Decoded 24 byte record leader, shared by the DDR and every DR.
#[derive(Clone, Debug)]
pub struct Leader {
    pub record_length: usize,
    pub interchange_level: char,
    /// `'L'` on the DDR, `'D'` or `'R'` on data records.
    pub identifier: char,
    pub inline_code_extension: char,
    pub version: char,
    pub application_indicator: char,
    pub field_control_length: usize,
    /// Start of the field area, counted from the beginning of the record.
    pub field_area_start: usize,
    pub extended_char_set: [char; 3],
    pub size_field_length: usize,
    pub size_field_position: usize,
    pub size_field_tag: usize,
}

impl Leader {
    /// Decode a leader. `data` must hold at least [`LEADER_SIZE`] bytes;
    /// validity of the decoded values is the caller's concern.
    pub(crate) fn from_bytes(data: &[u8]) -> Self {
        debug_assert!(data.len() >= LEADER_SIZE);
        Leader {
            record_length: scan_int(&data[0..5], 5).max(0) as usize,
            interchange_level: char::from(data[5]),
            identifier: char::from(data[6]),
            inline_code_extension: char::from(data[7]),
            version: char::from(data[8]),
            application_indicator: char::from(data[9]),
            field_control_length: scan_int(&data[10..12], 2).max(0) as usize,
            field_area_start: scan_int(&data[12..17], 5).max(0) as usize,
            extended_char_set: [
                char::from(data[17]),
                char::from(data[18]),
                char::from(data[19]),
            ],
            size_field_length: scan_int(&data[20..21], 1).max(0) as usize,
            size_field_position: scan_int(&data[21..22], 1).max(0) as usize,
            size_field_tag: scan_int(&data[23..24], 1).max(0) as usize,
        }
    }

    /// Width of one directory entry: tag, field length and field position.
    pub fn entry_width(&self) -> usize {
        self.size_field_length + self.size_field_position + self.size_field_tag
    }
}

/// The primary type for reading ISO 8211 (DDF) files.
///
/// Opening a module digests the data descriptive record, after which the
/// schema is available through [`Module::find_field_def`] and the data
/// records stream through [`Module::read_record`]. The module exclusively
/// owns the file buffer and the field definition table; records borrow the
/// definitions and therefore cannot outlive it.
#[derive(Debug)]
pub struct Module {
    file_name: PathBuf,
    buffer: Vec<u8>,
    position: usize,
    leader: Leader,
    field_defs: Vec<FieldDef>,
    first_record_offset: usize,
}

impl Module {
    /// Open an ISO 8211 file and digest its DDR into a field schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file_name = path.as_ref().to_path_buf();
        let buffer = fs::read(&file_name)?;
        ensure!(
            buffer.len() >= LEADER_SIZE,
            OpenSnafu {
                description: format!("Leader is short on DDF file '{}'", file_name.display()),
            }
        );
        let leader = Leader::from_bytes(&buffer[..LEADER_SIZE]);
        ensure!(
            leader.record_length >= LEADER_SIZE
                && leader.field_control_length > 0
                && leader.field_area_start >= LEADER_SIZE
                && leader.size_field_length > 0
                && leader.size_field_position > 0
                && leader.size_field_tag > 0,
            OpenSnafu {
                description: format!(
                    "File '{}' does not appear to have a valid ISO 8211 header",
                    file_name.display()
                ),
            }
        );
        ensure!(
            buffer.len() >= leader.record_length,
            OpenSnafu {
                description: format!(
                    "Header record is short on DDF file '{}'",
                    file_name.display()
                ),
            }
        );

        let body = &buffer[LEADER_SIZE..leader.record_length];
        let entry_width = leader.entry_width();
        let mut field_defs = Vec::new();
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
            // Field positions are relative to the field area; the directory
            // slice must stay inside the DDR body.
            let field_offset =
                (leader.field_area_start + field_position).saturating_sub(LEADER_SIZE);
            ensure!(
                field_offset + field_length <= body.len(),
                SchemaSnafu {
                    description: format!(
                        "Field area entry for '{tag}' lies outside the data descriptive record"
                    ),
                }
            );
            let def = FieldDef::build(
                &tag,
                leader.field_control_length,
                &body[field_offset..field_offset + field_length],
            )?;
            field_defs.push(def);
            idx += entry_width;
        }

        let first_record_offset = leader.record_length;
        Ok(Module {
            file_name,
            buffer,
            position: first_record_offset,
            leader,
            field_defs,
            first_record_offset,
        })
    }

    /// Read the next data record, or `None` at end of file.
    ///
    /// The returned record borrows this module's schema and stays valid until
    /// the next `read_record` call. A record that fails to decode is skipped
    /// whole, so the caller may keep reading after an error.
    pub fn read_record(&mut self) -> Result<Option<Record<'_>>> {
        let Module {
            buffer,
            position,
            field_defs,
            ..
        } = self;
        record::read_from(buffer, position, field_defs)
    }

    /// Return to the first data record.
    pub fn rewind(&mut self) {
        self.position = self.first_record_offset;
    }

    /// Fetch the definition of the named field. Tags are upper case; the
    /// comparison is exact.
    pub fn find_field_def(&self, tag: &str) -> Option<&FieldDef> {
        self.field_defs.iter().find(|def| def.tag() == tag)
    }

    /// All field definitions, in DDR directory order.
    pub fn field_defs(&self) -> &[FieldDef] {
        &self.field_defs
    }

    pub fn leader(&self) -> &Leader {
        &self.leader
    }

    pub fn file_name(&self) -> &Path {
        &self.file_name
    }
}
