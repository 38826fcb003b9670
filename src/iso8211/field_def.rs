use super::subfield::SubfieldDef;
use super::{decode_text, fetch_var, scan_int, Result, SchemaSnafu};
use super::{FIELD_TERMINATOR, UNIT_TERMINATOR};
use log::warn;
use snafu::prelude::*;
use std::collections::VecDeque;

/// How a field's bytes are structured, from byte 0 of its DDR entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataStructureCode {
    Elementary,
    Vector,
    Array,
    Concatenated,
}

/// What a field's bytes encode, from byte 1 of its DDR entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataTypeCode {
    CharString,
    ImplicitPoint,
    ExplicitPoint,
    ExplicitPointScaled,
    CharBitString,
    BitString,
    MixedDataType,
}

/// Truncated escape sequence level, selecting the lexical level of the
/// field's strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TruncatedEscape {
    Level0,
    Level1,
    Level2,
}

/// Definition of one field from the DDR.
///
/// A definition existing in the schema does not mean the field occurs on any
/// record; it mostly matters as the container of the [`SubfieldDef`] sequence
/// that decodes a field's bytes.
#[derive(Clone, Debug)]
pub struct FieldDef {
    tag: String,
    name: String,
    structure: DataStructureCode,
    data_type: DataTypeCode,
    escape: TruncatedEscape,
    subfields: Vec<SubfieldDef>,
    repeating: bool,
    fixed_width: usize,
}

impl FieldDef {
    /// Build one field definition from its field area slice in the DDR.
    ///
    /// The first `field_control_length` bytes carry the structure, type and
    /// escape codes; after them follow the field name, the descriptor array
    /// and the format controls, each UT delimited.
    pub(crate) fn build(tag: &str, field_control_length: usize, area: &[u8]) -> Result<Self> {
        ensure!(
            field_control_length >= 7 && area.len() >= field_control_length,
            SchemaSnafu {
                description: format!("Field area for '{tag}' is shorter than its field controls"),
            }
        );
        let structure = match area[0] {
            b' ' | b'0' => DataStructureCode::Elementary,
            b'1' => DataStructureCode::Vector,
            b'2' => DataStructureCode::Array,
            b'3' => DataStructureCode::Concatenated,
            other => {
                warn!(
                    "Unrecognised data structure code '{}' on field {tag}",
                    char::from(other)
                );
                DataStructureCode::Elementary
            }
        };
        let data_type = match area[1] {
            b' ' | b'0' => DataTypeCode::CharString,
            b'1' => DataTypeCode::ImplicitPoint,
            b'2' => DataTypeCode::ExplicitPoint,
            b'3' => DataTypeCode::ExplicitPointScaled,
            b'4' => DataTypeCode::CharBitString,
            b'5' => DataTypeCode::BitString,
            b'6' => DataTypeCode::MixedDataType,
            other => {
                warn!(
                    "Unrecognised data type code '{}' on field {tag}",
                    char::from(other)
                );
                DataTypeCode::CharString
            }
        };
        let escape = match area[6] {
            b'-' => TruncatedEscape::Level1,
            b'%' => TruncatedEscape::Level2,
            _ => TruncatedEscape::Level0,
        };

        let rest = &area[field_control_length..];
        let (name, used) = fetch_var(rest, UNIT_TERMINATOR, FIELD_TERMINATOR);
        let rest = &rest[used..];
        let (descriptor, used) = fetch_var(rest, UNIT_TERMINATOR, FIELD_TERMINATOR);
        let rest = &rest[used..];
        let (formats, _) = fetch_var(rest, UNIT_TERMINATOR, FIELD_TERMINATOR);

        let mut def = FieldDef {
            tag: tag.to_ascii_uppercase(),
            name: decode_text(name),
            structure,
            data_type,
            escape,
            subfields: Vec::new(),
            repeating: false,
            fixed_width: 0,
        };
        if def.structure != DataStructureCode::Elementary {
            def.build_subfields(descriptor, formats)?;
        }
        Ok(def)
    }

    fn build_subfields(&mut self, descriptor: &[u8], formats: &[u8]) -> Result<()> {
        ensure!(
            formats.len() >= 2 && formats[0] == b'(' && formats[formats.len() - 1] == b')',
            SchemaSnafu {
                description: format!(
                    "Format controls for '{}' field missing brackets: {}",
                    self.tag,
                    String::from_utf8_lossy(formats)
                ),
            }
        );
        let mut descriptor = descriptor;
        if descriptor.first() == Some(&b'*') {
            self.repeating = true;
            descriptor = &descriptor[1..];
        }
        // The first `*` delimited group names this level's subfields; any
        // further groups feed nested trees, consumed left to right.
        let mut groups = descriptor.split(|b| *b == b'*');
        let mnemonics: Vec<&[u8]> = groups
            .next()
            .unwrap_or_default()
            .split(|b| *b == b'!')
            .collect();
        let mut nested: VecDeque<&[u8]> = groups.collect();
        self.subfields = build_subfield_list(
            &self.tag,
            &mnemonics,
            &formats[1..formats.len() - 1],
            &mut nested,
        )?;
        ensure!(
            !self.subfields.is_empty(),
            SchemaSnafu {
                description: format!("Field '{}' declares no decodable subfields", self.tag),
            }
        );
        self.fixed_width = 0;
        for sub in &self.subfields {
            if sub.width() == 0 {
                self.fixed_width = 0;
                break;
            }
            self.fixed_width += sub.width();
        }
        Ok(())
    }

    /// Field tag, upper case.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Longer description of the field.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn structure(&self) -> DataStructureCode {
        self.structure
    }

    pub fn data_type(&self) -> DataTypeCode {
        self.data_type
    }

    pub fn escape(&self) -> TruncatedEscape {
        self.escape
    }

    pub fn subfields(&self) -> &[SubfieldDef] {
        &self.subfields
    }

    pub fn subfield_count(&self) -> usize {
        self.subfields.len()
    }

    /// True when the subfield group occurs repeatedly within one field, set
    /// by a leading `*` on the descriptor array.
    pub fn is_repeating(&self) -> bool {
        self.repeating
    }

    /// Sum of the subfield widths, or zero if any subfield is variable.
    pub fn fixed_width(&self) -> usize {
        self.fixed_width
    }

    /// Find a subfield definition and its position by mnemonic tag.
    pub fn find_subfield(&self, mnemonic: &str) -> Option<(usize, &SubfieldDef)> {
        self.subfields
            .iter()
            .enumerate()
            .find(|(_, sub)| sub.label() == mnemonic)
    }
}

/// Split a format control list (without its outer brackets) into its top
/// level atoms; commas inside nested brackets do not separate.
fn split_atoms(controls: &[u8]) -> Vec<&[u8]> {
    let mut atoms = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (idx, b) in controls.iter().copied().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                atoms.push(&controls[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    atoms.push(&controls[start..]);
    atoms
}

/// Expand numeric repeat prefixes: `3A(5)` repeats `A(5)` across the next
/// three mnemonics.
fn expand_atoms(atoms: Vec<&[u8]>) -> Vec<&[u8]> {
    let mut expanded = Vec::new();
    for atom in atoms {
        let digits = atom.iter().take_while(|b| b.is_ascii_digit()).count();
        if digits > 0 {
            let repeat = scan_int(&atom[..digits], 0).max(1) as usize;
            for _ in 0..repeat {
                expanded.push(&atom[digits..]);
            }
        } else {
            expanded.push(atom);
        }
    }
    expanded
}

fn build_subfield_list(
    tag: &str,
    mnemonics: &[&[u8]],
    controls: &[u8],
    nested: &mut VecDeque<&[u8]>,
) -> Result<Vec<SubfieldDef>> {
    let atoms = expand_atoms(split_atoms(controls));
    let mut atom_iter = atoms.into_iter();
    let mut subfields = Vec::with_capacity(mnemonics.len());
    for raw_name in mnemonics {
        if raw_name.is_empty() {
            continue;
        }
        let label = decode_text(raw_name);
        let Some(atom) = atom_iter.next() else {
            warn!("No format control left for subfield '{label}' of field {tag}");
            continue;
        };
        if atom.first() == Some(&b'(') {
            // A bracketed atom describes a nested subfield tree whose
            // mnemonics come from the next descriptor group.
            if atom.last() != Some(&b')') {
                warn!("Unbalanced nested format control for subfield '{label}' of field {tag}");
                continue;
            }
            let Some(group) = nested.pop_front() else {
                warn!("No descriptor group left for nested subfield '{label}' of field {tag}");
                continue;
            };
            let group_mnemonics: Vec<&[u8]> = group.split(|b| *b == b'!').collect();
            let children = build_subfield_list(
                tag,
                &group_mnemonics,
                &atom[1..atom.len() - 1],
                nested,
            )?;
            subfields.push(SubfieldDef::with_children(&label, children));
        } else {
            match SubfieldDef::from_format(&label, atom) {
                Ok(sub) => subfields.push(sub),
                Err(error) => warn!("Skipping subfield '{label}' of field {tag}: {error}"),
            }
        }
    }
    Ok(subfields)
}
