//! Builders for synthetic ISO 8211 cells, so the tests do not depend on
//! licensed chart material.
//!
//! The builders always emit directory fields of 4 ASCII digits for length
//! and position and 4 byte tags, which every reader must take from the
//! leader rather than assume.

#![allow(dead_code)]

pub const FT: u8 = 0x1E;
pub const UT: u8 = 0x1F;

const LEADER_SIZE: usize = 24;
const ENTRY_WIDTH: usize = 12;

/// One DDR field definition to encode.
pub struct FieldSpec {
    pub tag: &'static str,
    /// Field controls, `field_control_length` (9) bytes: structure, type,
    /// auxiliary controls, printable graphics and escape sequence.
    pub controls: &'static str,
    pub name: &'static str,
    pub descriptor: &'static str,
    pub formats: &'static str,
}

fn directory(entries: &[(&str, usize, usize)]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for (tag, length, position) in entries {
        assert_eq!(4, tag.len(), "directory tags are 4 characters");
        bytes.extend_from_slice(tag.as_bytes());
        bytes.extend_from_slice(format!("{length:04}").as_bytes());
        bytes.extend_from_slice(format!("{position:04}").as_bytes());
    }
    bytes.push(FT);
    bytes
}

fn ddr_leader(record_length: usize, field_area_start: usize) -> Vec<u8> {
    let mut leader = Vec::with_capacity(LEADER_SIZE);
    leader.extend_from_slice(format!("{record_length:05}").as_bytes());
    leader.extend_from_slice(b"3LE1 ");
    leader.extend_from_slice(b"09");
    leader.extend_from_slice(format!("{field_area_start:05}").as_bytes());
    leader.extend_from_slice(b" ! ");
    leader.extend_from_slice(b"4404");
    assert_eq!(LEADER_SIZE, leader.len());
    leader
}

fn dr_leader(record_length: usize, field_area_start: usize, identifier: u8) -> Vec<u8> {
    let mut leader = Vec::with_capacity(LEADER_SIZE);
    leader.extend_from_slice(format!("{record_length:05}").as_bytes());
    leader.push(b' ');
    leader.push(identifier);
    leader.extend_from_slice(b"     ");
    leader.extend_from_slice(format!("{field_area_start:05}").as_bytes());
    leader.extend_from_slice(b"   ");
    leader.extend_from_slice(b"4404");
    assert_eq!(LEADER_SIZE, leader.len());
    leader
}

/// Encode a data descriptive record defining the given fields.
pub fn ddr(fields: &[FieldSpec]) -> Vec<u8> {
    let mut area = Vec::new();
    let mut entries = Vec::new();
    for field in fields {
        assert_eq!(9, field.controls.len(), "field controls are 9 bytes");
        let start = area.len();
        area.extend_from_slice(field.controls.as_bytes());
        area.extend_from_slice(field.name.as_bytes());
        area.push(UT);
        area.extend_from_slice(field.descriptor.as_bytes());
        area.push(UT);
        area.extend_from_slice(field.formats.as_bytes());
        area.push(FT);
        entries.push((field.tag, area.len() - start, start));
    }
    let directory = directory(&entries);
    let field_area_start = LEADER_SIZE + directory.len();
    let record_length = field_area_start + area.len();
    let mut record = ddr_leader(record_length, field_area_start);
    record.extend_from_slice(&directory);
    record.extend_from_slice(&area);
    record
}

/// Encode one data record. Payloads are given without their trailing field
/// terminator; the builder appends it.
pub fn dr(fields: &[(&str, Vec<u8>)]) -> Vec<u8> {
    dr_with_identifier(fields, b'D')
}

pub fn dr_with_identifier(fields: &[(&str, Vec<u8>)], identifier: u8) -> Vec<u8> {
    let mut area = Vec::new();
    let mut entries = Vec::new();
    for (tag, payload) in fields {
        let start = area.len();
        area.extend_from_slice(payload);
        area.push(FT);
        entries.push((*tag, area.len() - start, start));
    }
    let directory = directory(&entries);
    let field_area_start = LEADER_SIZE + directory.len();
    let record_length = field_area_start + area.len();
    let mut record = dr_leader(record_length, field_area_start, identifier);
    record.extend_from_slice(&directory);
    record.extend_from_slice(&area);
    record
}

/// Byte by byte payload builder for data record fields.
#[derive(Default)]
pub struct Payload(Vec<u8>);

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(mut self, value: u8) -> Self {
        self.0.push(value);
        self
    }

    pub fn u16(mut self, value: u16) -> Self {
        self.0.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn u32(mut self, value: u32) -> Self {
        self.0.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn i32(mut self, value: i32) -> Self {
        self.0.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Raw text of a fixed width subfield.
    pub fn text(mut self, value: &str) -> Self {
        self.0.extend_from_slice(value.as_bytes());
        self
    }

    /// Text of a variable width subfield, with its unit terminator.
    pub fn var_text(mut self, value: &str) -> Self {
        self.0.extend_from_slice(value.as_bytes());
        self.0.push(UT);
        self
    }

    pub fn bytes(mut self, value: &[u8]) -> Self {
        self.0.extend_from_slice(value);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.0
    }
}

/// The DDR schema of a small but realistic ENC cell.
pub fn enc_schema() -> Vec<FieldSpec> {
    vec![
        FieldSpec {
            tag: "0001",
            controls: "0100;&   ",
            name: "ISO 8211 Record Identifier",
            descriptor: "",
            formats: "(b12)",
        },
        FieldSpec {
            tag: "DSID",
            controls: "1600;&   ",
            name: "Data set identification field",
            descriptor: "RCNM!RCID!EXPP!INTU!DSNM!EDTN!UPDN!UADT!ISDT!STED!PRSP!PSDN!PRED!PROF!AGEN!COMT",
            formats: "(b11,b14,2b11,3A,2A(8),R(4),b11,2A,b11,b12,A)",
        },
        FieldSpec {
            tag: "DSSI",
            controls: "1600;&   ",
            name: "Data set structure information field",
            descriptor: "DSTR!AALL!NALL!NOMR!NOCR!NOGR!NOLR!NOIN!NOCN!NOED!NOFA",
            formats: "(3b11,8b14)",
        },
        FieldSpec {
            tag: "DSPM",
            controls: "1600;&   ",
            name: "Data set parameter field",
            descriptor: "RCNM!RCID!HDAT!VDAT!SDAT!CSCL!DUNI!HUNI!PUNI!COUN!COMF!SOMF!COMT",
            formats: "(b11,b14,3b11,b14,4b11,2b14,A)",
        },
        FieldSpec {
            tag: "VRID",
            controls: "1600;&   ",
            name: "Vector record identifier field",
            descriptor: "RCNM!RCID!RVER!RUIN",
            formats: "(b11,b14,b12,b11)",
        },
        FieldSpec {
            tag: "SG2D",
            controls: "2600;&   ",
            name: "2-D coordinate field",
            descriptor: "*YCOO!XCOO",
            formats: "(2b24)",
        },
        FieldSpec {
            tag: "SG3D",
            controls: "2600;&   ",
            name: "3-D coordinate (sounding array) field",
            descriptor: "*YCOO!XCOO!VE3D",
            formats: "(3b24)",
        },
        FieldSpec {
            tag: "VRPT",
            controls: "2600;&   ",
            name: "Vector record pointer field",
            descriptor: "*NAME!ORNT!USAG!TOPI!MASK",
            formats: "(B(40),4b11)",
        },
        FieldSpec {
            tag: "FRID",
            controls: "1600;&   ",
            name: "Feature record identifier field",
            descriptor: "RCNM!RCID!PRIM!GRUP!OBJL!RVER!RUIN",
            formats: "(b11,b14,2b11,2b12,b11)",
        },
        FieldSpec {
            tag: "FOID",
            controls: "1600;&   ",
            name: "Feature object identifier field",
            descriptor: "AGEN!FIDN!FIDS",
            formats: "(b12,b14,b12)",
        },
        FieldSpec {
            tag: "FSPT",
            controls: "2600;&   ",
            name: "Feature record to spatial record pointer field",
            descriptor: "*NAME!ORNT!USAG!MASK",
            formats: "(B(40),3b11)",
        },
    ]
}

pub fn record_identifier(number: u16) -> Vec<u8> {
    Payload::new().u16(number).build()
}

pub fn dsid_payload(data_set_name: &str) -> Vec<u8> {
    Payload::new()
        .u8(10) // RCNM = DS
        .u32(1)
        .u8(1) // EXPP
        .u8(1) // INTU
        .var_text(data_set_name)
        .var_text("1") // EDTN
        .var_text("0") // UPDN
        .text("20240101") // UADT
        .text("20240101") // ISDT
        .text("03.1") // STED
        .u8(1) // PRSP = ENC
        .var_text("")
        .var_text("2.0")
        .u8(1) // PROF = EN
        .u16(540) // AGEN
        .var_text("")
        .build()
}

pub fn dssi_payload() -> Vec<u8> {
    let mut payload = Payload::new()
        .u8(2) // DSTR = chain-node
        .u8(1) // AALL
        .u8(1); // NALL
    for _ in 0..8 {
        payload = payload.u32(0);
    }
    payload.build()
}

pub fn dspm_payload(comf: u32, somf: u32, cscl: u32) -> Vec<u8> {
    Payload::new()
        .u8(20) // RCNM = DP
        .u32(1)
        .u8(2) // HDAT = WGS 84
        .u8(7) // VDAT
        .u8(23) // SDAT
        .u32(cscl)
        .u8(1) // DUNI = metres
        .u8(1) // HUNI
        .u8(1) // PUNI
        .u8(1) // COUN = lat/lon
        .u32(comf)
        .u32(somf)
        .var_text("")
        .build()
}

pub fn vrid_payload(rcnm: u8, rcid: u32, rver: u16, ruin: u8) -> Vec<u8> {
    Payload::new().u8(rcnm).u32(rcid).u16(rver).u8(ruin).build()
}

/// SG2D vertices, (YCOO, XCOO) order as on disk.
pub fn sg2d_payload(vertices: &[(i32, i32)]) -> Vec<u8> {
    let mut payload = Payload::new();
    for (y, x) in vertices {
        payload = payload.i32(*y).i32(*x);
    }
    payload.build()
}

pub fn sg3d_payload(soundings: &[(i32, i32, i32)]) -> Vec<u8> {
    let mut payload = Payload::new();
    for (y, x, z) in soundings {
        payload = payload.i32(*y).i32(*x).i32(*z);
    }
    payload.build()
}

pub fn vector_name(rcnm: u8, rcid: u32) -> [u8; 5] {
    let id = rcid.to_le_bytes();
    [rcnm, id[0], id[1], id[2], id[3]]
}

pub fn vrpt_payload(pointers: &[([u8; 5], u8, u8, u8, u8)]) -> Vec<u8> {
    let mut payload = Payload::new();
    for (name, ornt, usag, topi, mask) in pointers {
        payload = payload.bytes(name).u8(*ornt).u8(*usag).u8(*topi).u8(*mask);
    }
    payload.build()
}

pub fn frid_payload(rcid: u32, prim: u8, grup: u8, objl: u16, rver: u16, ruin: u8) -> Vec<u8> {
    Payload::new()
        .u8(100) // RCNM = FE
        .u32(rcid)
        .u8(prim)
        .u8(grup)
        .u16(objl)
        .u16(rver)
        .u8(ruin)
        .build()
}

pub fn foid_payload(agen: u16, fidn: u32, fids: u16) -> Vec<u8> {
    Payload::new().u16(agen).u32(fidn).u16(fids).build()
}

pub fn fspt_payload(pointers: &[([u8; 5], u8, u8, u8)]) -> Vec<u8> {
    let mut payload = Payload::new();
    for (name, ornt, usag, mask) in pointers {
        payload = payload.bytes(name).u8(*ornt).u8(*usag).u8(*mask);
    }
    payload.build()
}
