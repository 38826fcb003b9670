use crate::geometry::Point3;
use byteorder::{ByteOrder, LittleEndian};
use std::fmt;

/// Record name codes (RCNM) distinguishing the S-57 record classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKind {
    /// DS - Data Set General Information
    GeneralInformation,
    /// DP - Data Set Geographic Reference
    GeographicReference,
    /// DH - Data Set History
    History,
    /// DA - Data Set Accuracy
    Accuracy,
    /// CR - Catalogue Cross Reference
    CatalogueCrossReference,
    /// ID - Data Dictionary Definition
    DictionaryDefinition,
    /// IO - Data Dictionary Domain
    DictionaryDomain,
    /// IS - Data Dictionary Schema
    DictionarySchema,
    /// FE - Feature record
    Feature,
    /// VI - Isolated node vector
    IsolatedNode,
    /// VC - Connected node vector
    ConnectedNode,
    /// VE - Edge vector
    Edge,
    /// VF - Face vector
    Face,
}

impl RecordKind {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            10 => Some(Self::GeneralInformation),
            20 => Some(Self::GeographicReference),
            30 => Some(Self::History),
            40 => Some(Self::Accuracy),
            60 => Some(Self::CatalogueCrossReference),
            70 => Some(Self::DictionaryDefinition),
            80 => Some(Self::DictionaryDomain),
            90 => Some(Self::DictionarySchema),
            100 => Some(Self::Feature),
            110 => Some(Self::IsolatedNode),
            120 => Some(Self::ConnectedNode),
            130 => Some(Self::Edge),
            140 => Some(Self::Face),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::GeneralInformation => 10,
            Self::GeographicReference => 20,
            Self::History => 30,
            Self::Accuracy => 40,
            Self::CatalogueCrossReference => 60,
            Self::DictionaryDefinition => 70,
            Self::DictionaryDomain => 80,
            Self::DictionarySchema => 90,
            Self::Feature => 100,
            Self::IsolatedNode => 110,
            Self::ConnectedNode => 120,
            Self::Edge => 130,
            Self::Face => 140,
        }
    }

    pub fn ascii_code(&self) -> &'static str {
        match self {
            Self::GeneralInformation => "DS",
            Self::GeographicReference => "DP",
            Self::History => "DH",
            Self::Accuracy => "DA",
            Self::CatalogueCrossReference => "CR",
            Self::DictionaryDefinition => "ID",
            Self::DictionaryDomain => "IO",
            Self::DictionarySchema => "IS",
            Self::Feature => "FE",
            Self::IsolatedNode => "VI",
            Self::ConnectedNode => "VC",
            Self::Edge => "VE",
            Self::Face => "VF",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ascii_code())
    }
}

/// The 5 byte unique NAME of a vector record: one RCNM byte followed by a
/// little-endian RCID.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RecordName {
    pub kind: RecordKind,
    pub id: u32,
}

impl RecordName {
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 5 {
            return None;
        }
        let kind = RecordKind::from_code(data[0])?;
        Some(Self {
            kind,
            id: LittleEndian::read_u32(&data[1..5]),
        })
    }
}

impl fmt::Display for RecordName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind, self.id)
    }
}

/// The 8 byte long NAME (LNAM) of a feature object: producing agency,
/// feature identification number and subdivision, all little-endian.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LongName {
    pub agen: u16,
    pub fidn: u32,
    pub fids: u16,
}

impl LongName {
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 8 {
            return None;
        }
        Some(Self {
            agen: LittleEndian::read_u16(&data[0..2]),
            fidn: LittleEndian::read_u32(&data[2..6]),
            fids: LittleEndian::read_u16(&data[6..8]),
        })
    }
}

impl fmt::Display for LongName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}.{}", self.agen, self.fidn, self.fids)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpdateInstruction {
    Insert,
    Delete,
    Modify,
}

impl UpdateInstruction {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Insert),
            2 => Some(Self::Delete),
            3 => Some(Self::Modify),
            _ => None,
        }
    }
}

impl fmt::Display for UpdateInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "INSERT"),
            Self::Delete => write!(f, "DELETE"),
            Self::Modify => write!(f, "MODIFY"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Orientation {
    Forward,
    Reverse,
}

impl Orientation {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Forward),
            2 => Some(Self::Reverse),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UsageIndicator {
    Exterior,
    Interior,
    /// Exterior boundary truncated by the data limit.
    ExteriorTruncated,
}

impl UsageIndicator {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Exterior),
            2 => Some(Self::Interior),
            3 => Some(Self::ExteriorTruncated),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TopologyIndicator {
    BeginningNode,
    EndNode,
    LeftFace,
    RightFace,
    ContainingFace,
}

impl TopologyIndicator {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::BeginningNode),
            2 => Some(Self::EndNode),
            3 => Some(Self::LeftFace),
            4 => Some(Self::RightFace),
            5 => Some(Self::ContainingFace),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MaskingIndicator {
    Mask,
    Show,
}

impl MaskingIndicator {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Mask),
            2 => Some(Self::Show),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeometricPrimitive {
    Point,
    Line,
    Area,
}

impl GeometricPrimitive {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Point),
            2 => Some(Self::Line),
            3 => Some(Self::Area),
            _ => None,
        }
    }
}

/// Topology level of the data set, from the DSSI DSTR subfield.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataStructure {
    /// CS - Cartographic spaghetti
    CartographicSpaghetti,
    /// CN - Chain-node
    ChainNode,
    /// PG - Planar graph
    PlanarGraph,
    /// FT - Full topology
    FullTopology,
    /// NO - Topology is not relevant
    Irrelevant,
}

impl DataStructure {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::CartographicSpaghetti),
            2 => Some(Self::ChainNode),
            3 => Some(Self::PlanarGraph),
            4 => Some(Self::FullTopology),
            255 => Some(Self::Irrelevant),
            _ => None,
        }
    }
}

/// Identification subfields shared by every vector and feature record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordId {
    pub rcnm: RecordKind,
    pub rcid: u32,
    pub rver: u32,
    pub ruin: Option<UpdateInstruction>,
}

/// One entry of an edge's VRPT field, pointing at a bounding node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VectorRecordPointer {
    pub name: RecordName,
    pub orientation: Option<Orientation>,
    pub usage: Option<UsageIndicator>,
    pub topology: Option<TopologyIndicator>,
    pub masking: Option<MaskingIndicator>,
}

/// One entry of a feature's FSPT field, pointing at a spatial record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpatialRecordPointer {
    pub name: RecordName,
    pub orientation: Option<Orientation>,
    pub usage: Option<UsageIndicator>,
    pub masking: Option<MaskingIndicator>,
}

/// An isolated (VI) or connected (VC) node with its scaled position.
#[derive(Clone, Copy, Debug)]
pub struct PointGeometry {
    pub id: RecordId,
    pub point: Point3,
}

/// An edge (VE): a polyline between a begin and an end node.
#[derive(Clone, Debug)]
pub struct EdgeGeometry {
    pub id: RecordId,
    pub begin_node: VectorRecordPointer,
    pub end_node: VectorRecordPointer,
    pub points: Vec<Point3>,
}

/// A feature record carrying its object class and the pointers into the
/// spatial records that make up its geometry. Cross references are kept as
/// identifiers; resolving them is a map lookup against the chart at query
/// time, so forward references within a cell are harmless.
#[derive(Clone, Debug)]
pub struct GeometryPrimitive {
    pub id: RecordId,
    /// Object label code (OBJL).
    pub objl: u16,
    /// Group (GRUP).
    pub grup: u8,
    pub prim: Option<GeometricPrimitive>,
    /// The feature object identifier from the FOID field, when present.
    pub object_id: Option<LongName>,
    pub fspt: Vec<SpatialRecordPointer>,
}

/// Axis aligned bounding region over every coordinate seen so far.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
    valid: bool,
}

impl BoundingBox {
    /// Extend the region to cover `(x, y)`. The first point makes the box
    /// valid with min = max = point.
    pub fn extend(&mut self, x: f64, y: f64) {
        if self.valid {
            self.min_x = self.min_x.min(x);
            self.min_y = self.min_y.min(y);
            self.max_x = self.max_x.max(x);
            self.max_y = self.max_y.max(y);
        } else {
            self.min_x = x;
            self.max_x = x;
            self.min_y = y;
            self.max_y = y;
            self.valid = true;
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn min_x(&self) -> f64 {
        self.min_x
    }

    pub fn min_y(&self) -> f64 {
        self.min_y
    }

    pub fn max_x(&self) -> f64 {
        self.max_x
    }

    pub fn max_y(&self) -> f64 {
        self.max_y
    }

    pub fn width(&self) -> f64 {
        (self.max_x - self.min_x).abs()
    }

    pub fn height(&self) -> f64 {
        (self.max_y - self.min_y).abs()
    }
}
