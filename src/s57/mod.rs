//! IHO S-57 ENC chart ingestion on top of the generic ISO 8211 reader.
//!
//! A [`Chart`] drives a [`Module`] over one base cell file: vector records
//! become nodes and edges, feature records become primitives with spatial
//! cross references, and a bounding region grows with every coordinate.
//! After the base cell, sequential update cells (`.001`, `.002`, ...) found
//! next to it are merged in.

use crate::geometry::Point3;
use crate::iso8211::{DomainSnafu, Field, Module, Record, Result};
use itertools::Itertools;
use log::{info, warn};
use rustc_hash::FxHashMap;
use snafu::prelude::*;
use std::path::{Path, PathBuf};

pub mod data_types;
pub use data_types::*;

const DATA_SET_ID_TAG: &str = "DSID";
const DATA_SET_PARAMETER_TAG: &str = "DSPM";
const VECTOR_RECORD_ID_TAG: &str = "VRID";
const FEATURE_RECORD_ID_TAG: &str = "FRID";

/// An ENC cell held in memory: the vector and feature records of one chart,
/// indexed by record identifier.
///
/// Lifecycle: [`Chart::open`] → [`Chart::ingest`] → queries → drop (or
/// [`Chart::close`] to release everything early).
pub struct Chart {
    file_name: PathBuf,
    module: Option<Module>,
    ingested: bool,
    data_set_name: String,
    comf: u32,
    somf: u32,
    cscl: u32,
    attf_lexical_level: u8,
    natf_lexical_level: u8,
    data_structure: Option<DataStructure>,
    isolated_nodes: FxHashMap<u32, PointGeometry>,
    connected_nodes: FxHashMap<u32, PointGeometry>,
    edges: FxHashMap<u32, EdgeGeometry>,
    features: FxHashMap<u32, GeometryPrimitive>,
    bounding: BoundingBox,
}

impl Chart {
    /// Open an ENC base cell for reading.
    ///
    /// The underlying file must be ISO 8211 and its schema must define the
    /// DSID field, otherwise it is not an S-57 data file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file_name = path.as_ref().to_path_buf();
        let module = Module::open(&file_name)?;
        ensure!(
            module.find_field_def(DATA_SET_ID_TAG).is_some(),
            DomainSnafu {
                description: format!(
                    "'{}' is an ISO 8211 file, but not an IHO S-57 data file (defined fields: [{}])",
                    file_name.display(),
                    module.field_defs().iter().map(|def| def.tag()).join(", ")
                ),
            }
        );
        Ok(Self {
            file_name,
            module: Some(module),
            ingested: false,
            data_set_name: String::new(),
            comf: 1,
            somf: 1,
            cscl: 1,
            attf_lexical_level: 0,
            natf_lexical_level: 0,
            data_structure: None,
            isolated_nodes: FxHashMap::default(),
            connected_nodes: FxHashMap::default(),
            edges: FxHashMap::default(),
            features: FxHashMap::default(),
            bounding: BoundingBox::default(),
        })
    }

    /// Read every data record into memory, adding to the appropriate
    /// indexes, then find and merge any sequential update cells.
    ///
    /// Records that fail to decode are rejected individually; ingestion
    /// carries on with the next record.
    pub fn ingest(&mut self) -> Result<()> {
        let Some(mut module) = self.module.take() else {
            return DomainSnafu {
                description: "Chart is closed".to_string(),
            }
            .fail();
        };
        if self.ingested {
            self.module = Some(module);
            return Ok(());
        }
        loop {
            match module.read_record() {
                Ok(Some(record)) => {
                    if let Err(error) = self.ingest_record(&record) {
                        warn!("Rejecting record: {error}");
                    }
                }
                Ok(None) => break,
                Err(error) => warn!("Rejecting record: {error}"),
            }
        }
        self.ingested = true;
        self.module = Some(module);
        self.find_and_apply_updates()
    }

    fn ingest_record(&mut self, record: &Record<'_>) -> Result<()> {
        // Field 0 is the 0001 record identifier; the field at index 1
        // carries the record's principal tag.
        let Some(field) = record.field(1) else {
            return DomainSnafu {
                description: "Data record carries no principal field".to_string(),
            }
            .fail();
        };
        match field.def().tag() {
            DATA_SET_ID_TAG => {
                self.data_set_name = field.subfield_as_string("DSNM", 0);
                // The DSSI companion travels in the same record.
                if let Some(dssi) = record.field(2) {
                    self.data_structure =
                        DataStructure::from_code(dssi.subfield_as_long("DSTR", 0) as u8);
                    self.attf_lexical_level = dssi.subfield_as_long("AALL", 0) as u8;
                    self.natf_lexical_level = dssi.subfield_as_long("NALL", 0) as u8;
                }
            }
            DATA_SET_PARAMETER_TAG => {
                self.comf = field.subfield_as_long("COMF", 0).max(1) as u32;
                self.somf = field.subfield_as_long("SOMF", 0).max(1) as u32;
                self.cscl = field.subfield_as_long("CSCL", 0).max(1) as u32;
            }
            VECTOR_RECORD_ID_TAG => self.read_vector(record, &field)?,
            FEATURE_RECORD_ID_TAG => self.read_feature(record, &field)?,
            other => info!("Skipping '{other}' record during ingest"),
        }
        Ok(())
    }

    fn read_vector(&mut self, record: &Record<'_>, vrid: &Field<'_>) -> Result<()> {
        let rcnm_code = vrid.subfield_as_long("RCNM", 0);
        let kind = RecordKind::from_code(rcnm_code as u8)
            .filter(|kind| {
                matches!(
                    kind,
                    RecordKind::IsolatedNode
                        | RecordKind::ConnectedNode
                        | RecordKind::Edge
                        | RecordKind::Face
                )
            })
            .with_context(|| DomainSnafu {
                description: format!("Unrecognised record name code '{rcnm_code}' on vector record"),
            })?;
        let id = RecordId {
            rcnm: kind,
            rcid: vrid.subfield_as_long("RCID", 0) as u32,
            rver: vrid.subfield_as_long("RVER", 0) as u32,
            ruin: UpdateInstruction::from_code(vrid.subfield_as_long("RUIN", 0) as u8),
        };
        match kind {
            RecordKind::IsolatedNode | RecordKind::ConnectedNode => {
                let point = if let Some(sg2d) = record.find_field("SG2D") {
                    Point3::new(
                        self.scale_coordinate(sg2d.subfield_as_long("XCOO", 0)),
                        self.scale_coordinate(sg2d.subfield_as_long("YCOO", 0)),
                        0.0,
                    )
                } else if let Some(sg3d) = record.find_field("SG3D") {
                    Point3::new(
                        self.scale_coordinate(sg3d.subfield_as_long("XCOO", 0)),
                        self.scale_coordinate(sg3d.subfield_as_long("YCOO", 0)),
                        sg3d.subfield_as_long("VE3D", 0) as f64 / f64::from(self.somf),
                    )
                } else {
                    return DomainSnafu {
                        description: format!(
                            "Vector record {} has neither SG2D nor SG3D",
                            id.rcid
                        ),
                    }
                    .fail();
                };
                self.bounding.extend(point.x, point.y);
                let node = PointGeometry { id, point };
                if kind == RecordKind::IsolatedNode {
                    self.isolated_nodes.insert(id.rcid, node);
                } else {
                    self.connected_nodes.insert(id.rcid, node);
                }
            }
            RecordKind::Edge => {
                let mut points = Vec::new();
                if let Some(sg2d) = record.find_field("SG2D") {
                    let count = sg2d.repeat_count();
                    points.reserve(count);
                    for occurrence in 0..count {
                        let x = self.scale_coordinate(sg2d.subfield_as_long("XCOO", occurrence));
                        let y = self.scale_coordinate(sg2d.subfield_as_long("YCOO", occurrence));
                        self.bounding.extend(x, y);
                        points.push(Point3::new(x, y, 0.0));
                    }
                }
                let vrpt = record.find_field("VRPT").with_context(|| DomainSnafu {
                    description: format!("Edge record {} has no VRPT field", id.rcid),
                })?;
                ensure!(
                    vrpt.repeat_count() == 2,
                    DomainSnafu {
                        description: format!(
                            "Edge record {} must reference exactly a begin and an end node",
                            id.rcid
                        ),
                    }
                );
                let begin_node =
                    decode_vector_pointer(&vrpt, 0).with_context(|| DomainSnafu {
                        description: format!("Edge record {} has a malformed begin node", id.rcid),
                    })?;
                let end_node = decode_vector_pointer(&vrpt, 1).with_context(|| DomainSnafu {
                    description: format!("Edge record {} has a malformed end node", id.rcid),
                })?;
                self.edges.insert(
                    id.rcid,
                    EdgeGeometry {
                        id,
                        begin_node,
                        end_node,
                        points,
                    },
                );
            }
            // Face records (VF) carry no geometry of their own.
            _ => {}
        }
        Ok(())
    }

    fn read_feature(&mut self, record: &Record<'_>, frid: &Field<'_>) -> Result<()> {
        let prim_code = frid.subfield_as_long("PRIM", 0);
        ensure!(
            prim_code <= 3,
            DomainSnafu {
                description: format!(
                    "Unrecognised geometric primitive code '{prim_code}' on feature record"
                ),
            }
        );
        let rcnm_code = frid.subfield_as_long("RCNM", 0);
        let rcnm = RecordKind::from_code(rcnm_code as u8).with_context(|| DomainSnafu {
            description: format!("Unrecognised record name code '{rcnm_code}' on feature record"),
        })?;
        let mut feature = GeometryPrimitive {
            id: RecordId {
                rcnm,
                rcid: frid.subfield_as_long("RCID", 0) as u32,
                rver: frid.subfield_as_long("RVER", 0) as u32,
                ruin: UpdateInstruction::from_code(frid.subfield_as_long("RUIN", 0) as u8),
            },
            objl: frid.subfield_as_long("OBJL", 0) as u16,
            grup: frid.subfield_as_long("GRUP", 0) as u8,
            prim: GeometricPrimitive::from_code(prim_code as u8),
            object_id: None,
            fspt: Vec::new(),
        };
        if let Some(foid) = record.find_field("FOID") {
            feature.object_id = Some(LongName {
                agen: foid.subfield_as_long("AGEN", 0) as u16,
                fidn: foid.subfield_as_long("FIDN", 0) as u32,
                fids: foid.subfield_as_long("FIDS", 0) as u16,
            });
        }
        if let Some(fspt) = record.find_field("FSPT") {
            let count = fspt.repeat_count();
            feature.fspt.reserve(count);
            for occurrence in 0..count {
                let pointer =
                    decode_spatial_pointer(&fspt, occurrence).with_context(|| DomainSnafu {
                        description: format!(
                            "Feature record {} carries a malformed spatial pointer",
                            feature.id.rcid
                        ),
                    })?;
                feature.fspt.push(pointer);
            }
        }
        self.features.insert(feature.id.rcid, feature);
        Ok(())
    }

    fn scale_coordinate(&self, raw: i64) -> f64 {
        raw as f64 / f64::from(self.comf)
    }

    /// Probe for sequential update cells next to the base file and merge
    /// each one that opens. The first missing update ends the chain; a
    /// missing chain is not an ingest failure.
    fn find_and_apply_updates(&mut self) -> Result<()> {
        if self.file_name.extension().is_none() {
            return Ok(());
        }
        for number in 1u32.. {
            let update_path = self.file_name.with_extension(format!("{number:03}"));
            let mut update = match Module::open(&update_path) {
                Ok(module) => module,
                Err(_) => break,
            };
            info!("Applying update cell '{}'", update_path.display());
            self.apply_updates(&mut update, number)?;
        }
        Ok(())
    }

    /// Merge the records of one update cell into the base maps according to
    /// each record's update instruction: Delete removes the identifier from
    /// its map, Insert and Modify replay the record over the base state.
    fn apply_updates(&mut self, update: &mut Module, update_number: u32) -> Result<()> {
        loop {
            let record = match update.read_record() {
                Ok(Some(record)) => record,
                Ok(None) => break,
                Err(error) => {
                    warn!("Rejecting record of update {update_number}: {error}");
                    continue;
                }
            };
            let Some(field) = record.field(1) else {
                continue;
            };
            let tag = field.def().tag();
            match tag {
                VECTOR_RECORD_ID_TAG | FEATURE_RECORD_ID_TAG => {
                    let ruin = UpdateInstruction::from_code(field.subfield_as_long("RUIN", 0) as u8);
                    let merged = if ruin == Some(UpdateInstruction::Delete) {
                        self.delete_record(&field)
                    } else if tag == VECTOR_RECORD_ID_TAG {
                        self.read_vector(&record, &field)
                    } else {
                        self.read_feature(&record, &field)
                    };
                    if let Err(error) = merged {
                        warn!("Skipping record of update {update_number}: {error}");
                    }
                }
                other => info!("Skipping '{other}' record of update {update_number}"),
            }
        }
        Ok(())
    }

    fn delete_record(&mut self, field: &Field<'_>) -> Result<()> {
        let rcnm_code = field.subfield_as_long("RCNM", 0);
        let rcid = field.subfield_as_long("RCID", 0) as u32;
        let kind = RecordKind::from_code(rcnm_code as u8).with_context(|| DomainSnafu {
            description: format!("Unrecognised record name code '{rcnm_code}' on delete record"),
        })?;
        match kind {
            RecordKind::IsolatedNode => {
                self.isolated_nodes.remove(&rcid);
            }
            RecordKind::ConnectedNode => {
                self.connected_nodes.remove(&rcid);
            }
            RecordKind::Edge => {
                self.edges.remove(&rcid);
            }
            RecordKind::Feature => {
                self.features.remove(&rcid);
            }
            other => {
                return DomainSnafu {
                    description: format!("Cannot delete record of kind {other}"),
                }
                .fail()
            }
        }
        Ok(())
    }

    /// Name of the data set, from the DSID DSNM subfield.
    pub fn data_set_name(&self) -> &str {
        &self.data_set_name
    }

    /// Floating point to integer multiplication factor for coordinates.
    pub fn coordinate_factor(&self) -> u32 {
        self.comf
    }

    /// Floating point to integer multiplication factor for soundings.
    pub fn sounding_factor(&self) -> u32 {
        self.somf
    }

    /// Modulus of the compilation scale; 1:25000 is encoded as 25000.
    pub fn compilation_scale(&self) -> u32 {
        self.cscl
    }

    pub fn attf_lexical_level(&self) -> u8 {
        self.attf_lexical_level
    }

    pub fn natf_lexical_level(&self) -> u8 {
        self.natf_lexical_level
    }

    pub fn data_structure(&self) -> Option<DataStructure> {
        self.data_structure
    }

    pub fn isolated_nodes(&self) -> &FxHashMap<u32, PointGeometry> {
        &self.isolated_nodes
    }

    pub fn connected_nodes(&self) -> &FxHashMap<u32, PointGeometry> {
        &self.connected_nodes
    }

    pub fn edges(&self) -> &FxHashMap<u32, EdgeGeometry> {
        &self.edges
    }

    pub fn features(&self) -> &FxHashMap<u32, GeometryPrimitive> {
        &self.features
    }

    /// Bounding region over every coordinate ingested so far.
    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding
    }

    pub fn file_name(&self) -> &Path {
        &self.file_name
    }

    /// Release all ingested entities and the underlying module.
    pub fn close(&mut self) {
        self.module = None;
        self.ingested = false;
        self.data_set_name.clear();
        self.isolated_nodes.clear();
        self.connected_nodes.clear();
        self.edges.clear();
        self.features.clear();
        self.bounding = BoundingBox::default();
    }
}

fn decode_vector_pointer(field: &Field<'_>, occurrence: usize) -> Option<VectorRecordPointer> {
    let name = RecordName::from_bytes(field.subfield_as_binary("NAME", occurrence))?;
    Some(VectorRecordPointer {
        name,
        orientation: Orientation::from_code(field.subfield_as_long("ORNT", occurrence) as u8),
        usage: UsageIndicator::from_code(field.subfield_as_long("USAG", occurrence) as u8),
        topology: TopologyIndicator::from_code(field.subfield_as_long("TOPI", occurrence) as u8),
        masking: MaskingIndicator::from_code(field.subfield_as_long("MASK", occurrence) as u8),
    })
}

fn decode_spatial_pointer(field: &Field<'_>, occurrence: usize) -> Option<SpatialRecordPointer> {
    let name = RecordName::from_bytes(field.subfield_as_binary("NAME", occurrence))?;
    Some(SpatialRecordPointer {
        name,
        orientation: Orientation::from_code(field.subfield_as_long("ORNT", occurrence) as u8),
        usage: UsageIndicator::from_code(field.subfield_as_long("USAG", occurrence) as u8),
        masking: MaskingIndicator::from_code(field.subfield_as_long("MASK", occurrence) as u8),
    })
}
