//! End to end ingestion tests over a synthetic ENC cell, including the
//! update cell chain.

mod common;

use approx::assert_relative_eq;
use common::*;
use s57chart::s57::{
    DataStructure, GeometricPrimitive, MaskingIndicator, Orientation, RecordKind,
    TopologyIndicator, UpdateInstruction, UsageIndicator,
};
use s57chart::Chart;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const COMF: u32 = 10_000_000;
const SOMF: u32 = 10;
const CSCL: u32 = 25_000;

/// A base cell with one isolated node, two connected nodes, one edge of
/// three vertices between them, and one line feature over the edge.
fn base_cell() -> Vec<u8> {
    let mut cell = ddr(&enc_schema());

    cell.extend(dr(&[
        ("0001", record_identifier(1)),
        ("DSID", dsid_payload("TEST_CELL")),
        ("DSSI", dssi_payload()),
    ]));
    cell.extend(dr(&[
        ("0001", record_identifier(2)),
        ("DSPM", dspm_payload(COMF, SOMF, CSCL)),
    ]));
    // Isolated node (VI 1) with a sounding: (11.0, 21.0, -5.2).
    cell.extend(dr(&[
        ("0001", record_identifier(3)),
        ("VRID", vrid_payload(110, 1, 1, 1)),
        ("SG3D", sg3d_payload(&[(210_000_000, 110_000_000, -52)])),
    ]));
    // Connected nodes (VC 2, VC 3) at (10.5, 20.5) and (11.5, 21.5).
    cell.extend(dr(&[
        ("0001", record_identifier(4)),
        ("VRID", vrid_payload(120, 2, 1, 1)),
        ("SG2D", sg2d_payload(&[(205_000_000, 105_000_000)])),
    ]));
    cell.extend(dr(&[
        ("0001", record_identifier(5)),
        ("VRID", vrid_payload(120, 3, 1, 1)),
        ("SG2D", sg2d_payload(&[(215_000_000, 115_000_000)])),
    ]));
    // Edge (VE 42) with three vertices from (10, 20) to (12, 22).
    cell.extend(dr(&[
        ("0001", record_identifier(6)),
        ("VRID", vrid_payload(130, 42, 1, 1)),
        (
            "VRPT",
            vrpt_payload(&[
                (vector_name(120, 2), 1, 1, 1, 2),
                (vector_name(120, 3), 1, 1, 2, 2),
            ]),
        ),
        (
            "SG2D",
            sg2d_payload(&[
                (200_000_000, 100_000_000),
                (210_000_000, 110_000_000),
                (220_000_000, 120_000_000),
            ]),
        ),
    ]));
    // A line feature (FE 7) spanning the edge.
    cell.extend(dr(&[
        ("0001", record_identifier(7)),
        ("FRID", frid_payload(7, 2, 1, 30, 1, 1)),
        ("FOID", foid_payload(540, 123_456, 1)),
        ("FSPT", fspt_payload(&[(vector_name(130, 42), 1, 1, 2)])),
    ]));
    cell
}

fn write_base_cell() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("TESTCELL.000");
    fs::write(&path, base_cell()).unwrap();
    (dir, path)
}

#[test]
fn ingest_builds_the_chart() {
    let (_dir, path) = write_base_cell();
    let mut chart = Chart::open(&path).unwrap();
    chart.ingest().unwrap();

    assert_eq!("TEST_CELL", chart.data_set_name());
    assert_eq!(COMF, chart.coordinate_factor());
    assert_eq!(SOMF, chart.sounding_factor());
    assert_eq!(CSCL, chart.compilation_scale());
    assert_eq!(Some(DataStructure::ChainNode), chart.data_structure());
    assert_eq!(1, chart.attf_lexical_level());
    assert_eq!(1, chart.natf_lexical_level());

    assert_eq!(1, chart.isolated_nodes().len());
    assert_eq!(2, chart.connected_nodes().len());
    assert_eq!(1, chart.edges().len());
    assert_eq!(1, chart.features().len());
}

#[test]
fn point_coordinates_are_scaled() {
    let (_dir, path) = write_base_cell();
    let mut chart = Chart::open(&path).unwrap();
    chart.ingest().unwrap();

    let node = &chart.isolated_nodes()[&1];
    assert_eq!(RecordKind::IsolatedNode, node.id.rcnm);
    assert_eq!(Some(UpdateInstruction::Insert), node.id.ruin);
    assert_relative_eq!(11.0, node.point.x);
    assert_relative_eq!(21.0, node.point.y);
    assert_relative_eq!(-5.2, node.point.z);

    let node = &chart.connected_nodes()[&2];
    assert_relative_eq!(10.5, node.point.x);
    assert_relative_eq!(20.5, node.point.y);
    assert_relative_eq!(0.0, node.point.z);
}

#[test]
fn edge_polyline_and_node_pointers() {
    let (_dir, path) = write_base_cell();
    let mut chart = Chart::open(&path).unwrap();
    chart.ingest().unwrap();

    let edge = &chart.edges()[&42];
    assert_eq!(RecordKind::Edge, edge.id.rcnm);
    assert_eq!(3, edge.points.len());
    for (index, (x, y)) in [(10.0, 20.0), (11.0, 21.0), (12.0, 22.0)].iter().enumerate() {
        assert_relative_eq!(*x, edge.points[index].x);
        assert_relative_eq!(*y, edge.points[index].y);
    }

    assert_eq!(RecordKind::ConnectedNode, edge.begin_node.name.kind);
    assert_eq!(2, edge.begin_node.name.id);
    assert_eq!(Some(TopologyIndicator::BeginningNode), edge.begin_node.topology);
    assert_eq!(Some(Orientation::Forward), edge.begin_node.orientation);
    assert_eq!(Some(UsageIndicator::Exterior), edge.begin_node.usage);
    assert_eq!(Some(MaskingIndicator::Show), edge.begin_node.masking);

    assert_eq!(3, edge.end_node.name.id);
    assert_eq!(Some(TopologyIndicator::EndNode), edge.end_node.topology);
}

#[test]
fn bounding_box_covers_all_vertices() {
    let (_dir, path) = write_base_cell();
    let mut chart = Chart::open(&path).unwrap();
    chart.ingest().unwrap();

    let bbox = chart.bounding_box();
    assert!(bbox.is_valid());
    assert_relative_eq!(10.0, bbox.min_x());
    assert_relative_eq!(12.0, bbox.max_x());
    assert_relative_eq!(20.0, bbox.min_y());
    assert_relative_eq!(22.0, bbox.max_y());
}

#[test]
fn feature_decodes_identity_and_pointers() {
    let (_dir, path) = write_base_cell();
    let mut chart = Chart::open(&path).unwrap();
    chart.ingest().unwrap();

    let feature = &chart.features()[&7];
    assert_eq!(RecordKind::Feature, feature.id.rcnm);
    assert_eq!(30, feature.objl);
    assert_eq!(1, feature.grup);
    assert_eq!(Some(GeometricPrimitive::Line), feature.prim);

    let object_id = feature.object_id.unwrap();
    assert_eq!(540, object_id.agen);
    assert_eq!(123_456, object_id.fidn);
    assert_eq!(1, object_id.fids);

    assert_eq!(1, feature.fspt.len());
    let pointer = &feature.fspt[0];
    assert_eq!(RecordKind::Edge, pointer.name.kind);
    assert_eq!(42, pointer.name.id);
    assert_eq!(Some(Orientation::Forward), pointer.orientation);
    assert_eq!(Some(UsageIndicator::Exterior), pointer.usage);
    assert_eq!(Some(MaskingIndicator::Show), pointer.masking);
}

#[test]
fn spatial_pointer_decodes_the_raw_name() {
    // RCNM=130 (VE), RCID=0x2A: the reference bytes for the NAME subfield.
    let name = vector_name(130, 42);
    assert_eq!([0x82, 0x2A, 0x00, 0x00, 0x00], name);
}

#[test]
fn vector_without_geometry_is_rejected_but_ingest_continues() {
    let mut cell = ddr(&enc_schema());
    cell.extend(dr(&[
        ("0001", record_identifier(1)),
        ("DSPM", dspm_payload(COMF, SOMF, CSCL)),
    ]));
    // A point vector without SG2D or SG3D cannot be placed.
    cell.extend(dr(&[
        ("0001", record_identifier(2)),
        ("VRID", vrid_payload(110, 1, 1, 1)),
    ]));
    cell.extend(dr(&[
        ("0001", record_identifier(3)),
        ("VRID", vrid_payload(110, 8, 1, 1)),
        ("SG2D", sg2d_payload(&[(205_000_000, 105_000_000)])),
    ]));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("PARTIAL.000");
    fs::write(&path, cell).unwrap();

    let mut chart = Chart::open(&path).unwrap();
    chart.ingest().unwrap();
    assert_eq!(1, chart.isolated_nodes().len());
    assert!(chart.isolated_nodes().contains_key(&8));
}

#[test]
fn edge_without_vrpt_is_rejected() {
    let mut cell = ddr(&enc_schema());
    cell.extend(dr(&[
        ("0001", record_identifier(1)),
        ("VRID", vrid_payload(130, 5, 1, 1)),
        ("SG2D", sg2d_payload(&[(200_000_000, 100_000_000)])),
    ]));
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("NOVRPT.000");
    fs::write(&path, cell).unwrap();

    let mut chart = Chart::open(&path).unwrap();
    chart.ingest().unwrap();
    assert!(chart.edges().is_empty());
}

#[test]
fn updates_merge_into_the_base_maps() {
    let (dir, path) = write_base_cell();

    // Update 1: delete VC 3, modify FE 7, insert VI 9.
    let mut update = ddr(&enc_schema());
    update.extend(dr(&[
        ("0001", record_identifier(1)),
        ("VRID", vrid_payload(120, 3, 2, 2)),
    ]));
    update.extend(dr(&[
        ("0001", record_identifier(2)),
        ("FRID", frid_payload(7, 2, 1, 99, 2, 3)),
        ("FSPT", fspt_payload(&[(vector_name(130, 42), 1, 1, 2)])),
    ]));
    update.extend(dr(&[
        ("0001", record_identifier(3)),
        ("VRID", vrid_payload(110, 9, 1, 1)),
        ("SG2D", sg2d_payload(&[(202_000_000, 102_000_000)])),
    ]));
    fs::write(dir.path().join("TESTCELL.001"), update).unwrap();

    let mut chart = Chart::open(&path).unwrap();
    chart.ingest().unwrap();

    assert!(!chart.connected_nodes().contains_key(&3));
    assert_eq!(1, chart.connected_nodes().len());
    assert_eq!(99, chart.features()[&7].objl);
    assert_eq!(Some(UpdateInstruction::Modify), chart.features()[&7].id.ruin);
    assert_eq!(2, chart.isolated_nodes().len());
    assert_relative_eq!(10.2, chart.isolated_nodes()[&9].point.x);
}

#[test]
fn update_chain_stops_at_the_first_gap() {
    let (dir, path) = write_base_cell();

    // Only .002 exists; with .001 missing it must not be applied.
    let mut update = ddr(&enc_schema());
    update.extend(dr(&[
        ("0001", record_identifier(1)),
        ("VRID", vrid_payload(120, 3, 2, 2)),
    ]));
    fs::write(dir.path().join("TESTCELL.002"), update).unwrap();

    let mut chart = Chart::open(&path).unwrap();
    chart.ingest().unwrap();
    assert_eq!(2, chart.connected_nodes().len());
}

#[test]
fn non_s57_file_is_rejected_on_open() {
    let mut schema = enc_schema();
    schema.retain(|field| field.tag != "DSID");
    let cell = ddr(&schema);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("PLAIN.000");
    fs::write(&path, cell).unwrap();
    assert!(Chart::open(&path).is_err());
}

#[test]
fn close_releases_everything() {
    let (_dir, path) = write_base_cell();
    let mut chart = Chart::open(&path).unwrap();
    chart.ingest().unwrap();
    chart.close();
    assert!(chart.isolated_nodes().is_empty());
    assert!(chart.features().is_empty());
    assert!(!chart.bounding_box().is_valid());
    assert!(chart.ingest().is_err());
}
