use log::warn;
use s57chart::iso8211::{Module, SubfieldKind};
use s57chart::s57::{LongName, RecordName};
use s57chart::{Chart, Result};
use std::process::ExitCode;

const USAGE: &str = "usage: s57chart <cell.000> [--dump]";

pub fn main() -> ExitCode {
    env_logger::init();

    let mut path = None;
    let mut dump = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--dump" => dump = true,
            "--help" | "-h" => {
                println!("{USAGE}");
                return ExitCode::SUCCESS;
            }
            _ => path = Some(arg),
        }
    }
    let Some(path) = path else {
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    };

    let outcome = if dump {
        dump_records(&path)
    } else {
        ingest_summary(&path)
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}

/// Ingest the cell (with any update files) and print what the chart holds.
fn ingest_summary(path: &str) -> Result<()> {
    let mut chart = Chart::open(path)?;
    chart.ingest()?;
    println!("Data set: {}", chart.data_set_name());
    println!("Compilation scale: 1:{}", chart.compilation_scale());
    println!(
        "Records: {} isolated nodes, {} connected nodes, {} edges, {} features",
        chart.isolated_nodes().len(),
        chart.connected_nodes().len(),
        chart.edges().len(),
        chart.features().len()
    );
    let bbox = chart.bounding_box();
    if bbox.is_valid() {
        println!(
            "Coverage: ({}, {}) to ({}, {})",
            bbox.min_x(),
            bbox.min_y(),
            bbox.max_x(),
            bbox.max_y()
        );
    }
    Ok(())
}

/// Walk every record of the module and print each subfield value, decoded
/// according to the schema.
fn dump_records(path: &str) -> Result<()> {
    let mut module = Module::open(path)?;
    let mut record_number = 0usize;
    loop {
        let record = match module.read_record() {
            Ok(Some(record)) => record,
            Ok(None) => break,
            Err(error) => {
                warn!("Rejecting record: {error}");
                continue;
            }
        };
        record_number += 1;
        println!("Record {record_number} ({} bytes)", record.data_size());
        for field in record.fields() {
            let def = field.def();
            println!("Field {}: {}", def.tag(), def.name());
            if def.subfield_count() == 0 {
                println!("    {}", hex_string(field.data()));
                continue;
            }
            let data = field.data();
            let mut offset = 0usize;
            for _ in 0..field.repeat_count() {
                for sub in def.subfields() {
                    if offset >= data.len() {
                        break;
                    }
                    let rest = &data[offset..];
                    let consumed = match sub.kind() {
                        SubfieldKind::Int => {
                            let (value, consumed) = sub.extract_long(rest);
                            println!("    {:>8} = {value}", sub.label());
                            consumed
                        }
                        SubfieldKind::Float => {
                            let (value, consumed) = sub.extract_double(rest);
                            println!("    {:>8} = {value}", sub.label());
                            consumed
                        }
                        SubfieldKind::String => {
                            let (value, consumed) = sub.extract_string(rest);
                            println!("    {:>8} = {value}", sub.label());
                            consumed
                        }
                        SubfieldKind::BinaryString => {
                            let (bytes, consumed) = sub.extract_binary(rest);
                            println!("    {:>8} = {}", sub.label(), hex_string(bytes));
                            match sub.label() {
                                "NAME" => {
                                    if let Some(name) = RecordName::from_bytes(bytes) {
                                        println!("    {:>8}   ({name})", "");
                                    }
                                }
                                "LNAM" => {
                                    if let Some(name) = LongName::from_bytes(bytes) {
                                        println!("    {:>8}   ({name})", "");
                                    }
                                }
                                _ => {}
                            }
                            consumed
                        }
                    };
                    if consumed == 0 {
                        break;
                    }
                    offset += consumed;
                }
            }
        }
    }
    Ok(())
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
