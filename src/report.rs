//! CSV and JSON export of run results.
//!
//! The writer functions take any [`Write`] so that callers can target files, buffers or standard
//! output; the `*_file` variants create (or truncate) the file at the given path.

use crate::{
    engine::{DaySnapshot, SimulationHistory},
    error::EpiError,
    runner::SimulationOutput,
};
use serde::Serialize;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

// `DaySnapshot` nests its severity counts, which CSV cannot represent.
#[derive(Serialize)]
struct SnapshotRow {
    day: u32,
    susceptible: usize,
    exposed: usize,
    infectious: usize,
    recovered: usize,
    deceased: usize,
    vaccinated: usize,
    asymptomatic: usize,
    mild: usize,
    severe: usize,
    hospitalized: usize,
    critical: usize,
    new_infections: usize,
    new_deaths: usize,
    new_hospitalizations: usize,
    cumulative_infections: usize,
    cumulative_recoveries: usize,
    cumulative_deaths: usize,
    cumulative_hospitalizations: usize,
    cumulative_vaccinations: usize,
}

impl From<&DaySnapshot> for SnapshotRow {
    fn from(s: &DaySnapshot) -> Self {
        SnapshotRow {
            day: s.day,
            susceptible: s.susceptible,
            exposed: s.exposed,
            infectious: s.infectious,
            recovered: s.recovered,
            deceased: s.deceased,
            vaccinated: s.vaccinated,
            asymptomatic: s.severity.asymptomatic,
            mild: s.severity.mild,
            severe: s.severity.severe,
            hospitalized: s.severity.hospitalized,
            critical: s.severity.critical,
            new_infections: s.new_infections,
            new_deaths: s.new_deaths,
            new_hospitalizations: s.new_hospitalizations,
            cumulative_infections: s.cumulative_infections,
            cumulative_recoveries: s.cumulative_recoveries,
            cumulative_deaths: s.cumulative_deaths,
            cumulative_hospitalizations: s.cumulative_hospitalizations,
            cumulative_vaccinations: s.cumulative_vaccinations,
        }
    }
}

/// Writes one row per simulated day.
pub fn write_history_csv<W: Write>(history: &SimulationHistory, writer: W) -> Result<(), EpiError> {
    let mut csv = csv::Writer::from_writer(writer);
    for snapshot in &history.snapshots {
        csv.serialize(SnapshotRow::from(snapshot))?;
    }
    csv.flush()?;
    Ok(())
}

/// Writes one `infector,infectee,day` row per transmission.
pub fn write_lineage_csv<W: Write>(history: &SimulationHistory, writer: W) -> Result<(), EpiError> {
    let mut csv = csv::Writer::from_writer(writer);
    for edge in &history.lineage {
        csv.serialize(edge)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_output_json<W: Write>(output: &SimulationOutput, writer: W) -> Result<(), EpiError> {
    serde_json::to_writer_pretty(writer, output)?;
    Ok(())
}

pub fn write_history_csv_file(
    history: &SimulationHistory,
    path: impl AsRef<Path>,
) -> Result<(), EpiError> {
    write_history_csv(history, File::create(path)?)
}

pub fn write_lineage_csv_file(
    history: &SimulationHistory,
    path: impl AsRef<Path>,
) -> Result<(), EpiError> {
    write_lineage_csv(history, File::create(path)?)
}

pub fn write_output_json_file(
    output: &SimulationOutput,
    path: impl AsRef<Path>,
) -> Result<(), EpiError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_output_json(output, &mut writer)?;
    writer.flush()?;
    Ok(())
}
