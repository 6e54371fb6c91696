#![allow(clippy::too_many_arguments)]

mod compare_floats;
pub mod core;
pub mod errors;
pub mod input;
pub mod output;
pub mod retrofit;
pub mod sizing_results;

#[macro_use]
extern crate is_close;

pub use crate::retrofit::{ModelSizingResult, UnitSizingResult};
use crate::core::performance::dataset::PerformanceDataset;
use crate::core::units::cfm_per_ton;
use crate::errors::RetrofitError;
use crate::input::ingest_retrofit_request;
use crate::output::Output;
use crate::retrofit::RetrofitSizer;
use crate::sizing_results::{PrecomputedSizingRun, SizingRun, TabularResultsStore};
use csv::WriterBuilder;
use std::io::Read;
use std::sync::Arc;
use tracing::info;

/// Size every unit of a retrofit request and write the results out.
///
/// Arguments:
/// * `performance_dataset` - JSON performance dataset of the replacement product family
/// * `request` - JSON retrofit request
/// * `sizing_results` - tabular results of a sizing run, used when the request asks for finer
///                      design loads
/// * `output` - where the stages, summary and diagnostics files go
pub fn run_project(
    performance_dataset: impl Read,
    request: impl Read,
    sizing_results: Option<TabularResultsStore>,
    output: &impl Output,
) -> anyhow::Result<ModelSizingResult> {
    let dataset = PerformanceDataset::from_json(performance_dataset)?;
    let request = ingest_retrofit_request(request).map_err(RetrofitError::InvalidRequest)?;

    let sizer = RetrofitSizer::new(Arc::new(dataset));
    let mut sizing_run = sizing_results.map(|results| PrecomputedSizingRun::new(Some(results)));
    let model = sizer.size_model(
        &request,
        sizing_run.as_mut().map(|run| run as &mut dyn SizingRun),
    )?;

    if !output.is_noop() {
        write_stages_file(output, &model)?;
        write_summary_file(output, &model)?;
        write_diagnostics_file(output, &model)?;
    }

    Ok(model)
}

fn write_stages_file(output: &impl Output, model: &ModelSizingResult) -> anyhow::Result<()> {
    let output_key = "stages";
    info!("writing out to {output_key}");
    let writer = output.writer_for_location_key(output_key)?;
    let mut writer = WriterBuilder::new().flexible(true).from_writer(writer);

    writer.write_record([
        "Unit",
        "Track",
        "Speed",
        "Stage",
        "Source stage",
        "Gross capacity",
        "Airflow",
        "Airflow per capacity",
        "COP",
        "Sensible heat ratio",
        "Capacity fT curve",
        "Capacity fFF curve",
        "EIR fT curve",
        "EIR fFF curve",
        "PLF fPLR curve",
    ])?;
    writer.write_record([
        "", "", "[count]", "[count]", "[count]", "[W]", "[m3/s]", "[cfm/ton]", "[ratio]",
        "[ratio]", "", "", "", "", "",
    ])?;

    for (unit, result) in &model.units {
        for (track, description) in [
            ("heating", &result.equipment.heating),
            ("cooling", &result.equipment.cooling),
        ] {
            for stage in description.stages() {
                writer.write_record([
                    unit.clone(),
                    track.to_string(),
                    stage.speed.to_string(),
                    stage.stage.to_string(),
                    stage.source_stage.to_string(),
                    stage.gross_capacity.to_string(),
                    stage.airflow.to_string(),
                    cfm_per_ton(stage.airflow, stage.gross_capacity).to_string(),
                    stage.cop.to_string(),
                    stage
                        .sensible_heat_ratio
                        .map(|shr| shr.to_string())
                        .unwrap_or_default(),
                    stage.curves.capacity_ft.clone(),
                    stage.curves.capacity_ff.clone(),
                    stage.curves.eir_ft.clone(),
                    stage.curves.eir_ff.clone(),
                    stage.curves.plf_plr.clone(),
                ])?;
            }
        }
    }

    writer.flush()?;
    Ok(())
}

fn write_summary_file(output: &impl Output, model: &ModelSizingResult) -> anyhow::Result<()> {
    let output_key = "summary";
    info!("writing out to {output_key}");
    let writer = output.writer_for_location_key(output_key)?;
    let mut writer = WriterBuilder::new().flexible(true).from_writer(writer);

    writer.write_record([
        "Unit",
        "Regime",
        "Reference heating capacity",
        "Sizing temperature",
        "Sizing load",
        "Derate fraction",
        "Required heating capacity",
        "Rated heating capacity",
        "Rated cooling capacity",
        "Heating stages",
        "Cooling stages",
        "Heating COP",
        "Cooling COP",
        "Crankcase heater power",
    ])?;
    writer.write_record([
        "", "", "[W]", "[deg C]", "[W]", "[ratio]", "[W]", "[W]", "[W]", "[count]", "[count]",
        "[ratio]", "[ratio]", "[W]",
    ])?;

    for (unit, result) in &model.units {
        let decision = &result.decision;
        writer.write_record([
            unit.clone(),
            decision.regime.to_string(),
            result.reference_heating_capacity.to_string(),
            result.sizing_temperature.to_string(),
            result.sizing_load.to_string(),
            result.derate_fraction.to_string(),
            result.required_heating_capacity.to_string(),
            decision.rated_heating_capacity.to_string(),
            decision.rated_cooling_capacity.to_string(),
            result.equipment.heating.stages().len().to_string(),
            result.equipment.cooling.stages().len().to_string(),
            result.heating_performance.adjusted_cop.to_string(),
            result.cooling_performance.adjusted_cop.to_string(),
            result.equipment.crankcase_heater_power.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

fn write_diagnostics_file(output: &impl Output, model: &ModelSizingResult) -> anyhow::Result<()> {
    let output_key = "diagnostics";
    info!("writing out to {output_key}");
    let writer = output.writer_for_location_key(output_key)?;
    let mut writer = WriterBuilder::new().from_writer(writer);

    writer.write_record(["Unit", "Severity", "Kind", "Message"])?;
    for (unit, result) in &model.units {
        for message in &result.diagnostics {
            writer.write_record([
                unit.clone(),
                message.severity.to_string(),
                message.kind.to_string(),
                message.message.clone(),
            ])?;
        }
    }
    for skipped in &model.skipped {
        for message in &skipped.diagnostics {
            writer.write_record([
                skipped.unit.clone(),
                message.severity.to_string(),
                message.kind.to_string(),
                message.message.clone(),
            ])?;
        }
        writer.write_record([skipped.unit.as_str(), "error", "unit_skipped", skipped.error.as_str()])?;
    }

    writer.flush()?;
    Ok(())
}
