//! Access to the tabular results of a building simulation sizing run.
//!
//! All report, table and column names used by the sizing engine are built here; the rest of the
//! crate asks typed questions such as "what is this coil's design capacity".

use crate::core::equipment::OriginalCoil;
use crate::errors::SizingError;
use indexmap::IndexMap;
use serde::Deserialize;
use std::io::{BufReader, Read};

/// A tabular results store queried one scalar at a time.
pub trait SizingResults {
    fn get_scalar(&self, report: &str, table: &str, row: &str, column: &str) -> Option<f64>;
}

/// A one-shot invocation of the building simulation's sizing, producing tabular results.
pub trait SizingRun {
    fn run(&mut self) -> anyhow::Result<Box<dyn SizingResults>>;
}

type Rows = IndexMap<String, IndexMap<String, f64>>;

/// Tabular results held in memory, keyed report → table → row → column.
///
/// Row names are compared case-insensitively, as simulation reports upper-case object names.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct TabularResultsStore {
    reports: IndexMap<String, IndexMap<String, Rows>>,
}

impl TabularResultsStore {
    pub fn from_json(json: impl Read) -> anyhow::Result<Self> {
        Ok(serde_json::from_reader(BufReader::new(json))?)
    }

    pub fn insert(&mut self, report: &str, table: &str, row: &str, column: &str, value: f64) {
        self.reports
            .entry(report.to_string())
            .or_default()
            .entry(table.to_string())
            .or_default()
            .entry(row.to_uppercase())
            .or_default()
            .insert(column.to_string(), value);
    }
}

impl SizingResults for TabularResultsStore {
    fn get_scalar(&self, report: &str, table: &str, row: &str, column: &str) -> Option<f64> {
        self.reports
            .get(report)?
            .get(table)?
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(row))
            .and_then(|(_, columns)| columns.get(column))
            .copied()
    }
}

/// Sizing run whose results have already been produced, e.g. read from a file.
pub struct PrecomputedSizingRun {
    results: Option<TabularResultsStore>,
}

impl PrecomputedSizingRun {
    pub fn new(results: Option<TabularResultsStore>) -> Self {
        Self { results }
    }
}

impl SizingRun for PrecomputedSizingRun {
    fn run(&mut self) -> anyhow::Result<Box<dyn SizingResults>> {
        match self.results.take() {
            Some(results) => Ok(Box::new(results)),
            None => anyhow::bail!("no sizing run results are available"),
        }
    }
}

const COMPONENT_SIZING_REPORT: &str = "ComponentSizingSummary";
const HVAC_SIZING_REPORT: &str = "HVACSizingSummary";
const ZONE_SENSIBLE_HEATING_TABLE: &str = "Zone Sensible Heating";
const ZONE_SENSIBLE_COOLING_TABLE: &str = "Zone Sensible Cooling";
const ZONE_DESIGN_AIRFLOW_COLUMN: &str = "User Design Air Flow [m3/s]";
const COIL_SIZING_REPORT: &str = "CoilSizingDetails";
const COIL_SIZING_TABLE: &str = "Coil Sizing Summary";
const COIL_AIRFLOW_AT_PEAK_COLUMN: &str = "Coil Air Volume Flow Rate at Ideal Loads Peak [m3/s]";
const COIL_AIR_DENSITY_COLUMN: &str = "Standard Air Density Adjusted for Elevation [kg/m3]";
const COIL_AIR_HEAT_CAPACITY_COLUMN: &str = "Dry Air Heat Capacity [J/kg-K]";
const COIL_ENTERING_TEMP_COLUMN: &str = "Coil Entering Air Drybulb at Ideal Loads Peak [C]";
const COIL_LEAVING_TEMP_COLUMN: &str = "Coil Leaving Air Drybulb at Ideal Loads Peak [C]";

/// Design capacity of a coil from the component sizing results, in W
pub fn coil_design_capacity(results: &dyn SizingResults, coil: &dyn OriginalCoil) -> Option<f64> {
    results.get_scalar(
        COMPONENT_SIZING_REPORT,
        coil.component_type(),
        &coil.name().to_uppercase(),
        coil.capacity_column(),
    )
}

/// Heating design airflow of a zone, in m3/s
pub fn zone_heating_design_airflow(results: &dyn SizingResults, zone: &str) -> Option<f64> {
    results.get_scalar(
        HVAC_SIZING_REPORT,
        ZONE_SENSIBLE_HEATING_TABLE,
        &zone.to_uppercase(),
        ZONE_DESIGN_AIRFLOW_COLUMN,
    )
}

/// Cooling design airflow of a zone, in m3/s
pub fn zone_cooling_design_airflow(results: &dyn SizingResults, zone: &str) -> Option<f64> {
    results.get_scalar(
        HVAC_SIZING_REPORT,
        ZONE_SENSIBLE_COOLING_TABLE,
        &zone.to_uppercase(),
        ZONE_DESIGN_AIRFLOW_COLUMN,
    )
}

/// Air-side state of a coil at its ideal loads design peak
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoilPeakState {
    /// in m3/s
    pub airflow: f64,
    /// in kg/m3
    pub air_density: f64,
    /// in J/kg.K
    pub air_specific_heat: f64,
    /// in deg C
    pub entering_temperature: f64,
    /// in deg C
    pub leaving_temperature: f64,
}

impl CoilPeakState {
    /// Heat delivered to the air at the peak, in W
    pub fn heat_transfer_rate(&self) -> f64 {
        self.airflow
            * self.air_density
            * self.air_specific_heat
            * (self.leaving_temperature - self.entering_temperature)
    }
}

pub fn coil_peak_state(
    results: &dyn SizingResults,
    coil: &dyn OriginalCoil,
) -> Result<CoilPeakState, SizingError> {
    let row = coil.name().to_uppercase();
    let get = |column: &str| {
        results
            .get_scalar(COIL_SIZING_REPORT, COIL_SIZING_TABLE, &row, column)
            .ok_or_else(|| {
                SizingError::configuration(format!(
                    "Sizing results have no '{column}' for coil '{}'",
                    coil.name()
                ))
            })
    };

    Ok(CoilPeakState {
        airflow: get(COIL_AIRFLOW_AT_PEAK_COLUMN)?,
        air_density: get(COIL_AIR_DENSITY_COLUMN)?,
        air_specific_heat: get(COIL_AIR_HEAT_CAPACITY_COLUMN)?,
        entering_temperature: get(COIL_ENTERING_TEMP_COLUMN)?,
        leaving_temperature: get(COIL_LEAVING_TEMP_COLUMN)?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::equipment::{OriginalCoolingCoil, OriginalHeatingCoil};
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    pub(crate) fn insert_coil_peak_state(
        store: &mut TabularResultsStore,
        coil_name: &str,
        state: CoilPeakState,
    ) {
        for (column, value) in [
            (COIL_AIRFLOW_AT_PEAK_COLUMN, state.airflow),
            (COIL_AIR_DENSITY_COLUMN, state.air_density),
            (COIL_AIR_HEAT_CAPACITY_COLUMN, state.air_specific_heat),
            (COIL_ENTERING_TEMP_COLUMN, state.entering_temperature),
            (COIL_LEAVING_TEMP_COLUMN, state.leaving_temperature),
        ] {
            store.insert(COIL_SIZING_REPORT, COIL_SIZING_TABLE, coil_name, column, value);
        }
    }

    pub(crate) fn insert_zone_heating_airflow(
        store: &mut TabularResultsStore,
        zone: &str,
        airflow: f64,
    ) {
        store.insert(
            HVAC_SIZING_REPORT,
            ZONE_SENSIBLE_HEATING_TABLE,
            zone,
            ZONE_DESIGN_AIRFLOW_COLUMN,
            airflow,
        );
    }

    #[fixture]
    fn heating_coil() -> OriginalHeatingCoil {
        OriginalHeatingCoil::Gas {
            name: "RTU 1 Heating Coil".into(),
            rated_capacity: None,
        }
    }

    #[rstest]
    fn should_look_up_coil_design_capacity(heating_coil: OriginalHeatingCoil) {
        let mut store = TabularResultsStore::default();
        store.insert(
            COMPONENT_SIZING_REPORT,
            "Coil:Heating:Fuel",
            "RTU 1 HEATING COIL",
            "Design Size Nominal Capacity [W]",
            14_000.,
        );
        assert_eq!(coil_design_capacity(&store, &heating_coil), Some(14_000.));

        let cooling_coil = OriginalCoolingCoil::DxSingleSpeed {
            name: "RTU 1 Cooling Coil".into(),
            rated_capacity: None,
        };
        assert_eq!(coil_design_capacity(&store, &cooling_coil), None);
    }

    #[rstest]
    fn should_look_up_zone_airflows_case_insensitively() {
        let mut store = TabularResultsStore::default();
        insert_zone_heating_airflow(&mut store, "Office Zone", 0.62);
        assert_eq!(zone_heating_design_airflow(&store, "office zone"), Some(0.62));
        assert_eq!(zone_cooling_design_airflow(&store, "office zone"), None);
    }

    #[rstest]
    fn should_calculate_heat_transfer_rate_at_peak(heating_coil: OriginalHeatingCoil) {
        let mut store = TabularResultsStore::default();
        insert_coil_peak_state(
            &mut store,
            "RTU 1 Heating Coil",
            CoilPeakState {
                airflow: 0.5,
                air_density: 1.2,
                air_specific_heat: 1005.,
                entering_temperature: 10.,
                leaving_temperature: 30.,
            },
        );
        let state = coil_peak_state(&store, &heating_coil).unwrap();
        assert_relative_eq!(state.heat_transfer_rate(), 0.5 * 1.2 * 1005. * 20.);
    }

    #[rstest]
    fn should_fail_when_peak_state_is_missing(heating_coil: OriginalHeatingCoil) {
        let store = TabularResultsStore::default();
        assert!(matches!(
            coil_peak_state(&store, &heating_coil),
            Err(SizingError::Configuration(_))
        ));
    }

    #[rstest]
    fn should_read_results_from_json() {
        let json = r#"{"HVACSizingSummary": {"Zone Sensible Cooling": {"ZONE 1": {"User Design Air Flow [m3/s]": 0.8}}}}"#;
        let store = TabularResultsStore::from_json(json.as_bytes()).unwrap();
        assert_eq!(zone_cooling_design_airflow(&store, "Zone 1"), Some(0.8));
    }

    #[rstest]
    fn should_run_precomputed_sizing_once() {
        let mut run = PrecomputedSizingRun::new(Some(TabularResultsStore::default()));
        assert!(run.run().is_ok());
        assert!(run.run().is_err());
    }
}
