use crate::core::equipment::{OriginalCoolingCoil, OriginalHeatingCoil};
use anyhow::{anyhow, bail};
use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::io::{BufReader, Read};

pub fn ingest_retrofit_request(json: impl Read) -> anyhow::Result<RetrofitInput> {
    let reader = BufReader::new(json);
    let input: RetrofitInput = serde_json::from_reader(reader)?;
    input.check()?;
    Ok(input)
}

/// Manufacturer performance data for one performance scenario (product family).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PerformanceDatasetInput {
    #[serde(default)]
    pub scenario: Option<String>,
    pub curves: IndexMap<String, CurveRecord>,
    pub staging: StagingRecord,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CurveRecord {
    ClosedForm {
        form: String,
        coefficients: Vec<f64>,
        minimum_values: Option<Vec<Option<f64>>>,
        maximum_values: Option<Vec<Option<f64>>>,
        minimum_output: Option<f64>,
        maximum_output: Option<f64>,
    },
    Table {
        independent_variable_arrays: Vec<Vec<f64>>,
        output_values: Vec<f64>,
        #[serde(default)]
        interpolation_method: InterpolationMethod,
        normalization_divisor: Option<f64>,
    },
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
pub enum InterpolationMethod {
    #[default]
    #[serde(alias = "linear", alias = "LinearInterpolationOfTable")]
    Linear,
}

/// The distinguished record describing how the equipment stages.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StagingRecord {
    pub heating_stage_count: usize,
    pub cooling_stage_count: usize,
    pub rated_heating_stage: usize,
    pub rated_cooling_stage: usize,
    #[serde(deserialize_with = "deserialize_fraction_list")]
    pub heating_capacity_fractions: Vec<f64>,
    #[serde(deserialize_with = "deserialize_fraction_list")]
    pub heating_flow_fractions: Vec<f64>,
    #[serde(deserialize_with = "deserialize_fraction_list")]
    pub heating_cop_fractions: Vec<f64>,
    #[serde(deserialize_with = "deserialize_fraction_list")]
    pub cooling_capacity_fractions: Vec<f64>,
    #[serde(deserialize_with = "deserialize_fraction_list")]
    pub cooling_flow_fractions: Vec<f64>,
    #[serde(deserialize_with = "deserialize_fraction_list")]
    pub cooling_cop_fractions: Vec<f64>,
    #[serde(default, deserialize_with = "deserialize_optional_fraction_list")]
    pub cooling_sensible_heat_ratios: Option<Vec<f64>>,
    pub reference_heating_cfm_per_ton: f64,
    pub reference_cooling_cfm_per_ton: f64,
    pub cycling_losses: bool,
    pub cop_regression: CopRegressionRecords,
    pub heating_stage_curves: Vec<StageCurveNames>,
    pub cooling_stage_curves: Vec<StageCurveNames>,
    pub heating_capacity_derate_curve: String,
    pub heating_eir_ff_curve: String,
    pub cooling_eir_ff_curve: String,
    pub defrost: DefrostInput,
    pub minimum_compressor_outdoor_temperature: Option<f64>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CopRegressionRecords {
    pub heating: CopRegressionInput,
    pub cooling: CopRegressionInput,
}

/// Linear regression of rated COP against rated capacity (in kW)
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CopRegressionInput {
    pub intercept: f64,
    pub coefficient: f64,
    pub minimum: f64,
    pub maximum: f64,
}

/// Names of the performance curves describing one stage
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StageCurveNames {
    pub capacity_ft: String,
    pub capacity_ff: String,
    pub eir_ft: String,
    pub eir_ff: String,
    pub plf_plr: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DefrostInput {
    pub strategy: DefrostStrategy,
    pub control: DefrostControl,
    pub maximum_outdoor_temperature: f64,
    #[serde(default)]
    pub eir_curve: Option<String>,
    #[serde(default)]
    pub time_period_fraction: Option<f64>,
    #[serde(default)]
    pub resistive_heater_capacity: Option<f64>,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub enum DefrostStrategy {
    ReverseCycle,
    Resistive,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub enum DefrostControl {
    Timed,
    OnDemand,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FractionList {
    Values(Vec<f64>),
    Literal(String),
}

fn deserialize_fraction_list<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match FractionList::deserialize(deserializer)? {
        FractionList::Values(values) => Ok(values),
        FractionList::Literal(literal) => parse_list_literal(&literal).map_err(D::Error::custom),
    }
}

fn deserialize_optional_fraction_list<'de, D>(deserializer: D) -> Result<Option<Vec<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_fraction_list(deserializer).map(Some)
}

/// Parse a list literal such as `"[0.36, 0.64, 1.0]"` into its values.
pub(crate) fn parse_list_literal(literal: &str) -> anyhow::Result<Vec<f64>> {
    let inner = literal
        .trim()
        .strip_prefix('[')
        .and_then(|l| l.strip_suffix(']'))
        .ok_or_else(|| anyhow!("Expected a list literal in square brackets, found '{literal}'"))?;

    inner
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<f64>()
                .map_err(|_| anyhow!("Could not read '{item}' in list literal '{literal}'"))
        })
        .collect()
}

/// A request to size the retrofit of every listed air handling unit.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrofitInput {
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default)]
    pub stage_parity: StageParity,
    pub sizing_parameters: SizingParameters,
    /// Coldest outdoor dry bulb temperature of the heating design days, in deg C
    pub heating_design_day_minimum_temperature: f64,
    pub units: IndexMap<String, UnitInput>,
}

impl RetrofitInput {
    fn check(&self) -> anyhow::Result<()> {
        let params = &self.sizing_parameters;
        if params.heating_to_cooling_ratio <= 0. {
            bail!("heating_to_cooling_ratio must be positive");
        }
        if params.cooling_upsizing_estimate <= 0. {
            bail!("cooling_upsizing_estimate must be positive");
        }
        if params.maximum_oversizing < 0. {
            bail!("maximum_oversizing may not be negative");
        }
        if self.units.is_empty() {
            bail!("No air handling units were provided for sizing");
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SizingParameters {
    #[serde(default = "default_cooling_upsizing_estimate")]
    pub cooling_upsizing_estimate: f64,
    pub maximum_oversizing: f64,
    pub heating_to_cooling_ratio: f64,
    /// Outdoor temperature the heating capacity is sized for, in deg C
    pub sizing_outdoor_temperature: f64,
    /// Whether to run the sizing simulation once to obtain finer design loads
    #[serde(default)]
    pub use_finer_design_loads: bool,
    pub rated_heating_cop: Option<f64>,
    pub rated_cooling_cop: Option<f64>,
}

fn default_cooling_upsizing_estimate() -> f64 {
    1.0
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitInput {
    /// Zone served by the unit, used to look up zone sizing results
    pub zone: Option<String>,
    pub original_cooling_coil: OriginalCoolingCoil,
    pub original_heating_coil: OriginalHeatingCoil,
    /// Minimum outdoor air flow rate, in m3/s
    pub minimum_outdoor_air_flow: f64,
    /// Design airflow of the terminal serving the zone, in m3/s
    pub terminal_design_airflow: Option<f64>,
}

/// What to do when sizing of one unit fails
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    SkipUnit,
    AbortRun,
}

/// Whether heating and cooling must expose the same number of stages
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StageParity {
    #[default]
    Matched,
    Independent,
}
