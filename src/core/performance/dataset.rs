use crate::core::performance::curve::PerformanceCurve;
use crate::core::sizing::staging::{
    check_rated_stage, stage_points, StagePerformancePoint, Track,
};
use crate::errors::SizingError;
use crate::input::{
    CopRegressionInput, DefrostInput, PerformanceDatasetInput, StageCurveNames, StagingRecord,
};
use indexmap::IndexMap;
use std::io::{BufReader, Read};
use tracing::debug;

/// Validated manufacturer performance data for one product family, loaded once and shared
/// read-only between all units being sized.
#[derive(Debug)]
pub struct PerformanceDataset {
    scenario: Option<String>,
    curves: IndexMap<String, PerformanceCurve>,
    staging: StagingDefinition,
}

/// How one product family stages, with its reference data per stage.
#[derive(Clone, Debug)]
pub struct StagingDefinition {
    pub heating: TrackDefinition,
    pub cooling: TrackDefinition,
    pub cycling_losses: bool,
    pub heating_capacity_derate_curve: String,
    pub defrost: DefrostInput,
    /// in deg C
    pub minimum_compressor_outdoor_temperature: Option<f64>,
}

#[derive(Clone, Debug)]
pub struct TrackDefinition {
    pub points: Vec<StagePerformancePoint>,
    pub rated_stage: usize,
    pub reference_cfm_per_ton: f64,
    pub cop_regression: CopRegressionInput,
    pub stage_curves: Vec<StageCurveNames>,
    pub eir_ff_curve: String,
}

impl PerformanceDataset {
    pub fn from_json(json: impl Read) -> Result<Self, SizingError> {
        let input: PerformanceDatasetInput = serde_json::from_reader(BufReader::new(json))
            .map_err(|err| {
                SizingError::configuration(format!("Could not read performance dataset: {err}"))
            })?;
        Self::from_input(input)
    }

    pub fn from_input(input: PerformanceDatasetInput) -> Result<Self, SizingError> {
        let curves = input
            .curves
            .iter()
            .map(|(name, record)| Ok((name.clone(), PerformanceCurve::from_record(name, record)?)))
            .collect::<Result<IndexMap<_, _>, SizingError>>()?;

        let staging = StagingDefinition::from_record(input.staging)?;
        let dataset = Self {
            scenario: input.scenario,
            curves,
            staging,
        };
        dataset.check_curve_references()?;

        debug!(
            scenario = dataset.scenario.as_deref().unwrap_or("unnamed"),
            curves = dataset.curves.len(),
            "Loaded performance dataset"
        );
        Ok(dataset)
    }

    pub fn scenario(&self) -> Option<&str> {
        self.scenario.as_deref()
    }

    pub fn staging(&self) -> &StagingDefinition {
        &self.staging
    }

    pub fn curve(&self, name: &str) -> Result<&PerformanceCurve, SizingError> {
        self.curves.get(name).ok_or_else(|| {
            SizingError::configuration(format!(
                "Performance dataset has no curve named '{name}'"
            ))
        })
    }

    fn check_curve_references(&self) -> Result<(), SizingError> {
        let staging = &self.staging;
        let stage_curve_names = staging
            .heating
            .stage_curves
            .iter()
            .chain(staging.cooling.stage_curves.iter())
            .flat_map(|curves| {
                [
                    &curves.capacity_ft,
                    &curves.capacity_ff,
                    &curves.eir_ft,
                    &curves.eir_ff,
                    &curves.plf_plr,
                ]
            });
        for name in stage_curve_names
            .chain([
                &staging.heating_capacity_derate_curve,
                &staging.heating.eir_ff_curve,
                &staging.cooling.eir_ff_curve,
            ])
            .chain(staging.defrost.eir_curve.as_ref())
        {
            self.curve(name)?;
        }
        Ok(())
    }
}

impl StagingDefinition {
    fn from_record(record: StagingRecord) -> Result<Self, SizingError> {
        let heating = TrackDefinition::new(
            Track::Heating,
            stage_points(
                Track::Heating,
                record.heating_stage_count,
                &record.heating_capacity_fractions,
                &record.heating_flow_fractions,
                &record.heating_cop_fractions,
                None,
            )?,
            record.rated_heating_stage,
            record.reference_heating_cfm_per_ton,
            record.cop_regression.heating,
            record.heating_stage_curves,
            record.heating_eir_ff_curve,
        )?;
        let cooling = TrackDefinition::new(
            Track::Cooling,
            stage_points(
                Track::Cooling,
                record.cooling_stage_count,
                &record.cooling_capacity_fractions,
                &record.cooling_flow_fractions,
                &record.cooling_cop_fractions,
                record.cooling_sensible_heat_ratios.as_deref(),
            )?,
            record.rated_cooling_stage,
            record.reference_cooling_cfm_per_ton,
            record.cop_regression.cooling,
            record.cooling_stage_curves,
            record.cooling_eir_ff_curve,
        )?;

        Ok(Self {
            heating,
            cooling,
            cycling_losses: record.cycling_losses,
            heating_capacity_derate_curve: record.heating_capacity_derate_curve,
            defrost: record.defrost,
            minimum_compressor_outdoor_temperature: record.minimum_compressor_outdoor_temperature,
        })
    }

    pub fn track(&self, track: Track) -> &TrackDefinition {
        match track {
            Track::Heating => &self.heating,
            Track::Cooling => &self.cooling,
        }
    }
}

impl TrackDefinition {
    fn new(
        track: Track,
        points: Vec<StagePerformancePoint>,
        rated_stage: usize,
        reference_cfm_per_ton: f64,
        cop_regression: CopRegressionInput,
        stage_curves: Vec<StageCurveNames>,
        eir_ff_curve: String,
    ) -> Result<Self, SizingError> {
        check_rated_stage(track, &points, rated_stage)?;
        if stage_curves.len() != points.len() {
            return Err(SizingError::configuration(format!(
                "{} {track} stage curve sets given for {} stages",
                stage_curves.len(),
                points.len()
            )));
        }
        if reference_cfm_per_ton <= 0. {
            return Err(SizingError::configuration(format!(
                "Reference {track} airflow per capacity must be positive"
            )));
        }
        if cop_regression.minimum > cop_regression.maximum {
            return Err(SizingError::configuration(format!(
                "{track} COP regression minimum {} is above its maximum {}",
                cop_regression.minimum, cop_regression.maximum
            )));
        }

        Ok(Self {
            points,
            rated_stage,
            reference_cfm_per_ton,
            cop_regression,
            stage_curves,
            eir_ff_curve,
        })
    }

    /// Curves describing the given 1-based stage
    pub fn curves_for(&self, stage: usize) -> &StageCurveNames {
        &self.stage_curves[stage - 1]
    }

    pub fn point(&self, stage: usize) -> &StagePerformancePoint {
        &self.points[stage - 1]
    }
}
