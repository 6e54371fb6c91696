//! Sizes the replacement heat pump of every air handling unit in a retrofit request.

use crate::core::diagnostics::{Diagnostics, SizingMessage};
use crate::core::equipment::OriginalCoil;
use crate::core::performance::dataset::{PerformanceDataset, TrackDefinition};
use crate::core::sizing::assembler::{assemble, AssembledEquipment, AssemblyInput, TrackAssembly};
use crate::core::sizing::decision::{decide, SizingDecision, SizingDecisionInput};
use crate::core::sizing::derating::{derate, required_rated_capacity};
use crate::core::sizing::design_load::{
    rated_heating_indoor_temperature, reference_capacity_from_run, DesignLoadLine,
    ReferenceHeatingCapacity,
};
use crate::core::sizing::rated_performance::{
    adjust_rated_performance, RatedPerformance, RatedPerformanceInput,
};
use crate::core::sizing::stage_resolver::{resolve_stages, StageResolverInput};
use crate::core::sizing::staging::{FinalizedStagingPlan, Track};
use crate::errors::{RetrofitError, SizingError};
use crate::input::{FailurePolicy, RetrofitInput, SizingParameters, StageParity, UnitInput};
use crate::sizing_results::{
    coil_design_capacity, zone_cooling_design_airflow, zone_heating_design_airflow,
    SizingResults, SizingRun,
};
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything known about one unit before sizing starts.
#[derive(Clone, Debug, PartialEq)]
pub struct SizingContext {
    /// in W
    pub original_cooling_capacity: f64,
    /// in W
    pub original_heating_capacity: f64,
    pub parameters: SizingParameters,
    /// in deg C
    pub heating_design_day_temperature: f64,
    /// in m3/s
    pub minimum_outdoor_air_flow: f64,
    /// in m3/s
    pub terminal_design_airflow: f64,
    /// in m3/s
    pub zone_heating_design_airflow: Option<f64>,
    /// Heat delivered by the original heating coil at its simulated peak, in W
    pub finer_reference_capacity: Option<f64>,
}

impl SizingContext {
    /// Arguments:
    /// * `unit_name` - name of the air handling unit, for reporting
    /// * `unit` - the unit as given in the request
    /// * `request` - the whole retrofit request
    /// * `results` - results of the sizing run, when one was made; they fill in autosized coil
    ///               capacities and airflows, and give finer design loads when those were requested
    pub fn build(
        unit_name: &str,
        unit: &UnitInput,
        request: &RetrofitInput,
        results: Option<&dyn SizingResults>,
    ) -> Result<Self, SizingError> {
        let cooling_coil = &unit.original_cooling_coil;
        let heating_coil = &unit.original_heating_coil;
        let zone = unit.zone.as_deref();

        let original_cooling_capacity = coil_capacity(cooling_coil, results)?;
        let original_heating_capacity = coil_capacity(heating_coil, results)?;

        let terminal_design_airflow = match (unit.terminal_design_airflow, results, zone) {
            (Some(airflow), _, _) => airflow,
            (None, Some(results), Some(zone)) => zone_cooling_design_airflow(results, zone)
                .ok_or_else(|| {
                    SizingError::configuration(format!(
                        "Sizing results have no cooling design airflow for zone '{zone}'"
                    ))
                })?,
            _ => {
                return Err(SizingError::configuration(format!(
                    "Unit '{unit_name}' has no terminal design airflow"
                )))
            }
        };

        let finer_results = results.filter(|_| request.sizing_parameters.use_finer_design_loads);
        let (zone_heating_design_airflow, finer_reference_capacity) = match finer_results {
            Some(results) => (
                zone.and_then(|zone| zone_heating_design_airflow(results, zone)),
                Some(reference_capacity_from_run(results, heating_coil)?.value()),
            ),
            None => (None, None),
        };

        debug!(
            unit = unit_name,
            replaces_heat_pump = heating_coil.is_heat_pump(),
            original_cooling_capacity,
            original_heating_capacity,
            "Built sizing context"
        );

        Ok(Self {
            original_cooling_capacity,
            original_heating_capacity,
            parameters: request.sizing_parameters.clone(),
            heating_design_day_temperature: request.heating_design_day_minimum_temperature,
            minimum_outdoor_air_flow: unit.minimum_outdoor_air_flow,
            terminal_design_airflow,
            zone_heating_design_airflow,
            finer_reference_capacity,
        })
    }

    fn reference_heating_capacity(&self) -> ReferenceHeatingCapacity {
        match self.finer_reference_capacity {
            Some(capacity) => ReferenceHeatingCapacity::SimulationPeak(capacity),
            None => ReferenceHeatingCapacity::Nameplate(self.original_heating_capacity),
        }
    }
}

fn coil_capacity(
    coil: &dyn OriginalCoil,
    results: Option<&dyn SizingResults>,
) -> Result<f64, SizingError> {
    coil.rated_capacity()
        .or_else(|| results.and_then(|results| coil_design_capacity(results, coil)))
        .ok_or_else(|| {
            SizingError::configuration(format!(
                "Coil '{}' has no rated capacity and none was found in the sizing results",
                coil.name()
            ))
        })
}

/// The outcome of sizing one unit, handed to the model-editing layer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UnitSizingResult {
    /// in W
    pub reference_heating_capacity: f64,
    /// in deg C
    pub sizing_temperature: f64,
    /// in W
    pub sizing_load: f64,
    pub derate_fraction: f64,
    /// in W
    pub required_heating_capacity: f64,
    pub decision: SizingDecision,
    pub heating_plan: FinalizedStagingPlan,
    pub cooling_plan: FinalizedStagingPlan,
    pub heating_performance: RatedPerformance,
    pub cooling_performance: RatedPerformance,
    pub equipment: AssembledEquipment,
    pub diagnostics: Vec<SizingMessage>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SkippedUnit {
    pub unit: String,
    pub error: String,
    pub diagnostics: Vec<SizingMessage>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ModelSizingResult {
    pub units: IndexMap<String, UnitSizingResult>,
    pub skipped: Vec<SkippedUnit>,
}

/// Sizes units one after another against a shared performance dataset.
pub struct RetrofitSizer {
    dataset: Arc<PerformanceDataset>,
}

impl RetrofitSizer {
    pub fn new(dataset: Arc<PerformanceDataset>) -> Self {
        Self { dataset }
    }

    /// Size every unit of the request.
    ///
    /// A given sizing run is invoked once up front, and must be given when finer design loads are
    /// requested; its failure aborts the whole model. Failures of single units are handled per the
    /// request's failure policy.
    pub fn size_model(
        &self,
        request: &RetrofitInput,
        sizing_run: Option<&mut dyn SizingRun>,
    ) -> Result<ModelSizingResult, RetrofitError> {
        let use_finer_design_loads = request.sizing_parameters.use_finer_design_loads;
        let results = match sizing_run {
            Some(sizing_run) => {
                info!("Running sizing simulation");
                let results = sizing_run.run().map_err(|err| {
                    RetrofitError::ModelAborted(SizingError::ExternalRunFailure(err.to_string()))
                })?;
                if !use_finer_design_loads {
                    info!("Finer design loads were not requested, sizing results only fill in autosized coil capacities and airflows");
                }
                Some(results)
            }
            None if use_finer_design_loads => {
                return Err(RetrofitError::ModelAborted(SizingError::ExternalRunFailure(
                    "finer design loads were requested but no sizing run is available".to_string(),
                )))
            }
            None => None,
        };

        let mut model = ModelSizingResult::default();
        for (unit_name, unit) in &request.units {
            info!(unit = unit_name.as_str(), "Sizing unit");
            let mut diagnostics = Diagnostics::new();
            let sized = SizingContext::build(unit_name, unit, request, results.as_deref())
                .and_then(|context| {
                    self.size_unit(&context, request.stage_parity, &mut diagnostics)
                });

            match sized {
                Ok(mut result) => {
                    result.diagnostics = diagnostics.into_messages();
                    info!(
                        unit = unit_name.as_str(),
                        regime = %result.decision.regime,
                        "Sized unit"
                    );
                    model.units.insert(unit_name.clone(), result);
                }
                Err(err) => match request.failure_policy {
                    FailurePolicy::AbortRun => return Err(RetrofitError::in_unit(unit_name, err)),
                    FailurePolicy::SkipUnit => {
                        warn!(unit = unit_name.as_str(), "Skipping unit: {err}");
                        model.skipped.push(SkippedUnit {
                            unit: unit_name.clone(),
                            error: err.to_string(),
                            diagnostics: diagnostics.into_messages(),
                        });
                    }
                },
            }
        }

        Ok(model)
    }

    /// Size one unit: design load, derating, regime, stages, rated efficiency, then assembly.
    pub fn size_unit(
        &self,
        context: &SizingContext,
        parity: StageParity,
        diagnostics: &mut Diagnostics,
    ) -> Result<UnitSizingResult, SizingError> {
        let dataset = self.dataset.as_ref();
        let staging = dataset.staging();
        let parameters = &context.parameters;

        let reference = context.reference_heating_capacity();
        let load_line =
            DesignLoadLine::calibrate(reference, context.heating_design_day_temperature)?;
        let sizing = load_line.sizing_load(parameters.sizing_outdoor_temperature, diagnostics);

        let derate_curve_name = staging.heating_capacity_derate_curve.as_str();
        let derate_fraction = derate(
            derate_curve_name,
            dataset.curve(derate_curve_name)?,
            rated_heating_indoor_temperature(),
            sizing.temperature,
            diagnostics,
        )?;
        let required_heating_capacity = required_rated_capacity(sizing.load, derate_fraction);

        let decision = decide(
            &SizingDecisionInput {
                original_cooling_capacity: context.original_cooling_capacity,
                cooling_upsizing_estimate: parameters.cooling_upsizing_estimate,
                maximum_oversizing: parameters.maximum_oversizing,
                heating_to_cooling_ratio: parameters.heating_to_cooling_ratio,
                required_heating_capacity,
                cooling_design_airflow: context.terminal_design_airflow,
                zone_heating_design_airflow: context.zone_heating_design_airflow,
            },
            diagnostics,
        )?;

        let heating_plan = resolve_track(
            Track::Heating,
            &staging.heating,
            decision.rated_heating_capacity,
            decision.design_heating_airflow,
            context.minimum_outdoor_air_flow,
            diagnostics,
        )?;
        let cooling_plan = resolve_track(
            Track::Cooling,
            &staging.cooling,
            decision.rated_cooling_capacity,
            decision.design_cooling_airflow,
            context.minimum_outdoor_air_flow,
            diagnostics,
        )?;

        let heating_performance = self.rated_performance(
            Track::Heating,
            &heating_plan,
            &staging.heating,
            decision.rated_heating_capacity,
            parameters.rated_heating_cop,
            diagnostics,
        )?;
        let cooling_performance = self.rated_performance(
            Track::Cooling,
            &cooling_plan,
            &staging.cooling,
            decision.rated_cooling_capacity,
            parameters.rated_cooling_cop,
            diagnostics,
        )?;

        let equipment = assemble(
            &AssemblyInput {
                heating: TrackAssembly {
                    plan: &heating_plan,
                    performance: &heating_performance,
                    definition: &staging.heating,
                },
                cooling: TrackAssembly {
                    plan: &cooling_plan,
                    performance: &cooling_performance,
                    definition: &staging.cooling,
                },
                staging,
                parity,
            },
            diagnostics,
        )?;

        Ok(UnitSizingResult {
            reference_heating_capacity: reference.value(),
            sizing_temperature: sizing.temperature,
            sizing_load: sizing.load,
            derate_fraction,
            required_heating_capacity,
            decision,
            heating_plan,
            cooling_plan,
            heating_performance,
            cooling_performance,
            equipment,
            diagnostics: vec![],
        })
    }

    fn rated_performance(
        &self,
        track: Track,
        plan: &FinalizedStagingPlan,
        definition: &TrackDefinition,
        rated_capacity: f64,
        explicit_cop: Option<f64>,
        diagnostics: &mut Diagnostics,
    ) -> Result<RatedPerformance, SizingError> {
        let (actual_airflow, _) = plan.rated();
        adjust_rated_performance(
            &RatedPerformanceInput {
                track,
                rated_capacity,
                actual_airflow,
                reference_cfm_per_ton: definition.reference_cfm_per_ton,
                explicit_cop,
                regression: definition.cop_regression.into(),
                eir_ff_curve_name: &definition.eir_ff_curve,
                eir_ff_curve: self.dataset.curve(&definition.eir_ff_curve)?,
            },
            diagnostics,
        )
    }
}

fn resolve_track(
    track: Track,
    definition: &TrackDefinition,
    rated_capacity: f64,
    design_airflow: f64,
    minimum_outdoor_air_flow: f64,
    diagnostics: &mut Diagnostics,
) -> Result<FinalizedStagingPlan, SizingError> {
    resolve_stages(
        &StageResolverInput {
            track,
            points: &definition.points,
            rated_stage: definition.rated_stage,
            rated_capacity,
            design_airflow,
            minimum_outdoor_air_flow,
        },
        diagnostics,
    )?
    .finalize()
}
