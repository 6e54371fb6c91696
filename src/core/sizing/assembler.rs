use crate::core::diagnostics::{Diagnostics, MessageKind};
use crate::core::performance::dataset::{StagingDefinition, TrackDefinition};
use crate::core::sizing::rated_performance::RatedPerformance;
use crate::core::sizing::staging::{FinalizedStagingPlan, StageAllocation, Track};
use crate::core::units::watts_to_tons;
use crate::errors::SizingError;
use crate::input::{DefrostInput, StageCurveNames, StageParity};
use itertools::Itertools;
use serde::Serialize;

/// Crankcase heater power per square root of rated cooling tons, in W
const CRANKCASE_HEATER_POWER_PER_ROOT_TON: f64 = 30.;

/// One speed of the replacement coil as it will be described to the building model.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AssembledStage {
    /// 1-based position among the emitted speeds
    pub speed: usize,
    /// stage index in the performance dataset this speed stands for
    pub stage: usize,
    /// stage whose performance this speed carries; differs from `stage` when substituted
    pub source_stage: usize,
    /// in W
    pub gross_capacity: f64,
    /// in m3/s
    pub airflow: f64,
    pub cop: f64,
    pub sensible_heat_ratio: Option<f64>,
    pub curves: StageCurveNames,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "stages", rename_all = "snake_case")]
pub enum EquipmentDescription {
    SingleStage(AssembledStage),
    MultiStage(Vec<AssembledStage>),
}

impl EquipmentDescription {
    pub fn stages(&self) -> &[AssembledStage] {
        match self {
            EquipmentDescription::SingleStage(stage) => std::slice::from_ref(stage),
            EquipmentDescription::MultiStage(stages) => stages,
        }
    }
}

/// Heating and cooling descriptions of a replacement heat pump, with its ancillary settings.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AssembledEquipment {
    pub heating: EquipmentDescription,
    pub cooling: EquipmentDescription,
    /// in W
    pub crankcase_heater_power: f64,
    pub defrost: DefrostInput,
    /// in deg C
    pub minimum_compressor_outdoor_temperature: Option<f64>,
    pub cycling_losses: bool,
}

/// Everything known about one track once its stages are resolved and its COP adjusted.
#[derive(Clone, Copy, Debug)]
pub struct TrackAssembly<'a> {
    pub plan: &'a FinalizedStagingPlan,
    pub performance: &'a RatedPerformance,
    pub definition: &'a TrackDefinition,
}

pub struct AssemblyInput<'a> {
    pub heating: TrackAssembly<'a>,
    pub cooling: TrackAssembly<'a>,
    pub staging: &'a StagingDefinition,
    pub parity: StageParity,
}

pub fn crankcase_heater_power(rated_cooling_capacity: f64) -> f64 {
    CRANKCASE_HEATER_POWER_PER_ROOT_TON * watts_to_tons(rated_cooling_capacity).sqrt()
}

pub fn assemble(
    input: &AssemblyInput,
    diagnostics: &mut Diagnostics,
) -> Result<AssembledEquipment, SizingError> {
    let (heating_stages, cooling_stages) = match input.parity {
        StageParity::Matched => {
            let stages = input
                .heating
                .plan
                .active_stages()
                .into_iter()
                .chain(input.cooling.plan.active_stages())
                .sorted()
                .dedup()
                .collect::<Vec<_>>();
            (stages.clone(), stages)
        }
        StageParity::Independent => (
            input.heating.plan.active_stages(),
            input.cooling.plan.active_stages(),
        ),
    };

    let heating = assemble_track(&input.heating, &heating_stages, diagnostics)?;
    let cooling = assemble_track(&input.cooling, &cooling_stages, diagnostics)?;

    Ok(AssembledEquipment {
        heating,
        cooling,
        crankcase_heater_power: crankcase_heater_power(input.cooling.performance.rated_capacity),
        defrost: input.staging.defrost.clone(),
        minimum_compressor_outdoor_temperature: input
            .staging
            .minimum_compressor_outdoor_temperature,
        cycling_losses: input.staging.cycling_losses,
    })
}

fn assemble_track(
    assembly: &TrackAssembly,
    stages: &[usize],
    diagnostics: &mut Diagnostics,
) -> Result<EquipmentDescription, SizingError> {
    let track = assembly.plan.track();
    let mut assembled = vec![];

    for &stage in stages {
        let source_stage = match assembly.plan.get(stage) {
            Some(StageAllocation::Active { .. }) => stage,
            allocation => {
                let source_stage = substitute_for(assembly.plan, stage)?;
                let reason = match allocation {
                    Some(_) => "is disabled",
                    None => "does not exist",
                };
                diagnostics.info(
                    MessageKind::StageSubstituted,
                    format!(
                        "{track} stage {stage} {reason}, using stage {source_stage} to keep the stage count matched"
                    ),
                );
                source_stage
            }
        };
        assembled.push(assemble_stage(
            assembly,
            assembled.len() + 1,
            stage,
            source_stage,
        )?);
    }

    match assembled.len() {
        0 => Err(SizingError::configuration(format!(
            "{track} equipment has no stages to describe"
        ))),
        1 => Ok(EquipmentDescription::SingleStage(assembled.remove(0))),
        _ => Ok(EquipmentDescription::MultiStage(assembled)),
    }
}

/// Nearest active stage below, or failing that above, a stage the plan cannot describe
fn substitute_for(plan: &FinalizedStagingPlan, stage: usize) -> Result<usize, SizingError> {
    let active_stages = plan.active_stages();
    active_stages
        .iter()
        .rev()
        .find(|active| **active < stage)
        .or_else(|| active_stages.iter().find(|active| **active > stage))
        .copied()
        .ok_or_else(|| {
            SizingError::configuration(format!(
                "{} plan has no active stage to stand in for stage {stage}",
                plan.track()
            ))
        })
}

fn assemble_stage(
    assembly: &TrackAssembly,
    speed: usize,
    stage: usize,
    source_stage: usize,
) -> Result<AssembledStage, SizingError> {
    let track = assembly.plan.track();
    let (airflow, capacity) = match assembly.plan.get(source_stage) {
        Some(StageAllocation::Active {
            airflow, capacity, ..
        }) => (*airflow, *capacity),
        _ => {
            return Err(SizingError::configuration(format!(
                "{track} stage {source_stage} is not active"
            )))
        }
    };
    let point = assembly.definition.point(source_stage);

    Ok(AssembledStage {
        speed,
        stage,
        source_stage,
        gross_capacity: capacity,
        airflow,
        cop: assembly.performance.adjusted_cop * point.cop_fraction,
        sensible_heat_ratio: match track {
            Track::Cooling => point.sensible_heat_ratio,
            Track::Heating => None,
        },
        curves: assembly.definition.curves_for(source_stage).clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::performance::dataset::tests::{two_stage_dataset, two_stage_dataset_json};
    use crate::core::performance::dataset::PerformanceDataset;
    use crate::core::sizing::rated_performance::CopRegression;
    use crate::core::sizing::staging::EquipmentStagingPlan;
    use crate::core::units::tons_to_watts;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use serde_json::json;

    fn active(airflow: f64, capacity: f64) -> StageAllocation {
        StageAllocation::Active {
            airflow,
            capacity,
            capacity_fraction: capacity / 10_000.,
        }
    }

    fn plan(track: Track, allocations: &[StageAllocation]) -> FinalizedStagingPlan {
        let mut plan = EquipmentStagingPlan::new(track, allocations.len());
        for (i, allocation) in allocations.iter().enumerate() {
            plan.set(i + 1, *allocation);
        }
        plan.finalize().unwrap()
    }

    fn performance(track: Track, adjusted_cop: f64) -> RatedPerformance {
        RatedPerformance {
            track,
            rated_capacity: 10_000.,
            base_cop: adjusted_cop,
            explicit_cop: true,
            regression: CopRegression {
                intercept: 4.,
                coefficient: 0.,
                minimum: 2.,
                maximum: 5.,
            },
            reference_cfm_per_ton: 400.,
            flow_fraction: 1.,
            eir_modifier: 1.,
            adjusted_cop,
        }
    }

    #[fixture]
    fn dataset() -> PerformanceDataset {
        two_stage_dataset()
    }

    fn assemble_with(
        dataset: &PerformanceDataset,
        heating_plan: &FinalizedStagingPlan,
        cooling_plan: &FinalizedStagingPlan,
        parity: StageParity,
        diagnostics: &mut Diagnostics,
    ) -> AssembledEquipment {
        let heating_performance = performance(Track::Heating, 3.5);
        let cooling_performance = performance(Track::Cooling, 4.0);
        let staging = dataset.staging();
        assemble(
            &AssemblyInput {
                heating: TrackAssembly {
                    plan: heating_plan,
                    performance: &heating_performance,
                    definition: &staging.heating,
                },
                cooling: TrackAssembly {
                    plan: cooling_plan,
                    performance: &cooling_performance,
                    definition: &staging.cooling,
                },
                staging,
                parity,
            },
            diagnostics,
        )
        .unwrap()
    }

    #[rstest]
    fn should_describe_every_active_stage(dataset: PerformanceDataset) {
        let heating = plan(Track::Heating, &[active(0.3, 5_000.), active(0.6, 10_000.)]);
        let cooling = plan(Track::Cooling, &[active(0.25, 5_000.), active(0.5, 10_000.)]);
        let mut diagnostics = Diagnostics::new();
        let equipment =
            assemble_with(&dataset, &heating, &cooling, StageParity::Matched, &mut diagnostics);

        let cooling_stages = equipment.cooling.stages();
        assert_eq!(cooling_stages.len(), 2);
        assert_eq!(cooling_stages[0].speed, 1);
        assert_eq!(cooling_stages[0].gross_capacity, 5_000.);
        assert_eq!(cooling_stages[0].airflow, 0.25);
        assert_relative_eq!(cooling_stages[0].cop, 4.4, max_relative = 1e-12);
        assert_eq!(cooling_stages[0].sensible_heat_ratio, Some(0.8));
        assert_eq!(cooling_stages[1].curves.plf_plr, "PLF");

        let heating_stages = equipment.heating.stages();
        assert_eq!(heating_stages[1].cop, 3.5);
        assert_eq!(heating_stages[1].sensible_heat_ratio, None);
        assert!(diagnostics.messages().is_empty());
    }

    #[rstest]
    fn should_substitute_lower_stage_to_match_stage_counts(dataset: PerformanceDataset) {
        let heating = plan(Track::Heating, &[active(0.3, 5_000.), active(0.6, 10_000.)]);
        let cooling = plan(
            Track::Cooling,
            &[StageAllocation::Disabled, active(0.5, 10_000.)],
        );
        let mut diagnostics = Diagnostics::new();
        let equipment =
            assemble_with(&dataset, &heating, &cooling, StageParity::Matched, &mut diagnostics);

        let cooling_stages = equipment.cooling.stages();
        assert_eq!(cooling_stages.len(), 2);
        // no active stage below stage 1, so the nearest higher one stands in
        assert_eq!(cooling_stages[0].stage, 1);
        assert_eq!(cooling_stages[0].source_stage, 2);
        assert_eq!(cooling_stages[0].gross_capacity, 10_000.);
        assert_eq!(diagnostics.count_of(MessageKind::StageSubstituted), 1);
        assert!(matches!(equipment.cooling, EquipmentDescription::MultiStage(_)));
    }

    #[rstest]
    fn should_fill_missing_stages_of_shorter_track_when_matched() {
        let mut json = two_stage_dataset_json();
        let staging = &mut json["staging"];
        staging["heating_stage_count"] = json!(3);
        staging["rated_heating_stage"] = json!(3);
        staging["heating_capacity_fractions"] = json!([0.3, 0.6, 1.0]);
        staging["heating_flow_fractions"] = json!([0.5, 0.75, 1.0]);
        staging["heating_cop_fractions"] = json!([1.2, 1.1, 1.0]);
        let curves = staging["heating_stage_curves"][0].clone();
        staging["heating_stage_curves"]
            .as_array_mut()
            .unwrap()
            .push(curves);
        let dataset = PerformanceDataset::from_json(json.to_string().as_bytes()).unwrap();

        let heating = plan(
            Track::Heating,
            &[active(0.2, 3_000.), active(0.4, 6_000.), active(0.6, 10_000.)],
        );
        let cooling = plan(Track::Cooling, &[active(0.25, 5_000.), active(0.5, 10_000.)]);
        let mut diagnostics = Diagnostics::new();
        let equipment =
            assemble_with(&dataset, &heating, &cooling, StageParity::Matched, &mut diagnostics);

        assert_eq!(equipment.heating.stages().len(), 3);
        let cooling_stages = equipment.cooling.stages();
        assert_eq!(cooling_stages.len(), 3);
        assert_eq!(cooling_stages[2].speed, 3);
        assert_eq!(cooling_stages[2].stage, 3);
        assert_eq!(cooling_stages[2].source_stage, 2);
        assert_eq!(cooling_stages[2].gross_capacity, 10_000.);
        assert_eq!(diagnostics.count_of(MessageKind::StageSubstituted), 1);
    }

    #[rstest]
    fn should_let_stage_counts_differ_when_independent(dataset: PerformanceDataset) {
        let heating = plan(Track::Heating, &[active(0.3, 5_000.), active(0.6, 10_000.)]);
        let cooling = plan(
            Track::Cooling,
            &[StageAllocation::Disabled, active(0.5, 10_000.)],
        );
        let mut diagnostics = Diagnostics::new();
        let equipment = assemble_with(
            &dataset,
            &heating,
            &cooling,
            StageParity::Independent,
            &mut diagnostics,
        );

        assert!(matches!(equipment.cooling, EquipmentDescription::SingleStage(_)));
        assert_eq!(equipment.heating.stages().len(), 2);
        assert!(diagnostics.messages().is_empty());
    }

    #[rstest]
    fn should_carry_ancillary_settings_through(dataset: PerformanceDataset) {
        let heating = plan(Track::Heating, &[active(0.3, 5_000.), active(0.6, 10_000.)]);
        let cooling = plan(Track::Cooling, &[active(0.25, 5_000.), active(0.5, 10_000.)]);
        let mut diagnostics = Diagnostics::new();
        let equipment =
            assemble_with(&dataset, &heating, &cooling, StageParity::Matched, &mut diagnostics);

        assert_eq!(equipment.defrost, dataset.staging().defrost);
        assert_eq!(equipment.minimum_compressor_outdoor_temperature, Some(-20.));
        assert!(equipment.cycling_losses);
        assert_relative_eq!(
            equipment.crankcase_heater_power,
            30. * (10_000_f64 / tons_to_watts(1.)).sqrt(),
            max_relative = 1e-12
        );
    }

    #[rstest]
    fn should_size_crankcase_heater_by_root_of_tons() {
        assert_relative_eq!(crankcase_heater_power(tons_to_watts(4.)), 60., max_relative = 1e-12);
    }
}
