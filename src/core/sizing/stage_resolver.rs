//! Assigns an airflow and capacity to every stage of one track so that the airflow per unit
//! capacity stays within the bounds the equipment can run at.
//!
//! Stages are resolved greedily, lowest first, in a single pass. A stage whose airflow cannot be
//! brought within bounds without starving the zone of ventilation air is given more capacity, and
//! failing that is disabled. The stage immediately below the rated stage is never disabled, so a
//! multi-stage track keeps at least two stages. The rated stage is the top stage and keeps its
//! nominal airflow and capacity.

use crate::core::diagnostics::{Diagnostics, MessageKind};
use crate::core::sizing::staging::{
    check_rated_stage, check_stage_points, EquipmentStagingPlan, StageAllocation,
    StagePerformancePoint, Track,
};
use crate::core::units::{airflow_at_cfm_per_ton, capacity_at_cfm_per_ton, cfm_per_ton};
use crate::errors::SizingError;
use tracing::debug;

/// Lowest airflow per capacity a stage may run at, in cfm/ton
pub const MIN_CFM_PER_TON: f64 = 300.;
/// Highest airflow per capacity a stage may run at, in cfm/ton
pub const MAX_CFM_PER_TON: f64 = 450.;
/// Share of the capacity gap to the next stage a stage may grow by
const CAPACITY_GAP_FRACTION: f64 = 0.65;

#[derive(Clone, Copy, Debug)]
pub struct StageResolverInput<'a> {
    pub track: Track,
    pub points: &'a [StagePerformancePoint],
    pub rated_stage: usize,
    /// in W
    pub rated_capacity: f64,
    /// in m3/s
    pub design_airflow: f64,
    /// in m3/s
    pub minimum_outdoor_air_flow: f64,
}

impl StageResolverInput<'_> {
    /// Minimum outdoor air flow as a fraction of the design airflow
    pub fn minimum_ventilation_ratio(&self) -> f64 {
        self.minimum_outdoor_air_flow / self.design_airflow
    }

    fn check(&self) -> Result<(), SizingError> {
        let track = self.track;
        check_stage_points(track, self.points)?;
        check_rated_stage(track, self.points, self.rated_stage)?;
        if self.rated_capacity <= 0. {
            return Err(SizingError::configuration(format!(
                "Rated {track} capacity must be positive, got {} W",
                self.rated_capacity
            )));
        }
        if self.design_airflow <= 0. {
            return Err(SizingError::configuration(format!(
                "Design {track} airflow must be positive, got {} m3/s",
                self.design_airflow
            )));
        }
        if self.minimum_outdoor_air_flow < 0. {
            return Err(SizingError::configuration(format!(
                "Minimum outdoor air flow may not be negative, got {} m3/s",
                self.minimum_outdoor_air_flow
            )));
        }
        Ok(())
    }
}

/// Resolve airflow and capacity for every stage of one track.
pub fn resolve_stages(
    input: &StageResolverInput,
    diagnostics: &mut Diagnostics,
) -> Result<EquipmentStagingPlan, SizingError> {
    input.check()?;

    let track = input.track;
    let rated_capacity = input.rated_capacity;
    let ventilation_airflow = input.minimum_ventilation_ratio() * input.design_airflow;
    let mut plan = EquipmentStagingPlan::new(track, input.rated_stage);

    for point in input.points {
        let nominal_capacity = rated_capacity * point.capacity_fraction;
        let nominal_airflow = point.flow_fraction * input.design_airflow;

        if point.stage == input.rated_stage {
            plan.set(
                point.stage,
                active(nominal_airflow, nominal_capacity, rated_capacity),
            );
            continue;
        }

        let next_fraction = input.points[point.stage].capacity_fraction;
        let capacity_limit = rated_capacity
            * (point.capacity_fraction
                + CAPACITY_GAP_FRACTION * (next_fraction - point.capacity_fraction));
        let ratio = cfm_per_ton(nominal_airflow, nominal_capacity);

        let allocation = if ratio < MIN_CFM_PER_TON {
            let airflow = airflow_at_cfm_per_ton(MIN_CFM_PER_TON, nominal_capacity);
            diagnostics.info(
                MessageKind::StageAdjusted,
                format!(
                    "{track} stage {}: airflow raised from {nominal_airflow:.4} to {airflow:.4} m3/s ({ratio:.0} cfm/ton is below {MIN_CFM_PER_TON})",
                    point.stage
                ),
            );
            active(airflow, nominal_capacity, rated_capacity)
        } else if ratio > MAX_CFM_PER_TON {
            let lowered_airflow = airflow_at_cfm_per_ton(MAX_CFM_PER_TON, nominal_capacity);
            let raised_capacity = capacity_at_cfm_per_ton(MAX_CFM_PER_TON, ventilation_airflow);

            if lowered_airflow >= ventilation_airflow
                || is_close!(lowered_airflow, ventilation_airflow, rel_tol = 1e-9)
            {
                diagnostics.info(
                    MessageKind::StageAdjusted,
                    format!(
                        "{track} stage {}: airflow lowered from {nominal_airflow:.4} to {lowered_airflow:.4} m3/s ({ratio:.0} cfm/ton is above {MAX_CFM_PER_TON})",
                        point.stage
                    ),
                );
                active(lowered_airflow, nominal_capacity, rated_capacity)
            } else if raised_capacity <= capacity_limit {
                diagnostics.info(
                    MessageKind::StageAdjusted,
                    format!(
                        "{track} stage {}: capacity raised from {nominal_capacity:.0} to {raised_capacity:.0} W to hold the ventilation airflow of {ventilation_airflow:.4} m3/s",
                        point.stage
                    ),
                );
                active(ventilation_airflow, raised_capacity, rated_capacity)
            } else if point.stage + 1 == input.rated_stage {
                diagnostics.warn(
                    MessageKind::StageAdjusted,
                    format!(
                        "{track} stage {}: kept at {capacity_limit:.0} W and {ventilation_airflow:.4} m3/s although {:.0} cfm/ton is above {MAX_CFM_PER_TON}",
                        point.stage,
                        cfm_per_ton(ventilation_airflow, capacity_limit)
                    ),
                );
                active(ventilation_airflow, capacity_limit, rated_capacity)
            } else {
                diagnostics.warn(
                    MessageKind::StageDisabled,
                    format!(
                        "{track} stage {}: disabled, {ratio:.0} cfm/ton cannot be brought within bounds at the ventilation airflow of {ventilation_airflow:.4} m3/s",
                        point.stage
                    ),
                );
                StageAllocation::Disabled
            }
        } else {
            active(nominal_airflow, nominal_capacity, rated_capacity)
        };
        plan.set(point.stage, allocation);
    }

    debug!(
        %track,
        surviving = plan.surviving_count(),
        stages = input.points.len(),
        "Resolved stages"
    );
    Ok(plan)
}

fn active(airflow: f64, capacity: f64, rated_capacity: f64) -> StageAllocation {
    StageAllocation::Active {
        airflow,
        capacity,
        capacity_fraction: capacity / rated_capacity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    const RATED_CAPACITY: f64 = 10_000.;

    fn points(capacity_fractions: &[f64], flow_fractions: &[f64]) -> Vec<StagePerformancePoint> {
        capacity_fractions
            .iter()
            .zip(flow_fractions)
            .enumerate()
            .map(|(i, (capacity_fraction, flow_fraction))| StagePerformancePoint {
                stage: i + 1,
                capacity_fraction: *capacity_fraction,
                flow_fraction: *flow_fraction,
                cop_fraction: 1.,
                sensible_heat_ratio: None,
            })
            .collect()
    }

    /// Two-stage track whose first stage nominally runs at 600 cfm/ton
    fn two_stage_at_600_cfm_per_ton() -> (Vec<StagePerformancePoint>, f64) {
        let stage_1_airflow = airflow_at_cfm_per_ton(600., 0.5 * RATED_CAPACITY);
        (points(&[0.5, 1.0], &[0.5, 1.0]), stage_1_airflow / 0.5)
    }

    fn resolve(
        points: &[StagePerformancePoint],
        design_airflow: f64,
        minimum_ventilation_ratio: f64,
        diagnostics: &mut Diagnostics,
    ) -> EquipmentStagingPlan {
        resolve_stages(
            &StageResolverInput {
                track: Track::Cooling,
                points,
                rated_stage: points.len(),
                rated_capacity: RATED_CAPACITY,
                design_airflow,
                minimum_outdoor_air_flow: minimum_ventilation_ratio * design_airflow,
            },
            diagnostics,
        )
        .unwrap()
    }

    fn ratio_of(allocation: &StageAllocation) -> f64 {
        match allocation {
            StageAllocation::Active {
                airflow, capacity, ..
            } => cfm_per_ton(*airflow, *capacity),
            StageAllocation::Disabled => panic!("stage is disabled"),
        }
    }

    #[rstest]
    fn should_lower_airflow_to_maximum_ratio_when_ventilation_allows() {
        let (points, design_airflow) = two_stage_at_600_cfm_per_ton();
        let mut diagnostics = Diagnostics::new();
        let plan = resolve(&points, design_airflow, 0.1, &mut diagnostics);

        let stage_1 = plan.get(1).unwrap();
        assert_relative_eq!(ratio_of(stage_1), MAX_CFM_PER_TON, max_relative = 1e-9);
        assert_eq!(plan.capacities()[&1], 5_000.);
        assert_eq!(plan.surviving_count(), 2);
        assert!(!diagnostics.has_warnings());
    }

    #[rstest]
    fn should_raise_capacity_to_hold_ventilation_airflow() {
        let (points, design_airflow) = two_stage_at_600_cfm_per_ton();
        let mut diagnostics = Diagnostics::new();
        // ventilation airflow is 0.9 of the nominal stage 1 airflow
        let plan = resolve(&points, design_airflow, 0.45, &mut diagnostics);

        assert_relative_eq!(plan.capacities()[&1], 6_000., max_relative = 1e-9);
        assert_relative_eq!(plan.airflows()[&1], 0.45 * design_airflow, max_relative = 1e-12);
        assert_relative_eq!(ratio_of(plan.get(1).unwrap()), MAX_CFM_PER_TON, max_relative = 1e-9);
        assert!(!diagnostics.has_warnings());
    }

    #[rstest]
    fn should_keep_stage_below_rated_at_capacity_gap_limit() {
        let (points, design_airflow) = two_stage_at_600_cfm_per_ton();
        let mut diagnostics = Diagnostics::new();
        // raising capacity to 450 cfm/ton would need 9 333 W, above the 8 250 W gap limit
        let plan = resolve(&points, design_airflow, 0.7, &mut diagnostics);

        assert_relative_eq!(plan.capacities()[&1], 8_250., max_relative = 1e-12);
        assert_relative_eq!(plan.airflows()[&1], 0.7 * design_airflow, max_relative = 1e-12);
        assert!(ratio_of(plan.get(1).unwrap()) > MAX_CFM_PER_TON);
        assert_eq!(plan.surviving_count(), 2);
        assert_eq!(diagnostics.count_of(MessageKind::StageAdjusted), 1);
        assert!(diagnostics.has_warnings());
    }

    #[rstest]
    fn should_leave_rated_stage_unmodified() {
        let (points, design_airflow) = two_stage_at_600_cfm_per_ton();
        let mut diagnostics = Diagnostics::new();
        let plan = resolve(&points, design_airflow, 0.7, &mut diagnostics);
        assert_eq!(plan.capacities()[&2], RATED_CAPACITY);
        assert_eq!(plan.airflows()[&2], design_airflow);
    }

    #[rstest]
    fn should_disable_stage_that_cannot_be_brought_within_bounds() {
        let points = points(&[0.3, 0.6, 1.0], &[0.6, 0.8, 1.0]);
        let design_airflow = airflow_at_cfm_per_ton(400., RATED_CAPACITY);
        let mut diagnostics = Diagnostics::new();
        let plan = resolve(&points, design_airflow, 0.6, &mut diagnostics);

        assert_eq!(plan.get(1), Some(&StageAllocation::Disabled));
        assert_relative_eq!(ratio_of(plan.get(2).unwrap()), MAX_CFM_PER_TON, max_relative = 1e-9);
        assert_eq!(plan.surviving_count(), 2);
        assert_eq!(diagnostics.count_of(MessageKind::StageDisabled), 1);
        assert!(plan.finalize().is_ok());
    }

    #[rstest]
    fn should_raise_airflow_below_minimum_ratio() {
        let points = points(&[0.5, 1.0], &[0.3, 1.0]);
        let design_airflow = airflow_at_cfm_per_ton(400., RATED_CAPACITY);
        let mut diagnostics = Diagnostics::new();
        let plan = resolve(&points, design_airflow, 0.1, &mut diagnostics);

        assert_relative_eq!(ratio_of(plan.get(1).unwrap()), MIN_CFM_PER_TON, max_relative = 1e-9);
        assert_eq!(plan.capacities()[&1], 5_000.);
        assert_eq!(diagnostics.count_of(MessageKind::StageAdjusted), 1);
    }

    #[rstest]
    fn should_accept_stage_within_bounds() {
        let points = points(&[0.5, 1.0], &[0.5, 1.0]);
        let design_airflow = airflow_at_cfm_per_ton(400., RATED_CAPACITY);
        let mut diagnostics = Diagnostics::new();
        let plan = resolve(&points, design_airflow, 0.1, &mut diagnostics);

        assert_eq!(plan.airflows()[&1], 0.5 * design_airflow);
        assert!(diagnostics.messages().is_empty());
    }

    #[rstest]
    fn should_resolve_single_stage() {
        let points = points(&[1.0], &[1.0]);
        let mut diagnostics = Diagnostics::new();
        let plan = resolve(&points, 0.5, 0.2, &mut diagnostics);
        assert_eq!(plan.surviving_count(), 1);
        assert_eq!(plan.airflows()[&1], 0.5);
    }

    #[rstest]
    #[case(points(&[0.5, 1.0], &[0.5, 1.0]), 3)]
    #[case(points(&[0.5, 1.0], &[0.5, 1.0]), 0)]
    #[case(points(&[0.5, 1.0], &[0.5, 1.0]), 1)]
    #[case(points(&[0.4, 0.8, 1.0], &[0.9, 0.9, 1.0]), 2)]
    #[case(points(&[0.5, 0.9], &[0.5, 1.0]), 2)]
    #[case(points(&[0.5, 1.2], &[0.5, 1.0]), 2)]
    #[case(points(&[1.0, 0.5], &[0.5, 1.0]), 2)]
    #[case(points(&[0.0, 1.0], &[0.5, 1.0]), 2)]
    fn should_reject_invalid_stage_data(
        #[case] points: Vec<StagePerformancePoint>,
        #[case] rated_stage: usize,
    ) {
        let mut diagnostics = Diagnostics::new();
        let result = resolve_stages(
            &StageResolverInput {
                track: Track::Cooling,
                points: &points,
                rated_stage,
                rated_capacity: RATED_CAPACITY,
                design_airflow: 0.5,
                minimum_outdoor_air_flow: 0.1,
            },
            &mut diagnostics,
        );
        assert!(matches!(result, Err(SizingError::Configuration(_))));
    }

    #[rstest]
    fn should_hold_staging_properties_across_conditions() {
        let tracks = [
            points(&[0.5, 1.0], &[0.5, 1.0]),
            points(&[0.3, 0.6, 1.0], &[0.6, 0.8, 1.0]),
            points(&[0.25, 0.5, 0.75, 1.0], &[0.7, 0.75, 0.9, 1.0]),
            points(&[0.36, 0.51, 0.67, 1.0], &[0.2, 0.4, 0.7, 1.0]),
        ];
        for points in &tracks {
            for rated_cfm_per_ton in [250., 350., 400., 500., 650.] {
                for ventilation_ratio in [0., 0.2, 0.4, 0.6, 0.8, 1.0] {
                    let design_airflow = airflow_at_cfm_per_ton(rated_cfm_per_ton, RATED_CAPACITY);
                    let mut diagnostics = Diagnostics::new();
                    let plan = resolve(points, design_airflow, ventilation_ratio, &mut diagnostics);

                    assert!(plan.surviving_count() >= 2);
                    let rated_stage = points.len();
                    for stage in 1..rated_stage - 1 {
                        if let Some(allocation @ StageAllocation::Active { .. }) = plan.get(stage) {
                            let ratio = ratio_of(allocation);
                            assert!(ratio >= MIN_CFM_PER_TON * (1. - 1e-9), "{ratio}");
                            assert!(ratio <= MAX_CFM_PER_TON * (1. + 1e-9), "{ratio}");
                        }
                    }
                    let capacities = plan.capacities().into_values().collect::<Vec<_>>();
                    assert!(capacities.windows(2).all(|pair| pair[0] <= pair[1]));
                    assert!(plan.finalize().is_ok());
                }
            }
        }
    }
}
