use crate::errors::SizingError;
use itertools::Itertools;
use serde::Serialize;
use std::collections::BTreeMap;
use strum::Display;

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Track {
    Heating,
    Cooling,
}

/// Reference performance of one stage, relative to the rated stage.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StagePerformancePoint {
    /// 1-based stage index
    pub stage: usize,
    pub capacity_fraction: f64,
    /// fraction of the design airflow
    pub flow_fraction: f64,
    /// fraction of the rated COP
    pub cop_fraction: f64,
    /// cooling only
    pub sensible_heat_ratio: Option<f64>,
}

/// Build the stage points for one track from per-stage fraction arrays.
///
/// Arguments:
/// * `track` - heating or cooling, for reporting
/// * `stage_count` - number of stages declared for the track
/// * `capacity_fractions`, `flow_fractions`, `cop_fractions` - one entry per stage, lowest first
/// * `sensible_heat_ratios` - optional, one entry per stage
pub fn stage_points(
    track: Track,
    stage_count: usize,
    capacity_fractions: &[f64],
    flow_fractions: &[f64],
    cop_fractions: &[f64],
    sensible_heat_ratios: Option<&[f64]>,
) -> Result<Vec<StagePerformancePoint>, SizingError> {
    if !(1..=4).contains(&stage_count) {
        return Err(SizingError::configuration(format!(
            "{track} staging declares {stage_count} stages, between 1 and 4 are supported"
        )));
    }
    for (label, values) in [
        ("capacity fractions", capacity_fractions),
        ("flow fractions", flow_fractions),
        ("COP fractions", cop_fractions),
    ]
    .into_iter()
    .chain(sensible_heat_ratios.map(|shr| ("sensible heat ratios", shr)))
    {
        if values.len() != stage_count {
            return Err(SizingError::configuration(format!(
                "{track} staging has {} {label} for {stage_count} stages",
                values.len()
            )));
        }
    }

    let points = (0..stage_count)
        .map(|i| StagePerformancePoint {
            stage: i + 1,
            capacity_fraction: capacity_fractions[i],
            flow_fraction: flow_fractions[i],
            cop_fraction: cop_fractions[i],
            sensible_heat_ratio: sensible_heat_ratios.map(|shr| shr[i]),
        })
        .collect::<Vec<_>>();
    check_stage_points(track, &points)?;
    Ok(points)
}

/// Check that stage points are numbered from 1, with capacity fractions in (0, 1] that increase
/// with stage and positive flow and COP fractions.
pub fn check_stage_points(
    track: Track,
    points: &[StagePerformancePoint],
) -> Result<(), SizingError> {
    if let Some((i, point)) = points
        .iter()
        .enumerate()
        .find(|(i, point)| point.stage != i + 1)
    {
        return Err(SizingError::configuration(format!(
            "{track} stage {} is listed in position {}",
            point.stage,
            i + 1
        )));
    }
    if let Some(point) = points.iter().find(|point| {
        point.capacity_fraction <= 0.
            || point.capacity_fraction > 1.
            || point.flow_fraction <= 0.
            || point.cop_fraction <= 0.
            || point.sensible_heat_ratio.is_some_and(|shr| shr <= 0. || shr > 1.)
    }) {
        return Err(SizingError::configuration(format!(
            "{track} stage {} has a fraction out of range: {point:?}",
            point.stage
        )));
    }
    if !points
        .iter()
        .tuple_windows()
        .all(|(lower, upper)| lower.capacity_fraction < upper.capacity_fraction)
    {
        return Err(SizingError::configuration(format!(
            "{track} staging capacity fractions must increase with stage"
        )));
    }
    Ok(())
}

/// Check that the rated stage is the top stage and runs at the full rated capacity.
pub fn check_rated_stage(
    track: Track,
    points: &[StagePerformancePoint],
    rated_stage: usize,
) -> Result<(), SizingError> {
    if rated_stage != points.len() {
        return Err(SizingError::configuration(format!(
            "Rated {track} stage {rated_stage} must be the top stage {}",
            points.len()
        )));
    }
    match points.last() {
        Some(point) if point.capacity_fraction == 1. => Ok(()),
        Some(point) => Err(SizingError::configuration(format!(
            "Rated {track} stage {rated_stage} has capacity fraction {}, expected 1",
            point.capacity_fraction
        ))),
        None => Err(SizingError::configuration(format!(
            "{track} staging has no stages"
        ))),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageAllocation {
    Active {
        /// in m3/s
        airflow: f64,
        /// in W
        capacity: f64,
        /// capacity as a fraction of the rated capacity
        capacity_fraction: f64,
    },
    Disabled,
}

impl StageAllocation {
    pub fn is_active(&self) -> bool {
        matches!(self, StageAllocation::Active { .. })
    }
}

/// Per-stage airflow and capacity of one track, as resolved stage by stage.
#[derive(Clone, Debug, PartialEq)]
pub struct EquipmentStagingPlan {
    track: Track,
    rated_stage: usize,
    stages: BTreeMap<usize, StageAllocation>,
}

impl EquipmentStagingPlan {
    pub fn new(track: Track, rated_stage: usize) -> Self {
        Self {
            track,
            rated_stage,
            stages: Default::default(),
        }
    }

    pub fn set(&mut self, stage: usize, allocation: StageAllocation) {
        self.stages.insert(stage, allocation);
    }

    pub fn get(&self, stage: usize) -> Option<&StageAllocation> {
        self.stages.get(&stage)
    }

    pub fn surviving_count(&self) -> usize {
        self.stages.values().filter(|a| a.is_active()).count()
    }

    /// Airflow (m3/s) of each active stage
    pub fn airflows(&self) -> BTreeMap<usize, f64> {
        active_values(&self.stages, |airflow, _| airflow)
    }

    /// Capacity (W) of each active stage
    pub fn capacities(&self) -> BTreeMap<usize, f64> {
        active_values(&self.stages, |_, capacity| capacity)
    }

    /// Freeze the plan, checking that it is fit to describe equipment.
    pub fn finalize(self) -> Result<FinalizedStagingPlan, SizingError> {
        let track = self.track;
        match self.stages.get(&self.rated_stage) {
            Some(StageAllocation::Active { .. }) => {}
            _ => {
                return Err(SizingError::configuration(format!(
                    "{track} plan has no active rated stage {}",
                    self.rated_stage
                )))
            }
        }

        if let Some(((lower_stage, lower), (upper_stage, upper))) = self
            .capacities()
            .into_iter()
            .tuple_windows()
            .find(|((_, lower), (_, upper))| upper < lower)
        {
            return Err(SizingError::configuration(format!(
                "{track} plan capacity decreases from {lower} W at stage {lower_stage} to {upper} W at stage {upper_stage}"
            )));
        }

        Ok(FinalizedStagingPlan {
            track,
            rated_stage: self.rated_stage,
            stages: self.stages,
        })
    }
}

/// A staging plan that has passed its final checks and can no longer change.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FinalizedStagingPlan {
    track: Track,
    rated_stage: usize,
    stages: BTreeMap<usize, StageAllocation>,
}

impl FinalizedStagingPlan {
    pub fn track(&self) -> Track {
        self.track
    }

    pub fn rated_stage(&self) -> usize {
        self.rated_stage
    }

    pub fn stages(&self) -> impl Iterator<Item = (usize, &StageAllocation)> {
        self.stages.iter().map(|(stage, allocation)| (*stage, allocation))
    }

    pub fn get(&self, stage: usize) -> Option<&StageAllocation> {
        self.stages.get(&stage)
    }

    pub fn surviving_count(&self) -> usize {
        self.stages.values().filter(|a| a.is_active()).count()
    }

    pub fn active_stages(&self) -> Vec<usize> {
        self.stages
            .iter()
            .filter(|(_, allocation)| allocation.is_active())
            .map(|(stage, _)| *stage)
            .collect()
    }

    pub fn airflows(&self) -> BTreeMap<usize, f64> {
        active_values(&self.stages, |airflow, _| airflow)
    }

    pub fn capacities(&self) -> BTreeMap<usize, f64> {
        active_values(&self.stages, |_, capacity| capacity)
    }

    /// Airflow and capacity of the rated stage
    pub fn rated(&self) -> (f64, f64) {
        match self.stages[&self.rated_stage] {
            StageAllocation::Active {
                airflow, capacity, ..
            } => (airflow, capacity),
            // finalize() only admits plans with an active rated stage
            StageAllocation::Disabled => unreachable!(),
        }
    }
}

fn active_values(
    stages: &BTreeMap<usize, StageAllocation>,
    pick: impl Fn(f64, f64) -> f64,
) -> BTreeMap<usize, f64> {
    stages
        .iter()
        .filter_map(|(stage, allocation)| match allocation {
            StageAllocation::Active {
                airflow, capacity, ..
            } => Some((*stage, pick(*airflow, *capacity))),
            StageAllocation::Disabled => None,
        })
        .collect()
}
