//! Per-subject trajectories for the overlay plot and the single-subject fit.

use std::collections::{BTreeMap, HashSet};

use crate::domain::{ColumnPresence, Observation, VlRecord};

/// Default number of subjects drawn in the overlay.
pub const DEFAULT_MAX_SUBJECTS: usize = 25;

pub const Y_LABEL_RAW: &str = "Log10 Viral Load";
pub const Y_LABEL_GE: &str = "Log10 Genome Equivalents per ml (GE/ml, transformed)";

/// Identifies one plotted line.
///
/// `infection_id` / `sample_type` are `None` when that column is not part of
/// the grouping.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrajectoryKey {
    pub person_id: String,
    pub infection_id: Option<String>,
    pub sample_type: Option<String>,
}

impl std::fmt::Display for TrajectoryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.person_id)?;
        if let Some(inf) = &self.infection_id {
            write!(f, "/{inf}")?;
        }
        if let Some(st) = &self.sample_type {
            write!(f, "/{st}")?;
        }
        Ok(())
    }
}

/// One plotted line: points in input row order.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub key: TrajectoryKey,
    pub points: Vec<Observation>,
}

/// Overlay output.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub trajectories: Vec<Trajectory>,
    /// Subjects sampled, in order of appearance.
    pub subjects: Vec<String>,
    pub y_label: &'static str,
    pub ge_transformed: bool,
}

impl Overlay {
    pub fn point_count(&self) -> usize {
        self.trajectories.iter().map(|t| t.points.len()).sum()
    }

    /// `(t_min, t_max, y_min, y_max)` over every point, if any.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut it = self.trajectories.iter().flat_map(|t| t.points.iter());
        let first = it.next()?;
        Some(it.fold((first.t, first.t, first.y, first.y), |(t0, t1, y0, y1), p| {
            (t0.min(p.t), t1.max(p.t), y0.min(p.y), y1.max(p.y))
        }))
    }
}

pub fn y_label(columns: &ColumnPresence) -> &'static str {
    if columns.ge_conversion { Y_LABEL_GE } else { Y_LABEL_RAW }
}

/// Distinct subjects in order of first appearance.
pub fn subject_ids(rows: &[&VlRecord]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out: Vec<String> = Vec::new();
    for r in rows {
        if seen.insert(r.person_id.as_str()) {
            out.push(r.person_id.clone());
        }
    }
    out
}

/// Build the overlay for the first `max_subjects` subjects of `rows`.
pub fn overlay_trajectories(rows: &[&VlRecord], columns: &ColumnPresence, max_subjects: usize) -> Overlay {
    let mut subjects = subject_ids(rows);
    subjects.truncate(max_subjects);

    let keep: HashSet<&str> = subjects.iter().map(String::as_str).collect();
    let sampled: Vec<&VlRecord> = rows
        .iter()
        .copied()
        .filter(|r| keep.contains(r.person_id.as_str()))
        .collect();

    let by_infection = columns.infection_id && sampled.iter().any(|r| r.infection_id.is_some());
    let by_sample_type = columns.sample_type && sampled.iter().any(|r| r.sample_type.is_some());

    let mut groups: BTreeMap<TrajectoryKey, Vec<Observation>> = BTreeMap::new();
    for r in sampled {
        let Some(key) = group_key(r, by_infection, by_sample_type) else {
            continue;
        };
        let Some(y) = plotted_value(r, columns.ge_conversion) else {
            continue;
        };
        groups.entry(key).or_default().push(Observation::new(r.time_days, y));
    }

    Overlay {
        trajectories: groups
            .into_iter()
            .map(|(key, points)| Trajectory { key, points })
            .collect(),
        subjects,
        y_label: y_label(columns),
        ge_transformed: columns.ge_conversion,
    }
}

/// Raw observations of one subject, stably sorted by time.
pub fn subject_observations(rows: &[&VlRecord], person_id: &str) -> Vec<Observation> {
    let mut obs: Vec<Observation> = rows
        .iter()
        .filter(|r| r.person_id == person_id)
        .map(|r| r.observation())
        .collect();
    obs.sort_by(|a, b| a.t.total_cmp(&b.t));
    obs
}

fn group_key(r: &VlRecord, by_infection: bool, by_sample_type: bool) -> Option<TrajectoryKey> {
    let infection_id = if by_infection {
        Some(r.infection_id.clone()?)
    } else {
        None
    };
    let sample_type = if by_sample_type {
        Some(r.sample_type.clone()?)
    } else {
        None
    };
    Some(TrajectoryKey {
        person_id: r.person_id.clone(),
        infection_id,
        sample_type,
    })
}

fn plotted_value(r: &VlRecord, ge_conversion: bool) -> Option<f64> {
    if !ge_conversion {
        return Some(r.log10_vl);
    }
    let v = r.log10_vl * r.ge_slope? + r.ge_intercept?;
    v.is_finite().then_some(v)
}
