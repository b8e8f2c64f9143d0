//! Synthetic viral-load cohorts for demos and tests.
//!
//! Each subject gets its own piecewise-linear kinetics (rise, fall, plateau),
//! a handful of sampling days and Gaussian measurement noise. Everything is
//! drawn from a single seeded `StdRng`, so a seed always yields the same cohort.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use log::info;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{KineticParameters, VlRecord};
use crate::error::AppError;
use crate::models::evaluate_at;

/// Reported age groups `(AgeRng1, AgeRng2)`.
const AGE_GROUPS: [(f64, f64); 4] = [(0.0, 17.0), (18.0, 39.0), (40.0, 64.0), (65.0, 90.0)];

#[derive(Debug, Clone, PartialEq)]
pub struct SynthConfig {
    pub subjects: usize,
    pub seed: u64,
    pub studies: Vec<String>,
    pub sample_types: Vec<String>,
    /// Sampling window in days, starting at 0.
    pub horizon_days: f64,
    /// Inclusive range of samples per subject.
    pub samples_per_subject: (usize, usize),
    /// Standard deviation of the measurement noise (log10 units).
    pub noise_sd: f64,
    /// Emit `GEml_conversion_slope` / `GEml_conversion_intercept` per study.
    pub ge_conversion: bool,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            subjects: 60,
            seed: 42,
            studies: vec!["STUDY-A".to_string(), "STUDY-B".to_string(), "STUDY-C".to_string()],
            sample_types: vec!["Nasal".to_string(), "Saliva".to_string()],
            horizon_days: 21.0,
            samples_per_subject: (6, 14),
            noise_sd: 0.25,
            ge_conversion: false,
        }
    }
}

impl SynthConfig {
    fn validate(&self) -> Result<(), AppError> {
        if self.subjects == 0 {
            return Err(AppError::input("Synthetic cohort needs at least one subject."));
        }
        if self.studies.is_empty() || self.sample_types.is_empty() {
            return Err(AppError::input("Synthetic cohort needs at least one study and one sample type."));
        }
        if !(self.horizon_days.is_finite() && self.horizon_days > 0.0) {
            return Err(AppError::input("Sampling horizon must be a positive number of days."));
        }
        let (lo, hi) = self.samples_per_subject;
        if lo == 0 || hi < lo {
            return Err(AppError::input("Invalid samples-per-subject range."));
        }
        if !(self.noise_sd.is_finite() && self.noise_sd >= 0.0) {
            return Err(AppError::input("Noise standard deviation must be >= 0."));
        }
        Ok(())
    }
}

/// Generate a cohort; records are grouped by subject and time-ordered within each.
pub fn generate_cohort(config: &SynthConfig) -> Result<Vec<VlRecord>, AppError> {
    config.validate()?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, config.noise_sd)
        .map_err(|e| AppError::internal(format!("Noise distribution error: {e}")))?;

    // Per-study GE/ml conversion, drawn up front so it does not depend on subject count.
    let conversions: Vec<(f64, f64)> = config
        .studies
        .iter()
        .map(|_| (rng.gen_range(0.9..1.1), rng.gen_range(0.5..1.5)))
        .collect();

    let mut records = Vec::new();
    for i in 0..config.subjects {
        let person_id = format!("SYN-{:04}", i + 1);
        let params = draw_kinetics(&mut rng);

        let study_idx = rng.gen_range(0..config.studies.len());
        let sample_type = &config.sample_types[rng.gen_range(0..config.sample_types.len())];
        let (age_lo, age_hi) = AGE_GROUPS[rng.gen_range(0..AGE_GROUPS.len())];

        let n = rng.gen_range(config.samples_per_subject.0..=config.samples_per_subject.1);
        let mut days: Vec<f64> = (0..n)
            .map(|_| round_to(rng.gen_range(0.0..=config.horizon_days), 2))
            .collect();
        days.sort_by(f64::total_cmp);

        for t in days {
            let y = evaluate_at(t, &params) + noise.sample(&mut rng);
            let mut r = VlRecord::new(person_id.clone(), t, round_to(y, 3));
            r.age_lo = Some(age_lo);
            r.age_hi = Some(age_hi);
            r.study_id = Some(config.studies[study_idx].clone());
            r.sample_type = Some(sample_type.clone());
            r.infection_id = Some(format!("{person_id}-I1"));
            if config.ge_conversion {
                let (slope, intercept) = conversions[study_idx];
                r.ge_slope = Some(round_to(slope, 4));
                r.ge_intercept = Some(round_to(intercept, 4));
            }
            records.push(r);
        }
    }

    Ok(records)
}

/// Draw plausible kinetics: a 1.5-4 day rise, then a decline to a plateau.
fn draw_kinetics(rng: &mut StdRng) -> KineticParameters {
    let t1 = rng.gen_range(0.0..3.0);
    let t2 = t1 + rng.gen_range(1.5..4.0);
    let t3 = t2 + rng.gen_range(5.0..12.0);
    let y0 = rng.gen_range(1.5..3.0);
    let s1 = rng.gen_range(1.0..2.5);
    let peak = y0 + s1 * (t2 - t1);
    let plateau = rng.gen_range(1.0..2.5);
    let s2 = (plateau - peak) / (t3 - t2);
    KineticParameters { t1, t2, t3, y0, s1, s2 }
}

fn round_to(v: f64, decimals: i32) -> f64 {
    let f = 10f64.powi(decimals);
    (v * f).round() / f
}

/// Write a cohort in the ingest CSV schema.
pub fn write_cohort_csv(path: &Path, records: &[VlRecord], ge_conversion: bool) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create cohort CSV '{}': {e}", path.display())))?;
    write_cohort(file, records, ge_conversion)?;
    info!("wrote {} synthetic record(s) to '{}'", records.len(), path.display());
    Ok(())
}

fn write_cohort<W: Write>(out: W, records: &[VlRecord], ge_conversion: bool) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    let wrap = |e: csv::Error| AppError::input(format!("Failed to write cohort CSV: {e}"));

    let mut header = vec![
        "PersonID",
        "TimeDays",
        "Log10VL",
        "AgeRng1",
        "AgeRng2",
        "StudyID",
        "SampleType",
        "InfectionID",
    ];
    if ge_conversion {
        header.extend(["GEml_conversion_slope", "GEml_conversion_intercept"]);
    }
    writer.write_record(&header).map_err(wrap)?;

    for r in records {
        let mut row = vec![
            r.person_id.clone(),
            r.time_days.to_string(),
            r.log10_vl.to_string(),
            opt_num(r.age_lo),
            opt_num(r.age_hi),
            r.study_id.clone().unwrap_or_default(),
            r.sample_type.clone().unwrap_or_default(),
            r.infection_id.clone().unwrap_or_default(),
        ];
        if ge_conversion {
            row.push(opt_num(r.ge_slope));
            row.push(opt_num(r.ge_intercept));
        }
        writer.write_record(&row).map_err(wrap)?;
    }

    writer
        .flush()
        .map_err(|e| AppError::input(format!("Failed to flush cohort CSV: {e}")))
}

fn opt_num(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ingest::read_dataset;

    fn small() -> SynthConfig {
        SynthConfig {
            subjects: 5,
            ..SynthConfig::default()
        }
    }

    #[test]
    fn same_seed_same_cohort() {
        let a = generate_cohort(&small()).unwrap();
        let b = generate_cohort(&small()).unwrap();
        assert_eq!(a, b);

        let c = generate_cohort(&SynthConfig { seed: 7, ..small() }).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn subjects_have_sorted_days_within_horizon() {
        let cfg = small();
        let records = generate_cohort(&cfg).unwrap();
        for id in ["SYN-0001", "SYN-0005"] {
            let days: Vec<f64> = records.iter().filter(|r| r.person_id == id).map(|r| r.time_days).collect();
            assert!(days.len() >= cfg.samples_per_subject.0 && days.len() <= cfg.samples_per_subject.1);
            assert!(days.windows(2).all(|w| w[0] <= w[1]));
            assert!(days.iter().all(|&d| (0.0..=cfg.horizon_days).contains(&d)));
        }
    }

    #[test]
    fn written_cohort_reads_back_through_ingest() {
        let cfg = SynthConfig {
            ge_conversion: true,
            ..small()
        };
        let records = generate_cohort(&cfg).unwrap();
        let mut buf = Vec::new();
        write_cohort(&mut buf, &records, true).unwrap();

        let ds = read_dataset(buf.as_slice()).unwrap();
        assert_eq!(ds.rows_used, records.len());
        assert_eq!(ds.stats.subjects.len(), 5);
        assert!(ds.columns.ge_conversion);
        assert_eq!(ds.records[0].ge_slope, records[0].ge_slope);
    }

    #[test]
    fn invalid_config_is_an_input_error() {
        let err = generate_cohort(&SynthConfig { subjects: 0, ..small() }).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_INPUT);
        assert!(generate_cohort(&SynthConfig { samples_per_subject: (5, 2), ..small() }).is_err());
    }
}
