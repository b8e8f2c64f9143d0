//! Export per-observation fit results to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{KineticParameters, Observation};
use crate::error::AppError;
use crate::models::evaluate_at;

/// Write `time_days,log10_vl,fitted,residual` for one subject.
pub fn write_fit_csv(
    path: &Path,
    subject: &str,
    observations: &[Observation],
    params: &KineticParameters,
) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_fit_rows(file, subject, observations, params)
}

fn write_fit_rows<W: Write>(
    out: W,
    subject: &str,
    observations: &[Observation],
    params: &KineticParameters,
) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    let wrap = |e: csv::Error| AppError::input(format!("Failed to write export CSV: {e}"));

    writer
        .write_record(["person_id", "time_days", "log10_vl", "fitted", "residual"])
        .map_err(wrap)?;

    for o in observations {
        let fitted = evaluate_at(o.t, params);
        writer
            .write_record([
                subject.to_string(),
                o.t.to_string(),
                format!("{:.6}", o.y),
                format!("{fitted:.6}"),
                format!("{:.6}", o.y - fitted),
            ])
            .map_err(wrap)?;
    }

    writer
        .flush()
        .map_err(|e| AppError::input(format!("Failed to write export CSV: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_carry_residuals() {
        let params = KineticParameters { t1: 0.0, t2: 2.0, t3: 4.0, y0: 1.0, s1: 1.0, s2: -1.0 };
        let obs = [Observation::new(1.0, 2.5), Observation::new(2.0, 3.0)];

        let mut buf = Vec::new();
        write_fit_rows(&mut buf, "P1", &obs, &params).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let expected = concat!(
            "person_id,time_days,log10_vl,fitted,residual\n",
            "P1,1,2.500000,2.000000,0.500000\n",
            "P1,2,3.000000,3.000000,0.000000\n",
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn subject_with_comma_is_quoted() {
        let params = KineticParameters { t1: 0.0, t2: 2.0, t3: 4.0, y0: 1.0, s1: 1.0, s2: -1.0 };
        let obs = [Observation::new(1.0, 2.5)];

        let mut buf = Vec::new();
        write_fit_rows(&mut buf, "Smith, J", &obs, &params).unwrap();

        let mut reader = csv::Reader::from_reader(buf.as_slice());
        let rows: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 5);
        assert_eq!(&rows[0][0], "Smith, J");
        assert_eq!(&rows[0][4], "0.500000");
    }
}
