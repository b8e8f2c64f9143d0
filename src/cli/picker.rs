//! Interactive CSV picker.
//!
//! Last resort of data-path resolution: when neither `-f`, `VKX_DATA_PATH`
//! nor the default dataset is available, `vkx` lists the `*.csv` files under
//! the working directory and lets the user choose one.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Directory recursion depth when searching for CSV files.
const DEFAULT_SEARCH_DEPTH: usize = 4;

/// Prompt on stdin/stdout for a CSV file from the current directory tree.
///
/// Accepts a number from the list or an explicit path; `q` cancels.
pub fn prompt_for_csv_path() -> Result<PathBuf, AppError> {
    let files = discover_csv_files(Path::new("."));
    if files.is_empty() {
        return Err(AppError::input(
            "No .csv files found. Provide one with `vkx explore -f <file.csv>` or set VKX_DATA_PATH.",
        ));
    }
    let stdin = io::stdin();
    choose_csv(&files, &mut stdin.lock(), &mut io::stdout())
}

fn choose_csv<R: BufRead, W: Write>(files: &[PathBuf], input: &mut R, out: &mut W) -> Result<PathBuf, AppError> {
    let io_err = |e: io::Error| AppError::input(format!("Prompt I/O failed: {e}"));

    writeln!(out, "Found {} CSV file(s):", files.len()).map_err(io_err)?;
    for (idx, path) in files.iter().enumerate() {
        writeln!(out, "{:>3}) {}", idx + 1, pretty_path(path)).map_err(io_err)?;
    }

    loop {
        write!(out, "Select a file by number (1-{}) or type a path (q to quit): ", files.len()).map_err(io_err)?;
        out.flush().map_err(io_err)?;

        let mut line = String::new();
        if input.read_line(&mut line).map_err(io_err)? == 0 {
            return Err(AppError::input(
                "No input received. Provide a CSV path with `vkx explore -f <file.csv>`.",
            ));
        }

        let line = line.trim();
        if line.eq_ignore_ascii_case("q") {
            return Err(AppError::input("Canceled."));
        }

        if let Ok(choice) = line.parse::<usize>() {
            if (1..=files.len()).contains(&choice) {
                return validate_csv_path(&files[choice - 1]);
            }
            writeln!(out, "Invalid choice: {choice}. Enter a number between 1 and {}.", files.len())
                .map_err(io_err)?;
            continue;
        }

        match validate_csv_path(Path::new(line)) {
            Ok(path) => return Ok(path),
            Err(err) => writeln!(out, "{err}").map_err(io_err)?,
        }
    }
}

/// Check that `path` is an existing `.csv` file.
pub fn validate_csv_path(path: &Path) -> Result<PathBuf, AppError> {
    if !path.exists() {
        return Err(AppError::input(format!("CSV file not found: {}", path.display())));
    }
    if path.is_dir() {
        return Err(AppError::input(format!(
            "Expected a file, got a directory: {}",
            path.display()
        )));
    }
    if !has_csv_extension(path) {
        return Err(AppError::input(format!(
            "Expected a .csv file (got: {}). Use -f to pass a CSV path.",
            path.display()
        )));
    }
    Ok(path.to_path_buf())
}

/// `*.csv` files under `root`, sorted by display path.
pub fn discover_csv_files(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    walk(root, 0, &mut out);
    out.sort_by_key(|p| pretty_path(p));
    out
}

fn walk(dir: &Path, depth: usize, out: &mut Vec<PathBuf>) {
    if depth > DEFAULT_SEARCH_DEPTH {
        return;
    }
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            if !should_skip_dir(&path) {
                walk(&path, depth + 1, out);
            }
        } else if file_type.is_file() && has_csv_extension(&path) {
            out.push(path);
        }
    }
}

fn has_csv_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

fn should_skip_dir(path: &Path) -> bool {
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
    name.starts_with('.') || matches!(name, "target" | "node_modules")
}

fn pretty_path(path: &Path) -> String {
    let stripped = path.strip_prefix("./").unwrap_or(path);
    stripped.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        fs::create_dir_all(&data).unwrap();
        fs::create_dir_all(dir.path().join("target")).unwrap();
        let a = data.join("b_cohort.csv");
        let b = dir.path().join("a_cohort.CSV");
        fs::write(&a, "PersonID,TimeDays,Log10VL\n").unwrap();
        fs::write(&b, "PersonID,TimeDays,Log10VL\n").unwrap();
        fs::write(dir.path().join("target").join("skip.csv"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        (dir, a, b)
    }

    #[test]
    fn discovery_finds_csv_files_and_skips_build_dirs() {
        let (dir, a, b) = fixture();
        let found = discover_csv_files(dir.path());
        assert_eq!(found.len(), 2);
        assert!(found.contains(&a));
        assert!(found.contains(&b));
    }

    #[test]
    fn choose_by_number_and_reprompt_on_bad_input() {
        let (_dir, a, b) = fixture();
        let files = vec![b, a.clone()];
        let mut input = "7\nnot-a-file.csv\n2\n".as_bytes();
        let mut out = Vec::new();

        let chosen = choose_csv(&files, &mut input, &mut out).unwrap();
        assert_eq!(chosen, a);
        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("Invalid choice: 7"));
        assert!(shown.contains("CSV file not found"));
    }

    #[test]
    fn eof_and_quit_cancel() {
        let (_dir, a, _) = fixture();
        let files = vec![a];
        assert!(choose_csv(&files, &mut "".as_bytes(), &mut Vec::new()).is_err());
        let err = choose_csv(&files, &mut "q\n".as_bytes(), &mut Vec::new()).unwrap_err();
        assert_eq!(err.to_string(), "Canceled.");
    }

    #[test]
    fn validation_rejects_directories_and_other_extensions() {
        let (dir, _, _) = fixture();
        assert!(validate_csv_path(dir.path()).is_err());
        assert!(validate_csv_path(&dir.path().join("notes.txt")).is_err());
    }
}
