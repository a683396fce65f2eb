//! Tabular dataset ingestion.
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use ndarray::Array2;

use trust_calculators::data_handling::TrainingData;

/// Read a CSV (or TSV, by extension) file into a labelled dataset.
///
/// The label column is factorized to class ids in order of first appearance.
/// Feature columns with any value that does not parse as a number are dropped.
///
/// # Arguments
///
/// * `path` - Input file
/// * `label_column` - Header of the label column
/// * `limit` - Keep only the first `limit` rows
pub fn read_tabular_dataset<P: AsRef<Path>>(
    path: P,
    label_column: &str,
    limit: Option<usize>,
) -> Result<TrainingData> {
    let file = File::open(&path)
        .with_context(|| format!("Failed to open file: {:?}", path.as_ref()))?;
    let reader = BufReader::new(file);

    let is_tsv = path.as_ref().extension().map(|e| e == "tsv").unwrap_or(false);
    let delimiter = if is_tsv { b'\t' } else { b',' };

    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let label_idx = headers
        .iter()
        .position(|h| h == label_column)
        .with_context(|| format!("Label column '{}' not found in {:?}", label_column, path.as_ref()))?;

    let mut records = Vec::new();
    for result in rdr.records() {
        if limit.is_some_and(|l| records.len() >= l) {
            break;
        }
        records.push(result.with_context(|| format!("Malformed row in {:?}", path.as_ref()))?);
    }

    let mut label_names: Vec<String> = Vec::new();
    let mut label_ids: HashMap<String, usize> = HashMap::new();
    let y: Vec<usize> = records
        .iter()
        .map(|record| {
            let label = record.get(label_idx).unwrap_or("").to_string();
            *label_ids.entry(label.clone()).or_insert_with(|| {
                label_names.push(label);
                label_names.len() - 1
            })
        })
        .collect();

    let mut feature_names = Vec::new();
    let mut columns: Vec<Vec<f64>> = Vec::new();
    for (idx, name) in headers.iter().enumerate() {
        if idx == label_idx {
            continue;
        }
        let parsed: Option<Vec<f64>> = records
            .iter()
            .map(|record| record.get(idx).and_then(|v| v.trim().parse::<f64>().ok()))
            .collect();
        match parsed {
            Some(values) => {
                feature_names.push(name.to_string());
                columns.push(values);
            }
            None => log::debug!("Dropping non-numeric column '{}'", name),
        }
    }

    let x = Array2::from_shape_fn((records.len(), columns.len()), |(r, c)| columns[c][r]);
    let data = TrainingData::new(x, y, feature_names, label_names)?;
    log::info!(
        "Read {:?}: {} rows, {} numeric features, {} labels",
        path.as_ref(),
        data.n_samples(),
        data.n_features(),
        data.n_classes()
    );
    Ok(data)
}

/// File stem of a dataset path, safe to use inside an output file name.
pub fn clean_name(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn labels_follow_first_appearance_and_text_columns_drop() {
        let (_dir, path) = write_temp(
            "toy.csv",
            "a,proto,b,label\n1,tcp,2.5,normal\n2,udp,3.5,attack\n3,tcp,4.5,normal\n",
        );
        let data = read_tabular_dataset(&path, "label", None).unwrap();
        assert_eq!(data.label_names, vec!["normal", "attack"]);
        assert_eq!(data.y, vec![0, 1, 0]);
        assert_eq!(data.feature_names, vec!["a", "b"]);
        assert_eq!(data.x[(1, 1)], 3.5);
    }

    #[test]
    fn limit_truncates_rows() {
        let (_dir, path) = write_temp("toy.tsv", "x\tlabel\n1\ta\n2\tb\n3\tc\n");
        let data = read_tabular_dataset(&path, "label", Some(2)).unwrap();
        assert_eq!(data.n_samples(), 2);
        assert_eq!(data.n_classes(), 2);
    }

    #[test]
    fn missing_label_column_is_an_error() {
        let (_dir, path) = write_temp("toy.csv", "x,y\n1,2\n");
        let err = read_tabular_dataset(&path, "label", None).unwrap_err();
        assert!(err.to_string().contains("Label column 'label'"));
    }

    #[test]
    fn clean_name_strips_directories_and_extension() {
        assert_eq!(clean_name("data/NSL KDD.csv"), "NSL_KDD");
        assert_eq!(clean_name("iris"), "iris");
    }
}
