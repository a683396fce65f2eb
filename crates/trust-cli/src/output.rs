use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use ndarray::Array2;

use trust_calculators::data_handling::TrainingData;
use trust_calculators::evaluation::{CalculatorFailure, EvaluationReport};

/// Write one row per test instance: its features, true and predicted label,
/// the misclassification flag, the probability vector and every trust column.
///
/// Rows a calculator left unscored get an empty cell.
pub fn write_trust_output<P: AsRef<Path>>(
    output_path: P,
    test: &TrainingData,
    predicted: &[usize],
    y_proba: &Array2<f64>,
    report: &EvaluationReport,
) -> Result<()> {
    let path = output_path.as_ref();
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("csv");
    let delimiter = match extension {
        "tsv" => '\t',
        _ => ',',
    };

    let file = File::create(path).with_context(|| format!("Failed to create output file: {:?}", path))?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter as u8)
        .from_writer(BufWriter::new(file));

    let mut header: Vec<String> = test.feature_names.clone();
    header.extend(
        ["true_label", "predicted_label", "is_misclassification", "probabilities"]
            .iter()
            .map(|s| s.to_string()),
    );
    header.extend(report.columns.iter().map(|(name, _)| name.clone()));
    writer.write_record(&header)?;

    for (row, features) in test.x.rows().into_iter().enumerate() {
        let true_label = &test.label_names[test.y[row]];
        let predicted_label = &test.label_names[predicted[row]];
        let probabilities = y_proba
            .row(row)
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(" ");

        let mut record: Vec<String> = features.iter().map(|v| v.to_string()).collect();
        record.push(true_label.clone());
        record.push(predicted_label.clone());
        record.push(if true_label != predicted_label { "1" } else { "0" }.to_string());
        record.push(probabilities);
        for (_, column) in &report.columns {
            record.push(column[row].map_or(String::new(), |v| v.to_string()));
        }
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write the calculators that failed (to build or to score) as a JSON list.
pub fn write_failures<P: AsRef<Path>>(output_path: P, failures: &[CalculatorFailure]) -> Result<()> {
    let path = output_path.as_ref();
    let file = File::create(path).with_context(|| format!("Failed to create failure report: {:?}", path))?;
    serde_json::to_writer_pretty(BufWriter::new(file), failures)
        .with_context(|| format!("Failed to write failure report: {:?}", path))?;
    Ok(())
}
