//! Bundled Iris dataset
//!
//! The CSV is compiled into the binary. Its first row is a header of the form
//! `n_samples,n_features,<target name>...`; every following row holds the
//! feature values followed by the integer class label.

use crate::core::unified_error::{errors, UnifiedResult};
use linfa::Dataset;
use ndarray::{Array1, Array2, Ix1};
use tracing::debug;

const IRIS_CSV: &str = include_str!("../data/iris.csv");

pub const FEATURE_NAMES: [&str; 4] = [
    "sepal length (cm)",
    "sepal width (cm)",
    "petal length (cm)",
    "petal width (cm)",
];

/// Labelled feature matrix with human-readable class names
#[derive(Debug, Clone)]
pub struct IrisDataset {
    /// One row per sample
    pub records: Array2<f64>,
    /// Class index per sample, indexes into `target_names`
    pub targets: Array1<usize>,
    pub target_names: Vec<String>,
    pub feature_names: Vec<String>,
}

impl IrisDataset {
    pub fn n_samples(&self) -> usize {
        self.records.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.records.ncols()
    }

    pub fn target_name(&self, class_id: usize) -> Option<&str> {
        self.target_names.get(class_id).map(String::as_str)
    }

    /// Copy into a linfa dataset with feature names attached
    pub fn to_linfa(&self) -> Dataset<f64, usize, Ix1> {
        Dataset::new(self.records.clone(), self.targets.clone())
            .with_feature_names(self.feature_names.clone())
    }
}

/// Load the bundled Iris dataset (150 samples, 4 features, 3 classes)
pub fn load_iris() -> UnifiedResult<IrisDataset> {
    let dataset = parse_dataset_csv(IRIS_CSV)?;
    debug!(
        samples = dataset.n_samples(),
        features = dataset.n_features(),
        classes = dataset.target_names.len(),
        "loaded bundled iris dataset"
    );
    Ok(dataset)
}

/// Parse `"5.1,3.5,1.4,0.2"` into exactly `expected` feature values
pub fn parse_feature_list(text: &str, expected: usize) -> UnifiedResult<Vec<f64>> {
    let values = text
        .split(',')
        .map(|tok| tok.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| {
            errors::validation(
                "data",
                format!("{expected} numeric values separated by commas"),
                format!("'{text}'"),
            )
        })?;
    if values.len() != expected || values.iter().any(|v| !v.is_finite()) {
        return Err(errors::validation(
            "data",
            format!("{expected} numeric values separated by commas"),
            format!("'{text}'"),
        ));
    }
    Ok(values)
}

pub(crate) fn parse_dataset_csv(text: &str) -> UnifiedResult<IrisDataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut rows = reader.records();

    let header = rows
        .next()
        .ok_or_else(|| errors::invalid_dataset(0, "empty dataset"))?
        .map_err(|e| errors::invalid_dataset(0, &e.to_string()))?;
    if header.len() < 3 {
        return Err(errors::invalid_dataset(
            0,
            "header must be n_samples,n_features,<target names>",
        ));
    }
    let n_samples: usize = header[0]
        .trim()
        .parse()
        .map_err(|_| errors::invalid_dataset(0, "n_samples is not an integer"))?;
    let n_features: usize = header[1]
        .trim()
        .parse()
        .map_err(|_| errors::invalid_dataset(0, "n_features is not an integer"))?;
    let target_names: Vec<String> = header
        .iter()
        .skip(2)
        .map(|s| s.trim().to_string())
        .collect();

    let mut flat = Vec::with_capacity(n_samples * n_features);
    let mut targets = Vec::with_capacity(n_samples);

    for (i, result) in rows.enumerate() {
        let row = i + 1;
        let record = result.map_err(|e| errors::invalid_dataset(row, &e.to_string()))?;
        if record.len() != n_features + 1 {
            return Err(errors::invalid_dataset(
                row,
                &format!(
                    "expected {} columns, found {}",
                    n_features + 1,
                    record.len()
                ),
            ));
        }

        for (j, cell) in record.iter().take(n_features).enumerate() {
            let value: f64 = cell.trim().parse().map_err(|_| {
                errors::invalid_dataset(row, &format!("feature {j}: '{cell}' is not a number"))
            })?;
            flat.push(value);
        }

        let label_cell = &record[n_features];
        let label: usize = label_cell.trim().parse().map_err(|_| {
            errors::invalid_dataset(row, &format!("label '{label_cell}' is not a class index"))
        })?;
        if label >= target_names.len() {
            return Err(errors::invalid_dataset(
                row,
                &format!(
                    "label {label} out of range for {} classes",
                    target_names.len()
                ),
            ));
        }
        targets.push(label);
    }

    if targets.len() != n_samples {
        return Err(errors::invalid_dataset(
            targets.len(),
            &format!(
                "header declares {n_samples} samples, found {}",
                targets.len()
            ),
        ));
    }

    let records = Array2::from_shape_vec((n_samples, n_features), flat)
        .map_err(|e| errors::invalid_dataset(0, &e.to_string()))?;

    let feature_names = if n_features == FEATURE_NAMES.len() {
        FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
    } else {
        (0..n_features).map(|j| format!("feature_{j}")).collect()
    };

    Ok(IrisDataset {
        records,
        targets: Array1::from_vec(targets),
        target_names,
        feature_names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_dataset_shape() {
        let iris = load_iris().unwrap();
        assert_eq!(iris.n_samples(), 150);
        assert_eq!(iris.n_features(), 4);
        assert_eq!(iris.target_names, vec!["setosa", "versicolor", "virginica"]);
        assert_eq!(iris.feature_names.len(), 4);
    }

    #[test]
    fn test_bundled_dataset_is_balanced() {
        let iris = load_iris().unwrap();
        for class_id in 0..3 {
            let count = iris.targets.iter().filter(|&&t| t == class_id).count();
            assert_eq!(count, 50, "class {class_id}");
        }
    }

    #[test]
    fn test_first_sample() {
        let iris = load_iris().unwrap();
        assert_eq!(iris.records.row(0).to_vec(), vec![5.1, 3.5, 1.4, 0.2]);
        assert_eq!(iris.targets[0], 0);
        assert_eq!(iris.target_name(0), Some("setosa"));
        assert_eq!(iris.target_name(3), None);
    }

    #[test]
    fn test_to_linfa_keeps_shape() {
        let iris = load_iris().unwrap();
        let dataset = iris.to_linfa();
        assert_eq!(dataset.records().nrows(), 150);
        assert_eq!(dataset.targets().len(), 150);
        assert_eq!(dataset.feature_names().len(), 4);
    }

    #[test]
    fn test_parse_feature_list() {
        assert_eq!(
            parse_feature_list("5.1, 3.5,1.4 ,0.2", 4).unwrap(),
            vec![5.1, 3.5, 1.4, 0.2]
        );
        assert!(parse_feature_list("5.1,3.5,1.4", 4).is_err());
        assert!(parse_feature_list("5.1,3.5,abc,0.2", 4).is_err());
        assert!(parse_feature_list("5.1,3.5,NaN,0.2", 4).is_err());
        assert!(parse_feature_list("", 4).is_err());
    }

    #[test]
    fn test_rejects_non_numeric_feature() {
        let err = parse_dataset_csv("1,2,a,b\n1.0,x,0\n").unwrap_err();
        assert!(err.to_string().contains("not a number"), "{err}");
    }

    #[test]
    fn test_rejects_label_out_of_range() {
        let err = parse_dataset_csv("1,2,a,b\n1.0,2.0,5\n").unwrap_err();
        assert!(err.to_string().contains("out of range"), "{err}");
    }

    #[test]
    fn test_rejects_sample_count_mismatch() {
        let err = parse_dataset_csv("3,2,a,b\n1.0,2.0,0\n").unwrap_err();
        assert!(err.to_string().contains("declares 3 samples"), "{err}");
    }
}
