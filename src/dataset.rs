//! Turns the nutrition CSV into labelled meal records.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::config::{
    TrainingConfig, CALORIES_COLUMN, CATEGORY_COLUMN, DIET_COLUMN, PROTEIN_COLUMN,
};
use crate::encoder::{encode, MealRecord};
use crate::error::StoreError;
use crate::schema::FeatureSchema;

/// Labelled training data ready for the classifier.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub schema: FeatureSchema,
    pub features: Array2<f64>,
    pub labels: Vec<bool>,
}

pub fn load_training_rows(
    path: &Path,
    cfg: &TrainingConfig,
) -> Result<Vec<MealRecord>, StoreError> {
    read_training_rows(File::open(path)?, cfg)
}

/// Cell values read as missing, in addition to the empty cell.
pub const MISSING_MARKERS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_missing(cell: &str) -> bool {
    cell.is_empty() || MISSING_MARKERS.contains(&cell)
}

/// Reads every complete row. Rows with a missing cell, a cell count that
/// differs from the header, or a non-finite number are skipped.
pub fn read_training_rows<R: Read>(
    input: R,
    cfg: &TrainingConfig,
) -> Result<Vec<MealRecord>, StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input);
    let headers = reader.headers()?.clone();
    let column = |name: &'static str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or(StoreError::MissingColumn(name))
    };
    let calories = column(CALORIES_COLUMN)?;
    let protein = column(PROTEIN_COLUMN)?;
    let category = column(CATEGORY_COLUMN)?;
    let diet = column(DIET_COLUMN)?;

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() != headers.len() || record.iter().any(is_missing) {
            continue;
        }
        let row = line + 1;
        let calories = parse_number(&record, calories, CALORIES_COLUMN, row)?;
        let protein = parse_number(&record, protein, PROTEIN_COLUMN, row)?;
        if !calories.is_finite() || !protein.is_finite() {
            continue;
        }
        let category_value = record[category].to_string();
        rows.push(MealRecord {
            calories,
            protein,
            cuisine: cfg.cuisine_for(&category_value),
            category: category_value,
            diet: record[diet].to_string(),
        });
    }

    if rows.is_empty() {
        return Err(StoreError::EmptyDataset);
    }
    Ok(rows)
}

fn parse_number(
    record: &StringRecord,
    idx: usize,
    column: &'static str,
    row: usize,
) -> Result<f64, StoreError> {
    let value = &record[idx];
    value.parse::<f64>().map_err(|_| StoreError::BadNumber {
        row,
        column,
        value: value.to_string(),
    })
}

/// Median with the mean of the two middle values for an even count.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Recommended meals are those with protein strictly above the median.
pub fn protein_labels(rows: &[MealRecord]) -> Vec<bool> {
    let proteins: Vec<f64> = rows.iter().map(|r| r.protein).collect();
    match median(&proteins) {
        Some(m) => proteins.iter().map(|&p| p > m).collect(),
        None => Vec::new(),
    }
}

/// Derives the schema from `rows` and encodes every row against it.
pub fn build_training_set(rows: &[MealRecord]) -> Result<TrainingSet, StoreError> {
    let schema = FeatureSchema::from_rows(rows);
    let mut flat = Vec::with_capacity(rows.len() * schema.len());
    for row in rows {
        flat.extend(encode(row, &schema));
    }
    let features = Array2::from_shape_vec((rows.len(), schema.len()), flat)?;
    Ok(TrainingSet {
        schema,
        features,
        labels: protein_labels(rows),
    })
}

/// Shuffled `(train, test)` index split; the test side gets `ceil(n * ratio)` rows.
pub fn train_test_split(n: usize, ratio: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut idx: Vec<usize> = (0..n).collect();
    idx.shuffle(&mut StdRng::seed_from_u64(seed));
    let n_test = ((n as f64) * ratio).ceil() as usize;
    let n_test = n_test.min(n.saturating_sub(1));
    let train = idx.split_off(n_test);
    (train, idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
Dish Name,Calories (kcal),Protein (g),Category,Dietary Preference
Dal Tadka,180,9,Main Dish,Vegetarian
Poha,250,4,Breakfast,Vegetarian
Chicken Curry,320,25,Main Dish,Non-Vegetarian
Moong Dal,150,,Lentil Dish,Vegetarian
Rajma,210,11,Lentil Dish,Vegetarian
Samosa,260,5, ,Vegetarian
";

    #[test]
    fn drops_incomplete_rows_and_derives_cuisine() {
        let rows = read_training_rows(CSV.as_bytes(), &TrainingConfig::default()).unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(names, vec!["Main Dish", "Breakfast", "Main Dish", "Lentil Dish"]);
        assert_eq!(rows[0].cuisine, "North Indian");
        assert_eq!(rows[1].cuisine, "General");
        assert_eq!(rows[3].cuisine, "North Indian");
        assert_eq!(rows[2].protein, 25.0);
    }

    #[test]
    fn missing_column_is_reported() {
        let csv = "Calories (kcal),Category\n1,Snack\n";
        let err = read_training_rows(csv.as_bytes(), &TrainingConfig::default()).unwrap_err();
        assert!(matches!(err, StoreError::MissingColumn(PROTEIN_COLUMN)));
    }

    #[test]
    fn non_numeric_cell_is_an_error() {
        let csv = "\
Calories (kcal),Protein (g),Category,Dietary Preference
many,3,Snack,Vegetarian
";
        let err = read_training_rows(csv.as_bytes(), &TrainingConfig::default()).unwrap_err();
        assert!(matches!(err, StoreError::BadNumber { column: CALORIES_COLUMN, .. }));
    }

    const HEADER: &str = "Dish Name,Calories (kcal),Protein (g),Category,Dietary Preference\n";

    fn rows_of(body: &str) -> Vec<MealRecord> {
        let csv = format!("{HEADER}Dal Tadka,180,9,Main Dish,Vegetarian\n{body}");
        read_training_rows(csv.as_bytes(), &TrainingConfig::default()).unwrap()
    }

    #[test]
    fn missing_value_markers_drop_the_row() {
        for marker in ["N/A", "NA", "null", "None", "#N/A", "nan"] {
            let rows = rows_of(&format!("Poha,{marker},4,Breakfast,Vegetarian\n"));
            assert_eq!(rows.len(), 1, "marker {marker:?} was kept");
        }
        let rows = rows_of("Poha,250,4,Breakfast,NULL\n");
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn nan_and_infinite_numbers_drop_the_row() {
        let rows = rows_of(
            "Poha,250,NaN,Breakfast,Vegetarian\n\
             Idli,inf,3,Breakfast,Vegetarian\n",
        );
        assert_eq!(rows.len(), 1);
        assert!(rows.iter().all(|r| r.protein.is_finite() && r.calories.is_finite()));
    }

    #[test]
    fn short_and_long_rows_are_skipped_not_fatal() {
        let rows = rows_of(
            "Poha,250,4\n\
             Idli,60,3,Breakfast,Vegetarian,extra\n\
             Upma,200,5,Breakfast,Vegetarian\n",
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].calories, 200.0);
    }

    #[test]
    fn median_handles_odd_and_even_counts() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn labels_are_strictly_above_median() {
        let rows: Vec<MealRecord> = [1.0, 2.0, 3.0]
            .iter()
            .map(|&p| MealRecord {
                protein: p,
                ..Default::default()
            })
            .collect();
        assert_eq!(protein_labels(&rows), vec![false, false, true]);
    }

    #[test]
    fn training_set_rows_follow_schema() {
        let rows = read_training_rows(CSV.as_bytes(), &TrainingConfig::default()).unwrap();
        let set = build_training_set(&rows).unwrap();
        assert_eq!(set.features.nrows(), 4);
        assert_eq!(set.features.ncols(), set.schema.len());
        assert_eq!(set.labels.len(), 4);
    }

    #[test]
    fn split_is_deterministic_and_disjoint() {
        let (train, test) = train_test_split(10, 0.2, 42);
        assert_eq!(test.len(), 2);
        assert_eq!(train.len(), 8);
        assert_eq!(train_test_split(10, 0.2, 42), (train.clone(), test.clone()));

        let mut all: Vec<usize> = train.into_iter().chain(test).collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn split_keeps_at_least_one_training_row() {
        let (train, test) = train_test_split(1, 0.2, 42);
        assert_eq!(train.len(), 1);
        assert!(test.is_empty());
    }
}
