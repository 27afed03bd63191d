use serde_json::{Map, Value};

use crate::error::MealError;
use crate::schema::{CategoricalColumn, FeatureSchema, FeatureSlot, NumericField};

/// Raw meal attributes as seen by the encoder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MealRecord {
    pub calories: f64,
    pub protein: f64,
    pub cuisine: String,
    pub category: String,
    pub diet: String,
}

impl MealRecord {
    /// Reads a meal from request JSON. Absent or null attributes default to `0`
    /// or the empty string; present attributes of the wrong type are an error.
    pub fn from_json(value: &Value) -> Result<Self, MealError> {
        let obj = value
            .as_object()
            .ok_or_else(|| MealError::NotAnObject(json_kind(value).to_string()))?;

        Ok(Self {
            calories: number_field(obj, NumericField::Calories.as_str())?,
            protein: number_field(obj, NumericField::Protein.as_str())?,
            cuisine: text_field(obj, CategoricalColumn::Cuisine.as_str())?,
            category: text_field(obj, CategoricalColumn::Category.as_str())?,
            diet: text_field(obj, CategoricalColumn::Diet.as_str())?,
        })
    }

    pub fn numeric(&self, field: NumericField) -> f64 {
        match field {
            NumericField::Calories => self.calories,
            NumericField::Protein => self.protein,
        }
    }

    pub fn categorical(&self, column: CategoricalColumn) -> &str {
        match column {
            CategoricalColumn::Cuisine => &self.cuisine,
            CategoricalColumn::Category => &self.category,
            CategoricalColumn::Diet => &self.diet,
        }
    }
}

/// Produces a vector aligned 1:1 with `schema`.
///
/// Category values unseen at training time leave every indicator of their
/// column at zero.
pub fn encode(meal: &MealRecord, schema: &FeatureSchema) -> Vec<f64> {
    let mut vector = vec![0.0; schema.len()];
    for (slot, out) in schema.slots().iter().zip(vector.iter_mut()) {
        *out = match slot {
            FeatureSlot::Numeric { field } => meal.numeric(*field),
            FeatureSlot::OneHot { column, value } => {
                if normalize(meal.categorical(*column)) == normalize(value) {
                    1.0
                } else {
                    0.0
                }
            }
        };
    }
    vector
}

/// Case-folds and treats underscores as spaces.
pub fn normalize(value: &str) -> String {
    value.replace('_', " ").to_lowercase()
}

fn number_field(obj: &Map<String, Value>, field: &'static str) -> Result<f64, MealError> {
    let invalid = |v: &Value| MealError::InvalidField {
        field,
        expected: "a number",
        got: v.to_string(),
    };

    match obj.get(field) {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| invalid(&obj[field])),
        Some(v @ Value::String(s)) => s.trim().parse::<f64>().map_err(|_| invalid(v)),
        Some(v) => Err(invalid(v)),
    }
}

fn text_field(obj: &Map<String, Value>, field: &'static str) -> Result<String, MealError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(v) => Err(MealError::InvalidField {
            field,
            expected: "a string",
            got: v.to_string(),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_schema() -> FeatureSchema {
        use CategoricalColumn::*;
        FeatureSchema::new(vec![
            FeatureSlot::numeric(NumericField::Calories),
            FeatureSlot::numeric(NumericField::Protein),
            FeatureSlot::one_hot(Cuisine, "North Indian"),
            FeatureSlot::one_hot(Cuisine, "South Indian"),
            FeatureSlot::one_hot(Category, "Main Dish"),
            FeatureSlot::one_hot(Category, "Snack"),
            FeatureSlot::one_hot(Diet, "Vegetarian"),
            FeatureSlot::one_hot(Diet, "Non-Vegetarian"),
        ])
    }

    fn dal_tadka() -> MealRecord {
        MealRecord::from_json(&json!({
            "calories": 180,
            "protein": 9,
            "cuisine": "North Indian",
            "category": "Main Dish",
            "diet": "Vegetarian"
        }))
        .unwrap()
    }

    #[test]
    fn known_categories_set_one_indicator_per_column() {
        let v = encode(&dal_tadka(), &sample_schema());
        assert_eq!(v, vec![180.0, 9.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn length_matches_schema_and_is_stable() {
        let schema = sample_schema();
        let meal = dal_tadka();
        let first = encode(&meal, &schema);
        for _ in 0..5 {
            assert_eq!(encode(&meal, &schema), first);
        }
        assert_eq!(first.len(), schema.len());
    }

    #[test]
    fn unseen_category_zeroes_its_column() {
        let mut meal = dal_tadka();
        meal.cuisine = "Fusion".to_string();
        let v = encode(&meal, &sample_schema());
        assert_eq!(&v[2..4], &[0.0, 0.0]);
        assert_eq!(v[4], 1.0);
    }

    #[test]
    fn matching_ignores_case_and_underscores() {
        let mut meal = dal_tadka();
        meal.cuisine = "north_indian".to_string();
        meal.diet = "NON-VEGETARIAN".to_string();
        let v = encode(&meal, &sample_schema());
        assert_eq!(v[2], 1.0);
        assert_eq!(&v[6..8], &[0.0, 1.0]);
    }

    #[test]
    fn missing_attributes_default_instead_of_failing() {
        let meal = MealRecord::from_json(&json!({"cuisine": "South Indian"})).unwrap();
        let v = encode(&meal, &sample_schema());
        assert_eq!(v, vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let meal = MealRecord::from_json(&json!({"calories": " 250.5", "protein": "12"})).unwrap();
        assert_eq!(meal.calories, 250.5);
        assert_eq!(meal.protein, 12.0);
    }

    #[test]
    fn wrong_types_are_rejected() {
        let err = MealRecord::from_json(&json!({"calories": "lots"})).unwrap_err();
        assert!(matches!(err, MealError::InvalidField { field: "calories", .. }));

        let err = MealRecord::from_json(&json!({"diet": 3})).unwrap_err();
        assert!(matches!(err, MealError::InvalidField { field: "diet", .. }));

        let err = MealRecord::from_json(&json!([1, 2])).unwrap_err();
        assert_eq!(err, MealError::NotAnObject("an array".to_string()));
    }
}
