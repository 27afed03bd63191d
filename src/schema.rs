//! Ordered feature slots a classifier is trained against.
//!
//! The slot order is fixed when the model is trained and persisted with it.
//! The forest's splits refer to slot positions, so the same schema has to be
//! used for every encoding afterwards.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::encoder::MealRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    Calories,
    Protein,
}

impl NumericField {
    pub const ALL: [NumericField; 2] = [NumericField::Calories, NumericField::Protein];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calories => "calories",
            Self::Protein => "protein",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalColumn {
    Cuisine,
    Category,
    Diet,
}

impl CategoricalColumn {
    /// Encoding order of the categorical columns.
    pub const ALL: [CategoricalColumn; 3] = [
        CategoricalColumn::Cuisine,
        CategoricalColumn::Category,
        CategoricalColumn::Diet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cuisine => "cuisine",
            Self::Category => "category",
            Self::Diet => "diet",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureSlot {
    Numeric { field: NumericField },
    OneHot { column: CategoricalColumn, value: String },
}

impl FeatureSlot {
    pub fn numeric(field: NumericField) -> Self {
        Self::Numeric { field }
    }

    pub fn one_hot(column: CategoricalColumn, value: impl Into<String>) -> Self {
        Self::OneHot {
            column,
            value: value.into(),
        }
    }

    /// Display name, e.g. `calories` or `cuisine_North Indian`.
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FeatureSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric { field } => f.write_str(field.as_str()),
            Self::OneHot { column, value } => write!(f, "{}_{}", column.as_str(), value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    slots: Vec<FeatureSlot>,
}

impl FeatureSchema {
    pub fn new(slots: Vec<FeatureSlot>) -> Self {
        Self { slots }
    }

    /// Builds the schema a dummy encoding pass over `rows` produces: the numeric
    /// slots first, then one slot per distinct value of each categorical column,
    /// values in sorted order.
    pub fn from_rows<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a MealRecord>,
    {
        let mut seen: [BTreeSet<String>; 3] = Default::default();
        for row in rows {
            for (i, column) in CategoricalColumn::ALL.iter().enumerate() {
                seen[i].insert(row.categorical(*column).to_string());
            }
        }

        let mut slots: Vec<FeatureSlot> = NumericField::ALL
            .iter()
            .map(|f| FeatureSlot::numeric(*f))
            .collect();
        for (column, values) in CategoricalColumn::ALL.iter().zip(seen) {
            slots.extend(values.into_iter().map(|v| FeatureSlot::one_hot(*column, v)));
        }
        Self { slots }
    }

    /// Fixed slot list used when no dataset is available.
    pub fn canonical() -> Self {
        use CategoricalColumn::*;

        let mut slots: Vec<FeatureSlot> = NumericField::ALL
            .iter()
            .map(|f| FeatureSlot::numeric(*f))
            .collect();
        let one_hots: [(CategoricalColumn, &[&str]); 3] = [
            (Cuisine, &["North Indian", "South Indian", "Street Food", "General"]),
            (
                Category,
                &["Main Dish", "Breakfast", "Snack", "Side Dish", "Staple"],
            ),
            (Diet, &["Vegetarian", "Non-Vegetarian"]),
        ];
        for (column, values) in one_hots {
            slots.extend(values.iter().map(|v| FeatureSlot::one_hot(column, *v)));
        }
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[FeatureSlot] {
        &self.slots
    }

    pub fn names(&self) -> Vec<String> {
        self.slots.iter().map(FeatureSlot::name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meal(cuisine: &str, category: &str, diet: &str) -> MealRecord {
        MealRecord {
            calories: 100.0,
            protein: 5.0,
            cuisine: cuisine.to_string(),
            category: category.to_string(),
            diet: diet.to_string(),
        }
    }

    #[test]
    fn from_rows_orders_numeric_then_sorted_values_per_column() {
        let rows = vec![
            meal("North Indian", "Main Dish", "Vegetarian"),
            meal("General", "Snack", "Non-Vegetarian"),
            meal("North Indian", "Lentil Dish", "Vegetarian"),
        ];
        let schema = FeatureSchema::from_rows(&rows);
        assert_eq!(
            schema.names(),
            vec![
                "calories",
                "protein",
                "cuisine_General",
                "cuisine_North Indian",
                "category_Lentil Dish",
                "category_Main Dish",
                "category_Snack",
                "diet_Non-Vegetarian",
                "diet_Vegetarian",
            ]
        );
    }

    #[test]
    fn canonical_schema_has_thirteen_slots() {
        let schema = FeatureSchema::canonical();
        assert_eq!(schema.len(), 13);
        assert_eq!(schema.names()[2], "cuisine_North Indian");
        assert_eq!(schema.names()[12], "diet_Non-Vegetarian");
    }

    #[test]
    fn slots_serialize_with_a_kind_tag() {
        let slot = FeatureSlot::one_hot(CategoricalColumn::Diet, "Vegetarian");
        let json = serde_json::to_value(&slot).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "one_hot", "column": "diet", "value": "Vegetarian"})
        );
    }
}
