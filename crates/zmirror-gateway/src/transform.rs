//! Per-class value transforms for incoming write commands.
//!
//! Remote publishers send loosely typed scalars; devices want the exact
//! shape their class expects. A transform table maps a command's target
//! class (and optionally index) to a coercion applied before dispatch.
//! The defaults cover binary and multilevel switches.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use zmirror_core::{ClassId, Index, ValueId};

/// A coercion applied to a command's scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "transform", rename_all = "lowercase")]
pub enum Transform {
    /// Coerce to the integer `1` or `0`: `"on"`, `"true"`, `"1"`,
    /// nonzero numbers, and `true` become `1`; everything else `0`.
    OnOff,
    /// Coerce a decimal string to an integer where possible.
    Integer,
    /// Map one numeric value to a string, everything else to another.
    Discrete {
        /// The numeric value that selects `then`.
        matches: i64,
        /// Result when the scalar equals `matches`.
        then: String,
        /// Result for every other scalar.
        otherwise: String,
    },
}

impl Transform {
    fn apply(&self, value: &Json) -> Json {
        match self {
            Self::OnOff => Json::from(i64::from(truthy(value))),
            Self::Integer => match value {
                Json::String(text) => text
                    .trim()
                    .parse::<i64>()
                    .map_or_else(|_| value.clone(), Json::from),
                other => other.clone(),
            },
            Self::Discrete {
                matches,
                then,
                otherwise,
            } => {
                let selected = value.as_i64() == Some(*matches);
                Json::String(if selected {
                    then.clone()
                } else {
                    otherwise.clone()
                })
            }
        }
    }
}

fn truthy(value: &Json) -> bool {
    match value {
        Json::Bool(flag) => *flag,
        Json::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Json::String(text) => {
            matches!(text.to_ascii_lowercase().as_str(), "on" | "true" | "1")
        }
        _ => false,
    }
}

/// One table entry: which class (and optionally index) a transform
/// applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformRule {
    /// Target class.
    pub class_id: ClassId,
    /// Target index; `None` matches every index of the class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<Index>,
    /// The coercion to apply.
    #[serde(flatten)]
    pub transform: Transform,
}

/// Ordered transform rules; the first matching rule wins.
#[derive(Debug, Clone, Default)]
pub struct TransformTable {
    rules: Vec<TransformRule>,
}

impl TransformTable {
    /// Create a table from explicit rules.
    #[must_use]
    pub fn new(rules: Vec<TransformRule>) -> Self {
        Self { rules }
    }

    /// The built-in defaults: class 37 on/off and class 39 integer.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(vec![
            TransformRule {
                class_id: 37,
                index: None,
                transform: Transform::OnOff,
            },
            TransformRule {
                class_id: 39,
                index: None,
                transform: Transform::Integer,
            },
        ])
    }

    /// Apply the first matching rule; unmatched values pass through.
    #[must_use]
    pub fn apply(&self, id: &ValueId, value: &Json) -> Json {
        self.rules
            .iter()
            .find(|rule| {
                rule.class_id == id.class_id
                    && rule.index.map_or(true, |index| index == id.index)
            })
            .map_or_else(|| value.clone(), |rule| rule.transform.apply(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(class_id: ClassId, index: Index) -> ValueId {
        ValueId::new(3, class_id, 1, index)
    }

    #[test]
    fn binary_switch_scalars_coerce_to_integers() {
        let table = TransformTable::with_defaults();

        assert_eq!(table.apply(&id(37, 0), &json!("on")), json!(1));
        assert_eq!(table.apply(&id(37, 0), &json!("off")), json!(0));
        assert_eq!(table.apply(&id(37, 0), &json!(1)), json!(1));
        assert_eq!(table.apply(&id(37, 0), &json!(0)), json!(0));
        assert_eq!(table.apply(&id(37, 0), &json!(true)), json!(1));
        // Same shape the on/off command primitives produce.
        assert_eq!(table.apply(&id(37, 0), &json!("1")), json!(1));
    }

    #[test]
    fn multilevel_strings_parse_to_integers() {
        let table = TransformTable::with_defaults();

        assert_eq!(table.apply(&id(39, 0), &json!("80")), json!(80));
        assert_eq!(table.apply(&id(39, 0), &json!(" 7 ")), json!(7));
        assert_eq!(table.apply(&id(39, 0), &json!(42)), json!(42));
        // Unparseable strings pass through unchanged.
        assert_eq!(table.apply(&id(39, 0), &json!("dim")), json!("dim"));
    }

    #[test]
    fn discrete_rule_matches_class_and_index() {
        let table = TransformTable::new(vec![TransformRule {
            class_id: 113,
            index: Some(9),
            transform: Transform::Discrete {
                matches: 23,
                then: "0".to_string(),
                otherwise: "1".to_string(),
            },
        }]);

        assert_eq!(table.apply(&id(113, 9), &json!(23)), json!("0"));
        assert_eq!(table.apply(&id(113, 9), &json!(22)), json!("1"));
        // Other indexes of the class are untouched.
        assert_eq!(table.apply(&id(113, 3), &json!(23)), json!(23));
    }

    #[test]
    fn unmatched_classes_pass_through() {
        let table = TransformTable::with_defaults();

        assert_eq!(table.apply(&id(49, 1), &json!("21.5")), json!("21.5"));
    }

    #[test]
    fn rules_deserialize_from_config_json() {
        let rules: Vec<TransformRule> = serde_json::from_str(
            r#"[
                {"class_id": 37, "transform": "onoff"},
                {"class_id": 113, "index": 9, "transform": "discrete",
                 "matches": 23, "then": "0", "otherwise": "1"}
            ]"#,
        )
        .unwrap();

        let table = TransformTable::new(rules);
        assert_eq!(table.apply(&id(37, 0), &json!("on")), json!(1));
        assert_eq!(table.apply(&id(113, 9), &json!(23)), json!("0"));
    }
}
