//! Reconciles the two impact payload shapes the backend emits.
//!
//! The *flat* shape comes straight from the bundled dataset
//! (`{food, carbon, water, ..., impact, environmental_score}`), the *nested*
//! shape from the Open Food Facts and USDA lookups
//! (`{food, score, breakdown: {...}, ingredients, nutrition, ...}`). The
//! presence of a non-null `breakdown` key is the only discriminator.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::food::models::{Breakdown, ImpactLevel, ImpactReport, Nutrition, PartialImpact};

const DEFAULT_SCORE: f64 = 5.0;

#[derive(Debug, Error, PartialEq)]
pub enum ShapeError {
    #[error("payload is not a JSON object")]
    NotAnObject,
    #[error("'food' must be a string")]
    MissingFood,
    #[error("'breakdown' must be an object")]
    BreakdownNotAnObject,
    #[error("metric '{0}' is missing")]
    MissingMetric(&'static str),
    #[error("metric '{0}' is not a non-negative number")]
    InvalidMetric(&'static str),
}

enum Shape<'a> {
    Flat(&'a Map<String, Value>),
    Nested {
        root: &'a Map<String, Value>,
        breakdown: &'a Value,
    },
}

impl<'a> Shape<'a> {
    fn detect(raw: &'a Value) -> Result<Self, ShapeError> {
        let root = raw.as_object().ok_or(ShapeError::NotAnObject)?;
        Ok(match root.get("breakdown") {
            Some(breakdown) if !breakdown.is_null() => Shape::Nested { root, breakdown },
            _ => Shape::Flat(root),
        })
    }
}

/// Converts a raw impact payload into an [`ImpactReport`].
///
/// Returns `None` for falsy input and for payloads that fail structural
/// validation; the rejection reason is logged, never raised.
pub fn normalize(raw: &Value) -> Option<ImpactReport> {
    if is_falsy(raw) {
        return None;
    }

    match try_normalize(raw) {
        Ok(report) => Some(report),
        Err(e) => {
            warn!(error = %e, "Rejected impact payload");
            None
        }
    }
}

pub fn try_normalize(raw: &Value) -> Result<ImpactReport, ShapeError> {
    match Shape::detect(raw)? {
        Shape::Nested { root, breakdown } => {
            let metrics = breakdown.as_object().ok_or(ShapeError::BreakdownNotAnObject)?;
            Ok(ImpactReport {
                food: root.get("food").and_then(Value::as_str).unwrap_or_default().to_string(),
                score: number(root, "score")
                    .or_else(|| number(root, "environmental_score"))
                    .unwrap_or(DEFAULT_SCORE),
                breakdown: read_breakdown(metrics)?,
                impact_level: impact_level(root),
                ingredients: string_list(root.get("ingredients")),
                certifications: string_list(root.get("certifications")),
                nutrition: root
                    .get("nutrition")
                    .and_then(|n| serde_json::from_value::<Nutrition>(n.clone()).ok())
                    .unwrap_or_default(),
            })
        }
        Shape::Flat(root) => {
            let food = root
                .get("food")
                .and_then(Value::as_str)
                .ok_or(ShapeError::MissingFood)?;
            Ok(ImpactReport {
                food: food.to_string(),
                score: number(root, "environmental_score").unwrap_or(DEFAULT_SCORE),
                breakdown: read_breakdown(root)?,
                impact_level: impact_level(root),
                ingredients: Vec::new(),
                certifications: Vec::new(),
                nutrition: Nutrition::default(),
            })
        }
    }
}

/// Lenient variant used for the impact block attached to each alternative.
/// Never fails; whatever cannot be read is left empty.
pub fn normalize_partial(raw: &Value) -> PartialImpact {
    let Ok(shape) = Shape::detect(raw) else {
        return PartialImpact::default();
    };

    let (root, metrics) = match shape {
        Shape::Nested { root, breakdown } => match breakdown.as_object() {
            Some(metrics) => (root, metrics),
            None => (root, root),
        },
        Shape::Flat(root) => (root, root),
    };

    PartialImpact {
        score: number(root, "score").or_else(|| number(root, "environmental_score")),
        impact_level: impact_level(root),
        carbon: number(metrics, "carbon"),
        water: number(metrics, "water"),
        energy: number(metrics, "energy"),
        waste: number(metrics, "waste"),
        deforestation: number(metrics, "deforestation"),
    }
}

fn read_breakdown(fields: &Map<String, Value>) -> Result<Breakdown, ShapeError> {
    Ok(Breakdown {
        carbon: metric(fields, "carbon")?,
        water: metric(fields, "water")?,
        energy: metric(fields, "energy")?,
        waste: metric(fields, "waste")?,
        deforestation: match fields.get("deforestation") {
            None | Some(Value::Null) => 0.0,
            Some(_) => metric(fields, "deforestation")?,
        },
    })
}

fn metric(fields: &Map<String, Value>, name: &'static str) -> Result<f64, ShapeError> {
    let value = fields.get(name).ok_or(ShapeError::MissingMetric(name))?;
    match value.as_f64() {
        Some(n) if n.is_finite() && n >= 0.0 => Ok(n),
        _ => Err(ShapeError::InvalidMetric(name)),
    }
}

fn number(fields: &Map<String, Value>, name: &str) -> Option<f64> {
    fields.get(name).and_then(Value::as_f64)
}

fn impact_level(fields: &Map<String, Value>) -> Option<ImpactLevel> {
    fields
        .get("impact")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn is_falsy(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}
