use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::warn;
use validator::Validate;

use crate::food::analysis::normalizer::normalize_partial;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImpactLevel {
    High,
    Medium,
    Low,
}

impl FromStr for ImpactLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(ImpactLevel::High),
            "medium" => Ok(ImpactLevel::Medium),
            "low" => Ok(ImpactLevel::Low),
            other => Err(format!("unknown impact level '{}'", other)),
        }
    }
}

impl fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ImpactLevel::High => "High",
            ImpactLevel::Medium => "Medium",
            ImpactLevel::Low => "Low",
        };
        write!(f, "{}", label)
    }
}

impl<'de> Deserialize<'de> for ImpactLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// The five-metric environmental cost vector for one food item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    /// kg CO2
    pub carbon: f64,
    /// litres
    pub water: f64,
    /// MJ
    pub energy: f64,
    /// kg
    pub waste: f64,
    /// ha
    pub deforestation: f64,
}

impl Breakdown {
    pub const METRICS: [&'static str; 5] = ["carbon", "water", "energy", "waste", "deforestation"];

    pub fn metrics(&self) -> [(&'static str, f64); 5] {
        [
            ("carbon", self.carbon),
            ("water", self.water),
            ("energy", self.energy),
            ("waste", self.waste),
            ("deforestation", self.deforestation),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fiber: f64,
}

/// Canonical impact data, independent of which wire shape the backend sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactReport {
    pub food: String,
    pub score: f64,
    pub breakdown: Breakdown,
    pub impact_level: Option<ImpactLevel>,
    pub ingredients: Vec<String>,
    pub certifications: Vec<String>,
    pub nutrition: Nutrition,
}

/// Impact figures attached to a recommended alternative. Backends fill these
/// in unevenly, so every metric is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PartialImpact {
    pub score: Option<f64>,
    pub impact_level: Option<ImpactLevel>,
    pub carbon: Option<f64>,
    pub water: Option<f64>,
    pub energy: Option<f64>,
    pub waste: Option<f64>,
    pub deforestation: Option<f64>,
}

impl PartialImpact {
    pub fn is_empty(&self) -> bool {
        *self == PartialImpact::default()
    }
}

fn partial_impact<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PartialImpact, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().map(normalize_partial).unwrap_or_default())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Rows are decoded one at a time so a single malformed entry does not cost
// the whole ranked list.
fn ranked_alternatives<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Alternative>, D::Error> {
    let rows = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(rows
        .into_iter()
        .enumerate()
        .filter_map(|(rank, row)| match serde_json::from_value::<Alternative>(row) {
            Ok(alternative) => Some(alternative),
            Err(e) => {
                warn!(rank, error = %e, "Skipping malformed alternative");
                None
            }
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub name: String,
    #[serde(default, alias = "sustainabilityImprovement", deserialize_with = "null_as_default")]
    pub sustainability_improvement: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub explanation: String,
    #[serde(default, deserialize_with = "partial_impact")]
    pub impact: PartialImpact,
    #[serde(default, alias = "similarity")]
    pub similarity_score: Option<f64>,
}

/// Body of `GET /api/recommendations/{food}`. Ranking order of
/// `alternatives` is the backend's and is never re-sorted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    #[serde(default)]
    pub food: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "ranked_alternatives")]
    pub alternatives: Vec<Alternative>,
    #[serde(default)]
    pub preferences: Option<ImpactWeights>,
    #[serde(default, alias = "foodInfo")]
    pub food_info: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ImpactWeights {
    #[validate(range(min = 0.0, max = 1.0))]
    pub carbon: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub water: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub energy: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub waste: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub deforestation: f64,
}

impl Default for ImpactWeights {
    fn default() -> Self {
        Self {
            carbon: 0.3,
            water: 0.2,
            energy: 0.1,
            waste: 0.1,
            deforestation: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Validate)]
pub struct RecommendationOptions {
    pub use_ai: bool,
    #[validate(range(min = 1, max = 20))]
    pub limit: u32,
    #[validate]
    pub weights: ImpactWeights,
}

impl Default for RecommendationOptions {
    fn default() -> Self {
        Self {
            use_ai: true,
            limit: 3,
            weights: ImpactWeights::default(),
        }
    }
}

impl RecommendationOptions {
    pub fn without_ai(self) -> Self {
        Self { use_ai: false, ..self }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("use_ai", self.use_ai.to_string()),
            ("limit", self.limit.to_string()),
            ("carbon_weight", self.weights.carbon.to_string()),
            ("water_weight", self.weights.water.to_string()),
            ("energy_weight", self.weights.energy.to_string()),
            ("waste_weight", self.weights.waste.to_string()),
            ("deforestation_weight", self.weights.deforestation.to_string()),
        ]
    }
}
