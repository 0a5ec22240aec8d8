use chrono::{DateTime, Utc};
use ink_recipe::{ConcentrationTier, DeltaEMethod, LabColor, MixingModelKind, Recipe};
use serde::{Deserialize, Serialize};

/// Lifecycle of a stored recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Draft,
    Approved,
    Rejected,
    Corrected,
}

/// One ink line of a stored recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordInk {
    pub ink_id: String,
    pub ratio: f64,
    pub concentration: ConcentrationTier,
}

/// Recipe as exchanged over the API and persisted by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub target: LabColor,
    pub inks: Vec<RecordInk>,
    pub mixed: LabColor,
    pub delta_e: f64,
    pub method: DeltaEMethod,
    /// Optimizer that produced the ratios
    pub optimization: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<MixingModelKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_index: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RecordStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Recipe> for RecipeRecord {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: None,
            target: recipe.target(),
            inks: recipe
                .inks()
                .iter()
                .map(|r| RecordInk {
                    ink_id: r.ink_id.clone(),
                    ratio: r.ratio,
                    concentration: r.tier,
                })
                .collect(),
            mixed: recipe.mixed(),
            delta_e: recipe.delta_e(),
            method: recipe.method(),
            optimization: recipe.optimizer().to_string(),
            model: Some(recipe.model()),
            cost_index: Some(recipe.cost_index()),
            confidence: Some(recipe.confidence()),
            status: None,
            created_at: None,
            updated_at: None,
        }
    }
}

impl RecipeRecord {
    /// Mark as a fresh draft stamped with `now`.
    pub fn draft(mut self, now: DateTime<Utc>) -> Self {
        self.status = Some(RecordStatus::Draft);
        self.created_at = Some(now);
        self.updated_at = Some(now);
        self
    }

    /// Sum of the ink ratios, 100 for a normalized recipe.
    pub fn total_ratio(&self) -> f64 {
        self.inks.iter().map(|i| i.ratio).sum()
    }
}
