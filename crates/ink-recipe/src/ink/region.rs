//! Color regions and the preferred-ink table.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::color::LabColor;

/// Chroma below which a color is treated as neutral.
const NEUTRAL_CHROMA: f64 = 8.0;

/// Coarse hue sector of a target color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorRegion {
    Neutral,
    Red,
    Orange,
    Yellow,
    Green,
    Cyan,
    Blue,
    Purple,
}

impl ColorRegion {
    pub fn of(lab: LabColor) -> Self {
        if lab.chroma() < NEUTRAL_CHROMA {
            return ColorRegion::Neutral;
        }
        match lab.hue() {
            h if h < 20.0 => ColorRegion::Red,
            h if h < 55.0 => ColorRegion::Orange,
            h if h < 100.0 => ColorRegion::Yellow,
            h if h < 170.0 => ColorRegion::Green,
            h if h < 230.0 => ColorRegion::Cyan,
            h if h < 290.0 => ColorRegion::Blue,
            h if h < 345.0 => ColorRegion::Purple,
            _ => ColorRegion::Red,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ColorRegion::Neutral => "neutral",
            ColorRegion::Red => "red",
            ColorRegion::Orange => "orange",
            ColorRegion::Yellow => "yellow",
            ColorRegion::Green => "green",
            ColorRegion::Cyan => "cyan",
            ColorRegion::Blue => "blue",
            ColorRegion::Purple => "purple",
        }
    }
}

impl fmt::Display for ColorRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Preferred ink ids per color region, loaded from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionTable {
    regions: BTreeMap<ColorRegion, Vec<String>>,
}

impl RegionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the preferred list for one region.
    pub fn set(&mut self, region: ColorRegion, ids: Vec<String>) {
        self.regions.insert(region, ids);
    }

    pub fn preferred(&self, region: ColorRegion) -> &[String] {
        self.regions.get(&region).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True if `id` is preferred for the region `target` falls in.
    pub fn is_preferred(&self, target: LabColor, id: &str) -> bool {
        self.preferred(ColorRegion::of(target))
            .iter()
            .any(|p| p == id)
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
