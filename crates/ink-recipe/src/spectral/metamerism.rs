//! Metamerism index between two reflectance curves.

use serde::Serialize;

use super::curve::SpectralCurve;
use super::error::SpectralError;
use super::illuminant::IlluminantSpd;
use super::integrate::{integrate_curve, DataQuality};
use crate::color::{delta_e_unchecked, DeltaEMethod, Illuminant, LabColor};

/// Index above which two samples are reported as a metameric pair.
pub const METAMERISM_THRESHOLD: f64 = 2.0;

/// Default comparison set: daylight, the graphic-arts viewing standard and
/// a store-lighting fluorescent.
pub fn default_illuminants() -> Vec<IlluminantSpd> {
    [Illuminant::D65, Illuminant::D50, Illuminant::F11]
        .into_iter()
        .map(IlluminantSpd::standard)
        .collect()
}

/// Difference between the two samples under one illuminant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IlluminantDifference {
    pub illuminant: String,
    pub lab_a: LabColor,
    pub lab_b: LabColor,
    pub delta_e: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetamerismReport {
    pub per_illuminant: Vec<IlluminantDifference>,
    /// Largest CIEDE2000 difference across the illuminant set.
    pub metamerism_index: f64,
    pub is_metameric: bool,
    /// Illuminant under which the samples differ most.
    pub worst_illuminant: Option<String>,
    pub data_quality: DataQuality,
}

/// Compare two curves under every illuminant in `illuminants`.
pub fn metamerism_index(
    a: &SpectralCurve,
    b: &SpectralCurve,
    illuminants: &[IlluminantSpd],
) -> Result<MetamerismReport, SpectralError> {
    a.validate()?;
    b.validate()?;

    let mut per_illuminant = Vec::with_capacity(illuminants.len());
    let mut data_quality = DataQuality::default();

    for spd in illuminants {
        let table = spd.weights()?;
        let ia = integrate_curve(a, &table);
        let ib = integrate_curve(b, &table);
        data_quality.merge(&ia.quality);
        data_quality.merge(&ib.quality);
        per_illuminant.push(IlluminantDifference {
            illuminant: spd.name().to_string(),
            lab_a: ia.lab,
            lab_b: ib.lab,
            delta_e: delta_e_unchecked(ia.lab, ib.lab, DeltaEMethod::Ciede2000, None),
        });
    }

    let worst = per_illuminant
        .iter()
        .max_by(|x, y| x.delta_e.total_cmp(&y.delta_e));
    let metamerism_index = worst.map(|w| w.delta_e).unwrap_or(0.0);
    let worst_illuminant = worst.map(|w| w.illuminant.clone());

    tracing::debug!(
        index = metamerism_index,
        worst = ?worst_illuminant,
        "Computed metamerism index"
    );

    Ok(MetamerismReport {
        per_illuminant,
        metamerism_index,
        is_metameric: metamerism_index > METAMERISM_THRESHOLD,
        worst_illuminant,
        data_quality,
    })
}
