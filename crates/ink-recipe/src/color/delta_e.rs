//! Perceptual color difference formulas
//!
//! All four formulas are symmetric in their arguments. CIE94 and CMC are
//! asymmetric as published (the first color is the reference); here they
//! use the geometric mean chroma (CIE94) and mean lightness, chroma and
//! circular-mean hue (CMC) so that `delta_e(a, b) == delta_e(b, a)`.
//!
//! [`delta_e`] validates its inputs and is the public entry point. The
//! optimizer and mixing code call [`delta_e_unchecked`] in their inner
//! loops where the colors are model outputs rather than user input.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ColorError;
use super::lab::LabColor;

/// Chroma product below which CIEDE2000 treats a pair as neutral.
const NEUTRAL_CHROMA: f64 = 1e-10;

/// Supported Delta E formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaEMethod {
    /// Euclidean distance in Lab.
    Cie76,
    /// CIE 1994, graphic arts constants.
    Cie94,
    /// CIEDE2000.
    #[default]
    #[serde(alias = "cie2000", alias = "de2000")]
    Ciede2000,
    /// CMC l:c.
    Cmc,
}

impl DeltaEMethod {
    pub fn name(&self) -> &'static str {
        match self {
            DeltaEMethod::Cie76 => "cie76",
            DeltaEMethod::Cie94 => "cie94",
            DeltaEMethod::Ciede2000 => "ciede2000",
            DeltaEMethod::Cmc => "cmc",
        }
    }
}

impl fmt::Display for DeltaEMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DeltaEMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cie76" => Ok(DeltaEMethod::Cie76),
            "cie94" => Ok(DeltaEMethod::Cie94),
            "ciede2000" | "cie2000" | "de2000" => Ok(DeltaEMethod::Ciede2000),
            "cmc" => Ok(DeltaEMethod::Cmc),
            other => Err(format!("unknown delta E method '{other}'")),
        }
    }
}

/// Parametric weighting factors.
///
/// For CIE94 and CIEDE2000 these are kL, kC, kH. For CMC, `kl` and `kc`
/// are the l and c of CMC l:c and `kh` is unused.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaEWeights {
    pub kl: f64,
    pub kc: f64,
    pub kh: f64,
}

impl DeltaEWeights {
    pub const UNIT: Self = Self {
        kl: 1.0,
        kc: 1.0,
        kh: 1.0,
    };

    /// Conventional defaults: 1:1:1, except CMC which uses 2:1 (acceptability).
    pub fn default_for(method: DeltaEMethod) -> Self {
        match method {
            DeltaEMethod::Cmc => Self {
                kl: 2.0,
                kc: 1.0,
                kh: 1.0,
            },
            _ => Self::UNIT,
        }
    }
}

/// Color difference between two validated Lab colors.
pub fn delta_e(
    a: LabColor,
    b: LabColor,
    method: DeltaEMethod,
    weights: Option<DeltaEWeights>,
) -> Result<f64, ColorError> {
    a.validate()?;
    b.validate()?;
    if method == DeltaEMethod::Ciede2000 {
        let ca = a.chroma();
        let cb = b.chroma();
        if ca * cb < NEUTRAL_CHROMA {
            tracing::warn!(
                chroma_a = ca,
                chroma_b = cb,
                "CIEDE2000 hue undefined for neutral color, hue terms set to zero"
            );
        }
    }
    Ok(delta_e_unchecked(a, b, method, weights))
}

/// Color difference without validation or logging.
pub fn delta_e_unchecked(
    a: LabColor,
    b: LabColor,
    method: DeltaEMethod,
    weights: Option<DeltaEWeights>,
) -> f64 {
    let w = weights.unwrap_or_else(|| DeltaEWeights::default_for(method));
    match method {
        DeltaEMethod::Cie76 => cie76(a, b),
        DeltaEMethod::Cie94 => cie94(a, b, w),
        DeltaEMethod::Ciede2000 => ciede2000(a, b, w),
        DeltaEMethod::Cmc => cmc(a, b, w),
    }
}

fn cie76(a: LabColor, b: LabColor) -> f64 {
    let [dl, da, db] = a.difference(&b);
    (dl * dl + da * da + db * db).sqrt()
}

fn cie94(a: LabColor, b: LabColor, w: DeltaEWeights) -> f64 {
    const K1: f64 = 0.045;
    const K2: f64 = 0.015;

    let c1 = a.chroma();
    let c2 = b.chroma();
    let dl = a.l - b.l;
    let dc = c1 - c2;
    let da = a.a - b.a;
    let db = a.b - b.b;
    let dh2 = (da * da + db * db - dc * dc).max(0.0);

    let c = (c1 * c2).sqrt();
    let sc = 1.0 + K1 * c;
    let sh = 1.0 + K2 * c;

    let tl = dl / w.kl;
    let tc = dc / (w.kc * sc);
    (tl * tl + tc * tc + dh2 / (w.kh * sh).powi(2)).sqrt()
}

fn cmc(a: LabColor, b: LabColor, w: DeltaEWeights) -> f64 {
    let c1 = a.chroma();
    let c2 = b.chroma();
    let l = (a.l + b.l) / 2.0;
    let c = (c1 + c2) / 2.0;
    let h = mean_hue(a, b);

    let sl = if l < 16.0 {
        0.511
    } else {
        0.040975 * l / (1.0 + 0.01765 * l)
    };
    let sc = 0.0638 * c / (1.0 + 0.0131 * c) + 0.638;
    let c4 = c.powi(4);
    let f = (c4 / (c4 + 1900.0)).sqrt();
    let t = if (164.0..=345.0).contains(&h) {
        0.56 + (0.2 * (h + 168.0).to_radians().cos()).abs()
    } else {
        0.36 + (0.4 * (h + 35.0).to_radians().cos()).abs()
    };
    let sh = sc * (f * t + 1.0 - f);

    let dl = a.l - b.l;
    let dc = c1 - c2;
    let da = a.a - b.a;
    let db = a.b - b.b;
    let dh2 = (da * da + db * db - dc * dc).max(0.0);

    let tl = dl / (w.kl * sl);
    let tc = dc / (w.kc * sc);
    (tl * tl + tc * tc + dh2 / (sh * sh)).sqrt()
}

/// Circular mean of the two hue angles in degrees, chroma-weighted so
/// that a neutral color does not pull the mean.
fn mean_hue(a: LabColor, b: LabColor) -> f64 {
    let x = a.a + b.a;
    let y = a.b + b.b;
    if x == 0.0 && y == 0.0 {
        return 0.0;
    }
    y.atan2(x).to_degrees().rem_euclid(360.0)
}

#[inline]
fn hue_prime(a: f64, b: f64) -> f64 {
    if a == 0.0 && b == 0.0 {
        0.0
    } else {
        b.atan2(a).to_degrees().rem_euclid(360.0)
    }
}

fn ciede2000(c1: LabColor, c2: LabColor, w: DeltaEWeights) -> f64 {
    const POW25_7: f64 = 6_103_515_625.0; // 25^7

    let cab1 = c1.chroma();
    let cab2 = c2.chroma();
    let cab_mean = (cab1 + cab2) / 2.0;
    let cab_mean7 = cab_mean.powi(7);
    let g = 0.5 * (1.0 - (cab_mean7 / (cab_mean7 + POW25_7)).sqrt());

    let a1p = (1.0 + g) * c1.a;
    let a2p = (1.0 + g) * c2.a;
    let c1p = a1p.hypot(c1.b);
    let c2p = a2p.hypot(c2.b);
    let h1p = hue_prime(a1p, c1.b);
    let h2p = hue_prime(a2p, c2.b);

    let neutral = c1p * c2p < NEUTRAL_CHROMA;

    let dlp = c2.l - c1.l;
    let dcp = c2p - c1p;
    let dhp = if neutral {
        0.0
    } else {
        let d = h2p - h1p;
        if d > 180.0 {
            d - 360.0
        } else if d < -180.0 {
            d + 360.0
        } else {
            d
        }
    };
    let dhp_big = 2.0 * (c1p * c2p).sqrt() * (dhp.to_radians() / 2.0).sin();

    let lp_mean = (c1.l + c2.l) / 2.0;
    let cp_mean = (c1p + c2p) / 2.0;
    let hp_mean = if neutral {
        h1p + h2p
    } else if (h1p - h2p).abs() <= 180.0 {
        (h1p + h2p) / 2.0
    } else if h1p + h2p < 360.0 {
        (h1p + h2p + 360.0) / 2.0
    } else {
        (h1p + h2p - 360.0) / 2.0
    };

    let t = 1.0 - 0.17 * (hp_mean - 30.0).to_radians().cos()
        + 0.24 * (2.0 * hp_mean).to_radians().cos()
        + 0.32 * (3.0 * hp_mean + 6.0).to_radians().cos()
        - 0.20 * (4.0 * hp_mean - 63.0).to_radians().cos();

    let lm50 = (lp_mean - 50.0).powi(2);
    let sl = 1.0 + 0.015 * lm50 / (20.0 + lm50).sqrt();
    let sc = 1.0 + 0.045 * cp_mean;
    let sh = 1.0 + 0.015 * cp_mean * t;

    let d_theta = 30.0 * (-((hp_mean - 275.0) / 25.0).powi(2)).exp();
    let cp_mean7 = cp_mean.powi(7);
    let rc = 2.0 * (cp_mean7 / (cp_mean7 + POW25_7)).sqrt();
    let rt = -rc * (2.0 * d_theta).to_radians().sin();

    let tl = dlp / (w.kl * sl);
    let tc = dcp / (w.kc * sc);
    let th = dhp_big / (w.kh * sh);
    (tl * tl + tc * tc + th * th + rt * tc * th).max(0.0).sqrt()
}
