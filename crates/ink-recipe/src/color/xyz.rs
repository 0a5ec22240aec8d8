//! CIE XYZ tristimulus values, reference whites and chromatic adaptation
//!
//! XYZ values use the Y = 100 scale and always carry the [`WhitePoint`] they
//! are relative to. Moving between whites goes through
//! [`XyzColor::adapt_to`] (Bradford); the Lab conversions refuse to mix
//! whites silently.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ColorError;
use super::lab::LabColor;

/// CIE ε: (6/29)^3 rounded as in the CIE publication.
pub const EPSILON: f64 = 0.008856;
/// CIE κ: (29/3)^3 rounded as in the CIE publication.
pub const KAPPA: f64 = 903.3;

pub(crate) type Mat3 = [[f64; 3]; 3];

/// Bradford cone response matrix.
pub(crate) const BRADFORD: Mat3 = [
    [0.8951, 0.2664, -0.1614],
    [-0.7502, 1.7135, 0.0367],
    [0.0389, -0.0685, 1.0296],
];

/// Inverse of [`BRADFORD`] as published alongside it.
pub(crate) const BRADFORD_INV: Mat3 = [
    [0.9869929, -0.1470543, 0.1599627],
    [0.4323053, 0.5183603, 0.0492912],
    [-0.0085287, 0.0400428, 0.9684867],
];

#[inline]
pub(crate) fn mat_vec(m: &Mat3, v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

pub(crate) fn det3(m: &Mat3) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Inverse of a 3x3 matrix, `None` when singular.
pub(crate) fn invert3(m: &Mat3) -> Option<Mat3> {
    let det = det3(m);
    if det.abs() < 1e-12 {
        return None;
    }
    let inv = 1.0 / det;
    Some([
        [
            (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv,
            (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv,
            (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv,
        ],
        [
            (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv,
            (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv,
            (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv,
        ],
        [
            (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv,
            (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv,
            (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv,
        ],
    ])
}

/// Standard illuminants with tabulated white points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Illuminant {
    A,
    D50,
    D65,
    F11,
}

impl Illuminant {
    pub const ALL: [Illuminant; 4] = [Illuminant::A, Illuminant::D50, Illuminant::D65, Illuminant::F11];

    pub fn name(&self) -> &'static str {
        match self {
            Illuminant::A => "A",
            Illuminant::D50 => "D50",
            Illuminant::D65 => "D65",
            Illuminant::F11 => "F11",
        }
    }
}

impl fmt::Display for Illuminant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Illuminant {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Illuminant::A),
            "D50" => Ok(Illuminant::D50),
            "D65" => Ok(Illuminant::D65),
            "F11" | "TL84" => Ok(Illuminant::F11),
            _ => Err(ColorError::UnknownIlluminant(s.to_string())),
        }
    }
}

/// CIE standard observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Observer {
    /// CIE 1931 2°
    Deg2,
    /// CIE 1964 10°
    Deg10,
}

/// Reference white: an illuminant seen by an observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WhitePoint {
    pub illuminant: Illuminant,
    pub observer: Observer,
}

impl WhitePoint {
    pub const A: Self = Self::new(Illuminant::A, Observer::Deg2);
    pub const D50: Self = Self::new(Illuminant::D50, Observer::Deg2);
    pub const D65: Self = Self::new(Illuminant::D65, Observer::Deg2);
    pub const F11: Self = Self::new(Illuminant::F11, Observer::Deg2);

    pub const fn new(illuminant: Illuminant, observer: Observer) -> Self {
        Self {
            illuminant,
            observer,
        }
    }

    /// Tabulated tristimulus values of the white (Y = 100).
    pub fn tristimulus(&self) -> [f64; 3] {
        match (self.illuminant, self.observer) {
            (Illuminant::A, Observer::Deg2) => [109.850, 100.0, 35.585],
            (Illuminant::D50, Observer::Deg2) => [96.422, 100.0, 82.521],
            (Illuminant::D65, Observer::Deg2) => [95.047, 100.0, 108.883],
            (Illuminant::F11, Observer::Deg2) => [100.962, 100.0, 64.350],
            (Illuminant::A, Observer::Deg10) => [111.144, 100.0, 35.200],
            (Illuminant::D50, Observer::Deg10) => [96.720, 100.0, 81.427],
            (Illuminant::D65, Observer::Deg10) => [94.811, 100.0, 107.304],
            (Illuminant::F11, Observer::Deg10) => [103.863, 100.0, 65.607],
        }
    }
}

impl Default for WhitePoint {
    fn default() -> Self {
        Self::D50
    }
}

impl fmt::Display for WhitePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let deg = match self.observer {
            Observer::Deg2 => 2,
            Observer::Deg10 => 10,
        };
        write!(f, "{}/{}°", self.illuminant, deg)
    }
}

impl FromStr for WhitePoint {
    type Err = ColorError;

    /// Parse `D50`, `D50/2`, `D65/10°` and similar.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ill, obs) = match s.split_once('/') {
            Some((ill, obs)) => (ill, Some(obs)),
            None => (s, None),
        };
        let illuminant: Illuminant = ill.parse()?;
        let observer = match obs.map(|o| o.trim().trim_end_matches('°')) {
            None | Some("2") => Observer::Deg2,
            Some("10") => Observer::Deg10,
            Some(_) => return Err(ColorError::UnknownIlluminant(s.to_string())),
        };
        Ok(Self::new(illuminant, observer))
    }
}

impl TryFrom<String> for WhitePoint {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WhitePoint> for String {
    fn from(value: WhitePoint) -> Self {
        value.to_string()
    }
}

/// CIE XYZ tristimulus values (Y = 100 scale) relative to a white point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XyzColor {
    #[serde(rename = "X")]
    pub x: f64,
    #[serde(rename = "Y")]
    pub y: f64,
    #[serde(rename = "Z")]
    pub z: f64,
    pub white: WhitePoint,
}

impl XyzColor {
    /// Build without validation.
    pub const fn new(x: f64, y: f64, z: f64, white: WhitePoint) -> Self {
        Self { x, y, z, white }
    }

    /// Build a measured tristimulus value; components must be finite and
    /// non-negative.
    pub fn try_new(x: f64, y: f64, z: f64, white: WhitePoint) -> Result<Self, ColorError> {
        for (field, value) in [("X", x), ("Y", y), ("Z", z)] {
            if !value.is_finite() {
                return Err(ColorError::NotFinite { field });
            }
            if value < 0.0 {
                return Err(ColorError::Negative { field, value });
            }
        }
        Ok(Self::new(x, y, z, white))
    }

    #[inline]
    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Bradford chromatic adaptation to another reference white.
    pub fn adapt_to(self, target: WhitePoint) -> XyzColor {
        if self.white == target {
            return self;
        }
        let [x, y, z] = bradford_adapt(
            self.to_array(),
            self.white.tristimulus(),
            target.tristimulus(),
        );
        XyzColor::new(x, y, z, target)
    }
}

/// Bradford adaptation of raw tristimulus values between two whites.
pub(crate) fn bradford_adapt(xyz: [f64; 3], src: [f64; 3], dst: [f64; 3]) -> [f64; 3] {
    let Some(inverse) = invert3(&BRADFORD) else {
        return xyz;
    };
    let cone_src = mat_vec(&BRADFORD, src);
    let cone_dst = mat_vec(&BRADFORD, dst);
    let cone = mat_vec(&BRADFORD, xyz);
    let scaled = [
        cone[0] * cone_dst[0] / cone_src[0],
        cone[1] * cone_dst[1] / cone_src[1],
        cone[2] * cone_dst[2] / cone_src[2],
    ];
    mat_vec(&inverse, scaled)
}

#[inline]
fn lab_f(t: f64) -> f64 {
    if t > EPSILON {
        t.cbrt()
    } else {
        (KAPPA * t + 16.0) / 116.0
    }
}

/// Lab to XYZ against raw white tristimulus values. No validation.
pub(crate) fn lab_to_xyz_raw(lab: LabColor, white: [f64; 3]) -> [f64; 3] {
    let fy = (lab.l + 16.0) / 116.0;
    let fx = fy + lab.a / 500.0;
    let fz = fy - lab.b / 200.0;

    let fx3 = fx * fx * fx;
    let fy3 = fy * fy * fy;
    let fz3 = fz * fz * fz;
    let xr = if fx3 > EPSILON {
        fx3
    } else {
        (116.0 * fx - 16.0) / KAPPA
    };
    // Same branch test as the forward transform.
    let yr = if fy3 > EPSILON { fy3 } else { lab.l / KAPPA };
    let zr = if fz3 > EPSILON {
        fz3
    } else {
        (116.0 * fz - 16.0) / KAPPA
    };

    [xr * white[0], yr * white[1], zr * white[2]]
}

/// XYZ to Lab against raw white tristimulus values. No validation.
pub(crate) fn xyz_to_lab_raw(xyz: [f64; 3], white: [f64; 3]) -> LabColor {
    let fx = lab_f(xyz[0] / white[0]);
    let fy = lab_f(xyz[1] / white[1]);
    let fz = lab_f(xyz[2] / white[2]);
    LabColor::new(116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz))
}

/// Convert a validated Lab color to XYZ relative to `white`.
///
/// Lab colors outside the spectral locus (for example L = 0 with a large
/// b*) produce negative tristimulus values; they are returned unclamped so
/// that the round trip through [`xyz_to_lab`] is exact.
pub fn lab_to_xyz(lab: LabColor, white: WhitePoint) -> Result<XyzColor, ColorError> {
    lab.validate()?;
    let [x, y, z] = lab_to_xyz_raw(lab, white.tristimulus());
    Ok(XyzColor::new(x, y, z, white))
}

/// Convert XYZ to Lab relative to `white`.
///
/// The XYZ must already be referenced to `white`; call
/// [`XyzColor::adapt_to`] first otherwise. The result is not range
/// checked since brighter-than-white inputs legitimately exceed L = 100.
pub fn xyz_to_lab(xyz: XyzColor, white: WhitePoint) -> Result<LabColor, ColorError> {
    if xyz.white != white {
        return Err(ColorError::WhitePointMismatch {
            expected: white,
            found: xyz.white,
        });
    }
    for (field, value) in [("X", xyz.x), ("Y", xyz.y), ("Z", xyz.z)] {
        if !value.is_finite() {
            return Err(ColorError::NotFinite { field });
        }
    }
    Ok(xyz_to_lab_raw(xyz.to_array(), white.tristimulus()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const ROUND_TRIP_TOL: f64 = 1e-6;

    #[test]
    fn test_bradford_inverse_matches() {
        let computed = invert3(&BRADFORD).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                assert_abs_diff_eq!(computed[i][j], BRADFORD_INV[i][j], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_round_trip_grid() {
        for l in [0.0, 0.5, 7.9996, 8.0, 8.0001, 25.0, 50.0, 75.0, 100.0] {
            for a in [-128.0, -60.0, -1.0, 0.0, 1.0, 60.0, 127.0] {
                for b in [-128.0, -60.0, 0.0, 60.0, 127.0] {
                    let lab = LabColor::new(l, a, b);
                    let xyz = lab_to_xyz(lab, WhitePoint::D50).unwrap();
                    let back = xyz_to_lab(xyz, WhitePoint::D50).unwrap();
                    assert_abs_diff_eq!(back.l, l, epsilon = ROUND_TRIP_TOL);
                    assert_abs_diff_eq!(back.a, a, epsilon = ROUND_TRIP_TOL);
                    assert_abs_diff_eq!(back.b, b, epsilon = ROUND_TRIP_TOL);
                }
            }
        }
    }

    #[test]
    fn test_threshold_branches_agree_at_boundary() {
        // Both branches of f(t) evaluated at t = ε
        let cube = EPSILON.cbrt();
        let linear = (KAPPA * EPSILON + 16.0) / 116.0;
        assert_abs_diff_eq!(cube, linear, epsilon = 1e-6);

        // Both branches of the inverse evaluated at L = κε
        let l = KAPPA * EPSILON;
        let fy = (l + 16.0) / 116.0;
        assert_abs_diff_eq!(fy * fy * fy, l / KAPPA, epsilon = 1e-6);
    }

    #[test]
    fn test_white_maps_to_l100() {
        let white = WhitePoint::D65.tristimulus();
        let lab = xyz_to_lab(
            XyzColor::new(white[0], white[1], white[2], WhitePoint::D65),
            WhitePoint::D65,
        )
        .unwrap();
        assert_abs_diff_eq!(lab.l, 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(lab.a, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(lab.b, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_mismatched_white_is_rejected() {
        let xyz = XyzColor::new(20.0, 20.0, 20.0, WhitePoint::D65);
        let err = xyz_to_lab(xyz, WhitePoint::D50).unwrap_err();
        assert!(matches!(err, ColorError::WhitePointMismatch { .. }));
    }

    #[test]
    fn test_lab_to_xyz_validates_input() {
        let err = lab_to_xyz(LabColor::new(101.0, 0.0, 0.0), WhitePoint::D50).unwrap_err();
        assert!(matches!(err, ColorError::OutOfRange { field: "L", .. }));
    }

    #[test]
    fn test_bradford_maps_white_to_white() {
        let d65 = WhitePoint::D65.tristimulus();
        let adapted = XyzColor::new(d65[0], d65[1], d65[2], WhitePoint::D65).adapt_to(WhitePoint::D50);
        let d50 = WhitePoint::D50.tristimulus();
        assert_abs_diff_eq!(adapted.x, d50[0], epsilon = 1e-9);
        assert_abs_diff_eq!(adapted.y, d50[1], epsilon = 1e-9);
        assert_abs_diff_eq!(adapted.z, d50[2], epsilon = 1e-9);
        assert_eq!(adapted.white, WhitePoint::D50);
    }

    #[test]
    fn test_bradford_matches_published_matrix() {
        // Lindbloom's D65 -> D50 Bradford matrix, first row applied to a unit vector
        let adapted = bradford_adapt(
            [100.0, 0.0, 0.0],
            WhitePoint::D65.tristimulus(),
            WhitePoint::D50.tristimulus(),
        );
        assert_abs_diff_eq!(adapted[0] / 100.0, 1.0478112, epsilon = 1e-4);
        assert_abs_diff_eq!(adapted[1] / 100.0, 0.0295424, epsilon = 1e-4);
        assert_abs_diff_eq!(adapted[2] / 100.0, -0.0092345, epsilon = 1e-4);
    }

    #[test]
    fn test_matches_palette_crate() {
        use palette::white_point::D50;
        use palette::{IntoColor, Lab, Xyz};

        let lab = LabColor::new(48.0, 74.0, -3.0);
        let ours = lab_to_xyz(lab, WhitePoint::D50).unwrap();
        let reference: Xyz<D50, f64> = Lab::<D50, f64>::new(48.0, 74.0, -3.0).into_color();
        assert_abs_diff_eq!(ours.x / 100.0, reference.x, epsilon = 2e-3);
        assert_abs_diff_eq!(ours.y / 100.0, reference.y, epsilon = 2e-3);
        assert_abs_diff_eq!(ours.z / 100.0, reference.z, epsilon = 2e-3);
    }

    #[test]
    fn test_white_point_parsing() {
        assert_eq!("D50".parse::<WhitePoint>().unwrap(), WhitePoint::D50);
        assert_eq!(
            "d65/10°".parse::<WhitePoint>().unwrap(),
            WhitePoint::new(Illuminant::D65, Observer::Deg10)
        );
        assert!("D93".parse::<WhitePoint>().is_err());
        assert_eq!(WhitePoint::F11.to_string(), "F11/2°");
    }

    #[test]
    fn test_try_new_rejects_negative() {
        let err = XyzColor::try_new(1.0, -0.1, 1.0, WhitePoint::D50).unwrap_err();
        assert!(matches!(err, ColorError::Negative { field: "Y", .. }));
    }

    #[test]
    fn test_invert3_round_trip() {
        let inv = invert3(&BRADFORD).unwrap();
        let v = mat_vec(&inv, mat_vec(&BRADFORD, [12.0, 34.0, 56.0]));
        assert_abs_diff_eq!(v[0], 12.0, epsilon = 1e-9);
        assert_abs_diff_eq!(v[1], 34.0, epsilon = 1e-9);
        assert_abs_diff_eq!(v[2], 56.0, epsilon = 1e-9);
    }
}
