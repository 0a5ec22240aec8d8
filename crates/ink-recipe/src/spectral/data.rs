//! Tabulated spectral data on the 380-780 nm, 10 nm grid.
//!
//! CIE 1931 2° color matching functions and relative spectral power
//! distributions of CIE D65, D50 and F11 (F11 band-averaged from the 5 nm
//! table).

/// First wavelength of the sampling grid in nm.
pub const GRID_START: u32 = 380;
/// Grid spacing in nm.
pub const GRID_STEP: u32 = 10;
/// Number of grid samples (380..=780).
pub const GRID_LEN: usize = 41;

/// Wavelength of grid sample `i`.
#[inline]
pub const fn wavelength(i: usize) -> u32 {
    GRID_START + GRID_STEP * i as u32
}

/// x̄(λ), CIE 1931 2°
pub const CMF_X: [f64; GRID_LEN] = [
    0.001368, 0.004243, 0.01431, 0.04351, 0.13438, 0.2839,
    0.34828, 0.3362, 0.2908, 0.19536, 0.09564, 0.03201,
    0.0049, 0.0093, 0.06327, 0.1655, 0.2904, 0.43345,
    0.5945, 0.7621, 0.9163, 1.0263, 1.0622, 1.0026,
    0.85445, 0.6424, 0.4479, 0.2835, 0.1649, 0.0874,
    0.04677, 0.0227, 0.011359, 0.00579, 0.002899, 0.00144,
    0.00069, 0.000332, 0.000166, 8.3e-05, 4.2e-05,
];

/// ȳ(λ), CIE 1931 2°
pub const CMF_Y: [f64; GRID_LEN] = [
    3.9e-05, 0.00012, 0.000396, 0.00121, 0.004, 0.0116,
    0.023, 0.038, 0.06, 0.09098, 0.13902, 0.20802,
    0.323, 0.503, 0.71, 0.862, 0.954, 0.99495,
    0.995, 0.952, 0.87, 0.757, 0.631, 0.503,
    0.381, 0.265, 0.175, 0.107, 0.061, 0.032,
    0.017, 0.00821, 0.004102, 0.002091, 0.001047, 0.00052,
    0.000249, 0.00012, 6e-05, 3e-05, 1.5e-05,
];

/// z̄(λ), CIE 1931 2°
pub const CMF_Z: [f64; GRID_LEN] = [
    0.00645, 0.02005, 0.06785, 0.2074, 0.6456, 1.3856,
    1.74706, 1.77211, 1.6692, 1.28764, 0.81295, 0.46518,
    0.272, 0.1582, 0.07825, 0.04216, 0.0203, 0.00875,
    0.0039, 0.0021, 0.00165, 0.0011, 0.0008, 0.00034,
    0.00019, 5e-05, 2e-05, 0.0, 0.0, 0.0,
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
    0.0, 0.0, 0.0, 0.0, 0.0,
];

/// CIE D65 relative SPD
pub const SPD_D65: [f64; GRID_LEN] = [
    49.9755, 54.6482, 82.7549, 91.486, 93.4318, 86.6823,
    104.865, 117.008, 117.812, 114.861, 115.923, 108.811,
    109.354, 107.802, 104.79, 107.689, 104.405, 104.046,
    100.0, 96.3342, 95.788, 88.6856, 90.0062, 89.5991,
    87.6987, 83.2886, 83.6992, 80.0268, 80.2146, 82.2778,
    78.2842, 69.7213, 71.6091, 74.349, 61.604, 69.8856,
    75.087, 63.5927, 46.4182, 66.8054, 63.3828,
];

/// CIE D50 relative SPD
pub const SPD_D50: [f64; GRID_LEN] = [
    24.488, 29.871, 49.308, 56.513, 60.034, 57.818,
    74.825, 87.247, 90.612, 91.368, 95.109, 91.963,
    95.724, 96.613, 97.129, 102.099, 100.755, 102.317,
    100.0, 97.735, 98.918, 93.499, 97.688, 99.269,
    99.042, 95.722, 98.857, 95.667, 98.19, 103.003,
    99.133, 87.381, 91.604, 92.889, 76.854, 86.511,
    92.58, 78.23, 57.692, 82.923, 78.274,
];

/// CIE F11 (TL84-like triband fluorescent) relative SPD
pub const SPD_F11: [f64; GRID_LEN] = [
    0.84, 0.48, 3.907, 4.412, 2.51, 11.562,
    16.288, 7.113, 6.672, 5.46, 7.6, 13.295,
    5.185, 1.592, 0.927, 2.022, 39.23, 36.395,
    3.785, 2.433, 10.438, 12.49, 8.53, 40.71,
    20.525, 10.697, 2.897, 3.127, 2.527, 1.638,
    1.547, 1.785, 2.0, 4.442, 0.98, 0.235,
    0.232, 0.22, 0.285, 0.175, 0.098,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_bounds() {
        assert_eq!(wavelength(0), 380);
        assert_eq!(wavelength(GRID_LEN - 1), 780);
    }

    #[test]
    fn test_y_cmf_peaks_near_555() {
        let (idx, _) = CMF_Y
            .iter()
            .enumerate()
            .fold((0, 0.0), |best, (i, &v)| if v > best.1 { (i, v) } else { best });
        assert!((550..=560).contains(&wavelength(idx)));
    }

    #[test]
    fn test_daylight_spds_normalized_at_560() {
        let i = ((560 - GRID_START) / GRID_STEP) as usize;
        assert_eq!(SPD_D65[i], 100.0);
        assert_eq!(SPD_D50[i], 100.0);
    }
}
