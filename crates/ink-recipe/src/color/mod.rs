//! Color science kernel: CIELAB, CIE XYZ, sRGB and color difference.

mod delta_e;
mod error;
mod lab;
mod srgb;
mod xyz;

pub use delta_e::{delta_e, delta_e_unchecked, DeltaEMethod, DeltaEWeights};
pub use error::ColorError;
pub use lab::{LabColor, AB_RANGE, L_RANGE};
pub use srgb::{rgb_to_xyz, xyz_to_rgb, Srgb};
pub use xyz::{lab_to_xyz, xyz_to_lab, Illuminant, Observer, WhitePoint, XyzColor, EPSILON, KAPPA};

pub(crate) use xyz::{
    det3, invert3, lab_to_xyz_raw, mat_vec, xyz_to_lab_raw, Mat3, BRADFORD, BRADFORD_INV,
};
