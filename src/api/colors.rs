use axum::{extract::rejection::JsonRejection, response::Json};
use ink_recipe::color::{lab_to_xyz, xyz_to_rgb, Observer};
use ink_recipe::ink::ColorRegion;
use ink_recipe::{Illuminant, LabColor, WhitePoint, XyzColor};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;

/// Body of /api/colors/convert
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConvertRequest {
    #[schema(value_type = Object)]
    pub lab: LabColor,
    /// White the Lab values refer to, D50 when absent
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub illuminant: Option<Illuminant>,
}

/// Display swatch for a Lab color
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    /// Tristimulus values under the requested white
    #[schema(value_type = Object)]
    pub xyz: XyzColor,
    /// sRGB hex, clamped when out of gamut
    pub hex: String,
    pub in_gamut: bool,
    /// Hue region used for preferred inks
    pub region: String,
}

/// Convert a Lab color to XYZ and an sRGB swatch
#[utoipa::path(
    post,
    path = "/api/colors/convert",
    request_body = ConvertRequest,
    responses(
        (status = 200, description = "Converted color", body = ConvertResponse),
        (status = 400, description = "Invalid Lab color"),
    ),
    tag = "Colors"
)]
pub async fn handle_convert_color(
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Json<ConvertResponse>, ApiError> {
    let Json(request) = payload?;
    Ok(Json(convert(request.lab, request.illuminant)?))
}

fn convert(lab: LabColor, illuminant: Option<Illuminant>) -> Result<ConvertResponse, ApiError> {
    let white = WhitePoint::new(illuminant.unwrap_or(Illuminant::D50), Observer::Deg2);
    let bad = |e: ink_recipe::ColorError| ApiError::BadRequest(e.to_string());

    let xyz = lab_to_xyz(lab, white).map_err(bad)?;
    let rgb = xyz_to_rgb(xyz.adapt_to(WhitePoint::D65)).map_err(bad)?;

    Ok(ConvertResponse {
        xyz,
        hex: rgb.to_hex(),
        in_gamut: rgb.in_gamut(),
        region: ColorRegion::of(lab).name().to_string(),
    })
}
