pub mod colors;
pub mod corrections;
pub mod inks;
pub mod metamerism;
pub mod recipes;

pub use colors::{handle_convert_color, ConvertRequest, ConvertResponse};
pub use corrections::{
    handle_analyze_correction, handle_predict_correction, AnalyzeRequest, BatchRecipe,
    CorrectionLimits, PredictRequest, PredictResponse,
};
pub use inks::{handle_get_ink, handle_list_inks, InkListResponse};
pub use metamerism::{handle_metamerism, MetamerismRequest};
pub use recipes::{
    handle_calculate, handle_optimize, CalculateRequest, OptimizeRequest, RecipeListResponse,
};
