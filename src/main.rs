use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use ink_recipe::{
    ConcentrationTier, Feasibility, InkCatalog, InkRatio, LabColor, OptimizationConstraints,
};
use inkmatch::api;
use inkmatch::assets::{AssetCategory, AssetLoader};
use inkmatch::models::{AppConfig, InkCatalogFile};
use inkmatch::server;

#[derive(Parser)]
#[command(name = "inkmatch")]
#[command(about = "Ink recipe matching - find and correct ink mixtures for a target color")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve,
    /// Find recipes for a target color
    Match {
        /// Target color as L,a,b (e.g. "50,60,40")
        #[arg(short, long, allow_hyphen_values = true)]
        lab: String,

        /// Comma-separated ink ids (default: whole catalog)
        #[arg(short, long)]
        inks: Option<String>,

        /// Maximum number of inks per recipe
        #[arg(short, long)]
        max_inks: Option<usize>,

        /// Total ink coverage ceiling in percent
        #[arg(short, long)]
        tac: Option<f64>,

        /// Allow white inks in recipes
        #[arg(long)]
        include_white: bool,
    },
    /// Analyze a measured batch and suggest additions
    Correct {
        /// Target color as L,a,b
        #[arg(short, long, allow_hyphen_values = true)]
        target: String,

        /// Measured color as L,a,b
        #[arg(short, long, allow_hyphen_values = true)]
        actual: String,

        /// Batch recipe as id:ratio[@tier],... (e.g. "black:60,cyan:40@50")
        #[arg(short, long)]
        recipe: String,
    },
    /// Extract embedded assets to filesystem for customization
    Init {
        /// Extract config.yaml
        #[arg(long)]
        config: bool,

        /// Extract inks.yaml
        #[arg(long)]
        inks: bool,

        /// Extract all assets
        #[arg(long)]
        all: bool,

        /// Overwrite existing files
        #[arg(long, short)]
        force: bool,

        /// List embedded assets without extracting
        #[arg(long)]
        list: bool,
    },
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Inkmatch API",
        description = "Ink recipe matching: recipe search, batch correction and metamerism",
        version = "0.1.0",
        license(name = "MIT")
    ),
    paths(
        api::inks::handle_list_inks,
        api::inks::handle_get_ink,
        api::recipes::handle_calculate,
        api::recipes::handle_optimize,
        api::corrections::handle_analyze_correction,
        api::corrections::handle_predict_correction,
        api::metamerism::handle_metamerism,
        api::colors::handle_convert_color,
    ),
    components(schemas(
        api::InkListResponse,
        api::CalculateRequest,
        api::OptimizeRequest,
        api::RecipeListResponse,
        api::AnalyzeRequest,
        api::BatchRecipe,
        api::CorrectionLimits,
        api::PredictRequest,
        api::PredictResponse,
        api::MetamerismRequest,
        api::ConvertRequest,
        api::ConvertResponse,
    )),
    tags(
        (name = "Inks", description = "Ink catalog"),
        (name = "Recipes", description = "Recipe search"),
        (name = "Corrections", description = "Batch correction"),
        (name = "Spectral", description = "Metamerism evaluation"),
        (name = "Colors", description = "Color conversion")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Match {
            lab,
            inks,
            max_inks,
            tac,
            include_white,
        }) => run_match_command(&lab, inks.as_deref(), max_inks, tac, include_white),
        Some(Commands::Correct {
            target,
            actual,
            recipe,
        }) => run_correct_command(&target, &actual, &recipe),
        Some(Commands::Init {
            config,
            inks,
            all,
            force,
            list,
        }) => run_init_command(config, inks, all, force, list),
        Some(Commands::Serve) => run_server().await,
        None => {
            run_status_command();
            Ok(())
        }
    }
}

/// Minimal logging for one-shot commands
fn init_cli_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkmatch=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();
}

/// Load config and catalog, seeding configured files first
fn load_assets() -> (AppConfig, ink_recipe::InkSet) {
    let loader = AssetLoader::from_env();
    if let Err(e) = loader.seed_if_configured() {
        tracing::warn!(%e, "Failed to seed assets");
    }
    (
        AppConfig::load_from_assets(&loader),
        InkCatalogFile::load_from_assets(&loader),
    )
}

/// Parse "L,a,b" into a validated Lab color
fn parse_lab(s: &str) -> anyhow::Result<LabColor> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .with_context(|| format!("invalid Lab '{s}', expected L,a,b"))?;
    let [l, a, b] = parts[..] else {
        anyhow::bail!("invalid Lab '{s}', expected three components");
    };
    Ok(LabColor::try_new(l, a, b)?)
}

/// Parse "id:ratio[@tier],..." into recipe lines
fn parse_recipe(s: &str) -> anyhow::Result<Vec<InkRatio>> {
    s.split(',')
        .filter(|p| !p.trim().is_empty())
        .map(|part| -> anyhow::Result<InkRatio> {
            let (id, rest) = part
                .trim()
                .split_once(':')
                .with_context(|| format!("invalid recipe entry '{part}', expected id:ratio"))?;
            let (ratio, tier) = match rest.split_once('@') {
                Some((ratio, tier)) => (ratio, tier.parse::<ConcentrationTier>()?),
                None => (rest, ConcentrationTier::FULL),
            };
            let ratio: f64 = ratio
                .trim()
                .parse()
                .with_context(|| format!("invalid ratio in '{part}'"))?;
            Ok(InkRatio::new(id.trim(), ratio, tier))
        })
        .collect()
}

fn format_inks(inks: &[InkRatio]) -> String {
    inks.iter()
        .map(|r| {
            if r.tier == ConcentrationTier::FULL {
                format!("{} {:.1}%", r.ink_id, r.ratio)
            } else {
                format!("{} {:.1}% @{}", r.ink_id, r.ratio, r.tier)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Search recipes and print them (no server needed)
fn run_match_command(
    lab: &str,
    inks: Option<&str>,
    max_inks: Option<usize>,
    tac: Option<f64>,
    include_white: bool,
) -> anyhow::Result<()> {
    init_cli_tracing();

    let target = parse_lab(lab)?;
    let (config, catalog) = load_assets();
    let defaults = config.default_constraints();
    let constraints = OptimizationConstraints {
        max_ink_count: max_inks.unwrap_or(defaults.max_ink_count),
        tac_limit: tac.or(defaults.tac_limit),
        include_white: include_white || defaults.include_white,
        ..defaults
    };
    let engine = config.build_engine(catalog)?;

    let outcome = match inks {
        Some(list) => {
            let ids: Vec<String> = list.split(',').map(|s| s.trim().to_string()).collect();
            engine.calculate_recipe_with(
                target,
                &ids,
                &constraints,
                &ink_recipe::CancelToken::new(),
                config.timeout(),
            )?
        }
        None => engine.calculate_optimized_recipes_with(
            target,
            &constraints,
            &ink_recipe::CancelToken::new(),
            config.timeout(),
        )?,
    };

    println!(
        "Target L={:.1} a={:.1} b={:.1} ({} model, {})\n",
        target.l,
        target.a,
        target.b,
        engine.model_kind(),
        engine.delta_e_method()
    );

    if outcome.recipes.is_empty() {
        let reason = outcome.reason.map(|r| r.code()).unwrap_or("NO_RESULT");
        println!("No recipe found: {reason}");
        return Ok(());
    }

    for (i, recipe) in outcome.recipes.iter().enumerate() {
        let mixed = recipe.mixed();
        println!(
            "{}. dE {:.2}  [{}]",
            i + 1,
            recipe.delta_e(),
            format_inks(recipe.inks())
        );
        println!(
            "   mixed L={:.1} a={:.1} b={:.1}  coverage {:.0}%  confidence {:.2}",
            mixed.l,
            mixed.a,
            mixed.b,
            recipe.coverage(),
            recipe.confidence()
        );
    }
    if outcome.cancelled {
        println!("\nSearch stopped at the time limit; results are partial.");
    }
    println!(
        "\n{} branches, {} evaluations, {} ms",
        outcome.stats.branches, outcome.stats.evaluations, outcome.stats.elapsed_ms
    );

    Ok(())
}

/// Analyze a measured batch and print suggestions
fn run_correct_command(target: &str, actual: &str, recipe: &str) -> anyhow::Result<()> {
    init_cli_tracing();

    let target = parse_lab(target)?;
    let actual = parse_lab(actual)?;
    let recipe = parse_recipe(recipe)?;
    let (config, catalog) = load_assets();
    let engine = config.build_engine(catalog)?;

    let analysis = engine.analyze_correction(target, actual, &recipe, &[])?;

    println!(
        "dE {:.2}  (dL {:+.1}, da {:+.1}, db {:+.1})",
        analysis.delta_e, analysis.error.dl, analysis.error.da, analysis.error.db
    );

    match &analysis.feasibility {
        Feasibility::Feasible => println!("Correctable\n"),
        Feasibility::Infeasible { reason, categories } => {
            println!("Not correctable: {reason:?}");
            if !categories.is_empty() {
                println!("Consider adding inks of type: {categories:?}");
            }
            return Ok(());
        }
    }

    if analysis.suggestions.is_empty() {
        println!("Within tolerance, no additions needed.");
    }
    for s in &analysis.suggestions {
        let axes: Vec<String> = s.axes.iter().map(|a| a.to_string()).collect();
        println!(
            "  add {:.1} parts {} ({})  impact dL {:+.1} da {:+.1} db {:+.1}",
            s.add_amount,
            s.ink_id,
            axes.join("/"),
            s.expected_impact.dl,
            s.expected_impact.da,
            s.expected_impact.db
        );
    }
    if let Some(amended) = &analysis.amended {
        println!("\nAmended recipe: [{}]", format_inks(amended.inks()));
    }
    if let (Some(p), Some(de)) = (analysis.predicted, analysis.predicted_delta_e) {
        println!(
            "Predicted L={:.1} a={:.1} b={:.1}  dE {:.2}",
            p.l, p.a, p.b, de
        );
    }

    Ok(())
}

/// Extract embedded assets to filesystem
fn run_init_command(
    config: bool,
    inks: bool,
    all: bool,
    force: bool,
    list: bool,
) -> anyhow::Result<()> {
    if list {
        println!("Embedded assets:\n");
        for f in AssetLoader::list_embedded() {
            println!("  {f}");
        }
        return Ok(());
    }

    // Determine which categories to extract
    let mut categories = Vec::new();
    if all || config {
        categories.push(AssetCategory::Config);
    }
    if all || inks {
        categories.push(AssetCategory::Inks);
    }

    if categories.is_empty() {
        eprintln!("No categories specified. Use --all, --config or --inks");
        eprintln!("\nRun 'inkmatch init --list' to see embedded assets.");
        std::process::exit(1);
    }

    let report = AssetLoader::from_env().init(&categories, force)?;

    if !report.written.is_empty() {
        println!("Extracted {} files:", report.written.len());
        for f in &report.written {
            println!("  + {f}");
        }
    }
    if !report.skipped.is_empty() {
        println!(
            "\nSkipped {} existing files (use --force to overwrite):",
            report.skipped.len()
        );
        for f in &report.skipped {
            println!("  - {f}");
        }
    }

    if report.written.is_empty() && report.skipped.is_empty() {
        println!("No files to extract.");
    }

    Ok(())
}

/// Display status and configuration information
fn run_status_command() {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    let bind_addr = std::env::var("BIND_ADDR").ok();
    let config_file = std::env::var("CONFIG_FILE").ok();
    let inks_file = std::env::var("INKS_FILE").ok();

    println!("Inkmatch v{VERSION}");
    println!("Ink recipe matching service\n");

    println!("Environment Variables:");
    println!(
        "  BIND_ADDR   = {}",
        bind_addr.as_deref().unwrap_or("0.0.0.0:3000 (default)")
    );
    println!(
        "  CONFIG_FILE = {}",
        config_file.as_deref().unwrap_or("(not set)")
    );
    println!(
        "  INKS_FILE   = {}",
        inks_file.as_deref().unwrap_or("(not set)")
    );

    let loader = AssetLoader::new(
        config_file.map(PathBuf::from),
        inks_file.map(PathBuf::from),
    );

    println!("\nAsset Sources:");
    println!("  Config:  {}", loader.source(AssetCategory::Config));
    println!("  Inks:    {}", loader.source(AssetCategory::Inks));

    let config = AppConfig::load_from_assets(&loader);
    let catalog = InkCatalogFile::load_from_assets(&loader);
    println!("\nEngine:");
    println!(
        "  Model: {} under {}, {}",
        config.engine.model, config.engine.illuminant, config.engine.method
    );
    println!("  Catalog: {} inks", catalog.len());
    for ink in catalog.inks() {
        println!("    {:<14} {}", ink.id(), ink.ink_type());
    }

    println!("\nCommands:");
    println!("  inkmatch serve     Start the HTTP server");
    println!("  inkmatch match     Find recipes for a target color");
    println!("  inkmatch correct   Suggest additions for a measured batch");
    println!("  inkmatch init      Extract embedded assets");
    println!("\nRun 'inkmatch --help' for more details.");
}

/// Run the HTTP server
async fn run_server() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkmatch=debug,ink_recipe=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let asset_loader = Arc::new(AssetLoader::from_env());

    tracing::info!(
        config = %asset_loader.source(AssetCategory::Config),
        inks = %asset_loader.source(AssetCategory::Inks),
        "Asset sources configured"
    );

    // Seed configured paths that do not exist yet
    match asset_loader.seed_if_configured() {
        Ok(report) if !report.is_empty() => {
            tracing::info!(
                config = report.config_seeded,
                inks = report.inks_seeded,
                "Seeded missing files with embedded assets"
            );
        }
        Err(e) => {
            tracing::warn!(%e, "Failed to seed assets");
        }
        _ => {}
    }

    let state = server::create_app_state(asset_loader)?;

    let app = server::build_router(state)
        // OpenAPI documentation (production only)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Inkmatch server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lab() {
        let lab = parse_lab("50, -12.5,40").unwrap();
        assert_eq!(lab, LabColor::new(50.0, -12.5, 40.0));

        assert!(parse_lab("50,60").is_err());
        assert!(parse_lab("50,x,1").is_err());
        assert!(parse_lab("150,0,0").is_err());
    }

    #[test]
    fn test_parse_recipe() {
        let recipe = parse_recipe("black:60, cyan:40@50").unwrap();

        assert_eq!(recipe.len(), 2);
        assert_eq!(recipe[0].ink_id, "black");
        assert_eq!(recipe[0].tier, ConcentrationTier::FULL);
        assert_eq!(recipe[1].ratio, 40.0);
        assert_eq!(recipe[1].tier.percent(), 50);

        assert!(parse_recipe("black").is_err());
        assert!(parse_recipe("black:lots").is_err());
        assert!(parse_recipe("black:60@0").is_err());
    }

    #[test]
    fn test_format_inks() {
        let inks = vec![
            InkRatio::new("magenta", 62.5, ConcentrationTier::FULL),
            InkRatio::new("yellow", 37.5, ConcentrationTier::new(50).unwrap()),
        ];
        assert_eq!(format_inks(&inks), "magenta 62.5%, yellow 37.5% @50%");
    }

    #[test]
    fn test_cli_parses_match() {
        let cli = Cli::try_parse_from([
            "inkmatch", "match", "--lab", "50,-20,-30", "--max-inks", "3", "--include-white",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Match {
                lab,
                max_inks,
                include_white,
                ..
            }) => {
                assert_eq!(lab, "50,-20,-30");
                assert_eq!(max_inks, Some(3));
                assert!(include_white);
            }
            _ => panic!("expected match command"),
        }
    }
}
