// Emissions Explorer - Web Server
// REST API over the loaded dataset: metadata, rankings, time series, palettes.

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use emissions_explorer::{
    aggregate_by_country, available_continents, available_years, color_by_ranking,
    rank_within_continent, statistics_for_continents, time_series, top_countries,
    ContinentPalette, Dataset, DatasetStats, Metric, RangeStatistics, Rgb, TimeSeries,
    YearRange, CONTINENT_PALETTES, CYAN_COLOR_SCALE, DEFAULT_COLOR, VERSION,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    dataset: Arc<Dataset>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(message: String) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message),
        }
    }
}

/// Dataset metadata response
#[derive(Serialize)]
struct MetaResponse {
    version: &'static str,
    stats: DatasetStats,
    years: Vec<i32>,
    continents: Vec<String>,
    metrics: Vec<&'static str>,
}

/// One ranking row, with the map fill color already resolved
#[derive(Serialize)]
struct RankingRow {
    rank: usize,
    iso_code: String,
    country: String,
    continent: String,
    value: f64,
    color: Rgb,
}

#[derive(Serialize)]
struct RankingsResponse {
    metric: Metric,
    range: YearRange,
    value_min: f64,
    value_max: f64,
    statistics: RangeStatistics,
    rows: Vec<RankingRow>,
}

#[derive(Serialize)]
struct PalettesResponse {
    continents: &'static [ContinentPalette],
    cyan_scale: &'static [Rgb],
    default_color: Rgb,
}

// ============================================================================
// Query parameters
// ============================================================================

#[derive(Deserialize)]
struct RankingsQuery {
    metric: Option<String>,
    start: Option<i32>,
    end: Option<i32>,
    limit: Option<usize>,
    /// Comma-separated continent names
    continent: Option<String>,
}

#[derive(Deserialize)]
struct SeriesQuery {
    /// Comma-separated ISO codes
    countries: String,
    metric: Option<String>,
    start: Option<i32>,
    end: Option<i32>,
}

fn parse_metric(raw: &Option<String>) -> Result<Metric, String> {
    match raw {
        Some(name) => name
            .parse()
            .map_err(|_| format!("unknown metric: {}", name)),
        None => Ok(Metric::Co2),
    }
}

fn parse_range(start: Option<i32>, end: Option<i32>, fallback_year: i32) -> YearRange {
    match (start, end) {
        (Some(s), Some(e)) => YearRange::span(s, e),
        (Some(s), None) => YearRange::single(s),
        (None, _) => YearRange::single(fallback_year),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/meta - Dataset stats plus available years/continents/metrics
async fn get_meta(State(state): State<AppState>) -> impl IntoResponse {
    let records = &state.dataset.records;
    let response = MetaResponse {
        version: VERSION,
        stats: state.dataset.stats.clone(),
        years: available_years(records),
        continents: available_continents(records),
        metrics: Metric::ALL.iter().map(|m| m.as_str()).collect(),
    };
    Json(ApiResponse::ok(response))
}

/// GET /api/rankings - Top countries for a metric and year range
async fn get_rankings(
    State(state): State<AppState>,
    Query(query): Query<RankingsQuery>,
) -> axum::response::Response {
    let metric = match parse_metric(&query.metric) {
        Ok(metric) => metric,
        Err(message) => {
            return (StatusCode::BAD_REQUEST, Json(ApiResponse::err(message))).into_response()
        }
    };

    let records = &state.dataset.records;
    let range = parse_range(query.start, query.end, state.dataset.stats.year_max);
    let continents = query
        .continent
        .as_deref()
        .map(split_list)
        .unwrap_or_default();

    // Zero-value countries are "no data": never ranked, never colored, and
    // excluded from the scale's value span.
    let rows = aggregate_by_country(records, metric, range, &continents);
    let colorable: Vec<_> = rows.iter().filter(|r| r.value > 0.0).cloned().collect();
    let ranked = top_countries(&rows, query.limit.unwrap_or(0));
    let continent_ranks = rank_within_continent(&colorable);
    let (value_min, value_max) = colorable.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(min, max), row| (min.min(row.value), max.max(row.value)),
    );
    let (value_min, value_max) = if colorable.is_empty() {
        (0.0, 0.0)
    } else {
        (value_min, value_max)
    };

    let rows: Vec<RankingRow> = ranked
        .into_iter()
        .map(|row| {
            let color = match continent_ranks.position(&row.continent, &row.iso_code) {
                Some((rank, total)) => color_by_ranking(&row.continent, rank, total),
                None => DEFAULT_COLOR,
            };
            RankingRow {
                rank: row.rank,
                iso_code: row.iso_code,
                country: row.country,
                continent: row.continent,
                value: row.value,
                color,
            }
        })
        .collect();

    let response = RankingsResponse {
        metric,
        range,
        value_min,
        value_max,
        statistics: statistics_for_continents(records, metric, range, &continents),
        rows,
    };
    (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
}

/// GET /api/continents/:continent/rankings - Ranking within one continent
async fn get_continent_rankings(
    State(state): State<AppState>,
    AxumPath(continent): AxumPath<String>,
    Query(query): Query<RankingsQuery>,
) -> axum::response::Response {
    // Continent names carry accents ("América"), so the path segment
    // arrives URL-encoded
    let decoded = urlencoding::decode(&continent)
        .unwrap_or_else(|_| continent.clone().into())
        .into_owned();

    let mut query = query;
    query.continent = Some(decoded);
    get_rankings(State(state), Query(query)).await
}

/// GET /api/series - Time series for selected countries
async fn get_series(
    State(state): State<AppState>,
    Query(query): Query<SeriesQuery>,
) -> axum::response::Response {
    let metric = match parse_metric(&query.metric) {
        Ok(metric) => metric,
        Err(message) => {
            return (StatusCode::BAD_REQUEST, Json(ApiResponse::err(message))).into_response()
        }
    };

    let records = &state.dataset.records;
    let range = parse_range(query.start, query.end, state.dataset.stats.year_max);
    let countries = split_list(&query.countries);

    let series: Vec<TimeSeries> = time_series(records, &countries, metric, range);
    (StatusCode::OK, Json(ApiResponse::ok(series))).into_response()
}

/// GET /api/palettes - Color constants for the rendering layer
async fn get_palettes() -> impl IntoResponse {
    Json(ApiResponse::ok(PalettesResponse {
        continents: &CONTINENT_PALETTES,
        cyan_scale: &CYAN_COLOR_SCALE,
        default_color: DEFAULT_COLOR,
    }))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    println!("🌐 Emissions Explorer - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let path_arg = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Dataset_PAC4_InfyViz_cleaned.json".to_string());
    let dataset_path = Path::new(&path_arg);

    if !dataset_path.exists() {
        eprintln!("❌ Dataset not found at {:?}", dataset_path);
        eprintln!("   Usage: emissions-server <dataset.json|dataset.csv>");
        std::process::exit(1);
    }

    let dataset = Dataset::from_path(dataset_path).expect("Failed to load dataset");
    println!(
        "✓ Loaded {} records ({} countries, years {}-{})",
        dataset.stats.record_count,
        dataset.stats.country_count,
        dataset.stats.year_min,
        dataset.stats.year_max
    );

    // Create shared state
    let state = AppState {
        dataset: Arc::new(dataset),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/meta", get(get_meta))
        .route("/rankings", get(get_rankings))
        .route("/continents/:continent/rankings", get(get_continent_rankings))
        .route("/series", get(get_series))
        .route("/palettes", get(get_palettes))
        .with_state(state.clone());

    // Build main router
    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    // Start server
    let addr = "0.0.0.0:3000";
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    println!("\n🚀 Server running on http://localhost:3000");
    println!("   API: http://localhost:3000/api/rankings?metric=co2&start=2015&end=2020");
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
