// Emissions Explorer - Core Library
// Data layer of the world CO2-emissions explorer: loading, aggregation,
// ranking, and map coloring. Exposed for use in the CLI, API server, and tests.

pub mod dataset;
pub mod aggregate;
pub mod ranking;
pub mod color;
pub mod explorer;

// Re-export commonly used types
pub use dataset::{
    available_continents, available_years, is_small_country, small_country_name,
    CountryYearRecord, Dataset, DatasetStats, Metric, RawRecord, SMALL_COUNTRIES,
};
pub use aggregate::{
    aggregate_by_country, filter_by_continent, filter_by_year_range, group_by_continent,
    min_max, statistics_for_continents, time_series,
    AggregatedCountry, RangeStatistics, TimeSeries, TimeSeriesPoint, YearRange,
};
pub use ranking::{
    rank_countries, rank_within_continent, top_countries, ContinentRanks, RankedCountry,
};
pub use color::{
    color_by_percentile, color_by_ranking, continent_color, continent_palette,
    percentile_bucket, ContinentPalette, Rgb, CONTINENT_PALETTES, CYAN_COLOR_SCALE,
    DEFAULT_COLOR,
};
pub use explorer::{ColorMode, Explorer, FilterState, MAX_SELECTED_COUNTRIES};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
