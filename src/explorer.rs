// Explorer State - explicit filter state over the loaded dataset
// Replaces hidden UI-global state: callers own an Explorer and pass it where
// needed. Queries go through the pure aggregate/ranking/color modules; the
// last ranking is memoized against the filter state.

use crate::aggregate::{
    aggregate_by_country, statistics_for_continents, time_series, AggregatedCountry,
    RangeStatistics, TimeSeries, YearRange,
};
use crate::color::{color_by_percentile, color_by_ranking, Rgb, DEFAULT_COLOR};
use crate::dataset::{Dataset, Metric};
use crate::ranking::{rank_countries, rank_within_continent, ContinentRanks, RankedCountry};
use serde::Serialize;

/// At most this many countries can be selected for the line chart.
pub const MAX_SELECTED_COUNTRIES: usize = 5;

/// How the map colors countries: per-continent rank gradient, or a single
/// cyan scale over the value range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    Multi,
    Mono,
}

/// The complete filter state of one explorer view.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    pub metric: Metric,
    pub range: YearRange,
    pub continents: Vec<String>,
    pub ranking_limit: usize,
    pub color_mode: ColorMode,
    pub selected_countries: Vec<String>,
}

/// Key under which a ranking result stays valid. Selection and color mode
/// don't affect the ranking, so they are not part of the key.
#[derive(Debug, Clone, PartialEq)]
struct RankingKey {
    metric: Metric,
    range: YearRange,
    continents: Vec<String>,
    ranking_limit: usize,
}

/// Loaded dataset plus filter state, answering the dashboard's queries.
#[derive(Debug)]
pub struct Explorer {
    dataset: Dataset,
    filters: FilterState,
    ranking_memo: Option<(RankingKey, Vec<RankedCountry>)>,
}

impl Explorer {
    /// Wrap a dataset with default filters: per-capita CO2 over the last six
    /// years of data, all continents, no ranking limit, gradient colors.
    pub fn new(dataset: Dataset) -> Explorer {
        let range = if dataset.records.is_empty() {
            YearRange::single(0)
        } else {
            let max = dataset.stats.year_max;
            YearRange::span((max - 5).max(dataset.stats.year_min), max)
        };

        Explorer {
            dataset,
            filters: FilterState {
                metric: Metric::Co2PerCapita,
                range,
                continents: Vec::new(),
                ranking_limit: 0,
                color_mode: ColorMode::Multi,
                selected_countries: Vec::new(),
            },
            ranking_memo: None,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    // ------------------------------------------------------------------
    // Filter setters
    // ------------------------------------------------------------------

    pub fn set_metric(&mut self, metric: Metric) {
        self.filters.metric = metric;
    }

    pub fn set_year_range(&mut self, range: YearRange) {
        self.filters.range = range;
    }

    pub fn set_continents(&mut self, continents: Vec<String>) {
        self.filters.continents = continents;
    }

    pub fn set_ranking_limit(&mut self, limit: usize) {
        self.filters.ranking_limit = limit;
    }

    pub fn set_color_mode(&mut self, mode: ColorMode) {
        self.filters.color_mode = mode;
    }

    /// Selections past the cap are silently truncated.
    pub fn set_selected_countries(&mut self, mut iso_codes: Vec<String>) {
        iso_codes.truncate(MAX_SELECTED_COUNTRIES);
        self.filters.selected_countries = iso_codes;
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Per-country means under the current filters, in first-appearance order.
    pub fn aggregated(&self) -> Vec<AggregatedCountry> {
        aggregate_by_country(
            &self.dataset.records,
            self.filters.metric,
            self.filters.range,
            &self.filters.continents,
        )
    }

    /// The ranking table for the current filters. Recomputed only when a
    /// filter that feeds the ranking has changed since the last call.
    pub fn rankings(&mut self) -> &[RankedCountry] {
        let key = RankingKey {
            metric: self.filters.metric,
            range: self.filters.range,
            continents: self.filters.continents.clone(),
            ranking_limit: self.filters.ranking_limit,
        };

        let stale = match &self.ranking_memo {
            Some((cached_key, _)) => *cached_key != key,
            None => true,
        };
        if stale {
            let ranked = rank_countries(&self.aggregated(), self.filters.ranking_limit);
            self.ranking_memo = Some((key, ranked));
        }

        &self.ranking_memo.as_ref().unwrap().1
    }

    /// Per-country means with a positive value, the set the map colors.
    /// A mean of 0 (or below) is treated as "no data" and never ranked.
    fn colorable(&self) -> Vec<AggregatedCountry> {
        self.aggregated()
            .into_iter()
            .filter(|r| r.value > 0.0)
            .collect()
    }

    /// Independent per-continent ranks for the current filters. Zero-value
    /// countries are excluded so they never inflate a continent's group size.
    pub fn continent_ranks(&self) -> ContinentRanks {
        rank_within_continent(&self.colorable())
    }

    /// `(min, max)` over the per-country means under the current filters,
    /// excluding no-data countries. Feeds the mono scale, so it spans the
    /// same values the map actually colors. `(0, 0)` when nothing qualifies.
    pub fn value_range(&self) -> (f64, f64) {
        let rows = self.colorable();
        if rows.is_empty() {
            return (0.0, 0.0);
        }
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for row in &rows {
            if row.value < min {
                min = row.value;
            }
            if row.value > max {
                max = row.value;
            }
        }
        (min, max)
    }

    /// Header totals for the current filters.
    pub fn statistics(&self) -> RangeStatistics {
        statistics_for_continents(
            &self.dataset.records,
            self.filters.metric,
            self.filters.range,
            &self.filters.continents,
        )
    }

    /// Time series for the selected countries over the current range.
    pub fn time_series_for_selection(&self) -> Vec<TimeSeries> {
        time_series(
            &self.dataset.records,
            &self.filters.selected_countries,
            self.filters.metric,
            self.filters.range,
        )
    }

    /// Map fill color for one country under the current color mode.
    /// Countries absent from the aggregation, or with no data (mean <= 0),
    /// get neutral gray.
    pub fn country_color(&self, iso_code: &str) -> Rgb {
        let rows = self.colorable();
        let row = match rows.iter().find(|r| r.iso_code == iso_code) {
            Some(row) => row,
            None => return DEFAULT_COLOR,
        };

        match self.filters.color_mode {
            ColorMode::Multi => {
                let ranks = rank_within_continent(&rows);
                match ranks.position(&row.continent, iso_code) {
                    Some((rank, total)) => color_by_ranking(&row.continent, rank, total),
                    None => DEFAULT_COLOR,
                }
            }
            ColorMode::Mono => {
                let (min, max) = self.value_range();
                color_by_percentile(row.value, min, max)
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{continent_palette, CYAN_COLOR_SCALE};
    use crate::dataset::CountryYearRecord;

    fn record(iso: &str, continent: &str, year: i32, co2: f64) -> CountryYearRecord {
        CountryYearRecord {
            iso_code: iso.to_string(),
            country: format!("Country {}", iso),
            continent: continent.to_string(),
            year,
            co2,
            co2_per_capita: co2 / 10.0,
            share_global_co2: 0.0,
            co2_per_gdp: 0.0,
            population: 0.0,
            gdp: 0.0,
        }
    }

    fn explorer() -> Explorer {
        Explorer::new(Dataset::from_records(vec![
            record("ESP", "Europa", 2019, 250.0),
            record("ESP", "Europa", 2020, 230.0),
            record("FRA", "Europa", 2019, 310.0),
            record("JPN", "Asia", 2019, 1100.0),
            record("JPN", "Asia", 2020, 1050.0),
        ]))
    }

    #[test]
    fn test_default_range_covers_last_six_years() {
        let explorer = Explorer::new(Dataset::from_records(vec![
            record("ESP", "Europa", 2000, 280.0),
            record("ESP", "Europa", 2020, 230.0),
        ]));
        assert_eq!(explorer.filters().range, YearRange::span(2015, 2020));
        assert_eq!(explorer.filters().metric, Metric::Co2PerCapita);
    }

    #[test]
    fn test_default_range_clamps_to_dataset_start() {
        let explorer = Explorer::new(Dataset::from_records(vec![
            record("ESP", "Europa", 2019, 250.0),
            record("ESP", "Europa", 2020, 230.0),
        ]));
        assert_eq!(explorer.filters().range, YearRange::span(2019, 2020));
    }

    #[test]
    fn test_rankings_follow_filters() {
        let mut explorer = explorer();
        explorer.set_metric(Metric::Co2);
        explorer.set_year_range(YearRange::span(2019, 2020));

        let ranked: Vec<String> = explorer
            .rankings()
            .iter()
            .map(|r| r.iso_code.clone())
            .collect();
        assert_eq!(ranked, vec!["JPN", "FRA", "ESP"]);

        explorer.set_continents(vec!["Europa".to_string()]);
        explorer.set_ranking_limit(1);
        let ranked: Vec<String> = explorer
            .rankings()
            .iter()
            .map(|r| r.iso_code.clone())
            .collect();
        assert_eq!(ranked, vec!["FRA"]);
    }

    #[test]
    fn test_ranking_memo_invalidation() {
        let mut explorer = explorer();
        explorer.set_metric(Metric::Co2);
        explorer.set_year_range(YearRange::span(2019, 2020));

        assert_eq!(explorer.rankings().len(), 3);
        // Selection changes must not return a stale count
        explorer.set_ranking_limit(2);
        assert_eq!(explorer.rankings().len(), 2);
        // Unrelated state (color mode) leaves the memo valid
        explorer.set_color_mode(ColorMode::Mono);
        assert_eq!(explorer.rankings().len(), 2);
    }

    #[test]
    fn test_selection_cap() {
        let mut explorer = explorer();
        let codes: Vec<String> = (0..8).map(|i| format!("C{:02}", i)).collect();
        explorer.set_selected_countries(codes);
        assert_eq!(
            explorer.filters().selected_countries.len(),
            MAX_SELECTED_COUNTRIES
        );
    }

    #[test]
    fn test_country_color_multi_mode() {
        let mut explorer = explorer();
        explorer.set_metric(Metric::Co2);
        explorer.set_year_range(YearRange::span(2019, 2020));

        // JPN is Asia's only ranked country: rank 1 of 1 -> top color band
        let asia = continent_palette("Asia").unwrap();
        assert_eq!(explorer.country_color("JPN"), asia.top);

        // FRA ranks 1st of 2 in Europa, ESP 2nd
        let europa = continent_palette("Europa").unwrap();
        assert_eq!(explorer.country_color("FRA"), europa.top);
        assert_eq!(explorer.country_color("ESP"), europa.top);

        assert_eq!(explorer.country_color("ZZZ"), DEFAULT_COLOR);
    }

    #[test]
    fn test_country_color_mono_mode() {
        let mut explorer = explorer();
        explorer.set_metric(Metric::Co2);
        explorer.set_year_range(YearRange::span(2019, 2020));
        explorer.set_color_mode(ColorMode::Mono);

        // value_range spans the per-country means 240..1075; JPN sits at the
        // top of that span, ESP at the bottom.
        assert_eq!(explorer.country_color("JPN"), CYAN_COLOR_SCALE[10]);
        assert_eq!(explorer.country_color("ESP"), CYAN_COLOR_SCALE[2]);
    }

    #[test]
    fn test_value_range_spans_filtered_means() {
        let mut explorer = explorer();
        explorer.set_metric(Metric::Co2);
        explorer.set_year_range(YearRange::span(2019, 2020));

        // Means: ESP 240, FRA 310, JPN 1075
        assert_eq!(explorer.value_range(), (240.0, 1075.0));

        explorer.set_year_range(YearRange::single(1850));
        assert_eq!(explorer.value_range(), (0.0, 0.0));
    }

    #[test]
    fn test_no_data_country_stays_gray_and_unranked() {
        let mut explorer = Explorer::new(Dataset::from_records(vec![
            record("JPN", "Asia", 2020, 1000.0),
            record("ZRO", "Asia", 2020, 0.0),
        ]));
        explorer.set_metric(Metric::Co2);
        explorer.set_year_range(YearRange::single(2020));

        // A zero mean is "no data": gray fill, excluded from its continent's
        // ranking, and not counted toward the group size.
        assert_eq!(explorer.country_color("ZRO"), DEFAULT_COLOR);
        let ranks = explorer.continent_ranks();
        assert_eq!(ranks.position("Asia", "ZRO"), None);
        assert_eq!(ranks.position("Asia", "JPN"), Some((1, 1)));

        explorer.set_color_mode(ColorMode::Mono);
        assert_eq!(explorer.country_color("ZRO"), DEFAULT_COLOR);
    }

    #[test]
    fn test_time_series_for_selection() {
        let mut explorer = explorer();
        explorer.set_metric(Metric::Co2);
        explorer.set_year_range(YearRange::span(2019, 2020));
        explorer.set_selected_countries(vec!["ESP".to_string()]);

        let series = explorer.time_series_for_selection();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].points.len(), 2);
        assert_eq!(series[0].points[0].value, 250.0);
    }
}
