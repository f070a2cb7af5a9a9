// Aggregation Layer - filtering, grouping, and per-country averages
// All functions are pure and synchronous; callers recompute per filter change.

use crate::dataset::{CountryYearRecord, Metric};
use serde::Serialize;
use std::collections::HashMap;

// ============================================================================
// YEAR RANGE
// ============================================================================

/// Inclusive year range. `end = None` means the single year `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearRange {
    pub start: i32,
    pub end: Option<i32>,
}

impl YearRange {
    pub fn single(year: i32) -> YearRange {
        YearRange { start: year, end: None }
    }

    pub fn span(start: i32, end: i32) -> YearRange {
        YearRange { start, end: Some(end) }
    }

    pub fn contains(&self, year: i32) -> bool {
        match self.end {
            None => year == self.start,
            Some(end) => year >= self.start && year <= end,
        }
    }
}

// ============================================================================
// FILTERS
// ============================================================================

/// Records whose year falls in the inclusive range.
pub fn filter_by_year_range<'a>(
    records: &'a [CountryYearRecord],
    range: YearRange,
) -> Vec<&'a CountryYearRecord> {
    records.iter().filter(|r| range.contains(r.year)).collect()
}

/// Records whose continent is in `continents`. An empty list means no filter.
pub fn filter_by_continent<'a>(
    records: &'a [CountryYearRecord],
    continents: &[String],
) -> Vec<&'a CountryYearRecord> {
    if continents.is_empty() {
        return records.iter().collect();
    }
    records
        .iter()
        .filter(|r| continents.iter().any(|c| c == &r.continent))
        .collect()
}

/// Group records by continent name, preserving record order within groups.
pub fn group_by_continent(
    records: &[CountryYearRecord],
) -> HashMap<String, Vec<CountryYearRecord>> {
    let mut groups: HashMap<String, Vec<CountryYearRecord>> = HashMap::new();
    for record in records {
        groups
            .entry(record.continent.clone())
            .or_default()
            .push(record.clone());
    }
    groups
}

// ============================================================================
// PER-COUNTRY AGGREGATION
// ============================================================================

/// One country's mean metric value over the selected range.
/// Recomputed on every filter change; never cached or persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedCountry {
    pub iso_code: String,
    pub country: String,
    pub continent: String,
    pub value: f64,
}

/// Group the filtered records by ISO code and average the metric per country.
///
/// Missing values were already coerced to 0 at load time, so they drag the
/// mean down rather than erroring. Empty groups cannot occur (a group exists
/// only because a record matched), but the zero-guard stays for safety.
/// Output order is first appearance in the filtered records.
pub fn aggregate_by_country(
    records: &[CountryYearRecord],
    metric: Metric,
    range: YearRange,
    continents: &[String],
) -> Vec<AggregatedCountry> {
    struct Accumulator {
        country: String,
        continent: String,
        total: f64,
        count: usize,
    }

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Accumulator> = HashMap::new();

    for record in records {
        if !range.contains(record.year) {
            continue;
        }
        if !continents.is_empty() && !continents.iter().any(|c| c == &record.continent) {
            continue;
        }

        let entry = groups.entry(record.iso_code.clone()).or_insert_with(|| {
            order.push(record.iso_code.clone());
            Accumulator {
                country: record.country.clone(),
                continent: record.continent.clone(),
                total: 0.0,
                count: 0,
            }
        });
        entry.total += metric.value_of(record);
        entry.count += 1;
    }

    order
        .into_iter()
        .map(|iso_code| {
            let acc = &groups[&iso_code];
            let value = if acc.count == 0 {
                0.0
            } else {
                acc.total / acc.count as f64
            };
            AggregatedCountry {
                iso_code,
                country: acc.country.clone(),
                continent: acc.continent.clone(),
                value,
            }
        })
        .collect()
}

/// Dataset-wide `(min, max)` for a metric; `(0, 0)` on an empty slice.
pub fn min_max(records: &[CountryYearRecord], metric: Metric) -> (f64, f64) {
    if records.is_empty() {
        return (0.0, 0.0);
    }
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for record in records {
        let value = metric.value_of(record);
        if value < min {
            min = value;
        }
        if value > max {
            max = value;
        }
    }
    (min, max)
}

// ============================================================================
// TIME SERIES
// ============================================================================

/// Year-sorted metric values for one country, for the line chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    pub iso_code: String,
    pub country: String,
    pub points: Vec<TimeSeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    pub year: i32,
    pub value: f64,
}

/// Extract per-country time series over the range, sorted by year.
/// A country with no matching records yields an empty series whose display
/// name falls back to its ISO code.
pub fn time_series(
    records: &[CountryYearRecord],
    iso_codes: &[String],
    metric: Metric,
    range: YearRange,
) -> Vec<TimeSeries> {
    let filtered = filter_by_year_range(records, range);

    iso_codes
        .iter()
        .map(|iso_code| {
            let mut rows: Vec<&CountryYearRecord> = filtered
                .iter()
                .copied()
                .filter(|r| &r.iso_code == iso_code)
                .collect();
            rows.sort_by_key(|r| r.year);

            let country = rows
                .first()
                .map(|r| r.country.clone())
                .unwrap_or_else(|| iso_code.clone());

            TimeSeries {
                iso_code: iso_code.clone(),
                country,
                points: rows
                    .into_iter()
                    .map(|r| TimeSeriesPoint {
                        year: r.year,
                        value: metric.value_of(r),
                    })
                    .collect(),
            }
        })
        .collect()
}

// ============================================================================
// SUMMARY STATISTICS
// ============================================================================

/// Totals shown in the dashboard header for the current filter state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeStatistics {
    pub total: f64,
    pub average: f64,
    pub countries: usize,
}

/// Sum of the metric over all records matching the range and continents.
pub fn total_for_range(
    records: &[CountryYearRecord],
    metric: Metric,
    range: YearRange,
    continents: &[String],
) -> f64 {
    records
        .iter()
        .filter(|r| range.contains(r.year))
        .filter(|r| continents.is_empty() || continents.iter().any(|c| c == &r.continent))
        .map(|r| metric.value_of(r))
        .sum()
}

/// Mean of the metric over matching records; 0 when nothing matches.
pub fn average_for_range(
    records: &[CountryYearRecord],
    metric: Metric,
    range: YearRange,
    continents: &[String],
) -> f64 {
    let matching: Vec<f64> = records
        .iter()
        .filter(|r| range.contains(r.year))
        .filter(|r| continents.is_empty() || continents.iter().any(|c| c == &r.continent))
        .map(|r| metric.value_of(r))
        .collect();
    if matching.is_empty() {
        return 0.0;
    }
    matching.iter().sum::<f64>() / matching.len() as f64
}

/// Distinct countries with at least one record in the range.
pub fn country_count_for_range(
    records: &[CountryYearRecord],
    range: YearRange,
    continents: &[String],
) -> usize {
    let mut seen: Vec<&str> = Vec::new();
    for record in records {
        if !range.contains(record.year) {
            continue;
        }
        if !continents.is_empty() && !continents.iter().any(|c| c == &record.continent) {
            continue;
        }
        if !seen.contains(&record.iso_code.as_str()) {
            seen.push(&record.iso_code);
        }
    }
    seen.len()
}

/// Combined total/average/country-count for the visible continents.
pub fn statistics_for_continents(
    records: &[CountryYearRecord],
    metric: Metric,
    range: YearRange,
    continents: &[String],
) -> RangeStatistics {
    RangeStatistics {
        total: total_for_range(records, metric, range, continents),
        average: average_for_range(records, metric, range, continents),
        countries: country_count_for_range(records, range, continents),
    }
}

// ============================================================================
// TESTS
// ============================================================================
