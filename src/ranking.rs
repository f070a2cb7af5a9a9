// Ranking Layer - value-descending orderings of aggregated countries
// Global top-N for the table, per-continent ranks for the map colors.

use crate::aggregate::AggregatedCountry;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

// ============================================================================
// RANKED ROWS
// ============================================================================

/// An aggregated country plus its 1-based position in the ordering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCountry {
    pub rank: usize,
    pub iso_code: String,
    pub country: String,
    pub continent: String,
    pub value: f64,
}

/// Sort rows descending by value and attach 1-based ranks.
///
/// The sort is stable: rows with equal values keep their input order. That
/// matches the source data's behavior but is an accident of sort stability
/// there, not a documented contract; don't build on a specific tie order.
/// `limit == 0` returns all rows, otherwise the first `limit`.
pub fn rank_countries(rows: &[AggregatedCountry], limit: usize) -> Vec<RankedCountry> {
    let mut sorted: Vec<&AggregatedCountry> = rows.iter().collect();
    sorted.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));

    let take = if limit == 0 { sorted.len() } else { limit.min(sorted.len()) };
    sorted
        .into_iter()
        .take(take)
        .enumerate()
        .map(|(index, row)| RankedCountry {
            rank: index + 1,
            iso_code: row.iso_code.clone(),
            country: row.country.clone(),
            continent: row.continent.clone(),
            value: row.value,
        })
        .collect()
}

/// Top-N for display: countries with a non-positive aggregate are treated as
/// "no data" and excluded before the limit is applied.
pub fn top_countries(rows: &[AggregatedCountry], limit: usize) -> Vec<RankedCountry> {
    let positive: Vec<AggregatedCountry> =
        rows.iter().filter(|r| r.value > 0.0).cloned().collect();
    rank_countries(&positive, limit)
}

// ============================================================================
// PER-CONTINENT RANKS
// ============================================================================

/// Independent rank per continent: `ranks[continent][iso_code]` is the
/// country's 1-based position within its continent, `totals[continent]` the
/// number of ranked countries there. Feeds the rank-based color policy.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContinentRanks {
    pub ranks: HashMap<String, HashMap<String, usize>>,
    pub totals: HashMap<String, usize>,
}

impl ContinentRanks {
    /// Rank and group size for one country, if it was ranked.
    pub fn position(&self, continent: &str, iso_code: &str) -> Option<(usize, usize)> {
        let rank = *self.ranks.get(continent)?.get(iso_code)?;
        let total = *self.totals.get(continent)?;
        Some((rank, total))
    }
}

/// Rank countries within each continent independently.
/// Uses the same stable descending order as the global ranking.
pub fn rank_within_continent(rows: &[AggregatedCountry]) -> ContinentRanks {
    let mut sorted: Vec<&AggregatedCountry> = rows.iter().collect();
    sorted.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));

    let mut result = ContinentRanks::default();
    for row in sorted {
        let continent_ranks = result.ranks.entry(row.continent.clone()).or_default();
        let rank = continent_ranks.len() + 1;
        continent_ranks.insert(row.iso_code.clone(), rank);
        *result.totals.entry(row.continent.clone()).or_insert(0) = rank;
    }
    result
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn row(iso: &str, continent: &str, value: f64) -> AggregatedCountry {
        AggregatedCountry {
            iso_code: iso.to_string(),
            country: format!("Country {}", iso),
            continent: continent.to_string(),
            value,
        }
    }

    #[test]
    fn test_rank_descending_with_ranks() {
        let rows = vec![row("B", "Europa", 5.0), row("A", "Europa", 15.0)];
        let ranked = rank_countries(&rows, 0);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].iso_code, "A");
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].iso_code, "B");
        assert_eq!(ranked[1].rank, 2);
    }

    #[test]
    fn test_rank_limit() {
        let rows = vec![row("A", "Europa", 15.0), row("B", "Europa", 5.0)];
        let ranked = rank_countries(&rows, 1);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].iso_code, "A");

        // Limit larger than the row count is harmless
        assert_eq!(rank_countries(&rows, 10).len(), 2);
        // Limit 0 means no limit
        assert_eq!(rank_countries(&rows, 0).len(), 2);
    }

    #[test]
    fn test_rank_output_non_increasing() {
        let rows = vec![
            row("A", "Europa", 3.0),
            row("B", "Europa", 8.0),
            row("C", "Asia", 8.0),
            row("D", "Asia", 1.0),
        ];
        let ranked = rank_countries(&rows, 0);
        for pair in ranked.windows(2) {
            assert!(pair[0].value >= pair[1].value);
        }
    }

    #[test]
    fn test_rank_ties_keep_input_order() {
        let rows = vec![
            row("X", "Europa", 7.0),
            row("Y", "Europa", 7.0),
            row("Z", "Europa", 7.0),
        ];
        let ranked = rank_countries(&rows, 0);
        let order: Vec<&str> = ranked.iter().map(|r| r.iso_code.as_str()).collect();
        assert_eq!(order, vec!["X", "Y", "Z"]);
    }

    #[test]
    fn test_top_countries_excludes_no_data() {
        let rows = vec![
            row("A", "Europa", 15.0),
            row("B", "Europa", 0.0),
            row("C", "Europa", -1.0),
            row("D", "Europa", 5.0),
        ];
        let top = top_countries(&rows, 3);

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].iso_code, "A");
        assert_eq!(top[1].iso_code, "D");
    }

    #[test]
    fn test_continent_ranks_are_independent() {
        let rows = vec![
            row("JPN", "Asia", 1000.0),
            row("ESP", "Europa", 240.0),
            row("FRA", "Europa", 310.0),
            row("CHN", "Asia", 9000.0),
        ];
        let ranks = rank_within_continent(&rows);

        assert_eq!(ranks.position("Asia", "CHN"), Some((1, 2)));
        assert_eq!(ranks.position("Asia", "JPN"), Some((2, 2)));
        assert_eq!(ranks.position("Europa", "FRA"), Some((1, 2)));
        assert_eq!(ranks.position("Europa", "ESP"), Some((2, 2)));
        assert_eq!(ranks.position("Europa", "JPN"), None);
        assert_eq!(ranks.position("Oceanía", "AUS"), None);
    }
}
