// Dataset Loader - CO2 country-year records
// Reads the cleaned OWID export (JSON or CSV), normalizes legacy fields,
// and computes load-time stats for the CLI and API.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;

// ============================================================================
// RECORD MODEL
// ============================================================================

/// One (country, year) row of the emissions dataset.
///
/// Normalized and immutable once loaded. Missing numeric fields are 0,
/// missing string fields are empty; no further uniqueness is enforced
/// beyond what the source data provides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryYearRecord {
    pub iso_code: String,
    pub country: String,
    pub continent: String,
    pub year: i32,
    pub co2: f64,
    pub co2_per_capita: f64,
    pub share_global_co2: f64,
    pub co2_per_gdp: f64,
    pub population: f64,
    pub gdp: f64,
}

/// Record as it appears in the source file, before normalization.
///
/// Older exports carry the continent under a capitalized `Continent` key,
/// and numeric cells may be empty (CSV) or null (JSON).
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub iso_code: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub continent: String,
    #[serde(rename = "Continent", default)]
    pub legacy_continent: String,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub year: i32,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub co2: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub co2_per_capita: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub share_global_co2: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub co2_per_gdp: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub population: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub gdp: f64,
}

impl RawRecord {
    /// Fold the legacy `Continent` field into `continent` and fill defaults.
    /// A record that already has `continent` set is left unchanged.
    pub fn normalize(self) -> CountryYearRecord {
        let continent = if self.continent.is_empty() {
            self.legacy_continent
        } else {
            self.continent
        };

        CountryYearRecord {
            iso_code: self.iso_code,
            country: self.country,
            continent,
            year: self.year,
            co2: self.co2,
            co2_per_capita: self.co2_per_capita,
            share_global_co2: self.share_global_co2,
            co2_per_gdp: self.co2_per_gdp,
            population: self.population,
            gdp: self.gdp,
        }
    }
}

/// Accept numbers, numeric strings, empty cells, or null; anything else is 0.
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lenient {
        Num(f64),
        Text(String),
        Null,
    }

    Ok(match Lenient::deserialize(deserializer)? {
        Lenient::Num(n) => n,
        Lenient::Text(s) => s.trim().parse().unwrap_or(0.0),
        Lenient::Null => 0.0,
    })
}

fn lenient_i32<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_f64(deserializer).map(|n| n as i32)
}

// ============================================================================
// METRICS
// ============================================================================

/// Numeric field selectable for aggregation, ranking, and coloring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Co2,
    Co2PerCapita,
    ShareGlobalCo2,
    Co2PerGdp,
    Population,
    Gdp,
}

impl Metric {
    /// All selectable metrics, in display order.
    pub const ALL: [Metric; 6] = [
        Metric::Co2,
        Metric::Co2PerCapita,
        Metric::ShareGlobalCo2,
        Metric::Co2PerGdp,
        Metric::Population,
        Metric::Gdp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Co2 => "co2",
            Metric::Co2PerCapita => "co2_per_capita",
            Metric::ShareGlobalCo2 => "share_global_co2",
            Metric::Co2PerGdp => "co2_per_gdp",
            Metric::Population => "population",
            Metric::Gdp => "gdp",
        }
    }

    /// Value of this metric on a record.
    pub fn value_of(&self, record: &CountryYearRecord) -> f64 {
        match self {
            Metric::Co2 => record.co2,
            Metric::Co2PerCapita => record.co2_per_capita,
            Metric::ShareGlobalCo2 => record.share_global_co2,
            Metric::Co2PerGdp => record.co2_per_gdp,
            Metric::Population => record.population,
            Metric::Gdp => record.gdp,
        }
    }
}

impl FromStr for Metric {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "co2" => Ok(Metric::Co2),
            "co2_per_capita" => Ok(Metric::Co2PerCapita),
            "share_global_co2" => Ok(Metric::ShareGlobalCo2),
            "co2_per_gdp" => Ok(Metric::Co2PerGdp),
            "population" => Ok(Metric::Population),
            "gdp" => Ok(Metric::Gdp),
            other => Err(anyhow::anyhow!("unknown metric: {}", other)),
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// DATASET
// ============================================================================

/// Load-time stats, reported by the CLI and the `/api/meta` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetStats {
    pub record_count: usize,
    pub country_count: usize,
    pub continent_count: usize,
    pub year_min: i32,
    pub year_max: i32,
    /// SHA-256 of the source bytes, for telling exports apart.
    pub fingerprint: String,
    pub loaded_at: DateTime<Utc>,
}

/// The full in-memory dataset: normalized records plus load-time stats.
/// Records keep source order; everything downstream is recomputed per query.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Vec<CountryYearRecord>,
    pub stats: DatasetStats,
}

impl Dataset {
    /// Load from a JSON array of raw records.
    pub fn from_json_path(path: &Path) -> Result<Dataset> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read dataset: {}", path.display()))?;
        let raw: Vec<RawRecord> = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse JSON dataset: {}", path.display()))?;
        Ok(Self::build(raw, &bytes))
    }

    /// Load from a headered CSV export.
    pub fn from_csv_path(path: &Path) -> Result<Dataset> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read dataset: {}", path.display()))?;
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let raw = reader
            .deserialize()
            .collect::<std::result::Result<Vec<RawRecord>, _>>()
            .with_context(|| format!("Failed to parse CSV dataset: {}", path.display()))?;
        Ok(Self::build(raw, &bytes))
    }

    /// Dispatch on file extension (`.csv` → CSV, anything else → JSON).
    pub fn from_path(path: &Path) -> Result<Dataset> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("csv") => Self::from_csv_path(path),
            _ => Self::from_json_path(path),
        }
    }

    /// Build a dataset from already-normalized records (used in tests and by
    /// callers that fetch the asset themselves). Fingerprints the JSON form.
    pub fn from_records(records: Vec<CountryYearRecord>) -> Dataset {
        let bytes = serde_json::to_vec(&records).unwrap_or_default();
        let stats = compute_stats(&records, &bytes);
        Dataset { records, stats }
    }

    fn build(raw: Vec<RawRecord>, source_bytes: &[u8]) -> Dataset {
        // Rows without an ISO code are aggregates ("World", income groups)
        // and are dropped before any query sees them.
        let records: Vec<CountryYearRecord> = raw
            .into_iter()
            .map(RawRecord::normalize)
            .filter(|r| !r.iso_code.trim().is_empty())
            .collect();
        let stats = compute_stats(&records, source_bytes);
        Dataset { records, stats }
    }

    pub fn available_years(&self) -> Vec<i32> {
        available_years(&self.records)
    }

    pub fn available_continents(&self) -> Vec<String> {
        available_continents(&self.records)
    }
}

fn compute_stats(records: &[CountryYearRecord], source_bytes: &[u8]) -> DatasetStats {
    let mut hasher = Sha256::new();
    hasher.update(source_bytes);
    let fingerprint = format!("{:x}", hasher.finalize());

    let countries: BTreeSet<&str> = records.iter().map(|r| r.iso_code.as_str()).collect();
    let continents: BTreeSet<&str> = records
        .iter()
        .map(|r| r.continent.as_str())
        .filter(|c| !c.is_empty())
        .collect();

    DatasetStats {
        record_count: records.len(),
        country_count: countries.len(),
        continent_count: continents.len(),
        year_min: records.iter().map(|r| r.year).min().unwrap_or(0),
        year_max: records.iter().map(|r| r.year).max().unwrap_or(0),
        fingerprint,
        loaded_at: Utc::now(),
    }
}

/// Distinct years present in the dataset, ascending.
pub fn available_years(records: &[CountryYearRecord]) -> Vec<i32> {
    let years: BTreeSet<i32> = records.iter().map(|r| r.year).collect();
    years.into_iter().collect()
}

/// Distinct non-empty continent names, sorted.
pub fn available_continents(records: &[CountryYearRecord]) -> Vec<String> {
    let continents: BTreeSet<&str> = records
        .iter()
        .map(|r| r.continent.as_str())
        .filter(|c| !c.is_empty())
        .collect();
    continents.into_iter().map(String::from).collect()
}

// ============================================================================
// SMALL COUNTRIES
// ============================================================================

/// ISO codes too small to render on the world map, with display names.
/// The map layer hides these and lists them in a side legend instead.
pub const SMALL_COUNTRIES: [(&str, &str); 24] = [
    ("SXM", "Sint Maarten (Dutch part)"),
    ("BES", "Bonaire Sint Eustatius and Saba"),
    ("VGB", "British Virgin Islands"),
    ("AIA", "Anguilla"),
    ("MSR", "Montserrat"),
    ("SHN", "Saint Helena"),
    ("SPM", "Saint Pierre and Miquelon"),
    ("VCT", "Saint Vincent and the Grenadines"),
    ("KNA", "Saint Kitts and Nevis"),
    ("DMA", "Dominica"),
    ("GRD", "Grenada"),
    ("LCA", "Saint Lucia"),
    ("TCA", "Turks and Caicos Islands"),
    ("BMU", "Bermuda"),
    ("MLT", "Malta"),
    ("MDV", "Maldives"),
    ("TUV", "Tuvalu"),
    ("NRU", "Nauru"),
    ("KIR", "Kiribati"),
    ("TON", "Tonga"),
    ("MHL", "Marshall Islands"),
    ("PLW", "Palau"),
    ("FSM", "Micronesia"),
    ("NIU", "Niue"),
];

pub fn is_small_country(iso_code: &str) -> bool {
    SMALL_COUNTRIES.iter().any(|(code, _)| *code == iso_code)
}

pub fn small_country_name(iso_code: &str) -> Option<&'static str> {
    SMALL_COUNTRIES
        .iter()
        .find(|(code, _)| *code == iso_code)
        .map(|(_, name)| *name)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(iso: &str, continent: &str, legacy: &str) -> RawRecord {
        RawRecord {
            iso_code: iso.to_string(),
            country: String::new(),
            continent: continent.to_string(),
            legacy_continent: legacy.to_string(),
            year: 2020,
            co2: 0.0,
            co2_per_capita: 0.0,
            share_global_co2: 0.0,
            co2_per_gdp: 0.0,
            population: 0.0,
            gdp: 0.0,
        }
    }

    #[test]
    fn test_normalize_keeps_existing_continent() {
        let record = raw("ESP", "Europa", "Ignored").normalize();
        assert_eq!(record.continent, "Europa");
    }

    #[test]
    fn test_normalize_falls_back_to_legacy_continent() {
        let record = raw("ESP", "", "Europa").normalize();
        assert_eq!(record.continent, "Europa");
    }

    #[test]
    fn test_json_parse_defaults_missing_fields() {
        let json = r#"[{"iso_code":"ESP","country":"Spain","year":2019,"co2":244.0}]"#;
        let raw: Vec<RawRecord> = serde_json::from_slice(json.as_bytes()).unwrap();
        let record = raw.into_iter().next().unwrap().normalize();

        assert_eq!(record.iso_code, "ESP");
        assert_eq!(record.year, 2019);
        assert_eq!(record.co2, 244.0);
        assert_eq!(record.gdp, 0.0);
        assert_eq!(record.continent, "");
    }

    #[test]
    fn test_json_parse_coerces_null_and_strings() {
        let json = r#"[{"iso_code":"ESP","year":"2019","co2":null,"gdp":"not a number"}]"#;
        let raw: Vec<RawRecord> = serde_json::from_slice(json.as_bytes()).unwrap();
        let record = raw.into_iter().next().unwrap().normalize();

        assert_eq!(record.year, 2019);
        assert_eq!(record.co2, 0.0);
        assert_eq!(record.gdp, 0.0);
    }

    #[test]
    fn test_csv_parse_with_empty_cells() {
        let csv = "iso_code,country,Continent,year,co2,gdp\nESP,Spain,Europa,2019,244.0,\n";
        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let raw = reader
            .deserialize()
            .collect::<std::result::Result<Vec<RawRecord>, _>>()
            .unwrap();
        let record = raw.into_iter().next().unwrap().normalize();

        assert_eq!(record.continent, "Europa");
        assert_eq!(record.co2, 244.0);
        assert_eq!(record.gdp, 0.0);
    }

    #[test]
    fn test_dataset_drops_blank_iso_codes() {
        let raw_rows = vec![raw("ESP", "Europa", ""), raw("", "Europa", ""), raw("  ", "", "")];
        let dataset = Dataset::build(raw_rows, b"source");

        assert_eq!(dataset.records.len(), 1);
        assert_eq!(dataset.stats.record_count, 1);
        assert_eq!(dataset.stats.country_count, 1);
    }

    #[test]
    fn test_stats_year_span_and_fingerprint() {
        let mut r1 = raw("ESP", "Europa", "").normalize();
        r1.year = 1990;
        let mut r2 = raw("FRA", "Europa", "").normalize();
        r2.year = 2020;
        let dataset = Dataset::from_records(vec![r1, r2]);

        assert_eq!(dataset.stats.year_min, 1990);
        assert_eq!(dataset.stats.year_max, 2020);
        assert_eq!(dataset.stats.fingerprint.len(), 64);
    }

    #[test]
    fn test_metric_round_trip() {
        for metric in Metric::ALL {
            assert_eq!(metric.as_str().parse::<Metric>().unwrap(), metric);
        }
        assert!("co3".parse::<Metric>().is_err());
    }

    #[test]
    fn test_available_years_and_continents() {
        let mut r1 = raw("ESP", "Europa", "").normalize();
        r1.year = 2020;
        let mut r2 = raw("JPN", "Asia", "").normalize();
        r2.year = 2018;
        let mut r3 = raw("XXX", "", "").normalize();
        r3.year = 2020;
        let records = vec![r1, r2, r3];

        assert_eq!(available_years(&records), vec![2018, 2020]);
        assert_eq!(available_continents(&records), vec!["Asia", "Europa"]);
    }

    #[test]
    fn test_small_country_registry() {
        assert!(is_small_country("MLT"));
        assert_eq!(small_country_name("MLT"), Some("Malta"));
        assert!(!is_small_country("ESP"));
        assert_eq!(small_country_name("ESP"), None);
    }
}
