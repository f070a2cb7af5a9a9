// Emissions Explorer - CLI
// Loads a dataset export and prints stats plus a colored top-N ranking.

use anyhow::{bail, Result};
use std::env;
use std::path::Path;

use emissions_explorer::{
    color_by_ranking, rank_within_continent, top_countries, Dataset, Explorer, Metric, YearRange,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: emissions-explorer <dataset.json|dataset.csv> [metric] [start] [end] [limit]");
        eprintln!("Metrics: co2, co2_per_capita, share_global_co2, co2_per_gdp, population, gdp");
        std::process::exit(1);
    }

    let path = Path::new(&args[1]);
    let metric: Metric = match args.get(2) {
        Some(name) => name.parse()?,
        None => Metric::Co2,
    };
    let limit: usize = match args.get(5) {
        Some(n) => n.parse()?,
        None => 10,
    };

    // 1. Load dataset
    println!("📂 Loading dataset...");
    let dataset = Dataset::from_path(path)?;
    println!("✓ Loaded {} records from {}", dataset.records.len(), path.display());
    println!(
        "✓ {} countries, {} continents, years {}-{}",
        dataset.stats.country_count,
        dataset.stats.continent_count,
        dataset.stats.year_min,
        dataset.stats.year_max
    );
    println!("✓ Fingerprint: {}...", &dataset.stats.fingerprint[..16]);

    // 2. Resolve year range
    let start: i32 = match args.get(3) {
        Some(y) => y.parse()?,
        None => dataset.stats.year_max,
    };
    let range = match args.get(4) {
        Some(y) => {
            let end: i32 = y.parse()?;
            if end < start {
                bail!("end year {} is before start year {}", end, start);
            }
            YearRange::span(start, end)
        }
        None => YearRange::single(start),
    };

    // 3. Aggregate and rank
    let mut explorer = Explorer::new(dataset);
    explorer.set_metric(metric);
    explorer.set_year_range(range);

    let rows = explorer.aggregated();
    let ranked = top_countries(&rows, limit);
    let continent_ranks = rank_within_continent(&rows);

    println!("\n📊 Top {} countries by {} ({:?})", ranked.len(), metric, range);
    println!("─────────────────────────────────────────────────────────");
    for row in &ranked {
        let color = match continent_ranks.position(&row.continent, &row.iso_code) {
            Some((rank, total)) => color_by_ranking(&row.continent, rank, total),
            None => emissions_explorer::DEFAULT_COLOR,
        };
        println!(
            "{:>3}. {:<3} {:<32} {:>14.3}  {:<8} {}",
            row.rank, row.iso_code, row.country, row.value, row.continent, color
        );
    }

    let stats = explorer.statistics();
    println!("─────────────────────────────────────────────────────────");
    println!(
        "✓ Total: {:.3}  Average: {:.3}  Countries: {}",
        stats.total, stats.average, stats.countries
    );

    Ok(())
}
