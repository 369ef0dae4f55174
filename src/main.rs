use salesflow::{
    config::PipelineConfig,
    engine::filter::FilterSpec,
    enrichment::{catalog::ProductCatalog, http::HttpCatalog},
    export::save_enriched,
    logging::init_logging,
    pipeline::Pipeline,
};

use anyhow::Context;
use clap::Parser;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "salesflow", about = "Clean, analyse and enrich a sales transaction file")]
struct Args {
    /// Pipe-delimited sales file
    #[arg(default_value = "data/sales_data.txt")]
    input: PathBuf,

    /// TOML config; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    region: Option<String>,

    #[arg(long)]
    min_amount: Option<Decimal>,

    #[arg(long)]
    max_amount: Option<Decimal>,

    /// Where to write the enriched data file
    #[arg(long, default_value = "output/enriched_sales_data.txt")]
    output: PathBuf,

    /// Skip the product catalog lookups
    #[arg(long)]
    no_enrich: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if args.no_enrich {
        config.enrichment.enabled = false;
    }

    let catalog: Option<Arc<dyn ProductCatalog>> = if config.enrichment.enabled {
        Some(Arc::new(HttpCatalog::new(&config.enrichment)?))
    } else {
        None
    };

    let spec = FilterSpec {
        region: args.region,
        min_amount: args.min_amount,
        max_amount: args.max_amount,
    };

    let pipeline = Pipeline::new(config, catalog);
    let output = pipeline
        .run(&args.input, &spec)
        .await
        .with_context(|| format!("Pipeline failed for '{}'", args.input.display()))?;

    let summary = &output.summary;
    let options = &output.filter_options;
    println!("Rows read: {}", output.stats.rows_read);
    println!("Valid: {}  Invalid: {}", output.stats.valid, output.stats.invalid);
    println!("Available regions: {}", options.regions.join(", "));
    if let (Some(min), Some(max)) = (options.min_amount, options.max_amount) {
        println!("Amount range: {} to {}", min.round_dp(2), max.round_dp(2));
    }
    println!("Transactions in view: {}", summary.transaction_count);
    println!("Total revenue: {}", summary.total_revenue.round_dp(2));
    println!("Average amount: {}", summary.average_amount.round_dp(2));
    for region in &summary.regions {
        println!(
            "  {}: {} ({} transactions, {}%)",
            region.region,
            region.revenue.round_dp(2),
            region.count,
            region.share
        );
    }
    for product in &summary.top_products {
        println!("  {}: {} ({} sales)", product.product_id, product.revenue.round_dp(2), product.count);
    }
    if !summary.low_performers.is_empty() {
        println!("Low performers:");
        for product in &summary.low_performers {
            println!("  {}: {} sales, {}", product.product_id, product.count, product.revenue.round_dp(2));
        }
    }
    println!(
        "Enriched {} of {} products ({} records)",
        output.enrichment.products_enriched, output.enrichment.products_requested, output.enrichment.records_enriched
    );

    save_enriched(&output.records, &args.output)?;
    Ok(())
}
