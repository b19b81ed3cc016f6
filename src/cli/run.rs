use super::ui;
use crate::core::batch::{BatchOrchestrator, BatchOutcome};
use crate::core::cache::SnapshotCache;
use crate::core::config::{AppConfig, SHEET_TOKEN_ENV};
use crate::core::fetch::FetchClient;
use crate::core::normalizer::{ExchangeRateNormalizer, RateSet};
use crate::core::resolver::FallbackResolver;
use crate::providers;
use crate::store::{
    self, MemoryStore, SheetStore, UPDATE_CHUNK_SIZE, VikaStore, update_in_chunks,
};
use anyhow::{Context, Result, bail};
use comfy_table::Cell;
use std::sync::Arc;
use tracing::info;

impl BatchOutcome {
    pub fn display_as_table(&self, reporting_tag: &str) -> String {
        let mut prices = ui::new_styled_table();
        prices.set_header(vec![
            ui::header_cell("Record"),
            ui::header_cell("Code"),
            ui::header_cell("Price"),
            ui::header_cell("Multiplier"),
            ui::header_cell(&format!("Price ({reporting_tag})")),
        ]);
        for record in &self.prices {
            prices.add_row(vec![
                Cell::new(&record.instrument_id),
                Cell::new(&record.code),
                ui::number_cell(record.resolved_price, 4),
                ui::multiplier_cell(record.applied_multiplier),
                ui::number_cell(record.normalized_price(), 2),
            ]);
        }

        let mut rates = ui::new_styled_table();
        rates.set_header(vec![
            ui::header_cell("Record"),
            ui::header_cell("Currency"),
            ui::header_cell(&format!("Rate ({reporting_tag})")),
        ]);
        for record in &self.rates {
            rates.add_row(vec![
                Cell::new(&record.target_id),
                Cell::new(&record.currency_tag),
                ui::multiplier_cell(record.multiplier),
            ]);
        }

        let mut output = format!(
            "{}\n{}\n\n{}\n{}\n",
            ui::style_text("Resolved prices", ui::StyleType::Title),
            prices,
            ui::style_text("Exchange rates", ui::StyleType::Title),
            rates,
        );

        if !self.unresolved.is_empty() {
            let codes: Vec<String> = self
                .unresolved
                .iter()
                .map(|i| format!("{} ({})", i.code, i.asset_type))
                .collect();
            output.push_str(&format!(
                "\n{} {}\n",
                ui::style_text("Unresolved:", ui::StyleType::Error),
                codes.join(", ")
            ));
        }
        output
    }
}

/// Reads both datasheets, resolves every price and rate, and writes the
/// results back. With `dry_run` the writes go to an in-memory store and
/// nothing is sent to the sheet.
pub async fn run(config: &AppConfig, dry_run: bool) -> Result<()> {
    if config.sheet.token.is_empty() {
        bail!(
            "No sheet token configured, set sheet.token or {}",
            SHEET_TOKEN_ENV
        );
    }

    let fetch = Arc::new(FetchClient::new(config.fetch_options())?);
    let sheet = VikaStore::new(
        &config.sheet.base_url,
        &config.sheet.token,
        config.sheet.view_id.as_deref(),
        fetch.clone(),
    );

    let written = if dry_run {
        let preview = MemoryStore::new();
        sync(config, &fetch, &sheet, &preview).await?
    } else {
        sync(config, &fetch, &sheet, &sheet).await?
    };
    println!("{}", summary_line(written, dry_run));

    info!("Execution successful");
    Ok(())
}

fn summary_line(written: usize, dry_run: bool) -> String {
    if dry_run {
        ui::style_text(
            &format!("Dry run: {written} record updates not written"),
            ui::StyleType::Subtle,
        )
    } else {
        ui::style_text(
            &format!("Updated {written} records"),
            ui::StyleType::Success,
        )
    }
}

/// Returns the number of records handed to `target`.
async fn sync(
    config: &AppConfig,
    fetch: &Arc<FetchClient>,
    source: &dyn SheetStore,
    target: &dyn SheetStore,
) -> Result<usize> {
    let instruments_sheet = config.sheet.instruments_datasheet.as_str();
    let rates_sheet = config.sheet.rates_datasheet.as_str();

    let instrument_rows = source
        .query_all(instruments_sheet)
        .await
        .context("Failed to query instruments")?;
    let rate_rows = source
        .query_all(rates_sheet)
        .await
        .context("Failed to query exchange rate targets")?;
    let instruments = store::parse_instruments(&instrument_rows);
    let targets = store::parse_rate_targets(&rate_rows);
    info!(
        instruments = instruments.len(),
        rate_targets = targets.len(),
        "Loaded records"
    );

    let cache = Arc::new(SnapshotCache::new(config.cache_ttl()));
    let resolver = FallbackResolver::standard(providers::chain_providers(config, fetch, &cache));
    let rate_set = RateSet::default();
    let reporting_tag = rate_set.reporting_tag.clone();
    let normalizer = ExchangeRateNormalizer::new(providers::rate_provider(config, fetch), rate_set);
    let orchestrator = BatchOrchestrator::new(resolver, normalizer, config.batch_options());

    let pb = ui::new_progress_bar(instruments.len() as u64, true);
    pb.set_message("Resolving prices...");
    let outcome = orchestrator.run(&instruments, &targets, &|| pb.inc(1)).await;
    pb.finish_and_clear();
    let outcome = outcome.context("Exchange rates unavailable, no records updated")?;

    println!("{}", outcome.display_as_table(&reporting_tag));

    let prices_written = update_in_chunks(
        target,
        instruments_sheet,
        &store::price_updates(&outcome.prices),
        UPDATE_CHUNK_SIZE,
    )
    .await
    .context("Failed to update instrument prices")?;
    info!(written = prices_written, "Updated instrument prices");

    let rates_written = update_in_chunks(
        target,
        rates_sheet,
        &store::rate_updates(&outcome.rates),
        UPDATE_CHUNK_SIZE,
    )
    .await
    .context("Failed to update exchange rates")?;
    info!(written = rates_written, "Updated exchange rates");

    Ok(prices_written + rates_written)
}
