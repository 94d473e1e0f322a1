use anyhow::{bail, Context, Result};
use consumption_service::{
    entities, model::local_now, observability, statistics, ConsumptionModelBuilder,
};
use std::env;
use water_client::domain::{parse_reading_date, AccountData};

/// Builds one model from an account JSON document and prints the statistics
/// imports and entity states it produces.
fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: build_model_once <account_json_path> [YYYY-MM-DD]");
    }
    let file_path = &args[1];
    let today = match args.get(2) {
        Some(raw) => Some(parse_reading_date(raw).with_context(|| format!("invalid date '{raw}'"))?),
        None => None,
    };

    let contents = std::fs::read_to_string(file_path).with_context(|| format!("failed to read {file_path}"))?;
    let account: AccountData = serde_json::from_str(&contents).context("failed to parse account document")?;

    let entry_id = "once";
    let model = ConsumptionModelBuilder::new(local_now()).build(&account, today);
    let ids = statistics::SeriesIds::with_prefix(&format!("sensor.{entry_id}"));

    let output = serde_json::json!({
        "statistics": statistics::imports(&model, &ids),
        "entities": entities::entity_states(&model, entry_id),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
