//! Read-only store queries: cache hit/miss for one payload, and recent records.

use crate::core::error::QrForgeError;
use crate::core::records::RecordStore;
use crate::plugins::RunContext;
use colored::Colorize;

#[derive(clap::Args, Debug)]
pub struct LookupCli {
    /// Payload to look up (exact match after trimming).
    pub value: String,
}

#[derive(clap::Args, Debug)]
pub struct RecordsCli {
    /// Maximum number of records to show.
    #[clap(long, default_value_t = 20)]
    pub limit: usize,
}

pub fn run_lookup_cli(ctx: &RunContext, cli: LookupCli) -> Result<(), QrForgeError> {
    let data = cli.value.trim();
    if data.is_empty() {
        return Err(QrForgeError::InvalidInput("data can not be empty".into()));
    }
    let found = ctx.store.find_by_data(data)?;

    let status = if found.is_some() { "hit" } else { "miss" };
    let payload = serde_json::json!({ "data": data, "record": found });
    ctx.emit("lookup", status, payload, || match &found {
        Some(record) => {
            println!("{} {}", "Cache HIT:".bright_green(), record.data);
            println!("  id:       {}", record.id);
            println!("  kind:     {}", record.kind);
            println!("  artifact: {}", record.artifact_path);
            println!("  created:  {}", record.created_at);
        }
        None => println!("{} {}", "Cache MISS for:".yellow(), data),
    });
    Ok(())
}

pub fn run_records_cli(ctx: &RunContext, cli: RecordsCli) -> Result<(), QrForgeError> {
    let records = ctx.store.list_recent(cli.limit)?;

    let payload = serde_json::json!({ "count": records.len(), "records": records });
    ctx.emit("records", "ok", payload, || {
        if records.is_empty() {
            println!("No records yet.");
            return;
        }
        for r in &records {
            println!(
                "{:>5}  {:<9} {}  {}",
                r.id,
                r.kind,
                r.artifact_path.bright_black(),
                r.data
            );
        }
    });
    Ok(())
}
