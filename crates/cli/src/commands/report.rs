//! Daily earnings report (admin).

use std::path::Path;

use chrono::NaiveDate;
use merysalud_client::PharmacyClient;

/// Print the report for `date`, or save the Excel export to `export`.
#[allow(clippy::print_stdout)]
pub async fn daily(
    client: &PharmacyClient,
    date: NaiveDate,
    export: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = export {
        let bytes = client.reports().export_daily_earnings(date).await?;
        std::fs::write(path, &bytes)?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "Report exported");
        return Ok(());
    }

    let report = client.reports().daily_earnings(date).await?;
    if let Some(message) = &report.message {
        println!("{message}");
    }
    println!("{}", serde_json::to_string_pretty(&report.reporte)?);
    Ok(())
}
