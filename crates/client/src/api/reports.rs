//! Daily earnings reports (admin).

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::instrument;

use crate::error::ApiError;
use crate::transport::{ApiRequest, Transport};

/// Earnings summary for one day, counting delivered orders only.
#[derive(Debug, Clone, Deserialize)]
pub struct DailyEarnings {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    /// Report body as computed by the backend.
    #[serde(default)]
    pub reporte: Map<String, Value>,
}

/// Report endpoints.
#[derive(Clone)]
pub struct ReportsApi {
    transport: Transport,
}

impl ReportsApi {
    #[must_use]
    pub const fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// Earnings for `date`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn daily_earnings(&self, date: NaiveDate) -> Result<DailyEarnings, ApiError> {
        self.transport
            .fetch(
                ApiRequest::get("/reportes/diario-ganancias")
                    .query("fecha", date.format("%Y-%m-%d"))
                    .authenticated(),
            )
            .await
    }

    /// Earnings for `date` as an Excel workbook.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn export_daily_earnings(&self, date: NaiveDate) -> Result<Vec<u8>, ApiError> {
        self.transport
            .download(
                ApiRequest::get("/reportes/exportar-diario-ganancias")
                    .query("fecha", date.format("%Y-%m-%d"))
                    .authenticated(),
            )
            .await
    }
}
