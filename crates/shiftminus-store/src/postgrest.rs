//! Hosted PostgREST (Supabase) client for the shortfall and deadline tables.
//!
//! Row-level select/insert/patch/delete with query-string filters
//! (`gte.`, `lt.`, `eq.`, `in.(...)`) and the `apikey` + bearer headers.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use shiftminus_core::config::StoreConfig;
use shiftminus_core::error::{Result, ShiftError};
use shiftminus_core::traits::{DeadlineStore, ShortfallStore};
use shiftminus_core::types::{DeadlineRecord, NewShortfall, ShortfallRecord};

/// Shortfall row as the store returns it.
#[derive(Debug, Deserialize)]
struct ShortfallRow {
    id: i64,
    category: String,
    date_display: String,
    date_origin: NaiveDate,
    time_range: String,
    minus_count: i64,
}

impl ShortfallRow {
    fn into_record(self) -> Option<ShortfallRecord> {
        let count = u32::try_from(self.minus_count).ok().filter(|c| *c > 0);
        let Some(count) = count else {
            tracing::warn!("⚠️ Skipping shortfall {} with minus_count {}", self.id, self.minus_count);
            return None;
        };
        Some(ShortfallRecord::new(
            self.id,
            self.category,
            self.date_display,
            self.date_origin,
            self.time_range,
            count,
        ))
    }
}

#[derive(Debug, Deserialize)]
struct DeadlineRow {
    id: i64,
    deadline: NaiveDate,
    #[serde(default)]
    created_at: Option<String>,
}

impl From<DeadlineRow> for DeadlineRecord {
    fn from(row: DeadlineRow) -> Self {
        DeadlineRecord {
            id: row.id,
            deadline: row.deadline,
            created_at: row.created_at.as_deref().map(parse_timestamp).unwrap_or_default(),
        }
    }
}

/// `timestamptz` columns come back as RFC 3339, plain `timestamp` ones
/// without an offset. Unparseable values sort as the epoch.
fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.with_timezone(&Utc);
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .unwrap_or_default()
}

/// PostgREST `in.(...)` list with each value double-quoted.
fn in_filter(values: &[String]) -> String {
    let quoted: Vec<String> = values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

/// Client for both tables.
pub struct PostgrestStore {
    base_url: String,
    api_key: String,
    shortfall_table: String,
    deadline_table: String,
    client: reqwest::Client,
}

impl PostgrestStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(ShiftError::Config("Store URL not configured".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            shortfall_table: config.shortfall_table.clone(),
            deadline_table: config.deadline_table.clone(),
            client,
        })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    /// Turn a non-2xx response into a store error carrying the body.
    async fn ensure_success(response: Response, what: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ShiftError::Store(format!("{what} returned {status}: {body}")))
    }

    async fn select_shortfalls(&self, filters: &[(&str, String)]) -> Result<Vec<ShortfallRecord>> {
        let response = self
            .request(Method::GET, &self.shortfall_table)
            .query(&[("select", "*"), ("order", "date_origin")])
            .query(filters)
            .send()
            .await?;
        let response = Self::ensure_success(response, "shortfall select").await?;
        let rows: Vec<ShortfallRow> = response.json().await?;
        Ok(rows.into_iter().filter_map(ShortfallRow::into_record).collect())
    }
}

#[async_trait]
impl ShortfallStore for PostgrestStore {
    async fn insert_shortfall(&self, new: &NewShortfall) -> Result<()> {
        let response = self
            .request(Method::POST, &self.shortfall_table)
            .json(&[new])
            .send()
            .await?;
        if response.status() != StatusCode::CREATED {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ShiftError::Store(format!("shortfall insert returned {status}: {body}")));
        }
        tracing::debug!("➕ Shortfall registered: {} {}", new.category, new.date_display);
        Ok(())
    }

    async fn shortfalls_from(&self, from: NaiveDate) -> Result<Vec<ShortfallRecord>> {
        self.select_shortfalls(&[("date_origin", format!("gte.{from}"))]).await
    }

    async fn shortfalls_in(
        &self,
        categories: &[String],
        from: NaiveDate,
    ) -> Result<Vec<ShortfallRecord>> {
        if categories.is_empty() {
            return Ok(Vec::new());
        }
        self.select_shortfalls(&[
            ("category", in_filter(categories)),
            ("date_origin", format!("gte.{from}")),
        ])
        .await
    }

    async fn set_minus_count(&self, id: i64, minus_count: u32) -> Result<()> {
        let response = self
            .request(Method::PATCH, &self.shortfall_table)
            .query(&[("id", format!("eq.{id}"))])
            .json(&serde_json::json!({ "minus_count": minus_count }))
            .send()
            .await?;
        Self::ensure_success(response, "shortfall update").await?;
        Ok(())
    }

    async fn delete_shortfall(&self, id: i64) -> Result<()> {
        let response = self
            .request(Method::DELETE, &self.shortfall_table)
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await?;
        Self::ensure_success(response, "shortfall delete").await?;
        Ok(())
    }

    async fn delete_shortfalls_before(&self, before: NaiveDate) -> Result<()> {
        let response = self
            .request(Method::DELETE, &self.shortfall_table)
            .query(&[("date_origin", format!("lt.{before}"))])
            .send()
            .await?;
        Self::ensure_success(response, "shortfall cleanup").await?;
        Ok(())
    }
}

#[async_trait]
impl DeadlineStore for PostgrestStore {
    async fn deadlines(&self) -> Result<Vec<DeadlineRecord>> {
        let response = self
            .request(Method::GET, &self.deadline_table)
            .query(&[("select", "id,deadline,created_at"), ("order", "created_at.desc")])
            .send()
            .await?;
        let response = Self::ensure_success(response, "deadline select").await?;
        let rows: Vec<DeadlineRow> = response.json().await?;
        Ok(rows.into_iter().map(DeadlineRecord::from).collect())
    }

    async fn delete_deadline(&self, id: i64) -> Result<()> {
        let response = self
            .request(Method::DELETE, &self.deadline_table)
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await?;
        Self::ensure_success(response, "deadline delete").await?;
        Ok(())
    }

    async fn delete_all_deadlines(&self) -> Result<()> {
        // Unfiltered deletes are refused by the hosted store.
        let response = self
            .request(Method::DELETE, &self.deadline_table)
            .query(&[("id", "not.is.null")])
            .send()
            .await?;
        Self::ensure_success(response, "deadline clear").await?;
        Ok(())
    }

    async fn insert_deadline(&self, deadline: NaiveDate) -> Result<()> {
        let response = self
            .request(Method::POST, &self.deadline_table)
            .json(&serde_json::json!([{ "deadline": deadline }]))
            .send()
            .await?;
        if response.status() != StatusCode::CREATED {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ShiftError::Store(format!("deadline insert returned {status}: {body}")));
        }
        Ok(())
    }
}
