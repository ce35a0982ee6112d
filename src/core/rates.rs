use crate::core::normalizer::{parse_decimal, unparseable_reason};
use crate::domain::model::ExchangeSnapshot;
use crate::domain::ports::{ConfigProvider, RateSource};
use crate::utils::error::{NormalizerError, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;

/// Currencies requested from the feed on every invocation.
pub const RATE_SYMBOLS: [&str; 5] = ["USD", "CAD", "EUR", "GBP", "AUD"];

pub const DEFAULT_REFERENCE_CURRENCY: &str = "USD";

/// Multipliers into the reference currency:
/// `amount_in_reference = amount_in_currency * multiplier`.
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    reference: String,
    multipliers: HashMap<String, Decimal>,
}

impl RateTable {
    /// Derives multipliers as `reference_raw / currency_raw`. Currencies with a
    /// null or zero raw rate are left out; the reference currency itself must
    /// carry a nonzero rate or no table is built at all.
    pub fn from_snapshot(snapshot: &ExchangeSnapshot, reference: &str) -> Result<Self> {
        let reference_raw = snapshot
            .rates
            .get(reference)
            .copied()
            .flatten()
            .filter(|rate| !rate.is_zero())
            .ok_or_else(|| NormalizerError::MissingReferenceRate {
                currency: reference.to_string(),
            })?;

        let mut multipliers = HashMap::new();
        for (code, raw) in &snapshot.rates {
            let raw = match raw {
                Some(raw) if !raw.is_zero() => *raw,
                _ => {
                    tracing::debug!("Skipping {} - feed reported no usable rate", code);
                    continue;
                }
            };

            match reference_raw.checked_div(raw) {
                Some(multiplier) => {
                    multipliers.insert(code.clone(), multiplier);
                }
                None => {
                    tracing::warn!("Skipping {} - multiplier overflows ({} / {})", code, reference_raw, raw);
                }
            }
        }

        multipliers.insert(reference.to_string(), Decimal::ONE);

        Ok(Self {
            reference: reference.to_string(),
            multipliers,
        })
    }

    pub fn from_multipliers(
        reference: impl Into<String>,
        multipliers: HashMap<String, Decimal>,
    ) -> Self {
        Self {
            reference: reference.into(),
            multipliers,
        }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn multiplier(&self, currency: &str) -> Option<Decimal> {
        self.multipliers.get(currency).copied()
    }

    pub fn contains(&self, currency: &str) -> bool {
        self.multipliers.contains_key(currency)
    }

    pub fn len(&self) -> usize {
        self.multipliers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.multipliers.is_empty()
    }
}

/// Fetches a snapshot and turns it into the invocation's rate table.
pub async fn fetch_rates<R: RateSource + ?Sized>(source: &R, reference: &str) -> Result<RateTable> {
    let snapshot = source.fetch_snapshot().await?;
    let table = RateTable::from_snapshot(&snapshot, reference)?;

    let mut currencies: Vec<&str> = table.multipliers.keys().map(String::as_str).collect();
    currencies.sort_unstable();
    tracing::info!(
        "💱 Rate table ready: {} convertible currencies into {} ({})",
        table.len(),
        reference,
        currencies.join(",")
    );

    Ok(table)
}

/// HTTP client for an exchangeratesapi.io style `latest` endpoint.
pub struct RateFeedClient {
    client: Client,
    endpoint: String,
    access_key: String,
}

impl RateFeedClient {
    pub fn new(endpoint: impl Into<String>, access_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            access_key: access_key.into(),
        }
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.rate_timeout_seconds() {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: config.rate_endpoint().to_string(),
            access_key: config.rate_access_key().to_string(),
        })
    }
}

#[async_trait]
impl RateSource for RateFeedClient {
    async fn fetch_snapshot(&self) -> Result<ExchangeSnapshot> {
        let symbols = RATE_SYMBOLS.join(",");
        tracing::debug!("Requesting rates for {} from {}", symbols, self.endpoint);

        // 錯誤訊息不可帶出含 access_key 的 URL
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("access_key", self.access_key.as_str()),
                ("symbols", symbols.as_str()),
            ])
            .send()
            .await
            .map_err(|e| NormalizerError::RateFetch {
                message: format!("request to {} failed: {}", self.endpoint, e.without_url()),
            })?;

        let status = response.status();
        tracing::debug!("Rate feed response status: {}", status);
        if !status.is_success() {
            return Err(NormalizerError::RateFetch {
                message: format!("{} returned status {}", self.endpoint, status),
            });
        }

        let body = response.text().await.map_err(|e| NormalizerError::RateFetch {
            message: format!("failed to read response body: {}", e.without_url()),
        })?;

        parse_rate_body(&body)
    }
}

/// Parses the feed's JSON body. A missing `rates` member yields an empty
/// snapshot, which later fails on the reference-currency check.
pub(crate) fn parse_rate_body(body: &str) -> Result<ExchangeSnapshot> {
    let json: serde_json::Value = serde_json::from_str(body).map_err(|e| NormalizerError::RateFetch {
        message: format!("response is not valid JSON: {}", e),
    })?;

    let object = json.as_object().ok_or_else(|| NormalizerError::RateFetch {
        message: "response is not a JSON object".to_string(),
    })?;

    if object.get("success") == Some(&serde_json::Value::Bool(false)) {
        let detail = object
            .get("error")
            .map(|error| {
                error
                    .get("info")
                    .or_else(|| error.get("type"))
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| error.to_string())
            })
            .unwrap_or_else(|| "no error details".to_string());
        return Err(NormalizerError::RateFetch {
            message: format!("feed reported failure: {}", detail),
        });
    }

    let mut rates = HashMap::new();
    match object.get("rates") {
        None | Some(serde_json::Value::Null) => {
            tracing::warn!("Rate feed response has no rates");
        }
        Some(serde_json::Value::Object(entries)) => {
            for (code, value) in entries {
                rates.insert(code.clone(), parse_rate_value(code, value)?);
            }
        }
        Some(other) => {
            return Err(NormalizerError::RateFetch {
                message: format!("'rates' is not an object: {}", other),
            });
        }
    }

    Ok(ExchangeSnapshot::new(rates))
}

fn parse_rate_value(code: &str, value: &serde_json::Value) -> Result<Option<Decimal>> {
    let text = match value {
        serde_json::Value::Null => return Ok(None),
        // serde_json renders floats in shortest round-trip form, so "1.08" stays "1.08"
        serde_json::Value::Number(number) => number.to_string(),
        serde_json::Value::String(text) if text.trim().is_empty() => return Ok(None),
        serde_json::Value::String(text) => text.clone(),
        other => {
            return Err(NormalizerError::RateFetch {
                message: format!("rate for {} is not numeric: {}", code, other),
            })
        }
    };

    parse_decimal(&text)
        .map(Some)
        .ok_or_else(|| NormalizerError::RateFetch {
            message: format!("rate for {} is {}: {}", code, unparseable_reason(&text), text),
        })
}
