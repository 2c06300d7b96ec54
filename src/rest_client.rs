use crate::config::Config;
use crate::errors::AppError;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};
use std::time::Duration;

/// Status and raw body of one HTTP exchange.
///
/// Every response is returned as-is; interpreting the status is the job of
/// [`crate::classify`].
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

/// Client for the row-level data API and its RPC execution endpoint.
#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    rest_root: String,
    exec_function: String,
}

impl RestClient {
    /// Creates a new `RestClient`.
    ///
    /// The API key and bearer credential are attached as default headers so
    /// each request carries them without the callers seeing the secret.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        let api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| AppError::Config("API key contains invalid header characters".into()))?;
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", config.bearer_token))
            .map_err(|_| {
                AppError::Config("Bearer token contains invalid header characters".into())
            })?;
        bearer.set_sensitive(true);
        headers.insert("apikey", api_key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            rest_root: config.rest_root(),
            exec_function: config.exec_function.clone(),
        })
    }

    /// Name of the SQL execution function behind `rpc/`.
    pub fn exec_function(&self) -> &str {
        &self.exec_function
    }

    /// Reads at most one row of `table`, projecting only `columns`.
    pub async fn select_one(&self, table: &str, columns: &str) -> Result<ApiResponse, AppError> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/{}", self.rest_root, table),
            &[("select", columns), ("limit", "1")],
        )
        .map_err(|e| AppError::Config(format!("Failed to build URL for {}: {}", table, e)))?;

        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        Self::into_api_response(response).await
    }

    /// Inserts one row into `table`.
    pub async fn insert(&self, table: &str, row: &Value) -> Result<ApiResponse, AppError> {
        let url = format!("{}/{}", self.rest_root, table);
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;
        Self::into_api_response(response).await
    }

    /// Sends one SQL statement to the execution RPC.
    pub async fn rpc_exec(&self, sql: &str) -> Result<ApiResponse, AppError> {
        let url = format!("{}/rpc/{}", self.rest_root, self.exec_function);
        tracing::debug!("POST {} ({} bytes of SQL)", url, sql.len());

        let response = self
            .client
            .post(&url)
            .json(&json!({ "sql": sql }))
            .send()
            .await?;
        Self::into_api_response(response).await
    }

    async fn into_api_response(response: reqwest::Response) -> Result<ApiResponse, AppError> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(ApiResponse { status, body })
    }
}
