const DEFAULT_REST_PATH: &str = "rest/v1";
const DEFAULT_EXEC_FUNCTION: &str = "exec_sql";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the remote data API.
///
/// Built once at startup and passed by reference into every component
/// constructor. Nothing in the crate reads the environment after this.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub api_key: String,
    pub bearer_token: String,
    pub rest_path: String,
    pub exec_function: String,
    pub timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let api_key = std::env::var("SUPABASE_SERVICE_ROLE_KEY")
            .or_else(|_| std::env::var("DATA_API_KEY"))
            .map_err(|_| {
                anyhow::anyhow!(
                    "SUPABASE_SERVICE_ROLE_KEY or DATA_API_KEY environment variable required"
                )
            })
            .and_then(|key| {
                if key.trim().is_empty() {
                    anyhow::bail!("SUPABASE_SERVICE_ROLE_KEY cannot be empty");
                }
                Ok(key)
            })?;

        let config = Self {
            base_url: std::env::var("SUPABASE_URL")
                .or_else(|_| std::env::var("DATA_API_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("SUPABASE_URL or DATA_API_URL environment variable required")
                })
                .and_then(|url| validate_base_url(&url))?,
            bearer_token: std::env::var("DATA_API_BEARER")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| api_key.clone()),
            api_key,
            rest_path: std::env::var("DATA_API_REST_PATH")
                .ok()
                .map(|p| p.trim_matches('/').to_string())
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| DEFAULT_REST_PATH.to_string()),
            exec_function: std::env::var("EXEC_SQL_FUNCTION")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_EXEC_FUNCTION.to_string()),
            timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("REQUEST_TIMEOUT_SECS must be a number"))
                .and_then(|secs: u64| {
                    if !(1..=300).contains(&secs) {
                        anyhow::bail!("REQUEST_TIMEOUT_SECS must be between 1 and 300");
                    }
                    Ok(secs)
                })?,
        };

        // Keys stay out of the logs
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Data API base URL: {}", config.base_url);
        tracing::debug!("REST path: /{}", config.rest_path);
        tracing::debug!("Exec function: rpc/{}", config.exec_function);
        tracing::debug!("Request timeout: {}s", config.timeout_secs);

        Ok(config)
    }

    /// Builds a config pointing at `base_url` with default paths and timeout.
    pub fn for_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: api_key.clone(),
            api_key,
            rest_path: DEFAULT_REST_PATH.to_string(),
            exec_function: DEFAULT_EXEC_FUNCTION.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Root of the row-level API, e.g. `https://x.supabase.co/rest/v1`.
    pub fn rest_root(&self) -> String {
        format!("{}/{}", self.base_url, self.rest_path)
    }
}

fn validate_base_url(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        anyhow::bail!("SUPABASE_URL cannot be empty");
    }
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        anyhow::bail!("SUPABASE_URL must start with http:// or https://");
    }
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| anyhow::anyhow!("SUPABASE_URL is not a valid URL: {}", e))?;
    if parsed.host_str().is_none() {
        anyhow::bail!("SUPABASE_URL must include a host");
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_validation() {
        assert_eq!(
            validate_base_url("https://abc.supabase.co/").unwrap(),
            "https://abc.supabase.co"
        );
        assert!(validate_base_url("").is_err());
        assert!(validate_base_url("abc.supabase.co").is_err());
        assert!(validate_base_url("https://").is_err());
    }

    #[test]
    fn test_rest_root() {
        let config = Config::for_base_url("http://127.0.0.1:54321/", "key");
        assert_eq!(config.rest_root(), "http://127.0.0.1:54321/rest/v1");
        assert_eq!(config.bearer_token, "key");
        assert_eq!(config.exec_function, "exec_sql");
    }
}
