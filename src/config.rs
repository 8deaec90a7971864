use serde::Deserialize;

/// Runtime configuration, loaded once at startup and passed by reference.
///
/// No process-wide singletons: components receive the values they need
/// through their constructors.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub api_key: String,
    pub base_url: String,
    pub batch_size: i64,
    pub timeout_secs: u64,
    pub retry_attempts: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: database_url_from_env()?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            api_key: std::env::var("TASKMASTER_API_KEY")
                .map_err(|_| anyhow::anyhow!("TASKMASTER_API_KEY environment variable required"))
                .and_then(|key| {
                    if key.trim().is_empty() {
                        anyhow::bail!("TASKMASTER_API_KEY cannot be empty");
                    }
                    Ok(key)
                })?,
            base_url: std::env::var("TASKMASTER_BASE_URL")
                .unwrap_or_else(|_| "https://api.taskmaster.ai".to_string())
                .trim_end_matches('/')
                .to_string(),
            batch_size: std::env::var("TASKMASTER_BATCH_SIZE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("TASKMASTER_BATCH_SIZE must be a positive number"))?,
            timeout_secs: std::env::var("TASKMASTER_TIMEOUT")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("TASKMASTER_TIMEOUT must be a number of seconds"))?,
            retry_attempts: std::env::var("TASKMASTER_RETRY_ATTEMPTS")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("TASKMASTER_RETRY_ATTEMPTS must be a number"))?,
        };

        if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://") {
            anyhow::bail!("TASKMASTER_BASE_URL must start with http:// or https://");
        }
        if config.batch_size <= 0 {
            anyhow::bail!("TASKMASTER_BATCH_SIZE must be a positive number");
        }

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!(
            "Database URL: {}...",
            &config.database_url[..20.min(config.database_url.len())]
        );
        tracing::debug!("Taskmaster Base URL: {}", config.base_url);
        tracing::debug!("Batch size: {}", config.batch_size);

        Ok(config)
    }
}

/// Resolve the database URL from `DATABASE_URL`/`DB_URL`, or compose it from
/// the discrete `DB_HOST`/`DB_NAME`/`DB_USER`/`DB_PASSWORD`/`DB_PORT`
/// variables the scrape workflow exports.
fn database_url_from_env() -> anyhow::Result<String> {
    if let Ok(url) = std::env::var("DATABASE_URL").or_else(|_| std::env::var("DB_URL")) {
        if url.trim().is_empty() {
            anyhow::bail!("DATABASE_URL cannot be empty");
        }
        if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
            anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://");
        }
        return Ok(url);
    }

    let host = std::env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
    let name = std::env::var("DB_NAME").unwrap_or_else(|_| "restaurants".to_string());
    let user = std::env::var("DB_USER").unwrap_or_else(|_| "postgres".to_string());
    let password = std::env::var("DB_PASSWORD").unwrap_or_default();
    let db_port: u16 = std::env::var("DB_PORT")
        .unwrap_or_else(|_| "5432".to_string())
        .parse()
        .map_err(|_| anyhow::anyhow!("DB_PORT must be a valid port number"))?;

    if password.is_empty() {
        Ok(format!("postgres://{}@{}:{}/{}", user, host, db_port, name))
    } else {
        Ok(format!(
            "postgres://{}:{}@{}:{}/{}",
            user, password, host, db_port, name
        ))
    }
}
