use std::env;
use std::str::FromStr;

use anyhow::Context;
use northstar_core::ExecutionLimits;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database connection URL. In-memory stores are used when unset.
    pub database_url: Option<String>,
    /// Bounds for cells and transformations
    pub limits: ExecutionLimits,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = ExecutionLimits::default();

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = var_or("PORT", 3000)?;
        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());

        let limits = ExecutionLimits {
            max_timeout: var_or("NORTHSTARAPI_MAX_TIMEOUT", defaults.max_timeout)?,
            max_code_size: var_or("NORTHSTARAPI_MAX_CODE_SIZE", defaults.max_code_size)?,
            max_arg_count: var_or("NORTHSTARAPI_MAX_ARG_COUNT", defaults.max_arg_count)?,
            max_memory: var_or("EXECUTION_MEMORY_MAX", defaults.max_memory)?,
            default_memory: var_or("EXECUTION_MEMORY_DEFAULT", defaults.default_memory)?,
        };

        if limits.default_memory > limits.max_memory {
            anyhow::bail!(
                "EXECUTION_MEMORY_DEFAULT ({}) exceeds EXECUTION_MEMORY_MAX ({})",
                limits.default_memory,
                limits.max_memory
            );
        }

        Ok(Self {
            host,
            port,
            database_url,
            limits,
        })
    }
}

fn var_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} has invalid value '{}'", name, value)),
        Err(_) => Ok(default),
    }
}
