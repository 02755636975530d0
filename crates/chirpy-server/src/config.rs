use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;

/// Values shipped in `.env.example`. Starting with either of them is refused.
const PLACEHOLDER_JWT_SECRET: &str = "replace-with-output-of-openssl-rand-base64-64";
const PLACEHOLDER_POLKA_KEY: &str = "replace-with-polka-api-key";

/// Chirpy server settings. Every option can also come from the environment
/// (or a `.env` file).
#[derive(Debug, Parser)]
#[command(name = "chirpy", version, about = "Chirpy record service")]
pub struct Config {
    /// Discard any existing database before starting
    #[arg(long)]
    pub debug: bool,

    #[arg(long, env = "CHIRPY_DB_PATH", default_value = "database.json")]
    pub db_path: PathBuf,

    #[arg(long, env = "CHIRPY_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "CHIRPY_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Directory served under /app/
    #[arg(long, env = "CHIRPY_FILE_ROOT", default_value = ".")]
    pub file_root: PathBuf,

    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// API key expected on payment provider webhooks
    #[arg(long, env = "POLKA_KEY", hide_env_values = true)]
    pub polka_key: String,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.jwt_secret.is_empty() || self.jwt_secret == PLACEHOLDER_JWT_SECRET {
            bail!("JWT_SECRET is unset or still the .env.example placeholder");
        }
        if self.polka_key.is_empty() || self.polka_key == PLACEHOLDER_POLKA_KEY {
            bail!("POLKA_KEY is unset or still the .env.example placeholder");
        }
        Ok(())
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
