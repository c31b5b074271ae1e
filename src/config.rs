use crate::errors::{JournalError, JournalResult};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Rest,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub data_dir: PathBuf,
    pub store_backend: StoreBackend,
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub legacy_cache_path: Option<PathBuf>,
    pub seed_samples: bool,
    pub starting_capital: f64,
    pub image_max_bytes: usize,
    pub static_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> JournalResult<Self> {
        dotenvy::dotenv().ok();

        let server_port = env_var_or("SERVER_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| JournalError::Config(format!("SERVER_PORT: {e}")))?;

        let store_backend = parse_backend(&env_var_or("STORE_BACKEND", "sqlite"))?;

        let seed_samples = parse_bool("SEED_SAMPLES", &env_var_or("SEED_SAMPLES", "true"))?;

        let starting_capital = env_var_or("STARTING_CAPITAL", "100000")
            .parse::<f64>()
            .map_err(|e| JournalError::Config(format!("STARTING_CAPITAL: {e}")))?;

        let image_max_bytes = env_var_or("IMAGE_MAX_BYTES", "4194304")
            .parse::<usize>()
            .map_err(|e| JournalError::Config(format!("IMAGE_MAX_BYTES: {e}")))?;

        let supabase_url = std::env::var("SUPABASE_URL").ok().filter(|v| !v.is_empty());
        let supabase_anon_key = std::env::var("SUPABASE_ANON_KEY").ok().filter(|v| !v.is_empty());

        if store_backend == StoreBackend::Rest {
            if supabase_url.is_none() {
                return Err(JournalError::Config("missing env var: SUPABASE_URL".into()));
            }
            if supabase_anon_key.is_none() {
                return Err(JournalError::Config("missing env var: SUPABASE_ANON_KEY".into()));
            }
        }

        Ok(Self {
            server_port,
            data_dir: PathBuf::from(env_var_or("DATA_DIR", "data")),
            store_backend,
            supabase_url,
            supabase_anon_key,
            legacy_cache_path: std::env::var("LEGACY_CACHE_PATH").ok().map(PathBuf::from),
            seed_samples,
            starting_capital,
            image_max_bytes,
            static_dir: PathBuf::from(env_var_or("STATIC_DIR", "dashboard/dist")),
        })
    }
}

fn parse_backend(raw: &str) -> JournalResult<StoreBackend> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "sqlite" => Ok(StoreBackend::Sqlite),
        "rest" | "supabase" => Ok(StoreBackend::Rest),
        other => Err(JournalError::Config(format!("STORE_BACKEND: unknown backend {other}"))),
    }
}

fn parse_bool(key: &str, raw: &str) -> JournalResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(JournalError::Config(format!("{key}: not a boolean: {other}"))),
    }
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
