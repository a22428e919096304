use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    50
}
fn default_min_connections() -> u32 {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Lifetime of issued bearer tokens. Default: 7 days.
    #[serde(default = "default_token_ttl_days")]
    pub token_ttl_days: i64,
}

fn default_token_ttl_days() -> i64 {
    7
}

/// Settings for the remote text-generation service used to phrase
/// marksheet remarks. Any OpenAI-compatible `/chat/completions` endpoint works.
#[derive(Debug, Deserialize, Clone)]
pub struct RemarksConfig {
    /// When false, remarks always come from the grade-based fallback.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_remarks_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_remarks_model")]
    pub model: String,
    /// Hard upper bound for one remark request. Default: 10 seconds.
    #[serde(default = "default_remarks_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_remarks_temperature")]
    pub temperature: f32,
    #[serde(default = "default_remarks_max_tokens")]
    pub max_tokens: u32,
}

fn default_remarks_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_remarks_model() -> String {
    "meta-llama/llama-3.3-70b-instruct:free".into()
}
fn default_remarks_timeout_secs() -> u64 {
    10
}
fn default_remarks_temperature() -> f32 {
    0.6
}
fn default_remarks_max_tokens() -> u32 {
    60
}

impl Default for RemarksConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_remarks_base_url(),
            api_key: String::new(),
            model: default_remarks_model(),
            timeout_secs: default_remarks_timeout_secs(),
            temperature: default_remarks_temperature(),
            max_tokens: default_remarks_max_tokens(),
        }
    }
}

/// Optional super-admin account created on startup when absent.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct BootstrapConfig {
    pub super_admin_name: Option<String>,
    pub super_admin_email: Option<String>,
    pub super_admin_password: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub remarks: RemarksConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., SCHOOL__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("SCHOOL").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
