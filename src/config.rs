use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use validator::Validate;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 15;
const DEFAULT_STORE_PAGE_SIZE: u32 = 100;
const DEFAULT_RECORD_ID_PREFIX: &str = "rec";

/// Record store connection settings.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct StoreSettings {
    /// Base URL of the hosted table store, including the base/workspace path
    /// (e.g. "https://api.example.com/v0/appXXXX").
    #[validate(length(min = 1, message = "store base_url is required"))]
    pub base_url: String,

    /// Bearer token for the store API.
    #[validate(length(min = 1, message = "store api_key is required"))]
    pub api_key: String,

    /// Transport timeout for a single store call, in seconds.
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,

    /// Page size used when draining paginated scans.
    #[serde(default = "default_store_page_size")]
    pub page_size: u32,
}

/// Table names are an external contract; overridable for staging bases.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableNames {
    #[serde(default = "default_orders_table")]
    pub orders: String,
    #[serde(default = "default_employees_table")]
    pub employees: String,
    #[serde(default = "default_organizations_table")]
    pub organizations: String,
    #[serde(default = "default_meal_boxes_table")]
    pub meal_boxes: String,
    #[serde(default = "default_order_lines_table")]
    pub order_lines: String,
    #[serde(default = "default_dishes_table")]
    pub dishes: String,
    #[serde(default = "default_menu_table")]
    pub menu: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            orders: default_orders_table(),
            employees: default_employees_table(),
            organizations: default_organizations_table(),
            meal_boxes: default_meal_boxes_table(),
            order_lines: default_order_lines_table(),
            dishes: default_dishes_table(),
            menu: default_menu_table(),
        }
    }
}

/// Dish resolver tier configuration. Explicit so tests can inject fixed lists
/// instead of relying on ambient defaults.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolverSettings {
    /// Tables tried, in order, when the input turns out to be a linking
    /// record id rather than a dish id.
    #[serde(default = "default_lookup_tables")]
    pub lookup_tables: Vec<String>,

    /// Field names scanned, in priority order, for dish references inside a
    /// linking record.
    #[serde(default = "default_candidate_dish_fields")]
    pub candidate_dish_fields: Vec<String>,

    /// Prefix that store-assigned record ids carry.
    #[serde(default = "default_record_id_prefix")]
    pub record_id_prefix: String,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            lookup_tables: default_lookup_tables(),
            candidate_dish_fields: default_candidate_dish_fields(),
            record_id_prefix: default_record_id_prefix(),
        }
    }
}

/// Access-gate settings.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessSettings {
    /// When true the gate skips token comparison entirely. This is a
    /// deliberate configuration state for closed deployments and is logged
    /// loudly at startup; it is never the silent result of a missing secret.
    #[serde(default)]
    pub open: bool,
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Comma-separated list of allowed CORS origins; unset means permissive
    /// CORS in development and a startup error elsewhere.
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    #[validate]
    pub store: StoreSettings,

    #[serde(default)]
    pub tables: TableNames,

    #[serde(default)]
    pub resolver: ResolverSettings,

    #[serde(default)]
    pub access: AccessSettings,
}

impl AppConfig {
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_store_timeout() -> u64 {
    DEFAULT_STORE_TIMEOUT_SECS
}

fn default_store_page_size() -> u32 {
    DEFAULT_STORE_PAGE_SIZE
}

fn default_orders_table() -> String {
    "Orders".to_string()
}

fn default_employees_table() -> String {
    "Employees".to_string()
}

fn default_organizations_table() -> String {
    "Organizations".to_string()
}

fn default_meal_boxes_table() -> String {
    "Meal Boxes".to_string()
}

fn default_order_lines_table() -> String {
    "Order Lines".to_string()
}

fn default_dishes_table() -> String {
    "Dishes".to_string()
}

fn default_menu_table() -> String {
    "Menu".to_string()
}

fn default_lookup_tables() -> Vec<String> {
    vec![default_menu_table(), default_order_lines_table()]
}

fn default_candidate_dish_fields() -> Vec<String> {
    [
        "Dish",
        "DishID",
        "Item (Menu Item)",
        "Item",
        "Main",
        "Side",
        "Zapekanka",
        "Salad",
        "Soup",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_record_id_prefix() -> String {
    DEFAULT_RECORD_ID_PREFIX.to_string()
}

/// Load configuration from layered sources: config/default, an
/// environment-specific file, then `APP__`-prefixed environment variables
/// (e.g. `APP__STORE__API_KEY`).
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let run_env = env::var("APP_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let cfg = Config::builder()
        .add_source(File::with_name(&format!("{CONFIG_DIR}/default")).required(false))
        .add_source(File::with_name(&format!("{CONFIG_DIR}/{run_env}")).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = cfg.try_deserialize()?;
    app_config
        .validate()
        .map_err(|e| ConfigError::Message(format!("invalid configuration: {e}")))?;
    Ok(app_config)
}

/// Initialize the global tracing subscriber. `RUST_LOG` wins over the
/// configured level when set.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_directive = format!("obed_api={level},tower_http=debug");
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);
    let filter = EnvFilter::try_new(filter_directive)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
