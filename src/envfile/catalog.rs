//! Known-key catalog.
//!
//! The static table below mirrors the platform's documented configuration
//! surface: which keys exist, which category tab they render under, whether
//! their value is masked, and the default shown by the reset control.
//! Keys outside the table are still editable — they land in [`Category::Other`]
//! with sensitivity inferred from the name.

use serde::{Deserialize, Serialize};

/// Category tab a variable renders under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    LlmKey,
    DataSourceKey,
    SocialKey,
    Database,
    System,
    Other,
}

impl Category {
    /// Display label for the category tab.
    pub fn label(&self) -> &'static str {
        match self {
            Category::LlmKey => "LLM API Keys",
            Category::DataSourceKey => "Data Source Keys",
            Category::SocialKey => "Social Media Keys",
            Category::Database => "Database",
            Category::System => "System",
            Category::Other => "Other",
        }
    }

    /// All categories in tab order.
    pub fn all() -> &'static [Category] {
        &[
            Category::LlmKey,
            Category::DataSourceKey,
            Category::SocialKey,
            Category::Database,
            Category::System,
            Category::Other,
        ]
    }
}

/// Static description of a known configuration key.
#[derive(Debug, Clone, Copy)]
pub struct KeySpec {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: Category,
    pub sensitive: bool,
    pub default: Option<&'static str>,
}

const fn key(
    key: &'static str,
    name: &'static str,
    description: &'static str,
    category: Category,
    sensitive: bool,
    default: Option<&'static str>,
) -> KeySpec {
    KeySpec {
        key,
        name,
        description,
        category,
        sensitive,
        default,
    }
}

/// Known keys in display order (categories grouped, catalog order within).
pub const KNOWN_KEYS: &[KeySpec] = &[
    // ── LLM API keys ──────────────────────────────────────────────────
    key("DASHSCOPE_API_KEY", "DashScope API Key", "Alibaba DashScope models", Category::LlmKey, true, None),
    key("OPENAI_API_KEY", "OpenAI API Key", "OpenAI GPT models", Category::LlmKey, true, None),
    key("GOOGLE_API_KEY", "Google AI API Key", "Google Gemini models", Category::LlmKey, true, None),
    key("ANTHROPIC_API_KEY", "Anthropic API Key", "Anthropic Claude models", Category::LlmKey, true, None),
    key("DEEPSEEK_API_KEY", "DeepSeek API Key", "DeepSeek models", Category::LlmKey, true, None),
    key("SILICONFLOW_API_KEY", "SiliconFlow API Key", "SiliconFlow hosted models", Category::LlmKey, true, None),
    key("QIANFAN_API_KEY", "Qianfan API Key", "Baidu Qianfan models", Category::LlmKey, true, None),
    // ── Data source keys ──────────────────────────────────────────────
    key("FINNHUB_API_KEY", "Finnhub API Key", "US market data", Category::DataSourceKey, true, None),
    key("TUSHARE_TOKEN", "Tushare Token", "CN/HK market data", Category::DataSourceKey, true, None),
    // ── Social media keys ─────────────────────────────────────────────
    key("REDDIT_CLIENT_ID", "Reddit Client ID", "Reddit API client id", Category::SocialKey, true, None),
    key("REDDIT_CLIENT_SECRET", "Reddit Client Secret", "Reddit API client secret", Category::SocialKey, true, None),
    // ── Database ──────────────────────────────────────────────────────
    key("MONGODB_HOST", "MongoDB Host", "MongoDB host address", Category::Database, false, Some("localhost")),
    key("MONGODB_PORT", "MongoDB Port", "MongoDB port (1-65535)", Category::Database, false, Some("27017")),
    key("MONGODB_USERNAME", "MongoDB Username", "MongoDB user", Category::Database, true, None),
    key("MONGODB_PASSWORD", "MongoDB Password", "MongoDB password", Category::Database, true, None),
    key("MONGODB_DATABASE", "MongoDB Database", "MongoDB database name", Category::Database, false, Some("analysis")),
    key("MONGODB_AUTH_SOURCE", "MongoDB Auth Source", "MongoDB authentication database", Category::Database, false, Some("admin")),
    key("REDIS_URL", "Redis URL", "Redis connection URL", Category::Database, true, None),
    // ── System ────────────────────────────────────────────────────────
    key("LOG_LEVEL", "Log Level", "DEBUG, INFO, WARNING, ERROR or CRITICAL", Category::System, false, Some("INFO")),
    key("LOG_DIR", "Log Directory", "Log file directory", Category::System, false, Some("./logs")),
    key("RESULTS_DIR", "Results Directory", "Analysis results directory", Category::System, false, Some("./results")),
    key("OPENAI_ENABLED", "Enable OpenAI", "Enable OpenAI models (true/false)", Category::System, false, Some("false")),
    key("DOCKER_CONTAINER", "Docker Container Mode", "Running inside a container (true/false)", Category::System, false, Some("false")),
];

/// Look up a known key.
pub fn lookup(name: &str) -> Option<&'static KeySpec> {
    KNOWN_KEYS.iter().find(|s| s.key == name)
}

/// Category for any key — known keys from the table, everything else `Other`.
pub fn category_of(name: &str) -> Category {
    lookup(name).map_or(Category::Other, |s| s.category)
}

/// Whether a key's value should be masked. Unknown keys are treated as
/// sensitive when the name suggests a credential.
pub fn is_sensitive(name: &str) -> bool {
    match lookup(name) {
        Some(spec) => spec.sensitive,
        None => ["KEY", "SECRET", "PASSWORD", "TOKEN"]
            .iter()
            .any(|w| name.contains(w)),
    }
}

/// Mask a sensitive value for display — fixed-width bullets plus the last
/// four characters when the value is long enough to keep them.
pub fn mask(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    let chars: Vec<char> = value.chars().collect();
    if chars.len() >= 8 {
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("••••••••{tail}")
    } else {
        "••••••••".to_string()
    }
}
