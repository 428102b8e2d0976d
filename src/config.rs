use serde::Deserialize;
use std::path::Path;

use crate::error::{AppError, AppResult, ConfigError};

/// 默认配置文件名（位于工作目录）
pub const DEFAULT_CONFIG_FILE: &str = "lit_review.toml";

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- LLM 配置 ---
    /// 为空时不走远程生成，直接使用本地兜底
    pub llm_api_key: Option<String>,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_temperature: f32,
    pub llm_timeout_secs: u64,
    // --- 文献检索配置 ---
    pub search_api_url: String,
    /// 每次检索的条数
    pub search_page_size: usize,
    pub search_timeout_secs: u64,
    /// 契约目录，未设置时使用内置契约
    pub contracts_dir: Option<String>,
    /// 综述导出目录
    pub output_dir: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: None,
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            llm_temperature: 0.2,
            llm_timeout_secs: 30,
            search_api_url: "http://export.arxiv.org/api/query".to_string(),
            search_page_size: 20,
            search_timeout_secs: 10,
            contracts_dir: None,
            output_dir: "output".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 加载配置：默认值 → 配置文件（可选）→ 环境变量
    pub fn load() -> AppResult<Self> {
        let path = std::env::var("LIT_REVIEW_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let base = if Path::new(&path).exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        Ok(base.with_env_overrides())
    }

    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件读取配置，缺省字段使用默认值
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| {
            AppError::from(ConfigError::TomlParseFailed {
                path: path.to_string(),
                source,
            })
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn with_env_overrides(self) -> Self {
        Self {
            llm_api_key: std::env::var("OPENAI_API_KEY").ok().or(self.llm_api_key),
            llm_api_base_url: std::env::var("BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: std::env::var("OPENAI_MODEL").unwrap_or(self.llm_model_name),
            llm_temperature: std::env::var("LLM_TEMPERATURE").ok().and_then(|v| v.parse().ok()).unwrap_or(self.llm_temperature),
            llm_timeout_secs: std::env::var("LLM_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.llm_timeout_secs),
            search_api_url: std::env::var("SEARCH_API_URL").unwrap_or(self.search_api_url),
            search_page_size: std::env::var("SEARCH_PAGE_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(self.search_page_size),
            search_timeout_secs: std::env::var("SEARCH_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.search_timeout_secs),
            contracts_dir: std::env::var("CONTRACTS_DIR").ok().or(self.contracts_dir),
            output_dir: std::env::var("OUTPUT_DIR").unwrap_or(self.output_dir),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(self.verbose_logging),
        }
    }

    /// 是否配置了远程生成后端（凭据非空）
    pub fn is_llm_configured(&self) -> bool {
        self.llm_api_key
            .as_deref()
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false)
    }
}
