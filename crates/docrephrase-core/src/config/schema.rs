//! 按领域分组的配置结构体
//!
//! 从环境变量加载，统一 fallback 逻辑。

use super::env_keys::{corpus, env as env_vars, index, observability as obv_keys};
use super::loader::{env_bool, env_optional, env_or};
use std::path::PathBuf;

/// Default CPU-only PyTorch wheel index.
pub const DEFAULT_TORCH_INDEX_URL: &str = "https://download.pytorch.org/whl/cpu";
pub const DEFAULT_PYTHON_VERSION: &str = "3.10";
pub const DEFAULT_VENV_DIR: &str = "venv";

/// 环境构建配置（CLI 参数可覆盖）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    pub venv_dir: PathBuf,
    pub python_version: String,
    pub torch_index_url: String,
    pub extra_index_url: Option<String>,
    /// NLTK download_dir；None 表示 nltk 默认位置
    pub nltk_data: Option<PathBuf>,
    /// 原始 platform 覆盖值，由 `Platform::from_str` 解析
    pub platform_override: Option<String>,
}

impl BootstrapConfig {
    /// 从环境变量加载，空值使用默认（会自动加载 .env）
    pub fn from_env() -> Self {
        super::loader::load_dotenv();
        Self {
            venv_dir: PathBuf::from(env_or(env_vars::DOCREPHRASE_VENV_DIR, &[], || {
                DEFAULT_VENV_DIR.to_string()
            })),
            python_version: env_or(env_vars::DOCREPHRASE_PYTHON_VERSION, &[], || {
                DEFAULT_PYTHON_VERSION.to_string()
            }),
            torch_index_url: env_or(index::DOCREPHRASE_TORCH_INDEX_URL, &[], || {
                DEFAULT_TORCH_INDEX_URL.to_string()
            }),
            extra_index_url: env_optional(
                index::DOCREPHRASE_EXTRA_INDEX_URL,
                index::EXTRA_INDEX_URL_ALIASES,
            ),
            nltk_data: env_optional(corpus::DOCREPHRASE_NLTK_DATA, corpus::NLTK_DATA_ALIASES)
                .map(PathBuf::from),
            platform_override: env_optional(env_vars::DOCREPHRASE_PLATFORM, &[]),
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            venv_dir: PathBuf::from(DEFAULT_VENV_DIR),
            python_version: DEFAULT_PYTHON_VERSION.to_string(),
            torch_index_url: DEFAULT_TORCH_INDEX_URL.to_string(),
            extra_index_url: None,
            nltk_data: None,
            platform_override: None,
        }
    }
}

/// 可观测性配置：quiet、log_level、log_json、audit_log
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
    pub audit_log: Option<String>,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| {
            super::loader::load_dotenv();
            Self {
                quiet: env_bool(obv_keys::DOCREPHRASE_QUIET, &[], false),
                log_level: env_or(
                    obv_keys::DOCREPHRASE_LOG_LEVEL,
                    obv_keys::LOG_LEVEL_ALIASES,
                    || "docrephrase=info".to_string(),
                ),
                log_json: env_bool(obv_keys::DOCREPHRASE_LOG_JSON, &[], false),
                audit_log: env_optional(obv_keys::DOCREPHRASE_AUDIT_LOG, &[]),
            }
        })
    }
}
