//! 环境变量 key 常量与别名定义
//!
//! 主变量统一使用 `DOCREPHRASE_*`，兼容 pip / nltk 自身的变量名。

/// 隔离环境与解释器
pub mod env {
    pub const DOCREPHRASE_VENV_DIR: &str = "DOCREPHRASE_VENV_DIR";

    pub const DOCREPHRASE_PYTHON_VERSION: &str = "DOCREPHRASE_PYTHON_VERSION";

    /// Overrides `OSTYPE` / compile-time platform detection: darwin, linux, other.
    pub const DOCREPHRASE_PLATFORM: &str = "DOCREPHRASE_PLATFORM";

    /// Shell-provided OS identifier (`darwin23`, `linux-gnu`, ...). Usually not exported.
    pub const OSTYPE: &str = "OSTYPE";
}

/// 包索引
pub mod index {
    pub const DOCREPHRASE_TORCH_INDEX_URL: &str = "DOCREPHRASE_TORCH_INDEX_URL";

    pub const DOCREPHRASE_EXTRA_INDEX_URL: &str = "DOCREPHRASE_EXTRA_INDEX_URL";
    pub const EXTRA_INDEX_URL_ALIASES: &[&str] = &["PIP_EXTRA_INDEX_URL"];
}

/// 语料下载
pub mod corpus {
    pub const DOCREPHRASE_NLTK_DATA: &str = "DOCREPHRASE_NLTK_DATA";
    pub const NLTK_DATA_ALIASES: &[&str] = &["NLTK_DATA"];
}

/// 可观测性与日志
pub mod observability {
    pub const DOCREPHRASE_QUIET: &str = "DOCREPHRASE_QUIET";

    pub const DOCREPHRASE_LOG_LEVEL: &str = "DOCREPHRASE_LOG_LEVEL";
    pub const LOG_LEVEL_ALIASES: &[&str] = &["RUST_LOG"];

    pub const DOCREPHRASE_LOG_JSON: &str = "DOCREPHRASE_LOG_JSON";

    pub const DOCREPHRASE_AUDIT_LOG: &str = "DOCREPHRASE_AUDIT_LOG";
}
