use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 契约校验错误
    #[error("契约错误: {0}")]
    Schema(#[from] SchemaError),
    /// 文献检索错误
    #[error("检索错误: {0}")]
    Search(#[from] SearchError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 本地兜底生成的结果未通过校验，属于不变量被破坏
    #[error("本地生成结果未通过契约校验 ({task}): {source}")]
    FallbackContract {
        task: &'static str,
        #[source]
        source: SchemaError,
    },
}

/// 契约（JSON Schema）相关错误
#[derive(Debug, Error)]
pub enum SchemaError {
    /// 读取契约文件失败
    #[error("无法加载契约 {name}: {source}")]
    LoadFailed {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 契约本身不是合法的 JSON Schema
    #[error("契约 {name} 无效: {message}")]
    InvalidSchema { name: String, message: String },
    /// 实例不符合契约
    #[error("实例不符合契约 {name}: {}", .errors.join("; "))]
    Violation { name: String, errors: Vec<String> },
    /// 期望数组，实际不是
    #[error("契约 {name} 期望 JSON 数组")]
    NotAnArray { name: String },
    /// 校验通过但无法转换为内部类型
    #[error("无法转换为 {name}: {source}")]
    Conversion {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 文献检索错误
#[derive(Debug, Error)]
pub enum SearchError {
    /// 网络请求失败
    #[error("检索请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 非成功状态码
    #[error("检索接口返回错误状态 ({endpoint}): HTTP {status}")]
    BadStatus { endpoint: String, status: u16 },
    /// Atom 解析失败
    #[error("Atom 解析失败: {source}")]
    ParseFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// 未配置凭据
    #[error("未配置 LLM 凭据")]
    NotConfigured,
    /// 构建请求失败
    #[error("构建 LLM 请求失败: {source}")]
    RequestBuildFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {source}")]
    ApiCallFailed {
        model: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 调用超时
    #[error("LLM API调用超时 (模型: {model}, {secs}秒)")]
    Timeout { model: String, secs: u64 },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件读取失败
    #[error("无法读取配置文件 {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 配置文件解析失败
    #[error("配置文件解析失败 {path}: {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// HTTP 客户端构建失败
    #[error("HTTP 客户端构建失败: {0}")]
    HttpClient(String),
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 创建目录失败
    #[error("创建目录失败 ({path}): {source}")]
    CreateDirFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建检索请求失败错误
    pub fn search_request_failed(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Search(SearchError::RequestFailed {
            endpoint: endpoint.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建兜底契约错误
    pub fn fallback_contract(task: &'static str, source: SchemaError) -> Self {
        AppError::FallbackContract { task, source }
    }
}

impl LlmError {
    /// 创建LLM API调用错误
    pub fn api_failed(
        model: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        LlmError::ApiCallFailed {
            model: model.into(),
            source: Box::new(source),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
