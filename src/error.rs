use std::fmt;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 配置错误
    Config(ConfigError),
    /// 渲染工作线程错误
    Worker(WorkerError),
    /// 文件操作错误
    File(FileError),
    /// 公式渲染错误
    Render(RenderError),
    /// 其他错误（用于包装第三方库错误）
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(e) => write!(f, "配置错误: {}", e),
            AppError::Worker(e) => write!(f, "工作线程错误: {}", e),
            AppError::File(e) => write!(f, "文件错误: {}", e),
            AppError::Render(e) => write!(f, "渲染错误: {}", e),
            AppError::Other(msg) => write!(f, "错误: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(e) => Some(e),
            AppError::Worker(e) => Some(e),
            AppError::File(e) => Some(e),
            AppError::Render(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// 公式渲染错误
///
/// 快速渲染器失败时返回，慢速渲染器的错误载荷也使用此类型。
/// 渲染错误不会传递给调用方，只会被转换成错误标记写入文档。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// 渲染器不支持该表达式（语法错误或不支持的命令）
    #[error("{message}")]
    Unsupported { message: String },
    /// 渲染引擎内部失败
    #[error("渲染引擎失败: {message}")]
    Engine { message: String },
    /// 工作线程已退出，无法接收任务
    #[error("渲染工作线程不可用")]
    WorkerUnavailable,
}

impl RenderError {
    pub fn unsupported(message: impl Into<String>) -> Self {
        RenderError::Unsupported {
            message: message.into(),
        }
    }

    pub fn engine(message: impl Into<String>) -> Self {
        RenderError::Engine {
            message: message.into(),
        }
    }
}

/// 渲染工作线程错误
#[derive(Debug)]
pub enum WorkerError {
    /// 启动工作线程失败
    SpawnFailed {
        name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerError::SpawnFailed { name, source } => {
                write!(f, "无法启动工作线程 {}: {}", name, source)
            }
        }
    }
}

impl std::error::Error for WorkerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WorkerError::SpawnFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// 文件操作错误
#[derive(Debug)]
pub enum FileError {
    /// 读取文件失败
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 解析失败
    TomlParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// JSON 序列化失败
    JsonFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::ReadFailed { path, source } => {
                write!(f, "读取文件失败 ({}): {}", path, source)
            }
            FileError::TomlParseFailed { path, source } => {
                write!(f, "TOML解析失败 ({}): {}", path, source)
            }
            FileError::JsonFailed { source } => write!(f, "JSON序列化失败: {}", source),
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileError::ReadFailed { source, .. }
            | FileError::TomlParseFailed { source, .. }
            | FileError::JsonFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 配置值不合法
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue {
                field,
                value,
                reason,
            } => {
                write!(f, "配置项 {} 的值 '{}' 不合法: {}", field, value, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ========== 从常见错误类型转换 ==========

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        AppError::Render(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::File(FileError::JsonFailed {
            source: Box::new(err),
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::File(FileError::TomlParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建 TOML 解析错误（带路径）
    pub fn toml_parse_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::TomlParseFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建工作线程启动错误
    pub fn worker_spawn_failed(
        name: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Worker(WorkerError::SpawnFailed {
            name: name.into(),
            source: Box::new(source),
        })
    }

    /// 创建配置值错误
    pub fn invalid_config(
        field: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        AppError::Config(ConfigError::InvalidValue {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error_display() {
        let err = RenderError::unsupported("Unknown command \\foo");
        assert_eq!(err.to_string(), "Unknown command \\foo");

        let err = RenderError::WorkerUnavailable;
        assert_eq!(err.to_string(), "渲染工作线程不可用");
    }

    #[test]
    fn test_app_error_source_chain() {
        let err: AppError = RenderError::engine("boom").into();
        assert!(err.to_string().contains("boom"));
        assert!(std::error::Error::source(&err).is_some());

        let err = AppError::invalid_config("cache_capacity", 0, "必须大于 0");
        assert!(err.to_string().contains("cache_capacity"));
    }
}
