use crate::error::{AppError, AppResult};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 配置文件路径所在的环境变量
pub const CONFIG_PATH_ENV: &str = "MATH_RENDER_CONFIG";

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 每个渲染缓存（行内 / 块级各一个）的容量
    pub cache_capacity: usize,
    /// 占位符的固定前缀，与源文本冲突时会追加随机字符
    pub placeholder_tag: String,
    /// 公式定界符
    pub sentinel: char,
    /// 单个公式的渲染超时（毫秒），不设置则不限时
    pub render_timeout_ms: Option<u64>,
    /// 慢速渲染工作线程的任务队列长度
    pub worker_queue_size: usize,
    /// 慢速渲染的块级公式是否包一层居中容器
    pub center_display: bool,
    // --- 批量处理 ---
    /// 同时处理的文档数量
    pub max_concurrent_documents: usize,
    /// 渲染结果输出目录
    pub output_dir: String,
    /// JSON 统计报告路径
    pub report_file: Option<String>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_capacity: 512,
            placeholder_tag: "mathholder".to_string(),
            sentinel: '$',
            render_timeout_ms: None,
            worker_queue_size: 64,
            center_display: true,
            max_concurrent_documents: 8,
            output_dir: "output".to_string(),
            report_file: None,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 从环境变量读取配置，未设置的项使用默认值
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件读取配置
    pub fn from_toml_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| AppError::toml_parse_failed(path.display().to_string(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// 加载配置：先读 `MATH_RENDER_CONFIG` 指向的 TOML 文件（如果有），再用环境变量覆盖
    pub fn load() -> AppResult<Self> {
        let base = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_toml_file(path)?,
            Err(_) => Self::default(),
        };
        let config = base.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 用环境变量覆盖已有配置
    pub fn with_env_overrides(self) -> Self {
        Self {
            cache_capacity: std::env::var("MATH_RENDER_CACHE_CAPACITY").ok().and_then(|v| v.parse().ok()).unwrap_or(self.cache_capacity),
            placeholder_tag: std::env::var("MATH_RENDER_PLACEHOLDER_TAG").unwrap_or(self.placeholder_tag),
            sentinel: std::env::var("MATH_RENDER_SENTINEL").ok().and_then(|v| v.parse().ok()).unwrap_or(self.sentinel),
            render_timeout_ms: std::env::var("MATH_RENDER_TIMEOUT_MS").ok().and_then(|v| v.parse().ok()).or(self.render_timeout_ms),
            worker_queue_size: std::env::var("MATH_RENDER_WORKER_QUEUE").ok().and_then(|v| v.parse().ok()).unwrap_or(self.worker_queue_size),
            center_display: std::env::var("MATH_RENDER_CENTER_DISPLAY").ok().and_then(|v| v.parse().ok()).unwrap_or(self.center_display),
            max_concurrent_documents: std::env::var("MAX_CONCURRENT_DOCUMENTS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.max_concurrent_documents),
            output_dir: std::env::var("MATH_RENDER_OUTPUT_DIR").unwrap_or(self.output_dir),
            report_file: std::env::var("MATH_RENDER_REPORT_FILE").ok().or(self.report_file),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(self.verbose_logging),
        }
    }

    /// 检查配置是否合法
    pub fn validate(&self) -> AppResult<()> {
        if self.cache_capacity == 0 {
            return Err(AppError::invalid_config(
                "cache_capacity",
                self.cache_capacity,
                "必须大于 0",
            ));
        }
        if self.placeholder_tag.is_empty() {
            return Err(AppError::invalid_config("placeholder_tag", "", "不能为空"));
        }
        if self.placeholder_tag.contains(self.sentinel) || self.sentinel == '\\' {
            return Err(AppError::invalid_config(
                "sentinel",
                self.sentinel,
                "不能是反斜杠，也不能出现在占位符前缀中",
            ));
        }
        if self.worker_queue_size == 0 {
            return Err(AppError::invalid_config(
                "worker_queue_size",
                self.worker_queue_size,
                "必须大于 0",
            ));
        }
        if self.max_concurrent_documents == 0 {
            return Err(AppError::invalid_config(
                "max_concurrent_documents",
                self.max_concurrent_documents,
                "必须大于 0",
            ));
        }
        Ok(())
    }

    /// 单个公式的渲染超时
    pub fn render_timeout(&self) -> Option<Duration> {
        self.render_timeout_ms.map(Duration::from_millis)
    }
}
