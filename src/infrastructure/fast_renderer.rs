//! 快速渲染器 - 基础设施层
//!
//! 同步调用，延迟低，但只支持常见语法。失败由上层转交慢速渲染器。

use crate::error::RenderError;
use crate::infrastructure::latex;

/// 快速（同步）渲染能力
pub trait FastRenderer: Send + Sync {
    /// 渲染一个公式，无法处理时返回错误
    fn render(&self, source: &str, display: bool) -> Result<String, RenderError>;
}

/// 基于 pulldown-latex 的严格渲染器
#[derive(Debug, Clone, Copy, Default)]
pub struct LatexRenderer;

impl LatexRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl FastRenderer for LatexRenderer {
    fn render(&self, source: &str, display: bool) -> Result<String, RenderError> {
        latex::render_strict(source, display)
    }
}
