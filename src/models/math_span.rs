use std::fmt::Display;

/// 一个从文档中提取出来的公式
///
/// 提取后不再修改。`content` 中的转义定界符已经还原。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MathSpan {
    /// 是否为块级（居中）公式
    pub display: bool,
    /// 公式源码（不含定界符）
    pub content: String,
}

impl MathSpan {
    pub fn inline(content: impl Into<String>) -> Self {
        Self {
            display: false,
            content: content.into(),
        }
    }

    pub fn display(content: impl Into<String>) -> Self {
        Self {
            display: true,
            content: content.into(),
        }
    }

    /// 日志里使用的模式名称
    pub fn mode_label(&self) -> &'static str {
        if self.display {
            "display"
        } else {
            "inline"
        }
    }
}

impl Display for MathSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.mode_label(), self.content)
    }
}
