//! 公式渲染上下文
//!
//! 封装"我正在渲染哪篇文档的第几个公式"这一信息

use std::fmt::Display;

/// 公式渲染上下文
#[derive(Debug, Clone)]
pub struct SpanCtx {
    /// 文档编号（每次渲染调用递增，仅用于日志）
    pub document_id: u64,

    /// 公式在占位符表中的槽位
    pub slot: usize,

    /// 占位符
    pub placeholder: String,
}

impl SpanCtx {
    pub fn new(document_id: u64, slot: usize, placeholder: impl Into<String>) -> Self {
        Self {
            document_id,
            slot,
            placeholder: placeholder.into(),
        }
    }
}

impl Display for SpanCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[文档 #{} 公式 #{} {}]",
            self.document_id, self.slot, self.placeholder
        )
    }
}
