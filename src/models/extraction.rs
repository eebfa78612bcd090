//! 扫描结果
//!
//! 工作文档保存为"文本片段 + 槽位"序列。替换时按槽位编号回填，
//! 等价于按占位符做子串替换，但不会被渲染结果或互为前缀的占位符（`p1` / `p10`）干扰。

use super::PlaceholderTable;

/// 工作文档中的一段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// 原样保留的文本
    Text(String),
    /// 公式所在的位置，值为占位符表中的槽位编号
    Slot(usize),
}

/// 一次扫描的完整输出
#[derive(Debug, Clone)]
pub struct Extraction {
    pub(crate) prefix: String,
    pub(crate) segments: Vec<Segment>,
    pub(crate) table: PlaceholderTable,
}

impl Extraction {
    /// 本次扫描使用的占位符前缀
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn table(&self) -> &PlaceholderTable {
        &self.table
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// 生成"公式被占位符替换后"的文本
    pub fn text(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Slot(index) => {
                    if let Some((placeholder, _)) = self.table.slot(*index) {
                        out.push_str(placeholder);
                    }
                }
            }
        }
        out
    }

    pub fn into_parts(self) -> (Vec<Segment>, PlaceholderTable) {
        (self.segments, self.table)
    }
}
