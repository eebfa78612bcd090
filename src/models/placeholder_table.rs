//! 占位符表
//!
//! 占位符 → 公式 的有序映射，遍历顺序与插入顺序（即公式在文档中出现的顺序）一致

use super::MathSpan;

/// 占位符表
///
/// 一次扫描生成一张表，渲染阶段只读。
/// 槽位编号就是条目的插入序号，与占位符后缀的数字一致。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderTable {
    entries: Vec<(String, MathSpan)>,
}

impl PlaceholderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个条目，返回其槽位编号
    pub(crate) fn push(&mut self, placeholder: String, span: MathSpan) -> usize {
        debug_assert!(
            self.get(&placeholder).is_none(),
            "placeholder {placeholder} inserted twice"
        );
        self.entries.push((placeholder, span));
        self.entries.len() - 1
    }

    /// 按占位符查找公式
    pub fn get(&self, placeholder: &str) -> Option<&MathSpan> {
        self.entries
            .iter()
            .find(|(key, _)| key == placeholder)
            .map(|(_, span)| span)
    }

    /// 按槽位查找
    pub fn slot(&self, index: usize) -> Option<(&str, &MathSpan)> {
        self.entries
            .get(index)
            .map(|(key, span)| (key.as_str(), span))
    }

    /// 按插入顺序遍历 (占位符, 公式)
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MathSpan)> {
        self.entries.iter().map(|(key, span)| (key.as_str(), span))
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
