//! 公式扫描服务 - 业务能力层
//!
//! 只负责"找出公式并换成占位符"，不渲染、不做 I/O
//!
//! ## 定界规则（以 `$` 为例）
//! - `$$ ... $$`：块级公式，内容为两对定界符之间的全部字符
//! - `$ ... $`：行内公式，内容从开头 `$` 后的第一个字符开始
//! - `\$`：转义，永远不作为定界符；公式内部的反斜杠会被去掉，正文原样保留
//! - 反斜杠后的其他字符原样保留，且该字符不参与定界（`\\` 是转义的反斜杠）
//! - 没有闭合的公式吃掉剩余全部文本，不报错
//! - 位于文本末尾的单个定界符原样保留，不产生公式

use rand::Rng;
use std::iter::Peekable;
use std::str::Chars;
use tracing::debug;

use crate::models::{Extraction, MathSpan, PlaceholderTable, Segment};

/// 公式扫描器
///
/// 一个扫描器只服务一篇文档，不能跨文档复用。
pub struct Scanner<'a> {
    source: &'a str,
    prefix: String,
    sentinel: char,
}

impl<'a> Scanner<'a> {
    /// 创建扫描器，使用线程随机数生成占位符前缀
    pub fn new(source: &'a str, tag: &str, sentinel: char) -> Self {
        Self::with_rng(source, tag, sentinel, &mut rand::thread_rng())
    }

    /// 使用指定随机数源创建扫描器
    pub fn with_rng<R: Rng + ?Sized>(
        source: &'a str,
        tag: &str,
        sentinel: char,
        rng: &mut R,
    ) -> Self {
        let prefix = generate_prefix(source, tag, rng);
        Self {
            source,
            prefix,
            sentinel,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// 扫描整篇文档
    ///
    /// # 返回
    /// 返回工作文档（文本片段 + 槽位）和占位符表
    pub fn extract(&self) -> Extraction {
        let sentinel = self.sentinel;
        let mut chars = self.source.chars().peekable();
        let mut segments = Vec::new();
        let mut table = PlaceholderTable::new();
        let mut text = String::new();

        while let Some(c) = chars.next() {
            if c == '\\' {
                text.push(c);
                if let Some(escaped) = chars.next() {
                    text.push(escaped);
                }
                continue;
            }

            // 末尾孤立的定界符不开启公式，按普通文本保留
            if c != sentinel || chars.peek().is_none() {
                text.push(c);
                continue;
            }

            let display = chars.next_if_eq(&sentinel).is_some();
            let content = read_span(&mut chars, sentinel, display);

            if !text.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut text)));
            }

            let placeholder = format!("{}{}", self.prefix, table.len());
            let span = MathSpan { display, content };
            debug!("提取公式 {}: {}", placeholder, span);

            let slot = table.push(placeholder, span);
            segments.push(Segment::Slot(slot));
        }

        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Extraction {
            prefix: self.prefix.clone(),
            segments,
            table,
        }
    }
}

/// 读取一个公式的内容，直到遇到未转义的闭合定界符或输入结束
fn read_span(chars: &mut Peekable<Chars<'_>>, sentinel: char, display: bool) -> String {
    let mut content = String::new();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) if next == sentinel => content.push(next),
                Some(next) => {
                    content.push('\\');
                    content.push(next);
                }
                None => content.push('\\'),
            }
            continue;
        }

        if c == sentinel && (!display || chars.next_if_eq(&sentinel).is_some()) {
            return content;
        }

        content.push(c);
    }

    // 未闭合：剩余文本全部算作公式内容
    content
}

/// 生成不出现在源文本中的占位符前缀
///
/// 从 `tag` 开始，只要它仍是源文本的子串，就追加一个随机字符
/// （先等概率选数字 / 小写 / 大写，再在该类中等概率选字符）。
pub fn generate_prefix<R: Rng + ?Sized>(source: &str, tag: &str, rng: &mut R) -> String {
    let mut prefix = tag.to_string();

    while source.contains(prefix.as_str()) {
        let c = match rng.gen_range(0..3) {
            0 => rng.gen_range(b'0'..=b'9'),
            1 => rng.gen_range(b'a'..=b'z'),
            _ => rng.gen_range(b'A'..=b'Z'),
        };
        prefix.push(char::from(c));
    }

    prefix
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const TAG: &str = "mathholder";

    fn scan(source: &str) -> Extraction {
        let mut rng = StdRng::seed_from_u64(7);
        Scanner::with_rng(source, TAG, '$', &mut rng).extract()
    }

    fn spans(extraction: &Extraction) -> Vec<MathSpan> {
        extraction.table().iter().map(|(_, span)| span.clone()).collect()
    }

    #[test]
    fn test_no_math_is_unchanged() {
        let source = "普通文本，没有公式。\nplain *markdown* here";
        let extraction = scan(source);
        assert!(extraction.table().is_empty());
        assert_eq!(extraction.text(), source);
    }

    #[test]
    fn test_inline_and_display_classification() {
        let extraction = scan("$$x^2$$");
        assert_eq!(spans(&extraction), vec![MathSpan::display("x^2")]);
        assert_eq!(extraction.text(), format!("{}0", TAG));

        let extraction = scan("$x^2$");
        assert_eq!(spans(&extraction), vec![MathSpan::inline("x^2")]);
    }

    #[test]
    fn test_escaped_sentinel_outside_math() {
        let extraction = scan(r"a \$ b $x$ c");
        assert_eq!(spans(&extraction), vec![MathSpan::inline("x")]);
        assert_eq!(extraction.text(), format!(r"a \$ b {}0 c", TAG));
    }

    #[test]
    fn test_escaped_sentinel_inside_math() {
        let extraction = scan(r"cost $\$5 + x$ end");
        assert_eq!(spans(&extraction), vec![MathSpan::inline("$5 + x")]);

        let extraction = scan(r"$$a \$ b$$");
        assert_eq!(spans(&extraction), vec![MathSpan::display("a $ b")]);
    }

    #[test]
    fn test_other_backslashes_are_kept() {
        let extraction = scan(r"$\frac{a}{b}$ and $a \\$ tail");
        assert_eq!(
            spans(&extraction),
            vec![MathSpan::inline(r"\frac{a}{b}"), MathSpan::inline(r"a \\")]
        );
        assert!(extraction.text().ends_with(" tail"));
    }

    #[test]
    fn test_single_sentinel_inside_display() {
        let extraction = scan("$$a $ b$$ after");
        assert_eq!(spans(&extraction), vec![MathSpan::display("a $ b")]);
        assert_eq!(extraction.text(), format!("{}0 after", TAG));
    }

    #[test]
    fn test_unterminated_span_takes_rest() {
        let extraction = scan("before $x + y and more");
        assert_eq!(spans(&extraction), vec![MathSpan::inline("x + y and more")]);
        assert_eq!(extraction.text(), format!("before {}0", TAG));

        let extraction = scan("before $$\\sum x");
        assert_eq!(spans(&extraction), vec![MathSpan::display("\\sum x")]);
    }

    #[test]
    fn test_lone_trailing_sentinel_is_text() {
        let extraction = scan("price 5 $");
        assert!(extraction.table().is_empty());
        assert_eq!(extraction.text(), "price 5 $");

        // 前面的公式照常提取，末尾的定界符保留
        let extraction = scan("$x$ costs 5$");
        assert_eq!(spans(&extraction), vec![MathSpan::inline("x")]);
        assert_eq!(extraction.text(), format!("{}0 costs 5$", TAG));
    }

    #[test]
    fn test_adjacent_spans() {
        let extraction = scan("$a$$b$");
        assert_eq!(
            spans(&extraction),
            vec![MathSpan::inline("a"), MathSpan::inline("b")]
        );
        assert_eq!(extraction.text(), format!("{TAG}0{TAG}1"));
    }

    #[test]
    fn test_custom_sentinel() {
        let mut rng = StdRng::seed_from_u64(1);
        let extraction = Scanner::with_rng("cost $5, %x%", TAG, '%', &mut rng).extract();
        assert_eq!(spans(&extraction), vec![MathSpan::inline("x")]);
        assert_eq!(extraction.text(), format!("cost $5, {}0", TAG));
    }

    #[test]
    fn test_prefix_avoids_source() {
        let source = format!("{TAG} appears in the text, $x$ too");
        let extraction = scan(&source);
        let prefix = extraction.prefix();

        assert!(prefix.starts_with(TAG));
        assert!(prefix.len() > TAG.len());
        assert!(!source.contains(prefix));
        assert_eq!(extraction.table().len(), 1);
    }

    #[test]
    fn test_prefix_keeps_growing_until_unique() {
        // 所有单字符扩展都已出现在源文本中，前缀至少要扩展两次
        let mut source = String::new();
        for c in ('0'..='9').chain('a'..='z').chain('A'..='Z') {
            source.push_str(TAG);
            source.push(c);
            source.push(' ');
        }

        let mut rng = StdRng::seed_from_u64(42);
        let prefix = generate_prefix(&source, TAG, &mut rng);
        assert!(prefix.len() >= TAG.len() + 2);
        assert!(!source.contains(prefix.as_str()));
    }

    #[test]
    fn test_placeholders_are_distinct() {
        let source = (0..12).map(|i| format!("$x_{i}$ ")).collect::<String>();
        let extraction = scan(&source);
        let keys: Vec<_> = extraction.table().placeholders().collect();

        assert_eq!(keys.len(), 12);
        for (i, a) in keys.iter().enumerate() {
            assert!(!source.contains(a));
            for b in keys.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
