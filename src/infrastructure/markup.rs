//! 渲染结果的外层标记：错误提示、超时提示、块级公式居中容器

use html_escape::{encode_double_quoted_attribute, encode_text};
use std::time::Duration;

fn mode_class(display: bool) -> &'static str {
    if display {
        "math-display"
    } else {
        "math-inline"
    }
}

/// 渲染失败时替代公式的标记：保留源码，错误信息放在 title 里
pub fn error_markup(source: &str, message: &str, display: bool) -> String {
    format!(
        r#"<span class="math math-error {}" title="{}"><code>{}</code></span>"#,
        mode_class(display),
        encode_double_quoted_attribute(message),
        encode_text(source)
    )
}

/// 渲染超时时替代公式的标记
pub fn timeout_markup(source: &str, display: bool, limit: Duration) -> String {
    error_markup(
        source,
        &format!("渲染超时 ({} ms)", limit.as_millis()),
        display,
    )
}

/// 块级公式居中容器
pub fn center_display(markup: &str) -> String {
    format!(r#"<div style="width: 100%; text-align: center">{markup}</div>"#)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_markup_escapes_html() {
        let html = error_markup("a < b & \"c\"", "bad \"token\"", false);
        assert!(html.contains("math-error"));
        assert!(html.contains("math-inline"));
        assert!(html.contains("a &lt; b &amp;"));
        assert!(!html.contains("bad \"token\""));
        assert!(html.contains("bad &quot;token&quot;"));
    }

    #[test]
    fn test_timeout_markup_mentions_limit() {
        let html = timeout_markup("x", true, Duration::from_millis(1500));
        assert!(html.contains("math-display"));
        assert!(html.contains("1500 ms"));
    }

    #[test]
    fn test_center_display() {
        assert_eq!(
            center_display("<math></math>"),
            r#"<div style="width: 100%; text-align: center"><math></math></div>"#
        );
    }
}
