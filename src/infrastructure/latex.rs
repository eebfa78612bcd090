//! LaTeX → MathML（pulldown-latex）
//!
//! 严格模式：任何解析错误都算失败，用于快速渲染路径。
//! 宽松模式：解析错误由 pulldown-latex 直接标记在输出中，用于慢速渲染路径。

use pulldown_latex::{
    config::DisplayMode, config::RenderConfig, mathml::push_mathml, Parser, Storage,
};

use crate::error::RenderError;

fn display_mode(display: bool) -> DisplayMode {
    if display {
        DisplayMode::Block
    } else {
        DisplayMode::Inline
    }
}

/// 严格渲染，有解析错误时返回 `RenderError::Unsupported`
pub fn render_strict(latex: &str, display: bool) -> Result<String, RenderError> {
    let storage = Storage::new();
    let parser = Parser::new(latex, &storage);

    let events: Vec<_> = parser.collect();
    let errors: Vec<String> = events
        .iter()
        .filter_map(|e| e.as_ref().err().map(|err| err.to_string()))
        .collect();

    if !errors.is_empty() {
        return Err(RenderError::unsupported(errors.join("; ")));
    }

    let config = RenderConfig {
        display_mode: display_mode(display),
        ..Default::default()
    };
    let mut mathml = String::new();
    push_mathml(&mut mathml, events.into_iter(), config)
        .map_err(|e| RenderError::engine(e.to_string()))?;
    Ok(mathml)
}

/// 宽松渲染，解析错误保留在输出里，只有写出失败才返回错误
pub fn render_lenient(latex: &str, display: bool) -> Result<String, RenderError> {
    let storage = Storage::new();
    let parser = Parser::new(latex, &storage);

    let config = RenderConfig {
        display_mode: display_mode(display),
        ..Default::default()
    };
    let mut mathml = String::new();
    push_mathml(&mut mathml, parser, config)
        .map_err(|e| RenderError::engine(e.to_string()))?;
    Ok(mathml)
}
