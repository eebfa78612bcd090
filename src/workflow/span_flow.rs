//! 单个公式的渲染流程 - 流程层
//!
//! 流程顺序：
//! 1. 快速渲染器（同步）→ 成功则写缓存
//! 2. 失败（包括 panic）时转交慢速渲染器 → 结果（含错误标记）写缓存
//! 3. 设置了超时则整个流程限时，超时结果不写缓存

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::RenderError;
use crate::infrastructure::{markup, Renderers};
use crate::models::MathSpan;
use crate::services::MathCache;
use crate::utils::truncate_text;
use crate::workflow::span_ctx::SpanCtx;

/// 结果来自哪条渲染路径
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPath {
    /// 快速渲染器成功
    Fast,
    /// 快速渲染失败，由慢速渲染器给出结果
    Slow,
    /// 超时，结果为超时提示
    TimedOut,
}

/// 单个公式的渲染结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanOutcome {
    pub markup: String,
    pub path: RenderPath,
}

/// 公式渲染流程
///
/// - 决定何时走快速路径、何时回退到慢速路径
/// - 负责写缓存，不负责查缓存（命中在编排层同步处理）
/// - 不认识文档，只处理单个公式
pub struct SpanFlow {
    renderers: Renderers,
    cache: Arc<MathCache>,
    timeout: Option<Duration>,
}

impl SpanFlow {
    pub fn new(renderers: Renderers, cache: Arc<MathCache>, timeout: Option<Duration>) -> Self {
        Self {
            renderers,
            cache,
            timeout,
        }
    }

    pub fn cache(&self) -> &Arc<MathCache> {
        &self.cache
    }

    /// 渲染一个未命中缓存的公式，永远返回可替换的标记
    pub async fn run(&self, ctx: &SpanCtx, span: &MathSpan) -> SpanOutcome {
        let Some(limit) = self.timeout else {
            return self.render(ctx, span).await;
        };

        match tokio::time::timeout(limit, self.render(ctx, span)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    "{} ⚠️ 渲染超时 ({} ms): {}",
                    ctx,
                    limit.as_millis(),
                    truncate_text(&span.content, 60)
                );
                SpanOutcome {
                    markup: markup::timeout_markup(&span.content, span.display, limit),
                    path: RenderPath::TimedOut,
                }
            }
        }
    }

    async fn render(&self, ctx: &SpanCtx, span: &MathSpan) -> SpanOutcome {
        let fast = catch_unwind(AssertUnwindSafe(|| {
            self.renderers.fast.render(&span.content, span.display)
        }))
        .unwrap_or_else(|_| {
            warn!("{} ⚠️ 快速渲染器 panic", ctx);
            Err(RenderError::engine("快速渲染器 panic"))
        });

        match fast {
            Ok(rendered) => {
                debug!("{} 快速渲染完成 ({})", ctx, span.mode_label());
                self.cache.set(span, rendered.clone());
                SpanOutcome {
                    markup: rendered,
                    path: RenderPath::Fast,
                }
            }
            Err(e) => {
                debug!(
                    "{} 快速渲染失败，转交慢速渲染: {} ({})",
                    ctx,
                    truncate_text(&span.content, 60),
                    e
                );

                let rendered = match self
                    .renderers
                    .slow
                    .render(span.content.clone(), span.display)
                    .await
                {
                    Ok(rendered) => rendered,
                    Err(e) => {
                        warn!("{} ⚠️ 慢速渲染失败: {}", ctx, e);
                        markup::error_markup(&span.content, &e.to_string(), span.display)
                    }
                };

                self.cache.set(span, rendered.clone());
                SpanOutcome {
                    markup: rendered,
                    path: RenderPath::Slow,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{FastRenderer, SlowRenderer, SlowResult};
    use futures::future::{BoxFuture, FutureExt};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 只认识不含反斜杠的公式
    struct PlainFast;

    impl FastRenderer for PlainFast {
        fn render(&self, source: &str, _display: bool) -> Result<String, RenderError> {
            if source.contains('\\') {
                Err(RenderError::unsupported("unknown command"))
            } else {
                Ok(format!("<fast>{source}</fast>"))
            }
        }
    }

    #[derive(Default)]
    struct CountingSlow {
        calls: AtomicUsize,
        fail: bool,
        delay: Option<Duration>,
    }

    impl SlowRenderer for CountingSlow {
        fn render(&self, source: String, _display: bool) -> BoxFuture<'static, SlowResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let fail = self.fail;
            let delay = self.delay;
            async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                if fail {
                    Err(RenderError::engine("Undefined control sequence"))
                } else {
                    Ok(format!("<slow>{source}</slow>"))
                }
            }
            .boxed()
        }
    }

    fn flow(slow: Arc<CountingSlow>, timeout: Option<Duration>) -> SpanFlow {
        SpanFlow::new(
            Renderers::new(Arc::new(PlainFast), slow),
            Arc::new(MathCache::new(16)),
            timeout,
        )
    }

    fn ctx() -> SpanCtx {
        SpanCtx::new(1, 0, "ph0")
    }

    #[tokio::test]
    async fn test_fast_path_success_is_cached() {
        let slow = Arc::new(CountingSlow::default());
        let flow = flow(slow.clone(), None);
        let span = MathSpan::inline("x^2");

        let outcome = flow.run(&ctx(), &span).await;
        assert_eq!(outcome.path, RenderPath::Fast);
        assert_eq!(outcome.markup, "<fast>x^2</fast>");
        assert_eq!(flow.cache().get(&span).as_deref(), Some("<fast>x^2</fast>"));
        assert_eq!(slow.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fallback_to_slow_path() {
        let slow = Arc::new(CountingSlow::default());
        let flow = flow(slow.clone(), None);
        let span = MathSpan::display(r"\alpha");

        let outcome = flow.run(&ctx(), &span).await;
        assert_eq!(outcome.path, RenderPath::Slow);
        assert_eq!(outcome.markup, r"<slow>\alpha</slow>");
        assert_eq!(flow.cache().get(&span).as_deref(), Some(r"<slow>\alpha</slow>"));
        assert_eq!(slow.calls.load(Ordering::SeqCst), 1);
    }

    /// 渲染时 panic
    struct PanickingFast;

    impl FastRenderer for PanickingFast {
        fn render(&self, _source: &str, _display: bool) -> Result<String, RenderError> {
            panic!("fast renderer bug")
        }
    }

    #[tokio::test]
    async fn test_fast_panic_falls_back_to_slow() {
        let slow = Arc::new(CountingSlow::default());
        let flow = SpanFlow::new(
            Renderers::new(Arc::new(PanickingFast), slow.clone()),
            Arc::new(MathCache::new(16)),
            None,
        );
        let span = MathSpan::inline("x");

        let outcome = flow.run(&ctx(), &span).await;
        assert_eq!(outcome.path, RenderPath::Slow);
        assert_eq!(outcome.markup, "<slow>x</slow>");
        assert_eq!(slow.calls.load(Ordering::SeqCst), 1);
        assert_eq!(flow.cache().get(&span).as_deref(), Some("<slow>x</slow>"));
    }

    #[tokio::test]
    async fn test_slow_error_becomes_markup() {
        let slow = Arc::new(CountingSlow {
            fail: true,
            ..Default::default()
        });
        let flow = flow(slow, None);
        let span = MathSpan::inline(r"\oops");

        let outcome = flow.run(&ctx(), &span).await;
        assert_eq!(outcome.path, RenderPath::Slow);
        assert!(outcome.markup.contains("math-error"));
        assert!(outcome.markup.contains("Undefined control sequence"));
        // 错误结果同样写入缓存
        assert_eq!(flow.cache().get(&span), Some(outcome.markup));
    }

    #[tokio::test]
    async fn test_timeout_resolves_without_caching() {
        let slow = Arc::new(CountingSlow {
            delay: Some(Duration::from_secs(60)),
            ..Default::default()
        });
        let flow = flow(slow, Some(Duration::from_millis(100)));
        let span = MathSpan::inline(r"\slow");

        let outcome = flow.run(&ctx(), &span).await;
        assert_eq!(outcome.path, RenderPath::TimedOut);
        assert!(outcome.markup.contains("100 ms"));
        assert!(flow.cache().get(&span).is_none());
    }
}
