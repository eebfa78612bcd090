//! 慢速渲染工作线程 - 基础设施层
//!
//! 唯一持有慢速渲染引擎的地方，只暴露"异步渲染"能力。
//! 请求通过 mpsc 发给专用线程，结果通过 oneshot 返回。

use futures::future::{BoxFuture, FutureExt};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, RenderError};
use crate::infrastructure::{latex, markup};

const WORKER_NAME: &str = "math-render-worker";

/// 慢速渲染结果：渲染标记，或错误载荷
pub type SlowResult = Result<String, RenderError>;

/// 慢速（异步）渲染能力
///
/// 语法支持完整，被视为最终结果。返回的 future 不借用 `self`，可以直接交给任务。
pub trait SlowRenderer: Send + Sync {
    fn render(&self, source: String, display: bool) -> BoxFuture<'static, SlowResult>;
}

/// 工作线程里实际执行排版的引擎
pub trait MathEngine: Send + 'static {
    fn typeset(&mut self, source: &str, display: bool) -> SlowResult;
}

impl<F> MathEngine for F
where
    F: FnMut(&str, bool) -> SlowResult + Send + 'static,
{
    fn typeset(&mut self, source: &str, display: bool) -> SlowResult {
        self(source, display)
    }
}

/// 基于 pulldown-latex 的宽松引擎，语法错误会标记在输出中而不是整体失败
#[derive(Debug, Clone, Copy, Default)]
pub struct LatexEngine;

impl MathEngine for LatexEngine {
    fn typeset(&mut self, source: &str, display: bool) -> SlowResult {
        latex::render_lenient(source, display)
    }
}

struct RenderRequest {
    source: String,
    display: bool,
    reply: oneshot::Sender<SlowResult>,
}

/// 慢速渲染工作线程的句柄
///
/// 可以在多个文档之间共享（放进 `Arc`）。所有句柄释放后工作线程自动退出。
pub struct RenderWorker {
    sender: mpsc::Sender<RenderRequest>,
}

impl RenderWorker {
    /// 启动工作线程
    ///
    /// # 参数
    /// - `engine`: 排版引擎，归工作线程独占
    /// - `queue_size`: 请求队列长度
    /// - `center_display`: 块级公式是否包一层居中容器
    pub fn spawn<E: MathEngine>(
        engine: E,
        queue_size: usize,
        center_display: bool,
    ) -> AppResult<Self> {
        let (sender, receiver) = mpsc::channel(queue_size.max(1));

        std::thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || run_worker(engine, receiver, center_display))
            .map_err(|e| AppError::worker_spawn_failed(WORKER_NAME, e))?;

        Ok(Self { sender })
    }
}

fn run_worker<E: MathEngine>(
    mut engine: E,
    mut receiver: mpsc::Receiver<RenderRequest>,
    center_display: bool,
) {
    info!("✓ 慢速渲染工作线程已启动");

    while let Some(request) = receiver.blocking_recv() {
        let RenderRequest {
            source,
            display,
            reply,
        } = request;

        let result = catch_unwind(AssertUnwindSafe(|| engine.typeset(&source, display)))
            .unwrap_or_else(|_| {
                warn!("⚠️ 渲染引擎 panic: {}", source);
                Err(RenderError::engine("渲染引擎 panic"))
            })
            .map(|rendered| {
                if display && center_display {
                    markup::center_display(&rendered)
                } else {
                    rendered
                }
            });

        if reply.send(result).is_err() {
            debug!("请求方已不再等待结果: {}", source);
        }
    }

    info!("慢速渲染工作线程退出");
}

impl SlowRenderer for RenderWorker {
    fn render(&self, source: String, display: bool) -> BoxFuture<'static, SlowResult> {
        let sender = self.sender.clone();

        async move {
            let (reply, response) = oneshot::channel();
            sender
                .send(RenderRequest {
                    source,
                    display,
                    reply,
                })
                .await
                .map_err(|_| RenderError::WorkerUnavailable)?;

            response.await.map_err(|_| RenderError::WorkerUnavailable)?
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_latex_engine_through_worker() {
        let worker = RenderWorker::spawn(LatexEngine, 4, true).unwrap();

        let inline = worker.render("x^2".to_string(), false).await.unwrap();
        assert!(inline.contains("<math"));
        assert!(!inline.starts_with("<div"));

        let display = worker.render(r"\frac{a}{b}".to_string(), true).await.unwrap();
        assert!(display.starts_with(r#"<div style="width: 100%; text-align: center">"#));
        assert!(display.contains("<mfrac"));
    }

    #[tokio::test]
    async fn test_engine_error_is_returned_as_payload() {
        let engine = |source: &str, _display: bool| -> SlowResult {
            Err(RenderError::unsupported(format!("不支持: {source}")))
        };
        let worker = RenderWorker::spawn(engine, 1, false).unwrap();

        let result = worker.render("\\foo".to_string(), false).await;
        assert_eq!(result, Err(RenderError::unsupported("不支持: \\foo")));
    }

    #[tokio::test]
    async fn test_worker_survives_engine_panic() {
        let engine = |source: &str, _display: bool| -> SlowResult {
            if source == "boom" {
                panic!("engine exploded");
            }
            Ok(format!("<m>{source}</m>"))
        };
        let worker = RenderWorker::spawn(engine, 2, false).unwrap();

        let result = worker.render("boom".to_string(), false).await;
        assert!(matches!(result, Err(RenderError::Engine { .. })));

        let result = worker.render("y".to_string(), false).await;
        assert_eq!(result.as_deref(), Ok("<m>y</m>"));
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_worker() {
        let worker = std::sync::Arc::new(
            RenderWorker::spawn(|s: &str, _: bool| -> SlowResult { Ok(s.to_uppercase()) }, 2, false)
                .unwrap(),
        );

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let worker = worker.clone();
                tokio::spawn(async move { worker.render(format!("a{i}"), false).await })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap().unwrap(), format!("A{i}"));
        }
    }
}
