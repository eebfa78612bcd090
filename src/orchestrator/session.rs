//! 文档会话 - 编排层
//!
//! 同一篇文档被快速连续地重新渲染（例如边输入边预览）时，只有最新一次调用的结果会交给回调。
//! 旧调用的渲染任务照常完成并写入缓存，只是它们的回调被丢弃。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::debug;

use crate::orchestrator::document_renderer::MathRenderer;

/// 单篇文档的渲染会话
#[derive(Clone)]
pub struct DocumentSession {
    renderer: MathRenderer,
    generation: Arc<AtomicU64>,
}

impl DocumentSession {
    pub fn new(renderer: MathRenderer) -> Self {
        Self {
            renderer,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 当前最新一次调用的编号
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// 渲染文档；若完成时已有更新的调用，回调不会被执行
    ///
    /// # 返回
    /// 返回本次调用的编号
    pub fn render<F>(&self, source: &str, on_complete: F) -> u64
    where
        F: FnOnce(String) + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let latest = self.generation.clone();

        self.renderer.render_source(source, move |rendered| {
            let current = latest.load(Ordering::SeqCst);
            if current == generation {
                on_complete(rendered);
            } else {
                debug!("渲染结果 #{} 已过期（最新 #{}），丢弃", generation, current);
            }
        });

        generation
    }

    /// 渲染并等待结果，被后续调用取代时返回 `None`
    pub async fn render_to_string(&self, source: &str) -> Option<String> {
        let (sender, receiver) = oneshot::channel();
        self.render(source, move |rendered| {
            let _ = sender.send(rendered);
        });
        receiver.await.ok()
    }
}
