//! 单篇文档渲染器 - 编排层
//!
//! ## 职责
//!
//! 把扫描结果中的每个占位符替换成渲染结果，全部完成后调用一次完成回调。
//!
//! ## 流程
//!
//! 1. **分发阶段**（Dispatching）：按占位符表顺序遍历
//!    - 缓存命中：立即同步替换
//!    - 缓存未命中：未完成计数 +1，交给 tokio 任务执行 `SpanFlow`
//!    - 不在运行时内：未命中的公式直接替换为错误标记
//! 2. **等待阶段**（AwaitingResults）：分发结束后进入；若计数已为 0 立即完成
//! 3. **完成**（Complete）：计数归零且已进入等待阶段时触发，回调只会被调用一次
//!
//! 分发阶段中就完成的任务只会减少计数，不会提前触发回调。

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{markup, Renderers};
use crate::models::{Extraction, PlaceholderTable, Segment};
use crate::services::{MathCache, Scanner};
use crate::workflow::{SpanCtx, SpanFlow};

type Callback = Box<dyn FnOnce(String) + Send + 'static>;

/// 渲染选项
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// 占位符固定前缀
    pub placeholder_tag: String,
    /// 公式定界符
    pub sentinel: char,
    /// 单个公式的渲染超时
    pub timeout: Option<Duration>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for RenderOptions {
    fn from(config: &Config) -> Self {
        Self {
            placeholder_tag: config.placeholder_tag.clone(),
            sentinel: config.sentinel,
            timeout: config.render_timeout(),
        }
    }
}

/// 公式渲染编排器
///
/// 克隆代价很低，所有克隆共享同一组渲染器和缓存。
/// 同一文档的多次调用互不影响，各自回调一次；需要"只要最新结果"时使用 `DocumentSession`。
#[derive(Clone)]
pub struct MathRenderer {
    flow: Arc<SpanFlow>,
    options: Arc<RenderOptions>,
    next_document: Arc<AtomicU64>,
}

impl MathRenderer {
    /// 创建编排器
    ///
    /// # 参数
    /// - `renderers`: 快速 / 慢速渲染器
    /// - `cache`: 进程级共享的缓存对
    /// - `options`: 渲染选项
    pub fn new(renderers: Renderers, cache: Arc<MathCache>, options: RenderOptions) -> Self {
        let flow = SpanFlow::new(renderers, cache, options.timeout);
        Self {
            flow: Arc::new(flow),
            options: Arc::new(options),
            next_document: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn from_config(renderers: Renderers, cache: Arc<MathCache>, config: &Config) -> Self {
        Self::new(renderers, cache, RenderOptions::from(config))
    }

    pub fn cache(&self) -> &Arc<MathCache> {
        self.flow.cache()
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// 使用配置好的前缀和定界符扫描文档
    pub fn scan(&self, source: &str) -> Extraction {
        Scanner::new(source, &self.options.placeholder_tag, self.options.sentinel).extract()
    }

    /// 扫描并渲染整篇文档
    pub fn render_source<F>(&self, source: &str, on_complete: F)
    where
        F: FnOnce(String) + Send + 'static,
    {
        self.render(self.scan(source), on_complete);
    }

    /// 渲染扫描结果，全部公式替换完成后调用 `on_complete`
    ///
    /// 所有公式都命中缓存（或没有公式）时，回调在本函数返回前同步执行，不需要运行时。
    /// 未命中的公式在当前 tokio 运行时上渲染；不在运行时内调用时，这些公式直接替换为错误标记
    /// （不写缓存），回调同样在返回前执行。
    pub fn render<F>(&self, extraction: Extraction, on_complete: F)
    where
        F: FnOnce(String) + Send + 'static,
    {
        let document_id = self.next_document.fetch_add(1, Ordering::Relaxed) + 1;
        let (segments, table) = extraction.into_parts();
        let state = Arc::new(DocumentState::new(segments, table.clone(), Box::new(on_complete)));
        let cache = self.flow.cache();
        let runtime = Handle::try_current().ok();

        let mut hits = 0;
        for (slot, (placeholder, span)) in table.iter().enumerate() {
            if let Some(rendered) = cache.get(span) {
                state.substitute(slot, rendered);
                hits += 1;
                continue;
            }

            let Some(runtime) = runtime.as_ref() else {
                warn!(
                    "[文档 #{}] ⚠️ 没有可用的 tokio 运行时，公式 #{} 无法渲染",
                    document_id, slot
                );
                state.substitute(
                    slot,
                    markup::error_markup(&span.content, "没有可用的异步运行时", span.display),
                );
                continue;
            };

            state.begin_job();

            let ctx = SpanCtx::new(document_id, slot, placeholder);
            let span = span.clone();
            let flow = self.flow.clone();
            let state = state.clone();

            runtime.spawn(async move {
                let rendered = match AssertUnwindSafe(flow.run(&ctx, &span))
                    .catch_unwind()
                    .await
                {
                    Ok(outcome) => outcome.markup,
                    Err(_) => {
                        error!("{} ❌ 渲染任务 panic", ctx);
                        markup::error_markup(&span.content, "渲染失败", span.display)
                    }
                };
                state.resolve(slot, rendered);
            });
        }

        debug!(
            "[文档 #{}] 公式 {} 个，缓存命中 {}，待渲染 {}",
            document_id,
            table.len(),
            hits,
            table.len() - hits
        );

        state.finish_dispatch();
    }

    /// 渲染整篇文档并等待结果
    pub async fn render_to_string(&self, source: &str) -> AppResult<String> {
        self.render_extraction(self.scan(source)).await
    }

    /// 渲染扫描结果并等待结果
    pub async fn render_extraction(&self, extraction: Extraction) -> AppResult<String> {
        let (sender, receiver) = oneshot::channel();
        self.render(extraction, move |rendered| {
            let _ = sender.send(rendered);
        });
        receiver
            .await
            .map_err(|_| AppError::Other("渲染任务在完成前被取消".to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Dispatching,
    AwaitingResults,
    Complete,
}

/// 一次渲染调用的状态，所有字段在同一把锁内修改
struct DocumentState {
    inner: Mutex<DocumentInner>,
}

struct DocumentInner {
    phase: Phase,
    outstanding: usize,
    segments: Vec<Segment>,
    table: PlaceholderTable,
    rendered: Vec<Option<String>>,
    on_complete: Option<Callback>,
}

impl DocumentState {
    fn new(segments: Vec<Segment>, table: PlaceholderTable, on_complete: Callback) -> Self {
        let rendered = vec![None; table.len()];
        Self {
            inner: Mutex::new(DocumentInner {
                phase: Phase::Dispatching,
                outstanding: 0,
                segments,
                table,
                rendered,
                on_complete: Some(on_complete),
            }),
        }
    }

    /// 缓存命中，直接替换
    fn substitute(&self, slot: usize, markup: String) {
        self.lock().fill(slot, markup);
    }

    fn begin_job(&self) {
        let mut inner = self.lock();
        debug_assert_eq!(inner.phase, Phase::Dispatching);
        inner.outstanding += 1;
    }

    /// 渲染任务完成
    fn resolve(&self, slot: usize, markup: String) {
        let ready = {
            let mut inner = self.lock();
            inner.fill(slot, markup);
            inner.outstanding = inner.outstanding.saturating_sub(1);
            inner.try_complete()
        };
        fire(ready);
    }

    /// 分发结束，进入等待阶段
    fn finish_dispatch(&self) {
        let ready = {
            let mut inner = self.lock();
            if inner.phase == Phase::Dispatching {
                inner.phase = Phase::AwaitingResults;
            }
            inner.try_complete()
        };
        fire(ready);
    }

    fn lock(&self) -> MutexGuard<'_, DocumentInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DocumentInner {
    fn fill(&mut self, slot: usize, markup: String) {
        if let Some(entry) = self.rendered.get_mut(slot) {
            *entry = Some(markup);
        }
    }

    /// 满足条件时切换到 Complete，并取出回调和最终文本
    fn try_complete(&mut self) -> Option<(Callback, String)> {
        if self.phase != Phase::AwaitingResults || self.outstanding != 0 {
            return None;
        }
        self.phase = Phase::Complete;
        let callback = self.on_complete.take()?;
        Some((callback, self.assemble()))
    }

    fn assemble(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Slot(slot) => match self.rendered.get(*slot).and_then(Option::as_deref) {
                    Some(markup) => out.push_str(markup),
                    None => {
                        if let Some((placeholder, _)) = self.table.slot(*slot) {
                            out.push_str(placeholder);
                        }
                    }
                },
            }
        }
        out
    }
}

// 回调在锁外执行
fn fire(ready: Option<(Callback, String)>) {
    if let Some((callback, rendered)) = ready {
        callback(rendered);
    }
}
