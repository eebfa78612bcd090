//! # Math Render
//!
//! 把 Markdown 等文本中的 `$...$` / `$$...$$` 公式渲染为 HTML 的 Rust 库
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有渲染资源，只暴露能力
//! - `LatexRenderer` - 同步快速渲染器，遇到不支持的语法直接报错
//! - `RenderWorker` - 独占渲染引擎的工作线程，提供异步慢速渲染
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `Scanner` - 扫描文档，提取公式并生成占位符
//! - `MathCache` - 行内 / 行间两个 LRU 缓存
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个公式"的完整处理流程
//! - `SpanCtx` - 上下文封装（document_id + slot）
//! - `SpanFlow` - 流程编排（fast → slow → cache）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/document_renderer` - 单篇文档渲染器，跟踪未完成任务并回调一次
//! - `orchestrator/session` - 文档会话，只交付最新一次渲染结果
//! - `orchestrator/batch_processor` - 批量文档处理器，管理资源和并发
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult, RenderError};
pub use infrastructure::{
    FastRenderer, LatexEngine, LatexRenderer, RenderWorker, Renderers, SlowRenderer,
};
pub use models::{Extraction, MathSpan, PlaceholderTable, Segment};
pub use orchestrator::{App, DocumentSession, MathRenderer, RenderOptions, RunReport};
pub use services::{MathCache, Scanner};
pub use workflow::{SpanCtx, SpanFlow};
