//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责把扫描、缓存和渲染流程组织起来，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `document_renderer` - 单篇文档渲染器
//! - 遍历占位符表，命中缓存直接替换
//! - 未命中时分发 `SpanFlow` 任务
//! - 跟踪未完成任务数，全部完成后调用一次回调
//!
//! ### `session` - 文档会话
//! - 同一文档多次渲染时只交付最新结果
//!
//! ### `batch_processor` - 批量文档处理器
//! - 管理应用生命周期（初始化渲染器、缓存、工作线程）
//! - 控制并发数量（Semaphore）
//! - 输出全局统计信息
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<文档>)
//!     ↓
//! document_renderer / session (处理单篇文档)
//!     ↓
//! workflow::SpanFlow (处理单个公式)
//!     ↓
//! services (能力层：scanner / render_cache)
//!     ↓
//! infrastructure (基础设施：快速渲染器 / 渲染工作线程)
//! ```

pub mod batch_processor;
pub mod document_renderer;
pub mod session;

// 重新导出主要类型
pub use batch_processor::{App, DocumentReport, RunReport};
pub use document_renderer::{MathRenderer, RenderOptions};
pub use session::DocumentSession;
