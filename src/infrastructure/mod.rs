pub mod fast_renderer;
pub mod latex;
pub mod markup;
pub mod render_worker;

pub use fast_renderer::{FastRenderer, LatexRenderer};
pub use render_worker::{LatexEngine, MathEngine, RenderWorker, SlowRenderer, SlowResult};

use std::sync::Arc;

/// 快速 + 慢速 渲染器句柄，构造编排器时注入
#[derive(Clone)]
pub struct Renderers {
    pub fast: Arc<dyn FastRenderer>,
    pub slow: Arc<dyn SlowRenderer>,
}

impl Renderers {
    pub fn new(fast: Arc<dyn FastRenderer>, slow: Arc<dyn SlowRenderer>) -> Self {
        Self { fast, slow }
    }
}
