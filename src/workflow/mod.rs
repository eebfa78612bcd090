pub mod span_ctx;
pub mod span_flow;

pub use span_ctx::SpanCtx;
pub use span_flow::{RenderPath, SpanFlow, SpanOutcome};
