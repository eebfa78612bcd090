pub mod render_cache;
pub mod scanner;

pub use render_cache::{CacheStats, MathCache, RenderCache};
pub use scanner::{generate_prefix, Scanner};
