//! Terminal renderer: color-pair registry, window layout, per-cell paint
//! with first-covering-range resolution, batched writes, and redraw
//! coalescing.

pub mod batch_writer;
pub mod color;
pub mod engine;
pub mod layout;
pub mod paint;
pub mod scheduler;

pub use batch_writer::BatchWriter;
pub use color::ColorRegistry;
pub use engine::{Frame, RenderTheme, Renderer};
pub use layout::{Layout, Region, WindowId};
pub use scheduler::{COALESCE_DELAY, Damage, RedrawScheduler};
