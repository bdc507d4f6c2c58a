//! Application framework for the Cobble engine.
//!
//! Handles the boilerplate around the render backend:
//! - Window creation and event loop
//! - GPU context and swapchain bring-up
//! - Per-frame synchronization, submission, and presentation
//! - Swapchain rebuilds on resize or staleness
//! - Shutdown in dependency order
//!
//! # Example
//!
//! ```no_run
//! use cobble_app::{run_app, AppConfig, AppContext, CobbleApp, FrameContext};
//!
//! struct MyApp;
//!
//! impl CobbleApp for MyApp {
//!     fn init(_ctx: &mut AppContext) -> anyhow::Result<Self> {
//!         Ok(MyApp)
//!     }
//!
//!     fn update(&mut self, _ctx: &AppContext, _dt: f32) {}
//!
//!     fn render(&mut self, _ctx: &AppContext, _frame: &mut FrameContext) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     run_app::<MyApp>(AppConfig::new("My App"))
//! }
//! ```

mod app;
mod context;
mod frame;
mod pass;
mod runner;

pub use app::CobbleApp;
pub use context::AppContext;
pub use frame::FrameContext;
pub use pass::create_render_pass;
pub use runner::{run_app, AppConfig};

// Re-export commonly used types for convenience
pub use cobble_gpu::{GpuConfig, GpuContext};
pub use winit::event::WindowEvent;
