//! `CobbleApp` trait definition.

use crate::context::AppContext;
use crate::frame::FrameContext;
use winit::event::WindowEvent;

/// Trait for Cobble applications.
///
/// The framework owns the window, device bring-up, swapchain lifecycle, and
/// frame synchronization; the application records rendering commands into
/// the command buffer it is handed each frame.
pub trait CobbleApp: Sized {
    /// Initialize the application.
    ///
    /// Called once, after the GPU context, swapchain, and window exist.
    fn init(ctx: &mut AppContext) -> anyhow::Result<Self>;

    /// Update application state.
    ///
    /// Called every frame before rendering; `dt` is the seconds elapsed
    /// since the previous frame.
    fn update(&mut self, ctx: &AppContext, dt: f32);

    /// Record rendering commands for the current frame.
    ///
    /// The command buffer is already in the recording state; acquisition,
    /// submission, and presentation happen around this call.
    fn render(&mut self, ctx: &AppContext, frame: &mut FrameContext) -> anyhow::Result<()>;

    /// Handle window resize.
    ///
    /// The framework has already rebuilt the swapchain when this is called.
    #[allow(unused_variables)]
    fn on_resize(&mut self, ctx: &mut AppContext, width: u32, height: u32) -> anyhow::Result<()> {
        Ok(())
    }

    /// Handle a window event. Return `true` to swallow it.
    #[allow(unused_variables)]
    fn on_event(&mut self, event: &WindowEvent) -> bool {
        false
    }

    /// Release application resources. The GPU is idle when this runs.
    #[allow(unused_variables)]
    fn cleanup(&mut self, ctx: &mut AppContext) {}
}
