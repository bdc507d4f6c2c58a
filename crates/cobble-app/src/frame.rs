//! Per-frame context for rendering.

use ash::vk;

/// Context for the frame currently being recorded.
pub struct FrameContext {
    /// Command buffer in the recording state.
    pub command_buffer: vk::CommandBuffer,
    /// Index of the acquired swapchain image.
    pub image_index: u32,
    /// Framebuffer bound to the acquired image.
    pub framebuffer: vk::Framebuffer,
    /// Current swapchain extent.
    pub extent: vk::Extent2D,
    /// Seconds since the previous frame.
    pub dt: f32,
    /// Frames rendered so far.
    pub frame_number: u64,
}
