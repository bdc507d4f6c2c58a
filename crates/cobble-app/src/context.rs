//! Application context.

use std::sync::Arc;
use std::time::Instant;

use ash::vk;
use cobble_gpu::swapchain::{select_surface_format, Swapchain};
use cobble_gpu::{CommandPool, FrameSynchronizer, GpuConfig, GpuContext, SurfaceContext};
use winit::window::Window;

use crate::pass::create_render_pass;

/// Application context shared across all app methods.
///
/// Owns every GPU object of the presentation path and releases them in
/// dependency order at shutdown.
pub struct AppContext {
    /// The window handle.
    pub window: Arc<Window>,
    /// GPU context with instance, device, and queues.
    pub gpu: GpuContext,
    /// The window surface.
    pub surface: SurfaceContext,
    /// Render pass the swapchain framebuffers are built against.
    pub render_pass: vk::RenderPass,
    /// Current swapchain.
    pub swapchain: Swapchain,
    /// Frame slot pool and image-in-flight tracking.
    pub(crate) frames: FrameSynchronizer,
    /// Command pool on the graphics family.
    pub(crate) command_pool: CommandPool,
    /// One primary command buffer per frame slot.
    pub(crate) command_buffers: Vec<vk::CommandBuffer>,
    /// Total frames rendered.
    pub frame_count: u64,
    /// Time of the previous frame, for delta time.
    pub(crate) last_frame_time: Instant,
    /// Whether vsync is enabled.
    pub vsync: bool,
}

impl AppContext {
    /// Create the full presentation path for a window.
    ///
    /// # Safety
    /// The window must have valid handles.
    pub(crate) unsafe fn new(
        window: Arc<Window>,
        config: &GpuConfig,
        vsync: bool,
    ) -> anyhow::Result<Self> {
        // SAFETY: Caller guarantees window has valid handles
        let (gpu, surface) = unsafe { GpuContext::new(config, window.as_ref())? };

        tracing::info!("GPU: {}", gpu.candidate().profile.summary());

        // The render pass needs the format the swapchain will negotiate
        // SAFETY: GPU context and surface are valid
        let support = unsafe { surface.support(gpu.physical_device())? };
        let surface_format = select_surface_format(&support.formats);
        // SAFETY: Device is valid
        let render_pass = unsafe { create_render_pass(gpu.device(), surface_format.format)? };

        let size = window.inner_size();
        // SAFETY: GPU context, surface, and render pass are valid
        let swapchain = unsafe {
            gpu.create_swapchain(
                &surface,
                render_pass,
                size.width.max(1),
                size.height.max(1),
                vsync,
                None,
            )?
        };

        // SAFETY: Device is valid
        let frames = unsafe {
            FrameSynchronizer::new(
                gpu.device(),
                config.frames_in_flight,
                swapchain.image_count(),
            )?
        };

        // SAFETY: Device is valid and the graphics family exists
        let command_pool = unsafe {
            CommandPool::new(
                gpu.device(),
                gpu.queue_families().graphics,
                vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            )?
        };
        // SAFETY: Device and command pool are valid
        let command_buffers =
            unsafe { command_pool.allocate(gpu.device(), config.frames_in_flight as u32)? };

        Ok(Self {
            window,
            gpu,
            surface,
            render_pass,
            swapchain,
            frames,
            command_pool,
            command_buffers,
            frame_count: 0,
            last_frame_time: Instant::now(),
            vsync,
        })
    }

    /// Current swapchain extent.
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent
    }

    /// Swapchain width.
    pub fn width(&self) -> u32 {
        self.swapchain.extent.width
    }

    /// Swapchain height.
    pub fn height(&self) -> u32 {
        self.swapchain.extent.height
    }

    /// Aspect ratio (width / height).
    pub fn aspect_ratio(&self) -> f32 {
        self.swapchain.extent.width as f32 / self.swapchain.extent.height as f32
    }

    /// Number of frame slots.
    pub fn frames_in_flight(&self) -> usize {
        self.frames.frames_in_flight()
    }

    /// Tear down and rebuild the swapchain against the surface's current
    /// state.
    ///
    /// Runs only from the frame loop, after the device has gone idle, so no
    /// in-flight frame can still reference the old images. The retired
    /// handle is passed through so the driver may recycle it.
    pub(crate) fn rebuild_swapchain(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
        self.gpu.wait_idle()?;

        let new_swapchain = unsafe {
            self.gpu.create_swapchain(
                &self.surface,
                self.render_pass,
                width.max(1),
                height.max(1),
                self.vsync,
                Some(self.swapchain.handle),
            )?
        };

        unsafe {
            self.swapchain
                .destroy(self.gpu.device(), self.gpu.swapchain_loader());
        }
        self.swapchain = new_swapchain;
        self.frames.reset_images(self.swapchain.image_count());

        tracing::debug!(
            "swapchain rebuilt: {}x{}",
            self.swapchain.extent.width,
            self.swapchain.extent.height
        );

        Ok(())
    }

    /// Release all owned GPU objects, in dependency order.
    ///
    /// Frame sync objects and command pool first, then framebuffers/views/
    /// swapchain, render pass, and surface. Queues need no destroy; the
    /// device and instance go down with the `GpuContext` drop.
    pub(crate) fn cleanup(&mut self) {
        let _ = self.gpu.wait_idle();

        unsafe {
            let device = self.gpu.device();
            self.frames.destroy(device);
            self.command_pool.destroy(device);
            self.swapchain.destroy(device, self.gpu.swapchain_loader());
            device.destroy_render_pass(self.render_pass, None);
            self.surface.destroy();
        }
    }
}
