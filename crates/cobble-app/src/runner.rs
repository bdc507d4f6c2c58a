//! Application runner and event loop.

use std::sync::Arc;
use std::time::Instant;

use ash::vk;
use cobble_gpu::{submit_command_buffers, submit_present, GpuConfig, ImageAcquire};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::app::CobbleApp;
use crate::context::AppContext;
use crate::frame::FrameContext;

/// Application configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Window title.
    pub title: String,
    /// Initial window width.
    pub width: u32,
    /// Initial window height.
    pub height: u32,
    /// Enable vsync.
    pub vsync: bool,
    /// Enable Vulkan validation layers (default: debug builds only).
    pub validation: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Cobble Engine".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
            validation: cfg!(debug_assertions),
        }
    }
}

impl AppConfig {
    /// Create a new config with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the window dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Enable or disable vsync.
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    /// Enable or disable validation layers.
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }
}

/// Run a `CobbleApp` with the given configuration.
///
/// Initializes logging, creates the window and GPU context, and drives the
/// event loop until the application exits.
pub fn run_app<A: CobbleApp + 'static>(config: AppConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("{} starting...", config.title);

    let event_loop = EventLoop::new().map_err(anyhow::Error::from)?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runner = AppRunner::<A> {
        config,
        state: None,
    };

    if let Err(e) = event_loop.run_app(&mut runner) {
        error!("Event loop error: {e}");
    }

    Ok(())
}

/// Internal application runner implementing winit's `ApplicationHandler`.
struct AppRunner<A: CobbleApp> {
    config: AppConfig,
    state: Option<AppState<A>>,
}

/// Internal application state.
struct AppState<A: CobbleApp> {
    ctx: AppContext,
    app: A,
    /// Resize seen since the last frame; rebuild after the next present.
    pending_resize: Option<(u32, u32)>,
}

impl<A: CobbleApp + 'static> ApplicationHandler for AppRunner<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        match self.create_state(event_loop) {
            Ok(state) => {
                self.state = Some(state);
                info!("Application ready");
            }
            Err(e) => {
                error!("Failed to initialize application: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Some(state) = &mut self.state {
            if state.app.on_event(&event) {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                if let Some(mut state) = self.state.take() {
                    state.shutdown();
                }
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                let failed = match &mut self.state {
                    Some(state) => state.render_frame().map_err(|e| {
                        error!("Render error: {e}");
                    }),
                    None => Ok(()),
                };
                if failed.is_err() {
                    if let Some(mut state) = self.state.take() {
                        state.shutdown();
                    }
                    event_loop.exit();
                }
            }
            WindowEvent::Resized(size) => {
                if let Some(state) = &mut self.state {
                    state.pending_resize = Some((size.width, size.height));
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.ctx.window.request_redraw();
        }
    }
}

impl<A: CobbleApp + 'static> AppRunner<A> {
    fn create_state(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppState<A>> {
        let window_attrs = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));

        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let gpu_config = GpuConfig {
            app_name: self.config.title.clone(),
            validation: self.config.validation,
            ..Default::default()
        };

        let mut ctx = unsafe { AppContext::new(window, &gpu_config, self.config.vsync)? };
        let app = A::init(&mut ctx)?;

        Ok(AppState {
            ctx,
            app,
            pending_resize: None,
        })
    }
}

impl<A: CobbleApp> AppState<A> {
    /// Drive one frame: wait on the slot fence, acquire, record, submit,
    /// present, and rebuild the swapchain when anything reports staleness.
    fn render_frame(&mut self) -> anyhow::Result<()> {
        // A minimized window has nothing to present to
        let size = self.ctx.window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }

        let now = Instant::now();
        let dt = now
            .duration_since(self.ctx.last_frame_time)
            .as_secs_f32();
        self.ctx.last_frame_time = now;

        self.app.update(&self.ctx, dt);

        // Bound CPU-ahead-of-GPU: block until this slot's previous
        // submission retires
        unsafe {
            self.ctx.frames.begin_frame(self.ctx.gpu.device())?;
        }

        let acquire = unsafe {
            self.ctx.swapchain.acquire(
                self.ctx.gpu.swapchain_loader(),
                self.ctx.frames.current_slot().image_available,
                u64::MAX,
            )?
        };

        let (image_index, suboptimal) = match acquire {
            ImageAcquire::Acquired { index, suboptimal } => (index, suboptimal),
            ImageAcquire::Stale => {
                // Nothing was acquired and nothing will be submitted; the
                // slot fence stays signaled for the retry
                self.rebuild(size.width, size.height)?;
                return Ok(());
            }
        };

        unsafe {
            // The acquired image may still belong to an earlier slot
            self.ctx
                .frames
                .wait_for_image(self.ctx.gpu.device(), image_index)?;
            self.ctx.frames.reset_current_fence(self.ctx.gpu.device())?;
        }
        self.ctx.frames.mark_image_in_flight(image_index);

        let command_buffer = self.ctx.command_buffers[self.ctx.frames.current_index()];

        unsafe {
            let device = self.ctx.gpu.device();
            device.reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            device.begin_command_buffer(command_buffer, &begin_info)?;
        }

        let mut frame = FrameContext {
            command_buffer,
            image_index,
            framebuffer: self.ctx.swapchain.framebuffers[image_index as usize],
            extent: self.ctx.swapchain.extent,
            dt,
            frame_number: self.ctx.frame_count,
        };
        self.app.render(&self.ctx, &mut frame)?;

        let stale = unsafe {
            let device = self.ctx.gpu.device();
            device.end_command_buffer(command_buffer)?;

            let slot = self.ctx.frames.current_slot();
            let wait_semaphores = [slot.image_available];
            let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
            let signal_semaphores = [slot.render_finished];
            let command_buffers = [command_buffer];

            submit_command_buffers(
                device,
                self.ctx.gpu.graphics_queue(),
                &command_buffers,
                &wait_semaphores,
                &wait_stages,
                &signal_semaphores,
                slot.in_flight,
            )?;

            submit_present(
                self.ctx.gpu.swapchain_loader(),
                self.ctx.gpu.present_queue(),
                &self.ctx.swapchain,
                slot,
                image_index,
            )?
        };

        self.ctx.frames.end_frame();
        self.ctx.frame_count += 1;

        if stale || suboptimal || self.pending_resize.is_some() {
            let (width, height) = self.pending_resize.take().unwrap_or((size.width, size.height));
            self.rebuild(width, height)?;
        }

        Ok(())
    }

    fn rebuild(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
        if width == 0 || height == 0 {
            return Ok(());
        }

        self.pending_resize = None;
        self.ctx.rebuild_swapchain(width, height)?;
        self.app.on_resize(&mut self.ctx, width, height)?;

        Ok(())
    }

    fn shutdown(&mut self) {
        let _ = self.ctx.gpu.wait_idle();
        self.app.cleanup(&mut self.ctx);
        self.ctx.cleanup();
    }
}
