//! GPU context management.

use crate::device::{create_device, RenderDevice};
use crate::error::{GpuError, Result};
use crate::instance::create_instance;
use crate::physical::{select_physical_device, DeviceRequirements, PhysicalDeviceCandidate};
use crate::queue::ChosenQueueFamilies;
use crate::surface::SurfaceContext;
use crate::swapchain::Swapchain;
use crate::sync::FRAMES_IN_FLIGHT;
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

/// Backend configuration.
///
/// Plain data handed to [`GpuContext::new`] once; there is no staged
/// construction state.
pub struct GpuConfig {
    /// Application name reported to the driver.
    pub app_name: String,
    /// Enable validation layers.
    pub validation: bool,
    /// Frame slots the synchronizer rotates through.
    pub frames_in_flight: usize,
    /// Device requirements for selection and creation.
    pub requirements: DeviceRequirements,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            app_name: "Cobble".to_string(),
            validation: cfg!(debug_assertions),
            frames_in_flight: FRAMES_IN_FLIGHT,
            requirements: DeviceRequirements::default(),
        }
    }
}

/// Main GPU context holding the instance, selected device, and queues.
///
/// Owns the logical device exclusively; `Drop` destroys device then
/// instance. The surface returned alongside it must be destroyed first
/// (see [`SurfaceContext::destroy`]).
pub struct GpuContext {
    // Entry must be kept alive for the lifetime of the context
    #[allow(dead_code)]
    entry: ash::Entry,
    instance: ash::Instance,
    candidate: PhysicalDeviceCandidate,
    device: RenderDevice,
    swapchain_loader: ash::khr::swapchain::Device,
}

impl GpuContext {
    /// Bring the backend up against a window: instance, surface, device
    /// selection, logical device, queues.
    ///
    /// The surface is created before selection because suitability is
    /// surface-relative (a device without a present-capable family for this
    /// surface is not suitable at all).
    ///
    /// # Safety
    /// The window must have valid handles outliving the returned surface.
    pub unsafe fn new<W>(config: &GpuConfig, window: &W) -> Result<(Self, SurfaceContext)>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let entry = ash::Entry::load()
            .map_err(|e| GpuError::Other(format!("failed to load Vulkan: {e}")))?;

        let instance = create_instance(&entry, &config.app_name, config.validation)?;

        let surface = SurfaceContext::new(&entry, &instance, window)?;

        let candidate = select_physical_device(
            &instance,
            &surface.loader,
            surface.surface,
            &config.requirements,
        )?;

        let device = create_device(&instance, &candidate, &config.requirements)?;

        let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device.handle);

        Ok((
            Self {
                entry,
                instance,
                candidate,
                device,
                swapchain_loader,
            },
            surface,
        ))
    }

    /// The logical device handle.
    pub fn device(&self) -> &ash::Device {
        &self.device.handle
    }

    /// The selected physical device handle.
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.candidate.handle
    }

    /// The selected candidate (profile, families, verdict).
    pub fn candidate(&self) -> &PhysicalDeviceCandidate {
        &self.candidate
    }

    /// The graphics queue.
    pub fn graphics_queue(&self) -> vk::Queue {
        self.device.graphics_queue
    }

    /// The presentation queue.
    pub fn present_queue(&self) -> vk::Queue {
        self.device.present_queue
    }

    /// The chosen queue family assignment.
    pub fn queue_families(&self) -> ChosenQueueFamilies {
        self.device.families
    }

    /// The swapchain extension loader.
    pub fn swapchain_loader(&self) -> &ash::khr::swapchain::Device {
        &self.swapchain_loader
    }

    /// The Vulkan instance handle.
    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    /// Create (or rebuild) a swapchain for a surface, re-deriving everything
    /// from the surface's current capabilities.
    ///
    /// # Safety
    /// All handles must be valid; on rebuild, no in-flight frame may still
    /// reference the old images.
    pub unsafe fn create_swapchain(
        &self,
        surface: &SurfaceContext,
        render_pass: vk::RenderPass,
        window_width: u32,
        window_height: u32,
        vsync: bool,
        old_swapchain: Option<vk::SwapchainKHR>,
    ) -> Result<Swapchain> {
        let support = surface.support(self.physical_device())?;

        Swapchain::new(
            self.device(),
            &self.swapchain_loader,
            surface.surface,
            &support,
            self.device.families,
            render_pass,
            window_width,
            window_height,
            vsync,
            old_swapchain,
        )
    }

    /// Wait for the device to go idle.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device.handle.device_wait_idle()?;
        }
        Ok(())
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.handle.device_wait_idle();
            self.device.handle.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}
