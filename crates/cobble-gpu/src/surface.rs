//! Window surface management.
//!
//! Wraps surface creation over raw window handles and the surface-relative
//! capability queries that device selection and swapchain negotiation consume.

use crate::error::{GpuError, Result};
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

/// A window surface and its instance-level loader.
///
/// Created before device selection (suitability is surface-relative);
/// destroyed after the swapchain and before the instance.
pub struct SurfaceContext {
    /// The surface handle.
    pub surface: vk::SurfaceKHR,
    /// Surface extension loader.
    pub loader: ash::khr::surface::Instance,
}

impl SurfaceContext {
    /// Create a surface for a window.
    ///
    /// # Safety
    /// The entry and instance must be valid and the window must have valid
    /// handles for the lifetime of the surface.
    pub unsafe fn new<W>(
        entry: &ash::Entry,
        instance: &ash::Instance,
        window: &W,
    ) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let display = window
            .display_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("no display handle: {e}")))?;
        let window_handle = window
            .window_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("no window handle: {e}")))?;

        let surface = ash_window::create_surface(
            entry,
            instance,
            display.as_raw(),
            window_handle.as_raw(),
            None,
        )
        .map_err(|e| GpuError::SurfaceCreation(e.to_string()))?;

        let loader = ash::khr::surface::Instance::new(entry, instance);

        Ok(Self { surface, loader })
    }

    /// Query what the surface supports on a physical device.
    ///
    /// # Safety
    /// The physical device must be valid.
    pub unsafe fn support(&self, physical_device: vk::PhysicalDevice) -> Result<SurfaceSupport> {
        let capabilities = self
            .loader
            .get_physical_device_surface_capabilities(physical_device, self.surface)?;
        let formats = self
            .loader
            .get_physical_device_surface_formats(physical_device, self.surface)?;
        let present_modes = self
            .loader
            .get_physical_device_surface_present_modes(physical_device, self.surface)?;

        Ok(SurfaceSupport {
            capabilities,
            formats,
            present_modes,
        })
    }

    /// Destroy the surface.
    ///
    /// # Safety
    /// The surface must no longer be referenced by any swapchain.
    pub unsafe fn destroy(&self) {
        self.loader.destroy_surface(self.surface, None);
    }
}

/// Surface capability query result.
pub struct SurfaceSupport {
    /// Raw surface capabilities (image counts, extents, transforms).
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats.
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes.
    pub present_modes: Vec<vk::PresentModeKHR>,
}
