//! GPU error types.

use ash::vk;
use thiserror::Error;

/// GPU-related errors.
///
/// Everything here is fatal from the frame loop's point of view. Transient
/// swapchain staleness is deliberately *not* an error: it travels as
/// [`crate::swapchain::ImageAcquire::Stale`] or the `stale` flag returned by
/// [`crate::present::submit_present`] and is handled by a rebuild.
#[derive(Error, Debug)]
pub enum GpuError {
    /// Vulkan error.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// No device on the host supports Vulkan at all.
    #[error("no graphics device supports Vulkan")]
    NoDeviceFound,

    /// Devices exist, but none passed the mandatory capability checks.
    #[error("no suitable graphics device found")]
    NoSuitableDevice,

    /// Logical device creation failed. Indicates a driver or environment
    /// problem, never retried.
    #[error("logical device creation failed: {0}")]
    DeviceCreation(vk::Result),

    /// Presentation returned something other than success or staleness.
    /// Usually device loss.
    #[error("presentation failed: {0}")]
    Presentation(vk::Result),

    /// Surface creation failed.
    #[error("surface creation failed: {0}")]
    SurfaceCreation(String),

    /// Swapchain creation failed.
    #[error("swapchain creation failed: {0}")]
    SwapchainCreation(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;
