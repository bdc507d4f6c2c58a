//! Vulkan backend for the Cobble engine.
//!
//! This crate provides:
//! - Instance and surface bring-up
//! - Physical device enumeration, scoring, and selection
//! - Queue family negotiation and logical device creation
//! - Swapchain negotiation and lifecycle (including resize rebuilds)
//! - Frame synchronization and presentation

pub mod capabilities;
pub mod command;
pub mod context;
pub mod device;
pub mod error;
pub mod format;
pub mod instance;
pub mod physical;
pub mod present;
pub mod queue;
pub mod surface;
pub mod swapchain;
pub mod sync;

pub use capabilities::{DeviceFeatures, DeviceKind, DeviceProfile, GpuVendor};
pub use command::{submit_command_buffers, CommandPool};
pub use context::{GpuConfig, GpuContext};
pub use device::RenderDevice;
pub use error::{GpuError, Result};
pub use format::PixelFormat;
pub use physical::{DeviceRequirements, PhysicalDeviceCandidate};
pub use present::submit_present;
pub use queue::{ChosenQueueFamilies, QueueCaps, QueueFamilyInfo};
pub use surface::{SurfaceContext, SurfaceSupport};
pub use swapchain::{ImageAcquire, Swapchain};
pub use sync::{FrameSlot, FrameSynchronizer, FRAMES_IN_FLIGHT};
