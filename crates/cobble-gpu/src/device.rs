//! Logical device creation.

use crate::error::{GpuError, Result};
use crate::physical::{DeviceRequirements, PhysicalDeviceCandidate};
use crate::queue::ChosenQueueFamilies;
use ash::vk;

/// The logical device and its resolved queues.
///
/// `handle` is owned exclusively; [`crate::context::GpuContext`] destroys it
/// exactly once at shutdown. Queue handles need no destruction of their own.
pub struct RenderDevice {
    /// Owned device handle.
    pub handle: ash::Device,
    /// Queue driving graphics submissions.
    pub graphics_queue: vk::Queue,
    /// Queue driving presentation. May be the same handle as `graphics_queue`.
    pub present_queue: vk::Queue,
    /// The family assignment the queues were retrieved from.
    pub families: ChosenQueueFamilies,
}

/// Create the logical device for a selected candidate and retrieve its queues.
///
/// Requests one queue per chosen family (deduplicated when graphics and
/// present coincide) at priority 1.0, and enables exactly the required
/// extensions plus the candidate's recorded feature set. Creation failure is
/// fatal; it indicates a driver or environment problem, not transient load.
///
/// # Safety
/// The instance and the candidate's device handle must be valid.
pub unsafe fn create_device(
    instance: &ash::Instance,
    candidate: &PhysicalDeviceCandidate,
    requirements: &DeviceRequirements,
) -> Result<RenderDevice> {
    let families = candidate
        .chosen
        .ok_or(GpuError::NoSuitableDevice)?;

    let queue_priority = 1.0_f32;
    let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = families
        .unique_indices()
        .into_iter()
        .map(|family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(std::slice::from_ref(&queue_priority))
        })
        .collect();

    let extension_names: Vec<*const i8> = requirements
        .extensions
        .iter()
        .map(|ext| ext.as_ptr())
        .collect();

    let features = candidate.enabled_features.to_vk();

    let create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&extension_names)
        .enabled_features(&features);

    let handle = instance
        .create_device(candidate.handle, &create_info, None)
        .map_err(GpuError::DeviceCreation)?;

    let graphics_queue = handle.get_device_queue(families.graphics, 0);
    let present_queue = handle.get_device_queue(families.present, 0);

    tracing::debug!(
        "logical device created (graphics family {}, present family {})",
        families.graphics,
        families.present
    );

    Ok(RenderDevice {
        handle,
        graphics_queue,
        present_queue,
        families,
    })
}
