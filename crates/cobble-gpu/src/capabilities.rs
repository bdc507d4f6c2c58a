//! Physical device capability enumeration.
//!
//! [`DeviceProfile::query`] gathers everything selection needs in one pass:
//! properties, limits, the supported extension set, the supported feature
//! set, and a memory heap summary. The profile is immutable after
//! construction; the selector only reads and compares.

use ash::vk;
use bitflags::bitflags;
use std::collections::HashSet;
use std::ffi::CStr;

/// GPU vendor identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    Apple,
    Other(u32),
}

impl GpuVendor {
    /// Identify vendor from PCI vendor ID.
    pub fn from_vendor_id(id: u32) -> Self {
        match id {
            0x10DE => Self::Nvidia,
            0x1002 => Self::Amd,
            0x8086 => Self::Intel,
            0x106B => Self::Apple,
            other => Self::Other(other),
        }
    }
}

/// Device type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Discrete,
    Integrated,
    Virtual,
    Cpu,
    Other,
}

impl DeviceKind {
    /// Classify from the raw device type code.
    pub fn from_vk(device_type: vk::PhysicalDeviceType) -> Self {
        match device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => Self::Discrete,
            vk::PhysicalDeviceType::INTEGRATED_GPU => Self::Integrated,
            vk::PhysicalDeviceType::VIRTUAL_GPU => Self::Virtual,
            vk::PhysicalDeviceType::CPU => Self::Cpu,
            _ => Self::Other,
        }
    }
}

bitflags! {
    /// Device features the engine knows how to request.
    ///
    /// A closed set; conversion to and from `vk::PhysicalDeviceFeatures`
    /// happens only at the device-creation boundary.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DeviceFeatures: u32 {
        const SHADER_CLIP_DISTANCE = 1;
        const SAMPLER_ANISOTROPY = 1 << 1;
        const FILL_MODE_NON_SOLID = 1 << 2;
        const GEOMETRY_SHADER = 1 << 3;
        const WIDE_LINES = 1 << 4;
    }
}

impl DeviceFeatures {
    /// Collect the supported subset from a raw feature query.
    pub fn from_vk(features: &vk::PhysicalDeviceFeatures) -> Self {
        let mut set = Self::empty();
        if features.shader_clip_distance == vk::TRUE {
            set |= Self::SHADER_CLIP_DISTANCE;
        }
        if features.sampler_anisotropy == vk::TRUE {
            set |= Self::SAMPLER_ANISOTROPY;
        }
        if features.fill_mode_non_solid == vk::TRUE {
            set |= Self::FILL_MODE_NON_SOLID;
        }
        if features.geometry_shader == vk::TRUE {
            set |= Self::GEOMETRY_SHADER;
        }
        if features.wide_lines == vk::TRUE {
            set |= Self::WIDE_LINES;
        }
        set
    }

    /// Build the enable-struct for device creation.
    pub fn to_vk(self) -> vk::PhysicalDeviceFeatures {
        vk::PhysicalDeviceFeatures::default()
            .shader_clip_distance(self.contains(Self::SHADER_CLIP_DISTANCE))
            .sampler_anisotropy(self.contains(Self::SAMPLER_ANISOTROPY))
            .fill_mode_non_solid(self.contains(Self::FILL_MODE_NON_SOLID))
            .geometry_shader(self.contains(Self::GEOMETRY_SHADER))
            .wide_lines(self.contains(Self::WIDE_LINES))
    }
}

/// Limits the selector and swapchain negotiation care about.
#[derive(Debug, Clone, Copy)]
pub struct DeviceLimits {
    pub max_image_dimension_2d: u32,
    pub max_framebuffer_width: u32,
    pub max_framebuffer_height: u32,
    pub max_memory_allocation_count: u32,
}

/// Memory heap summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryProfile {
    /// Device-local memory in MB.
    pub device_local_mb: u64,
    /// Host-visible memory in MB.
    pub host_visible_mb: u64,
}

/// Everything selection needs to know about one physical device.
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    /// Device name.
    pub name: String,
    /// GPU vendor.
    pub vendor: GpuVendor,
    /// Device type classification.
    pub kind: DeviceKind,
    /// Vulkan API version.
    pub api_version: u32,
    /// Driver version.
    pub driver_version: u32,
    /// Relevant limits.
    pub limits: DeviceLimits,
    /// Supported device extensions by name.
    pub extensions: HashSet<String>,
    /// Supported features.
    pub features: DeviceFeatures,
    /// Memory heap summary.
    pub memory: MemoryProfile,
}

impl DeviceProfile {
    /// Query the profile of a physical device.
    ///
    /// # Safety
    /// The instance and physical device must be valid.
    pub unsafe fn query(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> Self {
        let properties = instance.get_physical_device_properties(physical_device);
        let features = instance.get_physical_device_features(physical_device);
        let memory_properties = instance.get_physical_device_memory_properties(physical_device);

        let extension_properties = instance
            .enumerate_device_extension_properties(physical_device)
            .unwrap_or_default();

        let extensions: HashSet<String> = extension_properties
            .iter()
            .filter_map(|ext| {
                CStr::from_ptr(ext.extension_name.as_ptr())
                    .to_str()
                    .ok()
                    .map(String::from)
            })
            .collect();

        let name = CStr::from_ptr(properties.device_name.as_ptr())
            .to_string_lossy()
            .into_owned();

        let heap_mb = |wanted: vk::MemoryHeapFlags, invert: bool| -> u64 {
            memory_properties
                .memory_heaps
                .iter()
                .take(memory_properties.memory_heap_count as usize)
                .filter(|heap| heap.flags.contains(wanted) != invert)
                .map(|heap| heap.size / (1024 * 1024))
                .sum()
        };

        Self {
            name,
            vendor: GpuVendor::from_vendor_id(properties.vendor_id),
            kind: DeviceKind::from_vk(properties.device_type),
            api_version: properties.api_version,
            driver_version: properties.driver_version,
            limits: DeviceLimits {
                max_image_dimension_2d: properties.limits.max_image_dimension2_d,
                max_framebuffer_width: properties.limits.max_framebuffer_width,
                max_framebuffer_height: properties.limits.max_framebuffer_height,
                max_memory_allocation_count: properties.limits.max_memory_allocation_count,
            },
            extensions,
            features: DeviceFeatures::from_vk(&features),
            memory: MemoryProfile {
                device_local_mb: heap_mb(vk::MemoryHeapFlags::DEVICE_LOCAL, false),
                host_visible_mb: heap_mb(vk::MemoryHeapFlags::DEVICE_LOCAL, true),
            },
        }
    }

    /// Check that every named extension is supported.
    pub fn supports_extensions(&self, required: &[&CStr]) -> bool {
        required.iter().all(|ext| {
            ext.to_str()
                .is_ok_and(|name| self.extensions.contains(name))
        })
    }

    /// Check that every requested feature is supported.
    pub fn supports_features(&self, required: DeviceFeatures) -> bool {
        self.features.contains(required)
    }

    /// Human-readable one-liner for logs.
    pub fn summary(&self) -> String {
        format!(
            "{} ({:?}, {:?}) - Vulkan {}.{}.{} - {} MB VRAM",
            self.name,
            self.vendor,
            self.kind,
            vk::api_version_major(self.api_version),
            vk::api_version_minor(self.api_version),
            vk::api_version_patch(self.api_version),
            self.memory.device_local_mb,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_with(extensions: &[&str], features: DeviceFeatures) -> DeviceProfile {
        DeviceProfile {
            name: "test".to_string(),
            vendor: GpuVendor::Other(0),
            kind: DeviceKind::Integrated,
            api_version: vk::API_VERSION_1_3,
            driver_version: 0,
            limits: DeviceLimits {
                max_image_dimension_2d: 4096,
                max_framebuffer_width: 4096,
                max_framebuffer_height: 4096,
                max_memory_allocation_count: 4096,
            },
            extensions: extensions.iter().map(|s| (*s).to_string()).collect(),
            features,
            memory: MemoryProfile::default(),
        }
    }

    #[test]
    fn vendor_identification() {
        assert_eq!(GpuVendor::from_vendor_id(0x10DE), GpuVendor::Nvidia);
        assert_eq!(GpuVendor::from_vendor_id(0x1002), GpuVendor::Amd);
        assert_eq!(GpuVendor::from_vendor_id(0x8086), GpuVendor::Intel);
        assert_eq!(GpuVendor::from_vendor_id(0x1234), GpuVendor::Other(0x1234));
    }

    #[test]
    fn extension_check_requires_all() {
        let profile = profile_with(&["VK_KHR_swapchain"], DeviceFeatures::empty());
        assert!(profile.supports_extensions(&[c"VK_KHR_swapchain"]));
        assert!(!profile.supports_extensions(&[c"VK_KHR_swapchain", c"VK_KHR_ray_query"]));
    }

    #[test]
    fn feature_check_is_subset() {
        let profile = profile_with(
            &[],
            DeviceFeatures::SHADER_CLIP_DISTANCE | DeviceFeatures::SAMPLER_ANISOTROPY,
        );
        assert!(profile.supports_features(DeviceFeatures::SHADER_CLIP_DISTANCE));
        assert!(profile.supports_features(DeviceFeatures::empty()));
        assert!(!profile.supports_features(DeviceFeatures::GEOMETRY_SHADER));
    }

    #[test]
    fn feature_set_round_trips_through_vk() {
        let set = DeviceFeatures::SHADER_CLIP_DISTANCE | DeviceFeatures::WIDE_LINES;
        assert_eq!(DeviceFeatures::from_vk(&set.to_vk()), set);
    }
}
