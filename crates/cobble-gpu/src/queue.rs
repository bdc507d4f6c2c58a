//! Queue family discovery and negotiation.
//!
//! Families are discovered once per (device, surface) pair, with presentation
//! support resolved up front so everything downstream is a pure function over
//! the discovered list.

use crate::error::Result;
use ash::vk;
use bitflags::bitflags;

bitflags! {
    /// Queue capabilities, as a set over a closed enumeration.
    ///
    /// Converted from `vk::QueueFlags` only at the discovery boundary;
    /// presentation is surface-relative and tracked separately on
    /// [`QueueFamilyInfo`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct QueueCaps: u32 {
        const GRAPHICS = 1;
        const COMPUTE = 1 << 1;
        const TRANSFER = 1 << 2;
        const SPARSE_BINDING = 1 << 3;
    }
}

impl QueueCaps {
    /// Collect the capability set from a raw flag mask.
    pub fn from_vk(flags: vk::QueueFlags) -> Self {
        let mut caps = Self::empty();
        if flags.contains(vk::QueueFlags::GRAPHICS) {
            caps |= Self::GRAPHICS;
        }
        if flags.contains(vk::QueueFlags::COMPUTE) {
            caps |= Self::COMPUTE;
        }
        if flags.contains(vk::QueueFlags::TRANSFER) {
            caps |= Self::TRANSFER;
        }
        if flags.contains(vk::QueueFlags::SPARSE_BINDING) {
            caps |= Self::SPARSE_BINDING;
        }
        caps
    }
}

/// One queue family of a physical device.
///
/// Carries its index rather than a reference to the owning device; validity
/// is scoped to the device the family was discovered from.
#[derive(Debug, Clone, Copy)]
pub struct QueueFamilyInfo {
    /// Family index on the owning device.
    pub index: u32,
    /// Number of queues the family exposes.
    pub count: u32,
    /// Capability set.
    pub caps: QueueCaps,
    /// Whether the family can present to the surface it was evaluated against.
    pub present: bool,
}

impl QueueFamilyInfo {
    pub fn supports_graphics(&self) -> bool {
        self.caps.contains(QueueCaps::GRAPHICS)
    }

    pub fn supports_present(&self) -> bool {
        self.present
    }
}

/// Family indices chosen to supply graphics and presentation work.
///
/// The two may coincide; when they do, swapchain images stay exclusive to a
/// single family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChosenQueueFamilies {
    pub graphics: u32,
    pub present: u32,
}

impl ChosenQueueFamilies {
    /// Whether one family serves both roles.
    pub fn unified(&self) -> bool {
        self.graphics == self.present
    }

    /// The distinct family indices, graphics first.
    pub fn unique_indices(&self) -> Vec<u32> {
        if self.unified() {
            vec![self.graphics]
        } else {
            vec![self.graphics, self.present]
        }
    }
}

/// Discover every queue family of a device, resolving presentation support
/// against the given surface.
///
/// # Safety
/// All handles must be valid.
pub unsafe fn discover_families(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
) -> Result<Vec<QueueFamilyInfo>> {
    let properties = instance.get_physical_device_queue_family_properties(physical_device);

    let mut families = Vec::with_capacity(properties.len());
    for (index, props) in properties.iter().enumerate() {
        let index = index as u32;
        let present = surface_loader.get_physical_device_surface_support(
            physical_device,
            index,
            surface,
        )?;

        families.push(QueueFamilyInfo {
            index,
            count: props.queue_count,
            caps: QueueCaps::from_vk(props.queue_flags),
            present,
        });
    }

    Ok(families)
}

/// Pick the family indices to drive graphics and presentation.
///
/// Prefers a single family offering both (avoids cross-queue image ownership
/// transfers); otherwise falls back to the first graphics-capable and first
/// present-capable families independently. Returns `None` when either
/// capability is wholly absent.
pub fn choose_graphics_and_present(families: &[QueueFamilyInfo]) -> Option<ChosenQueueFamilies> {
    if let Some(both) = families
        .iter()
        .find(|f| f.supports_graphics() && f.supports_present())
    {
        return Some(ChosenQueueFamilies {
            graphics: both.index,
            present: both.index,
        });
    }

    let graphics = families.iter().find(|f| f.supports_graphics())?;
    let present = families.iter().find(|f| f.supports_present())?;

    Some(ChosenQueueFamilies {
        graphics: graphics.index,
        present: present.index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(index: u32, caps: QueueCaps, present: bool) -> QueueFamilyInfo {
        QueueFamilyInfo {
            index,
            count: 1,
            caps,
            present,
        }
    }

    #[test]
    fn caps_from_flag_mask() {
        let caps = QueueCaps::from_vk(vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER);
        assert!(caps.contains(QueueCaps::GRAPHICS));
        assert!(caps.contains(QueueCaps::TRANSFER));
        assert!(!caps.contains(QueueCaps::COMPUTE));
    }

    #[test]
    fn prefers_single_family_for_both_roles() {
        let families = [
            family(0, QueueCaps::GRAPHICS, false),
            family(1, QueueCaps::empty(), true),
            family(2, QueueCaps::GRAPHICS, true),
        ];

        let chosen = choose_graphics_and_present(&families).unwrap();
        assert_eq!(chosen.graphics, 2);
        assert_eq!(chosen.present, 2);
        assert!(chosen.unified());
    }

    #[test]
    fn splits_roles_when_no_family_has_both() {
        let families = [
            family(0, QueueCaps::TRANSFER, false),
            family(1, QueueCaps::GRAPHICS, false),
            family(2, QueueCaps::empty(), true),
        ];

        let chosen = choose_graphics_and_present(&families).unwrap();
        assert_eq!(chosen.graphics, 1);
        assert_eq!(chosen.present, 2);
        assert!(!chosen.unified());
        assert_eq!(chosen.unique_indices(), vec![1, 2]);
    }

    #[test]
    fn rejects_when_a_capability_is_absent() {
        let no_present = [family(0, QueueCaps::GRAPHICS, false)];
        assert!(choose_graphics_and_present(&no_present).is_none());

        let no_graphics = [family(0, QueueCaps::COMPUTE, true)];
        assert!(choose_graphics_and_present(&no_graphics).is_none());

        assert!(choose_graphics_and_present(&[]).is_none());
    }

    #[test]
    fn first_match_wins_deterministically() {
        let families = [
            family(0, QueueCaps::GRAPHICS, true),
            family(1, QueueCaps::GRAPHICS, true),
        ];

        let chosen = choose_graphics_and_present(&families).unwrap();
        assert_eq!(chosen.graphics, 0);
    }
}
