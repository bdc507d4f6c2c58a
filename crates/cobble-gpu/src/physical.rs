//! Physical device selection.
//!
//! Every enumerable device is evaluated against the engine's requirements
//! and given a preference score; the best viable candidate wins. Evaluation
//! is a pure function over queried data so the selection rules are testable
//! without a GPU.

use crate::capabilities::{DeviceFeatures, DeviceKind, DeviceProfile};
use crate::error::{GpuError, Result};
use crate::queue::{choose_graphics_and_present, discover_families, ChosenQueueFamilies, QueueFamilyInfo};
use ash::vk;
use std::ffi::CStr;

/// Score bonus for discrete GPUs.
const DISCRETE_GPU_BONUS: u32 = 1000;

/// What the engine demands (and would like) from a device.
#[derive(Debug, Clone)]
pub struct DeviceRequirements {
    /// Extensions that must be present; absence rejects the device.
    pub extensions: Vec<&'static CStr>,
    /// Features that must be supported; absence rejects the device.
    pub required_features: DeviceFeatures,
    /// Features enabled opportunistically when the device supports them.
    pub optional_features: DeviceFeatures,
}

impl Default for DeviceRequirements {
    fn default() -> Self {
        Self {
            extensions: vec![ash::khr::swapchain::NAME],
            required_features: DeviceFeatures::empty(),
            optional_features: DeviceFeatures::SAMPLER_ANISOTROPY,
        }
    }
}

/// One enumerated device together with its evaluation verdict.
///
/// Immutable once built; the selection process owns candidates until one is
/// promoted to the active device.
#[derive(Debug, Clone)]
pub struct PhysicalDeviceCandidate {
    /// Opaque device handle.
    pub handle: vk::PhysicalDevice,
    /// Queried capability profile.
    pub profile: DeviceProfile,
    /// All queue families, with surface-relative present support resolved.
    pub families: Vec<QueueFamilyInfo>,
    /// Chosen graphics/present assignment, if negotiation succeeded.
    pub chosen: Option<ChosenQueueFamilies>,
    /// Features to enable at device creation: required plus the supported
    /// subset of the optional ones.
    pub enabled_features: DeviceFeatures,
    /// Whether every mandatory check passed. Kept separate from `score` so a
    /// device that legitimately earns zero bonus is distinguishable from a
    /// rejected one.
    pub viable: bool,
    /// Preference score among viable devices.
    pub score: u32,
}

/// Evaluate a device profile against the requirements.
///
/// Checks short-circuit in order: extensions, features, device-type bonus,
/// queue negotiation. Any mandatory failure marks the candidate non-viable
/// with score 0.
pub fn evaluate_candidate(
    handle: vk::PhysicalDevice,
    profile: DeviceProfile,
    families: Vec<QueueFamilyInfo>,
    requirements: &DeviceRequirements,
) -> PhysicalDeviceCandidate {
    let rejected = |profile: DeviceProfile, families: Vec<QueueFamilyInfo>| {
        PhysicalDeviceCandidate {
            handle,
            profile,
            families,
            chosen: None,
            enabled_features: DeviceFeatures::empty(),
            viable: false,
            score: 0,
        }
    };

    if !profile.supports_extensions(&requirements.extensions) {
        return rejected(profile, families);
    }

    if !profile.supports_features(requirements.required_features) {
        return rejected(profile, families);
    }
    let enabled_features =
        requirements.required_features | (requirements.optional_features & profile.features);

    let mut score = 0;
    if profile.kind == DeviceKind::Discrete {
        score += DISCRETE_GPU_BONUS;
    }

    let Some(chosen) = choose_graphics_and_present(&families) else {
        return rejected(profile, families);
    };

    PhysicalDeviceCandidate {
        handle,
        profile,
        families,
        chosen: Some(chosen),
        enabled_features,
        viable: true,
        score,
    }
}

/// Pick the best viable candidate.
///
/// Ties break to the first enumerated candidate. Fails with
/// [`GpuError::NoDeviceFound`] when the list is empty and
/// [`GpuError::NoSuitableDevice`] when nothing is viable.
pub fn pick_best(candidates: Vec<PhysicalDeviceCandidate>) -> Result<PhysicalDeviceCandidate> {
    if candidates.is_empty() {
        return Err(GpuError::NoDeviceFound);
    }

    let best = candidates
        .into_iter()
        .filter(|c| c.viable)
        .reduce(|best, c| if c.score > best.score { c } else { best });

    best.ok_or(GpuError::NoSuitableDevice)
}

/// Enumerate, evaluate, and select the physical device to render with.
///
/// # Safety
/// All handles must be valid.
pub unsafe fn select_physical_device(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    requirements: &DeviceRequirements,
) -> Result<PhysicalDeviceCandidate> {
    let devices = instance.enumerate_physical_devices()?;

    let mut candidates = Vec::with_capacity(devices.len());
    for device in devices {
        let profile = DeviceProfile::query(instance, device);
        let families = discover_families(instance, device, surface_loader, surface)?;
        let candidate = evaluate_candidate(device, profile, families, requirements);

        tracing::debug!(
            "candidate {}: viable={} score={}",
            candidate.profile.name,
            candidate.viable,
            candidate.score
        );
        candidates.push(candidate);
    }

    let best = pick_best(candidates)?;
    tracing::info!("selected GPU: {}", best.profile.summary());

    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{DeviceLimits, GpuVendor, MemoryProfile};
    use crate::queue::QueueCaps;

    fn profile(kind: DeviceKind, extensions: &[&str], features: DeviceFeatures) -> DeviceProfile {
        DeviceProfile {
            name: "test".to_string(),
            vendor: GpuVendor::Other(0),
            kind,
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

    fn graphics_present_family() -> Vec<QueueFamilyInfo> {
        vec![QueueFamilyInfo {
            index: 0,
            count: 1,
            caps: QueueCaps::GRAPHICS,
            present: true,
        }]
    }

    fn requirements() -> DeviceRequirements {
        DeviceRequirements {
            extensions: vec![c"VK_KHR_swapchain"],
            required_features: DeviceFeatures::empty(),
            optional_features: DeviceFeatures::empty(),
        }
    }

    fn candidate(kind: DeviceKind) -> PhysicalDeviceCandidate {
        evaluate_candidate(
            vk::PhysicalDevice::null(),
            profile(kind, &["VK_KHR_swapchain"], DeviceFeatures::empty()),
            graphics_present_family(),
            &requirements(),
        )
    }

    #[test]
    fn missing_extension_rejects() {
        let c = evaluate_candidate(
            vk::PhysicalDevice::null(),
            profile(DeviceKind::Discrete, &[], DeviceFeatures::empty()),
            graphics_present_family(),
            &requirements(),
        );
        assert!(!c.viable);
        assert_eq!(c.score, 0);
        assert!(c.chosen.is_none());
    }

    #[test]
    fn missing_required_feature_rejects() {
        let mut reqs = requirements();
        reqs.required_features = DeviceFeatures::GEOMETRY_SHADER;

        let c = evaluate_candidate(
            vk::PhysicalDevice::null(),
            profile(
                DeviceKind::Discrete,
                &["VK_KHR_swapchain"],
                DeviceFeatures::empty(),
            ),
            graphics_present_family(),
            &reqs,
        );
        assert!(!c.viable);
    }

    #[test]
    fn missing_queue_capability_rejects() {
        let c = evaluate_candidate(
            vk::PhysicalDevice::null(),
            profile(
                DeviceKind::Discrete,
                &["VK_KHR_swapchain"],
                DeviceFeatures::empty(),
            ),
            vec![QueueFamilyInfo {
                index: 0,
                count: 1,
                caps: QueueCaps::GRAPHICS,
                present: false,
            }],
            &requirements(),
        );
        assert!(!c.viable);
    }

    #[test]
    fn split_families_are_still_viable() {
        let c = evaluate_candidate(
            vk::PhysicalDevice::null(),
            profile(
                DeviceKind::Integrated,
                &["VK_KHR_swapchain"],
                DeviceFeatures::empty(),
            ),
            vec![
                QueueFamilyInfo {
                    index: 0,
                    count: 1,
                    caps: QueueCaps::GRAPHICS,
                    present: false,
                },
                QueueFamilyInfo {
                    index: 1,
                    count: 1,
                    caps: QueueCaps::empty(),
                    present: true,
                },
            ],
            &requirements(),
        );
        assert!(c.viable);
        assert_eq!(
            c.chosen,
            Some(ChosenQueueFamilies {
                graphics: 0,
                present: 1
            })
        );
    }

    #[test]
    fn discrete_outranks_integrated_by_exactly_the_bonus() {
        let discrete = candidate(DeviceKind::Discrete);
        let integrated = candidate(DeviceKind::Integrated);
        assert!(discrete.viable && integrated.viable);
        assert_eq!(discrete.score - integrated.score, DISCRETE_GPU_BONUS);
    }

    #[test]
    fn integrated_with_all_checks_passing_is_viable_at_score_zero() {
        let c = candidate(DeviceKind::Integrated);
        assert!(c.viable);
        assert_eq!(c.score, 0);
        assert!(pick_best(vec![c]).is_ok());
    }

    #[test]
    fn optional_features_are_recorded_when_supported() {
        let mut reqs = requirements();
        reqs.optional_features = DeviceFeatures::SAMPLER_ANISOTROPY | DeviceFeatures::WIDE_LINES;

        let c = evaluate_candidate(
            vk::PhysicalDevice::null(),
            profile(
                DeviceKind::Discrete,
                &["VK_KHR_swapchain"],
                DeviceFeatures::SAMPLER_ANISOTROPY,
            ),
            graphics_present_family(),
            &reqs,
        );
        assert!(c.viable);
        assert_eq!(c.enabled_features, DeviceFeatures::SAMPLER_ANISOTROPY);
    }

    #[test]
    fn pick_best_prefers_highest_score() {
        let result =
            pick_best(vec![candidate(DeviceKind::Integrated), candidate(DeviceKind::Discrete)])
                .unwrap();
        assert_eq!(result.score, DISCRETE_GPU_BONUS);
    }

    #[test]
    fn pick_best_breaks_ties_to_first_enumerated() {
        let mut first = candidate(DeviceKind::Discrete);
        first.profile.name = "first".to_string();
        let mut second = candidate(DeviceKind::Discrete);
        second.profile.name = "second".to_string();

        let result = pick_best(vec![first, second]).unwrap();
        assert_eq!(result.profile.name, "first");
    }

    #[test]
    fn no_devices_at_all() {
        assert!(matches!(pick_best(vec![]), Err(GpuError::NoDeviceFound)));
    }

    #[test]
    fn all_rejected_means_no_suitable_device() {
        let c = evaluate_candidate(
            vk::PhysicalDevice::null(),
            profile(DeviceKind::Discrete, &[], DeviceFeatures::empty()),
            graphics_present_family(),
            &requirements(),
        );
        assert!(matches!(
            pick_best(vec![c]),
            Err(GpuError::NoSuitableDevice)
        ));
    }
}
