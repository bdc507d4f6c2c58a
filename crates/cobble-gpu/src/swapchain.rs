//! Swapchain creation and lifecycle.
//!
//! Negotiation (extent, image count, sharing mode, format, present mode) is
//! split into pure helpers over the queried surface data; the [`Swapchain`]
//! itself owns the handle plus one image view and one framebuffer per image.
//! The only mutation a swapchain ever sees is a full destroy-then-recreate.

use crate::error::{GpuError, Result};
use crate::format::PixelFormat;
use crate::queue::ChosenQueueFamilies;
use crate::surface::SurfaceSupport;
use ash::vk;

/// Sentinel in `current_extent` meaning the surface leaves the size to us.
const EXTENT_UNDEFINED: u32 = u32::MAX;

/// Outcome of an image acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageAcquire {
    /// An image is ready to be rendered to.
    Acquired {
        /// Swapchain image index.
        index: u32,
        /// The image is usable this frame, but the swapchain no longer
        /// matches the surface exactly and should be rebuilt soon.
        suboptimal: bool,
    },
    /// The swapchain no longer matches the surface; rebuild before rendering.
    Stale,
}

/// Derive the swapchain image count from the surface capabilities.
///
/// One above the minimum, so the CPU never waits for the driver to reclaim
/// an image before starting the next frame; clamped to the maximum when the
/// surface reports one (zero means unbounded).
pub fn select_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let mut count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 && count > capabilities.max_image_count {
        count = capabilities.max_image_count;
    }
    count.max(1)
}

/// Resolve the swapchain extent.
///
/// A fixed `current_extent` from the surface is used verbatim; otherwise the
/// window's pixel size is clamped component-wise into the surface's bounds.
pub fn calculate_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    window_width: u32,
    window_height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != EXTENT_UNDEFINED {
        return capabilities.current_extent;
    }

    vk::Extent2D {
        width: window_width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: window_height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

/// Select the surface format, preferring sRGB BGRA.
pub fn select_surface_format(available: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    available
        .iter()
        .find(|f| {
            f.format == PixelFormat::Bgra8Srgb.to_vk()
                && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .copied()
        .unwrap_or(available[0])
}

/// Select the present mode.
///
/// FIFO is the only mode Vulkan guarantees, and the one vsync wants;
/// without vsync, mailbox beats immediate beats FIFO.
pub fn select_present_mode(available: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
    if vsync {
        return vk::PresentModeKHR::FIFO;
    }

    for wanted in [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE] {
        if available.contains(&wanted) {
            return wanted;
        }
    }

    vk::PresentModeKHR::FIFO
}

/// Image sharing mode for the chosen queue families.
///
/// Exclusive ownership when one family serves both graphics and present;
/// concurrent sharing across both indices otherwise.
pub fn sharing_mode(families: ChosenQueueFamilies) -> (vk::SharingMode, Vec<u32>) {
    if families.unified() {
        (vk::SharingMode::EXCLUSIVE, vec![])
    } else {
        (
            vk::SharingMode::CONCURRENT,
            vec![families.graphics, families.present],
        )
    }
}

/// A presentable swapchain and its per-image resources.
pub struct Swapchain {
    /// Owned swapchain handle.
    pub handle: vk::SwapchainKHR,
    /// The presentable images, owned by the swapchain handle.
    pub images: Vec<vk::Image>,
    /// One view per image.
    pub image_views: Vec<vk::ImageView>,
    /// One framebuffer per image, bound to the render pass given at creation.
    pub framebuffers: Vec<vk::Framebuffer>,
    /// Negotiated image format.
    pub format: vk::Format,
    /// Negotiated color space.
    pub color_space: vk::ColorSpaceKHR,
    /// Negotiated present mode.
    pub present_mode: vk::PresentModeKHR,
    /// Negotiated image extent.
    pub extent: vk::Extent2D,
}

impl Swapchain {
    /// Create a swapchain and its per-image views and framebuffers.
    ///
    /// `old_swapchain` lets the driver recycle the retired chain on rebuild;
    /// the caller still destroys the old object afterwards.
    ///
    /// # Safety
    /// All handles must be valid.
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn new(
        device: &ash::Device,
        swapchain_loader: &ash::khr::swapchain::Device,
        surface: vk::SurfaceKHR,
        support: &SurfaceSupport,
        families: ChosenQueueFamilies,
        render_pass: vk::RenderPass,
        window_width: u32,
        window_height: u32,
        vsync: bool,
        old_swapchain: Option<vk::SwapchainKHR>,
    ) -> Result<Self> {
        let surface_format = select_surface_format(&support.formats);
        let present_mode = select_present_mode(&support.present_modes, vsync);
        let extent = calculate_extent(&support.capabilities, window_width, window_height);
        let image_count = select_image_count(&support.capabilities);
        let (image_sharing_mode, queue_family_indices) = sharing_mode(families);

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(image_sharing_mode)
            .queue_family_indices(&queue_family_indices)
            .pre_transform(support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain.unwrap_or(vk::SwapchainKHR::null()));

        let handle = swapchain_loader
            .create_swapchain(&create_info, None)
            .map_err(|e| GpuError::SwapchainCreation(e.to_string()))?;

        let images = swapchain_loader.get_swapchain_images(handle)?;

        let image_views: Vec<vk::ImageView> = images
            .iter()
            .map(|&image| {
                let view_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(surface_format.format)
                    .components(vk::ComponentMapping::default())
                    .subresource_range(
                        vk::ImageSubresourceRange::default()
                            .aspect_mask(vk::ImageAspectFlags::COLOR)
                            .base_mip_level(0)
                            .level_count(1)
                            .base_array_layer(0)
                            .layer_count(1),
                    );

                device.create_image_view(&view_info, None)
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let framebuffers: Vec<vk::Framebuffer> = image_views
            .iter()
            .map(|view| {
                let attachments = [*view];
                let framebuffer_info = vk::FramebufferCreateInfo::default()
                    .render_pass(render_pass)
                    .attachments(&attachments)
                    .width(extent.width)
                    .height(extent.height)
                    .layers(1);

                device.create_framebuffer(&framebuffer_info, None)
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        tracing::info!(
            "swapchain: {}x{}, {} images, {:?} ({:?})",
            extent.width,
            extent.height,
            images.len(),
            PixelFormat::from_vk(surface_format.format),
            present_mode
        );

        Ok(Self {
            handle,
            images,
            image_views,
            framebuffers,
            format: surface_format.format,
            color_space: surface_format.color_space,
            present_mode,
            extent,
        })
    }

    /// Number of presentable images.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Acquire the next presentable image.
    ///
    /// An out-of-date swapchain yields [`ImageAcquire::Stale`] instead of an
    /// index; the caller rebuilds and retries next frame. A suboptimal
    /// acquisition still yields the index.
    ///
    /// # Safety
    /// All handles must be valid.
    pub unsafe fn acquire(
        &self,
        swapchain_loader: &ash::khr::swapchain::Device,
        image_available: vk::Semaphore,
        timeout_ns: u64,
    ) -> Result<ImageAcquire> {
        let result = swapchain_loader.acquire_next_image(
            self.handle,
            timeout_ns,
            image_available,
            vk::Fence::null(),
        );

        match result {
            Ok((index, suboptimal)) => Ok(ImageAcquire::Acquired { index, suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(ImageAcquire::Stale),
            Err(e) => Err(GpuError::from(e)),
        }
    }

    /// Destroy the swapchain and its per-image resources.
    ///
    /// Release order is framebuffers, then image views, then the swapchain
    /// handle; the objects form a dependency chain.
    ///
    /// # Safety
    /// No in-flight frame may still reference the images.
    pub unsafe fn destroy(
        &self,
        device: &ash::Device,
        swapchain_loader: &ash::khr::swapchain::Device,
    ) {
        for &framebuffer in &self.framebuffers {
            device.destroy_framebuffer(framebuffer, None);
        }
        for &view in &self.image_views {
            device.destroy_image_view(view, None);
        }
        swapchain_loader.destroy_swapchain(self.handle, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capabilities(min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            current_extent: vk::Extent2D {
                width: EXTENT_UNDEFINED,
                height: EXTENT_UNDEFINED,
            },
            min_image_extent: vk::Extent2D {
                width: 1,
                height: 1,
            },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 4096,
            },
            ..Default::default()
        }
    }

    #[test]
    fn image_count_is_min_plus_one_when_unbounded() {
        assert_eq!(select_image_count(&capabilities(2, 0)), 3);
    }

    #[test]
    fn image_count_clamps_to_max() {
        assert_eq!(select_image_count(&capabilities(3, 3)), 3);
    }

    #[test]
    fn image_count_within_bounds_when_max_is_roomy() {
        let caps = capabilities(2, 10);
        let count = select_image_count(&caps);
        assert_eq!(count, 3);
        assert!(count >= caps.min_image_count && count <= caps.max_image_count);
    }

    #[test]
    fn fixed_current_extent_wins_over_window_size() {
        let mut caps = capabilities(2, 0);
        caps.current_extent = vk::Extent2D {
            width: 800,
            height: 600,
        };

        let extent = calculate_extent(&caps, 1920, 1080);
        assert_eq!(extent.width, 800);
        assert_eq!(extent.height, 600);
    }

    #[test]
    fn window_size_clamps_component_wise() {
        let mut caps = capabilities(2, 0);
        caps.max_image_extent = vk::Extent2D {
            width: 1280,
            height: 2160,
        };

        let extent = calculate_extent(&caps, 1920, 1080);
        assert_eq!(extent.width, 1280);
        assert_eq!(extent.height, 1080);
    }

    #[test]
    fn extent_rederivation_is_idempotent() {
        let caps = capabilities(2, 0);
        let first = calculate_extent(&caps, 1024, 768);
        let second = calculate_extent(&caps, 1024, 768);
        assert_eq!(first, second);
        assert_eq!(select_image_count(&caps), select_image_count(&caps));
    }

    #[test]
    fn prefers_bgra8_srgb() {
        let formats = [
            vk::SurfaceFormatKHR {
                format: vk::Format::R8G8B8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
        ];

        assert_eq!(
            select_surface_format(&formats).format,
            vk::Format::B8G8R8A8_SRGB
        );
    }

    #[test]
    fn falls_back_to_first_format() {
        let formats = [vk::SurfaceFormatKHR {
            format: vk::Format::R8G8B8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }];

        assert_eq!(
            select_surface_format(&formats).format,
            vk::Format::R8G8B8A8_UNORM
        );
    }

    #[test]
    fn vsync_forces_fifo() {
        let modes = [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::FIFO];
        assert_eq!(select_present_mode(&modes, true), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn no_vsync_prefers_mailbox_then_immediate() {
        let with_mailbox = [
            vk::PresentModeKHR::IMMEDIATE,
            vk::PresentModeKHR::MAILBOX,
            vk::PresentModeKHR::FIFO,
        ];
        assert_eq!(
            select_present_mode(&with_mailbox, false),
            vk::PresentModeKHR::MAILBOX
        );

        let without_mailbox = [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO];
        assert_eq!(
            select_present_mode(&without_mailbox, false),
            vk::PresentModeKHR::IMMEDIATE
        );

        let fifo_only = [vk::PresentModeKHR::FIFO];
        assert_eq!(
            select_present_mode(&fifo_only, false),
            vk::PresentModeKHR::FIFO
        );
    }

    #[test]
    fn unified_families_use_exclusive_sharing() {
        let (mode, indices) = sharing_mode(ChosenQueueFamilies {
            graphics: 1,
            present: 1,
        });
        assert_eq!(mode, vk::SharingMode::EXCLUSIVE);
        assert!(indices.is_empty());
    }

    #[test]
    fn split_families_share_concurrently() {
        let (mode, indices) = sharing_mode(ChosenQueueFamilies {
            graphics: 0,
            present: 2,
        });
        assert_eq!(mode, vk::SharingMode::CONCURRENT);
        assert_eq!(indices, vec![0, 2]);
    }
}
