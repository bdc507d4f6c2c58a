//! Frame synchronization.
//!
//! A fixed pool of [`FrameSlot`]s bounds how far CPU submission may run
//! ahead of the GPU. The slot cursor rotates independently of the swapchain
//! image count; an image-in-flight map keeps a swapchain image from being
//! reused while an earlier slot still presents it.

use crate::error::Result;
use ash::vk;

/// Default number of frames the CPU may queue before blocking.
pub const FRAMES_IN_FLIGHT: usize = 2;

/// Defensive ceiling on fence waits; normal operation never hits it.
pub const FENCE_WAIT_TIMEOUT_NS: u64 = u64::MAX;

/// Create a semaphore.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_semaphore(device: &ash::Device) -> Result<vk::Semaphore> {
    let create_info = vk::SemaphoreCreateInfo::default();
    Ok(device.create_semaphore(&create_info, None)?)
}

/// Create a fence, optionally already signaled.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_fence(device: &ash::Device, signaled: bool) -> Result<vk::Fence> {
    let flags = if signaled {
        vk::FenceCreateFlags::SIGNALED
    } else {
        vk::FenceCreateFlags::empty()
    };

    let create_info = vk::FenceCreateInfo::default().flags(flags);
    Ok(device.create_fence(&create_info, None)?)
}

/// Block until a fence signals.
///
/// # Safety
/// The device and fence must be valid.
pub unsafe fn wait_for_fence(device: &ash::Device, fence: vk::Fence, timeout_ns: u64) -> Result<()> {
    device.wait_for_fences(&[fence], true, timeout_ns)?;
    Ok(())
}

/// Reset a fence to unsignaled.
///
/// # Safety
/// The device and fence must be valid.
pub unsafe fn reset_fence(device: &ash::Device, fence: vk::Fence) -> Result<()> {
    device.reset_fences(&[fence])?;
    Ok(())
}

/// One frame's synchronization bundle.
pub struct FrameSlot {
    /// Signaled by the driver when the acquired image is ready to render to.
    pub image_available: vk::Semaphore,
    /// Signaled by the graphics queue when rendering completes; presentation
    /// waits on it.
    pub render_finished: vk::Semaphore,
    /// Signaled when the slot's submission retires; `begin_frame` blocks on
    /// it. Created signaled so the first pass over the slot does not wait.
    pub in_flight: vk::Fence,
}

impl FrameSlot {
    /// Create the slot's semaphores and fence.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(device: &ash::Device) -> Result<Self> {
        Ok(Self {
            image_available: create_semaphore(device)?,
            render_finished: create_semaphore(device)?,
            in_flight: create_fence(device, true)?,
        })
    }

    /// Destroy the slot's objects.
    ///
    /// # Safety
    /// The device must be valid and the slot must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_semaphore(self.image_available, None);
        device.destroy_semaphore(self.render_finished, None);
        device.destroy_fence(self.in_flight, None);
    }
}

/// Rotating pool of frame slots plus the image-in-flight map.
///
/// Mutated only by the single submission thread; `&mut self` on the
/// map-touching operations makes concurrent submission unrepresentable
/// without external serialization.
pub struct FrameSynchronizer {
    slots: Vec<FrameSlot>,
    current: usize,
    /// Per swapchain image: the fence of the slot currently using it.
    images_in_flight: Vec<Option<vk::Fence>>,
}

impl FrameSynchronizer {
    /// Create `frames_in_flight` slots over a swapchain with `image_count`
    /// images.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(
        device: &ash::Device,
        frames_in_flight: usize,
        image_count: usize,
    ) -> Result<Self> {
        let mut slots = Vec::with_capacity(frames_in_flight);
        for _ in 0..frames_in_flight {
            slots.push(FrameSlot::new(device)?);
        }

        Ok(Self {
            slots,
            current: 0,
            images_in_flight: vec![None; image_count],
        })
    }

    /// Number of slots.
    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    /// Index of the current slot.
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// The current slot.
    pub fn current_slot(&self) -> &FrameSlot {
        &self.slots[self.current]
    }

    /// Block until the current slot's previous submission retires, then hand
    /// the slot out for this frame.
    ///
    /// With N slots, the (N+1)th `begin_frame` with no intervening GPU
    /// completion blocks here; no more than N frames are ever in flight. The
    /// fence stays signaled until [`Self::reset_current_fence`] — resetting
    /// it here would deadlock the slot's next pass whenever acquisition bails
    /// out stale with nothing submitted to re-signal it.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn begin_frame(&self, device: &ash::Device) -> Result<&FrameSlot> {
        let slot = &self.slots[self.current];
        wait_for_fence(device, slot.in_flight, FENCE_WAIT_TIMEOUT_NS)?;
        Ok(slot)
    }

    /// Unsignal the current slot's fence; call once an image is acquired and
    /// a submission is guaranteed to follow.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn reset_current_fence(&self, device: &ash::Device) -> Result<()> {
        reset_fence(device, self.current_slot().in_flight)
    }

    /// Block until whichever slot last used `image_index` has retired.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn wait_for_image(&mut self, device: &ash::Device, image_index: u32) -> Result<()> {
        if let Some(fence) = self.images_in_flight[image_index as usize] {
            wait_for_fence(device, fence, FENCE_WAIT_TIMEOUT_NS)?;
        }
        Ok(())
    }

    /// Record that the current slot now owns `image_index`.
    pub fn mark_image_in_flight(&mut self, image_index: u32) {
        self.images_in_flight[image_index as usize] = Some(self.current_slot().in_flight);
    }

    /// Advance the cursor to the next slot.
    pub fn end_frame(&mut self) {
        self.current = (self.current + 1) % self.slots.len();
    }

    /// Reset the image map for a rebuilt swapchain.
    ///
    /// Call only after the rebuild's `device_wait_idle`; the old images (and
    /// the fences tracking them) are gone.
    pub fn reset_images(&mut self, image_count: usize) {
        self.images_in_flight.clear();
        self.images_in_flight.resize(image_count, None);
    }

    /// Destroy every slot.
    ///
    /// # Safety
    /// The device must be valid and no slot may be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        for slot in &self.slots {
            slot.destroy(device);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    fn synchronizer(frames: usize, images: usize) -> FrameSynchronizer {
        let slots = (0..frames)
            .map(|i| FrameSlot {
                image_available: vk::Semaphore::null(),
                render_finished: vk::Semaphore::null(),
                in_flight: vk::Fence::from_raw(i as u64 + 1),
            })
            .collect();

        FrameSynchronizer {
            slots,
            current: 0,
            images_in_flight: vec![None; images],
        }
    }

    #[test]
    fn cursor_rotates_modulo_slot_count() {
        let mut sync = synchronizer(2, 3);
        assert_eq!(sync.current_index(), 0);
        sync.end_frame();
        assert_eq!(sync.current_index(), 1);
        sync.end_frame();
        assert_eq!(sync.current_index(), 0);
    }

    #[test]
    fn rotation_is_independent_of_image_count() {
        let mut sync = synchronizer(2, 5);
        for _ in 0..5 {
            sync.end_frame();
        }
        assert_eq!(sync.current_index(), 1);
    }

    #[test]
    fn marking_records_the_current_slots_fence() {
        let mut sync = synchronizer(2, 3);
        sync.mark_image_in_flight(1);
        assert_eq!(
            sync.images_in_flight[1],
            Some(vk::Fence::from_raw(1))
        );

        sync.end_frame();
        sync.mark_image_in_flight(1);
        assert_eq!(
            sync.images_in_flight[1],
            Some(vk::Fence::from_raw(2))
        );
    }

    #[test]
    fn reset_images_clears_the_map() {
        let mut sync = synchronizer(2, 3);
        sync.mark_image_in_flight(0);
        sync.mark_image_in_flight(2);

        sync.reset_images(4);
        assert_eq!(sync.images_in_flight.len(), 4);
        assert!(sync.images_in_flight.iter().all(Option::is_none));
    }
}
