//! Presentation submission.

use crate::error::{GpuError, Result};
use crate::swapchain::Swapchain;
use crate::sync::FrameSlot;
use ash::vk;

/// Present an acquired image, gated on the slot's render-finished semaphore.
///
/// Returns `Ok(true)` when the swapchain has gone stale — either out-of-date
/// (the present did not happen) or suboptimal (presented, but the chain
/// should be rebuilt soon). Both instruct the caller to rebuild; neither is
/// an error. Any other failure is [`GpuError::Presentation`] and fatal —
/// device loss or a programming error, not a recoverable condition.
///
/// # Safety
/// All handles must be valid and the image index must come from a successful
/// acquire on this swapchain.
pub unsafe fn submit_present(
    swapchain_loader: &ash::khr::swapchain::Device,
    present_queue: vk::Queue,
    swapchain: &Swapchain,
    slot: &FrameSlot,
    image_index: u32,
) -> Result<bool> {
    let wait_semaphores = [slot.render_finished];
    let swapchains = [swapchain.handle];
    let image_indices = [image_index];

    let present_info = vk::PresentInfoKHR::default()
        .wait_semaphores(&wait_semaphores)
        .swapchains(&swapchains)
        .image_indices(&image_indices);

    classify_present_result(swapchain_loader.queue_present(present_queue, &present_info))
}

/// Fold the raw present result into stale-or-fatal.
fn classify_present_result(result: ash::prelude::VkResult<bool>) -> Result<bool> {
    match result {
        Ok(suboptimal) => Ok(suboptimal),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(true),
        Err(e) => Err(GpuError::Presentation(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_date_is_stale_not_success() {
        let outcome = classify_present_result(Err(vk::Result::ERROR_OUT_OF_DATE_KHR));
        assert!(matches!(outcome, Ok(true)));
    }

    #[test]
    fn suboptimal_is_stale() {
        assert!(matches!(classify_present_result(Ok(true)), Ok(true)));
    }

    #[test]
    fn clean_present_is_not_stale() {
        assert!(matches!(classify_present_result(Ok(false)), Ok(false)));
    }

    #[test]
    fn device_loss_is_fatal() {
        let outcome = classify_present_result(Err(vk::Result::ERROR_DEVICE_LOST));
        assert!(matches!(
            outcome,
            Err(GpuError::Presentation(vk::Result::ERROR_DEVICE_LOST))
        ));
    }
}
