//! Semantic pixel format tags.
//!
//! Core logic reasons about the handful of formats swapchain negotiation can
//! produce; the raw `vk::Format` code stays at the boundary. The table is
//! deliberately restricted to that subset rather than mirroring the full
//! format enumeration.

use ash::vk;

/// Pixel formats the presentation path understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Bgra8Srgb,
    Bgra8Unorm,
    Rgba8Srgb,
    Rgba8Unorm,
}

/// Bidirectional tag ⇄ wire-code table.
const FORMAT_TABLE: &[(PixelFormat, vk::Format)] = &[
    (PixelFormat::Bgra8Srgb, vk::Format::B8G8R8A8_SRGB),
    (PixelFormat::Bgra8Unorm, vk::Format::B8G8R8A8_UNORM),
    (PixelFormat::Rgba8Srgb, vk::Format::R8G8B8A8_SRGB),
    (PixelFormat::Rgba8Unorm, vk::Format::R8G8B8A8_UNORM),
];

impl PixelFormat {
    /// Wire-level format code.
    pub fn to_vk(self) -> vk::Format {
        FORMAT_TABLE
            .iter()
            .find(|(tag, _)| *tag == self)
            .map(|(_, code)| *code)
            .unwrap_or(vk::Format::UNDEFINED)
    }

    /// Tag for a wire-level code, if the presentation path knows it.
    pub fn from_vk(format: vk::Format) -> Option<Self> {
        FORMAT_TABLE
            .iter()
            .find(|(_, code)| *code == format)
            .map(|(tag, _)| *tag)
    }

    /// Whether the format carries sRGB-encoded color.
    pub fn is_srgb(self) -> bool {
        matches!(self, Self::Bgra8Srgb | Self::Rgba8Srgb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_bijective() {
        for &(tag, code) in FORMAT_TABLE {
            assert_eq!(tag.to_vk(), code);
            assert_eq!(PixelFormat::from_vk(code), Some(tag));
        }
    }

    #[test]
    fn unknown_code_has_no_tag() {
        assert_eq!(PixelFormat::from_vk(vk::Format::D32_SFLOAT), None);
    }

    #[test]
    fn srgb_classification() {
        assert!(PixelFormat::Bgra8Srgb.is_srgb());
        assert!(!PixelFormat::Bgra8Unorm.is_srgb());
    }
}
