// Copyright (c) 2025 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! The formats that render pass attachments can have.
//!
//! Only the attachment formats that the render pass emulation needs to reason about are listed.
//! A format is described by the aspects it contains, the size of one texel block, and whether
//! its color components are stored as integers. Integer formats can't be averaged, so resolving
//! them always picks sample zero.

use crate::image::ImageAspects;
use ash::vk;

vulkan_enum! {
    /// An enumeration of the attachment formats known to this crate.
    #[allow(non_camel_case_types)]
    #[non_exhaustive]
    Format = Format(i32);

    UNDEFINED = UNDEFINED,
    R8_UNORM = R8_UNORM,
    R8_UINT = R8_UINT,
    R8G8_UNORM = R8G8_UNORM,
    R8G8B8_UNORM = R8G8B8_UNORM,
    R8G8B8A8_UNORM = R8G8B8A8_UNORM,
    R8G8B8A8_SRGB = R8G8B8A8_SRGB,
    R8G8B8A8_UINT = R8G8B8A8_UINT,
    R8G8B8A8_SINT = R8G8B8A8_SINT,
    B8G8R8A8_UNORM = B8G8R8A8_UNORM,
    B8G8R8A8_SRGB = B8G8R8A8_SRGB,
    A2B10G10R10_UNORM_PACK32 = A2B10G10R10_UNORM_PACK32,
    B10G11R11_UFLOAT_PACK32 = B10G11R11_UFLOAT_PACK32,
    R16_SFLOAT = R16_SFLOAT,
    R16G16_SFLOAT = R16G16_SFLOAT,
    R16G16B16A16_SFLOAT = R16G16B16A16_SFLOAT,
    R16G16B16A16_UINT = R16G16B16A16_UINT,
    R32_UINT = R32_UINT,
    R32_SINT = R32_SINT,
    R32_SFLOAT = R32_SFLOAT,
    R32G32_SFLOAT = R32G32_SFLOAT,
    R32G32B32A32_SFLOAT = R32G32B32A32_SFLOAT,
    R32G32B32A32_UINT = R32G32B32A32_UINT,
    D16_UNORM = D16_UNORM,
    X8_D24_UNORM_PACK32 = X8_D24_UNORM_PACK32,
    D32_SFLOAT = D32_SFLOAT,
    S8_UINT = S8_UINT,
    D16_UNORM_S8_UINT = D16_UNORM_S8_UINT,
    D24_UNORM_S8_UINT = D24_UNORM_S8_UINT,
    D32_SFLOAT_S8_UINT = D32_SFLOAT_S8_UINT,
}

impl Format {
    /// Returns the aspects that images of this format have.
    pub fn aspects(self) -> ImageAspects {
        match self {
            Format::UNDEFINED => ImageAspects::empty(),
            Format::D16_UNORM | Format::X8_D24_UNORM_PACK32 | Format::D32_SFLOAT => {
                ImageAspects::DEPTH
            }
            Format::S8_UINT => ImageAspects::STENCIL,
            Format::D16_UNORM_S8_UINT | Format::D24_UNORM_S8_UINT | Format::D32_SFLOAT_S8_UINT => {
                ImageAspects::DEPTH | ImageAspects::STENCIL
            }
            _ => ImageAspects::COLOR,
        }
    }

    /// Returns the size in bytes of one texel block of this format.
    ///
    /// For combined depth/stencil formats, this is the size of the depth and stencil components
    /// packed together.
    pub fn block_size(self) -> u64 {
        match self {
            Format::UNDEFINED => 0,
            Format::R8_UNORM | Format::R8_UINT | Format::S8_UINT => 1,
            Format::R8G8_UNORM | Format::R16_SFLOAT | Format::D16_UNORM => 2,
            Format::R8G8B8_UNORM | Format::D16_UNORM_S8_UINT => 3,
            Format::R8G8B8A8_UNORM
            | Format::R8G8B8A8_SRGB
            | Format::R8G8B8A8_UINT
            | Format::R8G8B8A8_SINT
            | Format::B8G8R8A8_UNORM
            | Format::B8G8R8A8_SRGB
            | Format::A2B10G10R10_UNORM_PACK32
            | Format::B10G11R11_UFLOAT_PACK32
            | Format::R16G16_SFLOAT
            | Format::R32_UINT
            | Format::R32_SINT
            | Format::R32_SFLOAT
            | Format::X8_D24_UNORM_PACK32
            | Format::D32_SFLOAT
            | Format::D24_UNORM_S8_UINT => 4,
            Format::D32_SFLOAT_S8_UINT => 5,
            Format::R16G16B16A16_SFLOAT | Format::R16G16B16A16_UINT | Format::R32G32_SFLOAT => 8,
            Format::R32G32B32A32_SFLOAT | Format::R32G32B32A32_UINT => 16,
        }
    }

    /// Returns whether the color components of this format are stored as signed or unsigned
    /// integers.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Format::R8_UINT
                | Format::R8G8B8A8_UINT
                | Format::R8G8B8A8_SINT
                | Format::R16G16B16A16_UINT
                | Format::R32_UINT
                | Format::R32_SINT
                | Format::R32G32B32A32_UINT
        )
    }

    #[inline]
    pub fn has_depth(self) -> bool {
        self.aspects().intersects(ImageAspects::DEPTH)
    }

    #[inline]
    pub fn has_stencil(self) -> bool {
        self.aspects().intersects(ImageAspects::STENCIL)
    }

    /// Returns whether this format has a depth or a stencil aspect.
    #[inline]
    pub fn is_depth_stencil(self) -> bool {
        self.aspects()
            .intersects(ImageAspects::DEPTH | ImageAspects::STENCIL)
    }
}

/// Describes a uniform value that will be used to fill an image.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ClearValue {
    /// Value for floating-point attachments, including `UNORM`, `SNORM`, `SFLOAT`.
    Float([f32; 4]),
    /// Value for integer attachments, including `SINT`.
    Int([i32; 4]),
    /// Value for unsigned integer attachments, including `UINT`.
    Uint([u32; 4]),
    /// Value for depth attachments.
    Depth(f32),
    /// Value for stencil attachments.
    Stencil(u32),
    /// Value for depth and stencil attachments.
    DepthStencil((f32, u32)),
}

impl From<ClearValue> for vk::ClearValue {
    #[inline]
    fn from(val: ClearValue) -> Self {
        match val {
            ClearValue::Float(float32) => Self {
                color: vk::ClearColorValue { float32 },
            },
            ClearValue::Int(int32) => Self {
                color: vk::ClearColorValue { int32 },
            },
            ClearValue::Uint(uint32) => Self {
                color: vk::ClearColorValue { uint32 },
            },
            ClearValue::Depth(depth) => Self {
                depth_stencil: vk::ClearDepthStencilValue { depth, stencil: 0 },
            },
            ClearValue::Stencil(stencil) => Self {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 0.0,
                    stencil,
                },
            },
            ClearValue::DepthStencil((depth, stencil)) => Self {
                depth_stencil: vk::ClearDepthStencilValue { depth, stencil },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Format;
    use crate::image::ImageAspects;

    #[test]
    fn aspects() {
        assert_eq!(Format::R8G8B8A8_UNORM.aspects(), ImageAspects::COLOR);
        assert_eq!(Format::D32_SFLOAT.aspects(), ImageAspects::DEPTH);
        assert_eq!(Format::S8_UINT.aspects(), ImageAspects::STENCIL);
        assert_eq!(
            Format::D24_UNORM_S8_UINT.aspects(),
            ImageAspects::DEPTH | ImageAspects::STENCIL,
        );
        assert!(Format::UNDEFINED.aspects().is_empty());

        assert!(Format::D16_UNORM_S8_UINT.has_depth());
        assert!(Format::D16_UNORM_S8_UINT.has_stencil());
        assert!(!Format::D32_SFLOAT.has_stencil());
        assert!(!Format::R32_UINT.is_depth_stencil());
    }

    #[test]
    fn integer_formats() {
        assert!(Format::R32_UINT.is_integer());
        assert!(Format::R8G8B8A8_SINT.is_integer());
        assert!(!Format::R8G8B8A8_UNORM.is_integer());
        assert!(!Format::R16G16B16A16_SFLOAT.is_integer());
    }

    #[test]
    fn ffi_conversion() {
        let raw: ash::vk::Format = Format::B8G8R8A8_SRGB.into();
        assert_eq!(raw, ash::vk::Format::B8G8R8A8_SRGB);
        assert_eq!(
            Format::try_from(ash::vk::Format::D32_SFLOAT),
            Ok(Format::D32_SFLOAT),
        );
        assert_eq!(Format::try_from(ash::vk::Format::BC1_RGB_UNORM_BLOCK), Err(()));
    }
}
