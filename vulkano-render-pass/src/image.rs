// Copyright (c) 2025 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Images and image views, as seen by a render pass.
//!
//! The render pass emulation never creates or binds images itself. It only needs to know enough
//! about the image views in a framebuffer to compute layout transitions: the view's handle, the
//! handle of the image it belongs to, the image's type and creation flags, and the subresources
//! that the view covers.

use crate::format::Format;
use ash::vk;
use std::{ops::Range, sync::Arc};

vulkan_enum! {
    #[non_exhaustive]

    /// In-memory layout of the pixel data of an image.
    ImageLayout = ImageLayout(i32);

    /// The layout of the data is unknown, and the image is treated as containing no valid data.
    Undefined = UNDEFINED,

    /// A general-purpose layout that can be used for any operation.
    General = GENERAL,

    /// For an image used as a color or resolve attachment.
    ColorAttachmentOptimal = COLOR_ATTACHMENT_OPTIMAL,

    /// For an image used as a depth/stencil attachment.
    DepthStencilAttachmentOptimal = DEPTH_STENCIL_ATTACHMENT_OPTIMAL,

    /// A layout for the depth/stencil aspects of an image that are only read.
    DepthStencilReadOnlyOptimal = DEPTH_STENCIL_READ_ONLY_OPTIMAL,

    /// For an image that is read by shaders, including as an input attachment.
    ShaderReadOnlyOptimal = SHADER_READ_ONLY_OPTIMAL,

    /// For an image used as the source of a transfer operation.
    TransferSrcOptimal = TRANSFER_SRC_OPTIMAL,

    /// For an image used as the destination of a transfer operation.
    TransferDstOptimal = TRANSFER_DST_OPTIMAL,

    /// The image contains data written by the host, laid out linearly.
    Preinitialized = PREINITIALIZED,

    DepthReadOnlyStencilAttachmentOptimal = DEPTH_READ_ONLY_STENCIL_ATTACHMENT_OPTIMAL,

    DepthAttachmentStencilReadOnlyOptimal = DEPTH_ATTACHMENT_STENCIL_READ_ONLY_OPTIMAL,

    DepthAttachmentOptimal = DEPTH_ATTACHMENT_OPTIMAL,

    DepthReadOnlyOptimal = DEPTH_READ_ONLY_OPTIMAL,

    StencilAttachmentOptimal = STENCIL_ATTACHMENT_OPTIMAL,

    StencilReadOnlyOptimal = STENCIL_READ_ONLY_OPTIMAL,

    /// A read-only layout for any aspect that the image has.
    ReadOnlyOptimal = READ_ONLY_OPTIMAL,

    /// A writable attachment layout for any aspect that the image has.
    AttachmentOptimal = ATTACHMENT_OPTIMAL,

    /// The layout of images that are presented to a surface.
    PresentSrc = PRESENT_SRC_KHR,

    SharedPresent = SHARED_PRESENT_KHR,

    FragmentShadingRateAttachmentOptimal = FRAGMENT_SHADING_RATE_ATTACHMENT_OPTIMAL_KHR,

    FragmentDensityMapOptimal = FRAGMENT_DENSITY_MAP_OPTIMAL_EXT,

    /// For an image that is used as an input attachment and a render target of the same
    /// subpass at the same time.
    AttachmentFeedbackLoopOptimal = ATTACHMENT_FEEDBACK_LOOP_OPTIMAL_EXT,
}

impl ImageLayout {
    /// Returns whether `aspect` can only be read while an image is in this layout.
    ///
    /// `aspect` must be a single aspect.
    pub fn is_read_only(self, aspect: ImageAspects) -> bool {
        match self {
            ImageLayout::Undefined
            | ImageLayout::Preinitialized
            | ImageLayout::DepthStencilReadOnlyOptimal
            | ImageLayout::ShaderReadOnlyOptimal
            | ImageLayout::TransferSrcOptimal
            | ImageLayout::PresentSrc
            | ImageLayout::FragmentDensityMapOptimal
            | ImageLayout::ReadOnlyOptimal
            | ImageLayout::DepthReadOnlyOptimal
            | ImageLayout::StencilReadOnlyOptimal => true,
            ImageLayout::DepthReadOnlyStencilAttachmentOptimal => aspect == ImageAspects::DEPTH,
            ImageLayout::DepthAttachmentStencilReadOnlyOptimal => aspect == ImageAspects::STENCIL,
            _ => false,
        }
    }

    /// Returns whether every aspect in `aspects` is read-only in this layout.
    #[inline]
    pub fn are_all_aspects_read_only(self, aspects: ImageAspects) -> bool {
        aspects.iter().all(|aspect| self.is_read_only(aspect))
    }

    /// Returns whether an image in this layout can be read as an input attachment.
    pub fn supports_input_attachment(self) -> bool {
        matches!(
            self,
            ImageLayout::General
                | ImageLayout::DepthStencilReadOnlyOptimal
                | ImageLayout::ShaderReadOnlyOptimal
                | ImageLayout::DepthReadOnlyStencilAttachmentOptimal
                | ImageLayout::DepthAttachmentStencilReadOnlyOptimal
                | ImageLayout::DepthReadOnlyOptimal
                | ImageLayout::StencilReadOnlyOptimal
                | ImageLayout::SharedPresent
                | ImageLayout::AttachmentFeedbackLoopOptimal
        )
    }
}

impl Default for ImageLayout {
    #[inline]
    fn default() -> Self {
        ImageLayout::Undefined
    }
}

vulkan_bitflags! {
    /// An individual data type within an image.
    ImageAspects = ImageAspectFlags(u32);

    COLOR = COLOR,
    DEPTH = DEPTH,
    STENCIL = STENCIL,
}

vulkan_bitflags! {
    /// Describes how an image is going to be used.
    ImageUsage = ImageUsageFlags(u32);

    TRANSFER_SRC = TRANSFER_SRC,
    TRANSFER_DST = TRANSFER_DST,
    SAMPLED = SAMPLED,
    STORAGE = STORAGE,
    COLOR_ATTACHMENT = COLOR_ATTACHMENT,
    DEPTH_STENCIL_ATTACHMENT = DEPTH_STENCIL_ATTACHMENT,
    TRANSIENT_ATTACHMENT = TRANSIENT_ATTACHMENT,
    INPUT_ATTACHMENT = INPUT_ATTACHMENT,
    FRAGMENT_SHADING_RATE_ATTACHMENT = FRAGMENT_SHADING_RATE_ATTACHMENT_KHR,
    FRAGMENT_DENSITY_MAP = FRAGMENT_DENSITY_MAP_EXT,
}

vulkan_bitflags! {
    /// Flags that an image was created with.
    ImageCreateFlags = ImageCreateFlags(u32);

    MUTABLE_FORMAT = MUTABLE_FORMAT,
    CUBE_COMPATIBLE = CUBE_COMPATIBLE,
    DIM2D_ARRAY_COMPATIBLE = TYPE_2D_ARRAY_COMPATIBLE,

    /// The image can be used with custom sample locations as a depth/stencil attachment.
    SAMPLE_LOCATIONS_COMPATIBLE_DEPTH = SAMPLE_LOCATIONS_COMPATIBLE_DEPTH_EXT,
}

vulkan_bitflags! {
    /// A set of sample counts.
    SampleCounts = SampleCountFlags(u32);

    SAMPLE_1 = TYPE_1,
    SAMPLE_2 = TYPE_2,
    SAMPLE_4 = TYPE_4,
    SAMPLE_8 = TYPE_8,
    SAMPLE_16 = TYPE_16,
    SAMPLE_32 = TYPE_32,
    SAMPLE_64 = TYPE_64,
}

vulkan_enum! {
    /// The number of samples per texel of an image.
    SampleCount = SampleCountFlags(u32);

    Sample1 = TYPE_1,
    Sample2 = TYPE_2,
    Sample4 = TYPE_4,
    Sample8 = TYPE_8,
    Sample16 = TYPE_16,
    Sample32 = TYPE_32,
    Sample64 = TYPE_64,
}

impl SampleCount {
    /// Returns the number of samples as an integer.
    #[inline]
    pub const fn count(self) -> u32 {
        self as u32
    }
}

impl Default for SampleCount {
    #[inline]
    fn default() -> Self {
        SampleCount::Sample1
    }
}

impl From<SampleCount> for SampleCounts {
    #[inline]
    fn from(val: SampleCount) -> Self {
        Self(val as u32)
    }
}

vulkan_enum! {
    #[non_exhaustive]

    /// The basic dimensionality of an image.
    ImageType = ImageType(i32);

    Dim1d = TYPE_1D,
    Dim2d = TYPE_2D,

    /// Layout transitions of a view of a 3D image always apply to the whole mip level.
    Dim3d = TYPE_3D,
}

/// One or more subresources of an image.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageSubresourceRange {
    /// Selects the aspects that will be included.
    pub aspects: ImageAspects,

    /// Selects the range of the mip levels that will be included.
    pub mip_levels: Range<u32>,

    /// Selects the range of array layers that will be included.
    pub array_layers: Range<u32>,
}

impl From<ImageSubresourceRange> for vk::ImageSubresourceRange {
    #[inline]
    fn from(val: ImageSubresourceRange) -> Self {
        Self {
            aspect_mask: val.aspects.into(),
            base_mip_level: val.mip_levels.start,
            level_count: val.mip_levels.end - val.mip_levels.start,
            base_array_layer: val.array_layers.start,
            layer_count: val.array_layers.end - val.array_layers.start,
        }
    }
}

/// A view of an image that is used as a framebuffer attachment.
#[derive(Debug)]
pub struct ImageView {
    handle: vk::ImageView,
    image: vk::Image,
    image_type: ImageType,
    image_flags: ImageCreateFlags,
    format: Format,
    samples: SampleCount,
    usage: ImageUsage,
    extent: [u32; 3],
    subresource_range: ImageSubresourceRange,
}

impl ImageView {
    /// Describes an existing image view.
    ///
    /// `handle` is the view itself, and `image` is the image that it was created from.
    pub fn new(
        handle: vk::ImageView,
        image: vk::Image,
        create_info: ImageViewCreateInfo,
    ) -> Arc<ImageView> {
        let ImageViewCreateInfo {
            image_type,
            image_flags,
            format,
            samples,
            usage,
            extent,
            subresource_range,
            _ne: _,
        } = create_info;

        Arc::new(ImageView {
            handle,
            image,
            image_type,
            image_flags,
            format,
            samples,
            usage,
            extent,
            subresource_range,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::ImageView {
        self.handle
    }

    /// Returns the handle of the image that this view belongs to.
    #[inline]
    pub fn image(&self) -> vk::Image {
        self.image
    }

    #[inline]
    pub fn image_type(&self) -> ImageType {
        self.image_type
    }

    #[inline]
    pub fn image_flags(&self) -> ImageCreateFlags {
        self.image_flags
    }

    #[inline]
    pub fn format(&self) -> Format {
        self.format
    }

    #[inline]
    pub fn samples(&self) -> SampleCount {
        self.samples
    }

    #[inline]
    pub fn usage(&self) -> ImageUsage {
        self.usage
    }

    /// Returns the extent of the image at the view's base mip level.
    #[inline]
    pub fn extent(&self) -> [u32; 3] {
        self.extent
    }

    #[inline]
    pub fn subresource_range(&self) -> &ImageSubresourceRange {
        &self.subresource_range
    }

    #[inline]
    pub fn base_mip_level(&self) -> u32 {
        self.subresource_range.mip_levels.start
    }

    #[inline]
    pub fn base_array_layer(&self) -> u32 {
        self.subresource_range.array_layers.start
    }

    #[inline]
    pub fn layer_count(&self) -> u32 {
        self.subresource_range.array_layers.end - self.subresource_range.array_layers.start
    }
}

/// Parameters to describe an existing image view.
#[derive(Clone, Debug)]
pub struct ImageViewCreateInfo {
    /// The type of the image that the view belongs to.
    ///
    /// The default value is [`ImageType::Dim2d`].
    pub image_type: ImageType,

    /// The flags that the image was created with.
    ///
    /// The default value is empty.
    pub image_flags: ImageCreateFlags,

    /// The format of the view.
    ///
    /// The default value is [`Format::UNDEFINED`].
    pub format: Format,

    /// The number of samples of the image.
    ///
    /// The default value is [`SampleCount::Sample1`].
    pub samples: SampleCount,

    /// The usage that the view was created with.
    ///
    /// The default value is empty.
    pub usage: ImageUsage,

    /// The extent of the image at the base mip level of the view.
    ///
    /// The default value is `[0; 3]`, which must be overridden.
    pub extent: [u32; 3],

    /// The subresources of the image that the view covers.
    ///
    /// The default value is the first mip level and the first array layer of the color aspect.
    pub subresource_range: ImageSubresourceRange,

    pub _ne: crate::NonExhaustive,
}

impl Default for ImageViewCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            image_type: ImageType::Dim2d,
            image_flags: ImageCreateFlags::empty(),
            format: Format::UNDEFINED,
            samples: SampleCount::Sample1,
            usage: ImageUsage::empty(),
            extent: [0; 3],
            subresource_range: ImageSubresourceRange {
                aspects: ImageAspects::COLOR,
                mip_levels: 0..1,
                array_layers: 0..1,
            },
            _ne: crate::NonExhaustive(()),
        }
    }
}

/// Custom sample locations, used while rendering to or transitioning a depth/stencil image that
/// was created with [`ImageCreateFlags::SAMPLE_LOCATIONS_COMPATIBLE_DEPTH`].
#[derive(Clone, Debug, PartialEq)]
pub struct SampleLocationsInfo {
    pub sample_locations_per_pixel: SampleCount,
    pub sample_location_grid_size: [u32; 2],
    pub sample_locations: Vec<[f32; 2]>,
}

#[cfg(test)]
mod tests {
    use super::{ImageAspects, ImageLayout, SampleCount, SampleCounts};

    #[test]
    fn read_only_layouts() {
        assert!(ImageLayout::ShaderReadOnlyOptimal.is_read_only(ImageAspects::COLOR));
        assert!(!ImageLayout::ColorAttachmentOptimal.is_read_only(ImageAspects::COLOR));
        assert!(!ImageLayout::General.is_read_only(ImageAspects::DEPTH));

        let layout = ImageLayout::DepthReadOnlyStencilAttachmentOptimal;
        assert!(layout.is_read_only(ImageAspects::DEPTH));
        assert!(!layout.is_read_only(ImageAspects::STENCIL));
        assert!(!layout.are_all_aspects_read_only(ImageAspects::DEPTH | ImageAspects::STENCIL));

        let layout = ImageLayout::DepthAttachmentStencilReadOnlyOptimal;
        assert!(!layout.is_read_only(ImageAspects::DEPTH));
        assert!(layout.is_read_only(ImageAspects::STENCIL));

        assert!(ImageLayout::DepthStencilReadOnlyOptimal
            .are_all_aspects_read_only(ImageAspects::DEPTH | ImageAspects::STENCIL));
    }

    #[test]
    fn input_attachment_layouts() {
        assert!(ImageLayout::AttachmentFeedbackLoopOptimal.supports_input_attachment());
        assert!(ImageLayout::General.supports_input_attachment());
        assert!(!ImageLayout::ColorAttachmentOptimal.supports_input_attachment());
        assert!(!ImageLayout::TransferSrcOptimal.supports_input_attachment());
    }

    #[test]
    fn sample_counts() {
        assert_eq!(SampleCount::Sample4.count(), 4);
        assert_eq!(
            SampleCounts::from(SampleCount::Sample4) | SampleCount::Sample1.into(),
            SampleCounts::SAMPLE_1 | SampleCounts::SAMPLE_4,
        );
    }
}
