// Copyright (c) 2025 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! The device capabilities that render pass creation depends on.

use crate::format::Format;

/// Capabilities of the physical device that a render pass is created for.
///
/// These are the only properties the render pass emulation needs. Drivers usually implement this
/// trait on their physical device type. [`DeviceLimits`] is a plain implementation that can be
/// filled in by hand.
pub trait DeviceProperties {
    /// Returns the maximum number of color attachments that a subpass can use.
    fn max_color_attachments(&self) -> u32;

    /// Returns the number of bytes of on-chip tile memory available to hold render targets, or
    /// `None` if the device doesn't render through a tile buffer.
    ///
    /// Subpasses are only merged into a single rendering region when this returns `Some`.
    fn tile_buffer_size(&self) -> Option<u32>;

    /// Returns whether the device keeps attachments of `format` in an internal 32-bit blending
    /// format while they are resident in the tile buffer.
    #[inline]
    fn is_blend_internal(&self, format: Format) -> bool {
        let _ = format;

        false
    }
}

/// Plain device limits.
#[derive(Clone, Debug)]
pub struct DeviceLimits {
    /// The maximum number of color attachments of a subpass.
    ///
    /// The default value is `8`.
    pub max_color_attachments: u32,

    /// The size of the tile buffer in bytes.
    ///
    /// The default value is `None`.
    pub tile_buffer_size: Option<u32>,

    /// The formats that are blended through an internal 32-bit format.
    ///
    /// The default value is empty.
    pub internal_blend_formats: Vec<Format>,

    pub _ne: crate::NonExhaustive,
}

impl Default for DeviceLimits {
    #[inline]
    fn default() -> Self {
        Self {
            max_color_attachments: 8,
            tile_buffer_size: None,
            internal_blend_formats: Vec::new(),
            _ne: crate::NonExhaustive(()),
        }
    }
}

impl DeviceProperties for DeviceLimits {
    #[inline]
    fn max_color_attachments(&self) -> u32 {
        self.max_color_attachments
    }

    #[inline]
    fn tile_buffer_size(&self) -> Option<u32> {
        self.tile_buffer_size
    }

    #[inline]
    fn is_blend_internal(&self, format: Format) -> bool {
        self.internal_blend_formats.contains(&format)
    }
}

impl<T> DeviceProperties for &T
where
    T: DeviceProperties + ?Sized,
{
    #[inline]
    fn max_color_attachments(&self) -> u32 {
        (**self).max_color_attachments()
    }

    #[inline]
    fn tile_buffer_size(&self) -> Option<u32> {
        (**self).tile_buffer_size()
    }

    #[inline]
    fn is_blend_internal(&self, format: Format) -> bool {
        (**self).is_blend_internal(format)
    }
}
