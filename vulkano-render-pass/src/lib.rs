// Copyright (c) 2025 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

#![doc(html_logo_url = "https://raw.githubusercontent.com/vulkano-rs/vulkano/master/logo.png")]
//! Emulation of multi-subpass render passes on top of dynamic rendering.
//!
//! Drivers that only implement `vkCmdBeginRendering` and `vkCmdEndRendering` can still expose
//! the legacy render pass API by translating every subpass into a dynamic rendering region. This
//! crate implements that translation:
//!
//! - A [`RenderPass`] is created from a [`RenderPassCreateInfo`]. Creation validates the
//!   description, normalizes every attachment reference, computes the views for which each
//!   reference is the last use of its attachment, and records the subpass dependencies.
//!
//! - If the device reports a tile buffer through [`DeviceProperties::tile_buffer_size`],
//!   adjacent subpasses whose render targets fit in the tile buffer are merged, so that they are
//!   recorded as a single rendering region. Reads between merged subpasses then become
//!   framebuffer-local barriers instead of full pipeline barriers.
//!
//! - A [`RenderPassRecorder`] walks a render pass at recording time. It emits the layout
//!   transitions, emulated load operations, memory barriers and `begin_rendering` /
//!   `end_rendering` calls through the [`RenderingCommands`] trait, which is implemented by the
//!   driver's command buffer.
//!
//! - [`Subpass`] answers the questions that pipeline creation and secondary command buffer
//!   inheritance need to ask about a subpass: formats, view masks, input attachment indices,
//!   color attachment locations and pipeline flags.
//!
//! [`RenderPass`]: render_pass::RenderPass
//! [`RenderPassCreateInfo`]: render_pass::RenderPassCreateInfo
//! [`DeviceProperties::tile_buffer_size`]: device::DeviceProperties::tile_buffer_size
//! [`RenderPassRecorder`]: command_buffer::RenderPassRecorder
//! [`RenderingCommands`]: command_buffer::RenderingCommands
//! [`Subpass`]: render_pass::Subpass

pub use ash::vk::Handle;
use std::{
    collections::TryReserveError,
    error::Error,
    fmt::{Display, Error as FmtError, Formatter},
};

#[macro_use]
mod macros;
pub mod command_buffer;
pub mod device;
pub mod format;
pub mod image;
pub mod render_pass;
pub mod sync;
#[cfg(test)]
mod test_util;

/// A helper type for non-exhaustive structs.
///
/// This type cannot be constructed outside this crate. Structures that have a field of this type
/// can therefore not be constructed outside the crate either. This creates a similar situation
/// to the standard Rust `#[non_exhaustive]` attribute, except that it does not prevent update
/// syntax from being used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NonExhaustive(pub(crate) ());

/// Error type returned when an allocation fails.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OomError {
    /// There is no memory available on the host (ie. the CPU, RAM, etc.).
    OutOfHostMemory,
    /// There is no memory available on the device (ie. video memory).
    OutOfDeviceMemory,
}

impl Error for OomError {}

impl Display for OomError {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(
            f,
            "{}",
            match self {
                OomError::OutOfHostMemory => "no memory available on the host",
                OomError::OutOfDeviceMemory => "no memory available on the graphical device",
            }
        )
    }
}

impl From<TryReserveError> for OomError {
    #[inline]
    fn from(_err: TryReserveError) -> OomError {
        OomError::OutOfHostMemory
    }
}

/// Returns an empty `Vec` with room for at least `capacity` elements, or an error if the
/// allocation failed.
pub(crate) fn try_vec<T>(capacity: usize) -> Result<Vec<T>, OomError> {
    let mut vec = Vec::new();
    vec.try_reserve(capacity)?;

    Ok(vec)
}

/// Returns the index of the highest set bit, plus one.
#[inline]
pub(crate) const fn last_bit(mask: u32) -> u32 {
    u32::BITS - mask.leading_zeros()
}

/// Iterates over the indices of the bits set in `mask`, lowest first.
#[inline]
pub(crate) fn bits(mut mask: u32) -> impl Iterator<Item = u32> {
    std::iter::from_fn(move || {
        if mask == 0 {
            None
        } else {
            let bit = mask.trailing_zeros();
            mask &= mask - 1;

            Some(bit)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::{bits, last_bit};

    #[test]
    fn bit_helpers() {
        assert_eq!(last_bit(0), 0);
        assert_eq!(last_bit(0b1), 1);
        assert_eq!(last_bit(0b1010), 4);
        assert_eq!(bits(0b1010_0001).collect::<Vec<_>>(), [0, 5, 7]);
        assert_eq!(bits(0).count(), 0);
    }
}
