// Copyright (c) 2025 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

use super::RenderPass;
use crate::image::ImageView;
use std::sync::Arc;

/// The image views that are attached to a render pass during drawing.
///
/// A framebuffer can be created with any render pass object that is compatible with it. An
/// imageless framebuffer carries no views; they are then given when the render pass begins.
///
/// ```
/// # use std::sync::Arc;
/// # use vulkano_render_pass::render_pass::RenderPass;
/// # use vulkano_render_pass::image::ImageView;
/// use vulkano_render_pass::render_pass::{Framebuffer, FramebufferCreateInfo};
///
/// # fn create(render_pass: Arc<RenderPass>, view: Arc<ImageView>) {
/// let framebuffer = Framebuffer::new(
///     render_pass,
///     FramebufferCreateInfo {
///         attachments: vec![view],
///         ..Default::default()
///     },
/// );
/// # }
/// ```
#[derive(Debug)]
pub struct Framebuffer {
    render_pass: Arc<RenderPass>,
    flags: FramebufferCreateFlags,
    attachments: Vec<Arc<ImageView>>,
    extent: [u32; 2],
    layers: u32,
}

impl Framebuffer {
    /// Creates a new `Framebuffer`.
    ///
    /// If `create_info.extent` is `[0, 0]`, the extent is the smallest extent of the attachments.
    pub fn new(
        render_pass: Arc<RenderPass>,
        create_info: FramebufferCreateInfo,
    ) -> Arc<Framebuffer> {
        let FramebufferCreateInfo {
            flags,
            attachments,
            mut extent,
            layers,
            _ne: _,
        } = create_info;

        if extent == [0, 0] {
            extent = attachments
                .iter()
                .map(|view| view.extent())
                .fold([u32::MAX, u32::MAX], |min, e| {
                    [min[0].min(e[0]), min[1].min(e[1])]
                });

            if attachments.is_empty() {
                extent = [0, 0];
            }
        }

        Arc::new(Framebuffer {
            render_pass,
            flags,
            attachments,
            extent,
            layers,
        })
    }

    /// Returns the render pass that the framebuffer was created for.
    #[inline]
    pub fn render_pass(&self) -> &Arc<RenderPass> {
        &self.render_pass
    }

    /// Returns the flags that the framebuffer was created with.
    #[inline]
    pub fn flags(&self) -> FramebufferCreateFlags {
        self.flags
    }

    /// Returns the attachments of the framebuffer. Empty if the framebuffer is imageless.
    #[inline]
    pub fn attachments(&self) -> &[Arc<ImageView>] {
        &self.attachments
    }

    /// Returns the extent (width and height) of the framebuffer.
    #[inline]
    pub fn extent(&self) -> [u32; 2] {
        self.extent
    }

    /// Returns the number of layers of the framebuffer.
    #[inline]
    pub fn layers(&self) -> u32 {
        self.layers
    }
}

/// Parameters to create a new `Framebuffer`.
#[derive(Clone, Debug)]
pub struct FramebufferCreateInfo {
    /// Additional properties of the framebuffer.
    ///
    /// The default value is empty.
    pub flags: FramebufferCreateFlags,

    /// The attachment images that are to be used in the framebuffer.
    ///
    /// Attachments are specified in the same order as they are defined in the render pass, and
    /// there must be exactly as many. Must be empty if `flags` contains `IMAGELESS`.
    ///
    /// The default value is empty.
    pub attachments: Vec<Arc<ImageView>>,

    /// The extent (width and height) of the framebuffer.
    ///
    /// If set to `[0, 0]`, the extent is calculated automatically from the attachments.
    ///
    /// The default value is `[0, 0]`.
    pub extent: [u32; 2],

    /// The number of layers of the framebuffer.
    ///
    /// For a render pass with multiview, the layers are addressed through the view mask instead
    /// and this should be `1`.
    ///
    /// The default value is `1`.
    pub layers: u32,

    pub _ne: crate::NonExhaustive,
}

impl Default for FramebufferCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            flags: FramebufferCreateFlags::empty(),
            attachments: Vec::new(),
            extent: [0, 0],
            layers: 1,
            _ne: crate::NonExhaustive(()),
        }
    }
}

vulkan_bitflags! {
    /// Flags specifying additional properties of a framebuffer.
    FramebufferCreateFlags = FramebufferCreateFlags(u32);

    /// The framebuffer has no image views. The views are given when the render pass begins.
    IMAGELESS = IMAGELESS,
}
