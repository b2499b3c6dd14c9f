// Copyright (c) 2025 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Recording render passes into a command buffer that only knows dynamic rendering.
//!
//! The command buffer is represented by the [`RenderingCommands`] trait. A
//! [`RenderPassRecorder`] drives it: beginning a render pass, advancing to the next subpass and
//! ending the render pass each turn into some number of pipeline barriers and
//! `begin_rendering` / `end_rendering` calls.
//!
//! This module also contains the inheritance information of secondary command buffers, which is
//! needed to answer what a secondary command buffer executed inside a subpass renders to.

pub use self::render_pass::{RenderPassRecorder, RenderPassRecordingError};
use crate::{
    format::{ClearValue, Format},
    image::{ImageAspects, ImageLayout, ImageView, SampleCount, SampleCounts, SampleLocationsInfo},
    render_pass::{Framebuffer, LoadOp, RenderPass, ResolveMode, StoreOp, Subpass},
    sync::DependencyInfo,
};
use std::sync::Arc;

mod render_pass;

/// The commands of a command buffer that recording a render pass needs.
pub trait RenderingCommands {
    /// Begins a dynamic rendering region.
    fn begin_rendering(&mut self, rendering_info: &RenderingInfo);

    /// Ends the dynamic rendering region that was begun last.
    fn end_rendering(&mut self);

    /// Records a pipeline barrier.
    fn pipeline_barrier(&mut self, dependency_info: &DependencyInfo);
}

impl<T> RenderingCommands for &mut T
where
    T: RenderingCommands + ?Sized,
{
    #[inline]
    fn begin_rendering(&mut self, rendering_info: &RenderingInfo) {
        (**self).begin_rendering(rendering_info)
    }

    #[inline]
    fn end_rendering(&mut self) {
        (**self).end_rendering()
    }

    #[inline]
    fn pipeline_barrier(&mut self, dependency_info: &DependencyInfo) {
        (**self).pipeline_barrier(dependency_info)
    }
}

vulkan_enum! {
    /// The level of a command buffer.
    CommandBufferLevel = CommandBufferLevel(i32);

    /// Submitted to a queue directly. A render pass is begun and ended in a primary command
    /// buffer.
    Primary = PRIMARY,

    /// Executed from a primary command buffer. One that continues a render pass is confined to
    /// a single subpass.
    Secondary = SECONDARY,
}

vulkan_bitflags! {
    /// Usage flags of a command buffer.
    CommandBufferUsage = CommandBufferUsageFlags(u32);

    /// The command buffer can only be submitted once before being reset.
    ONE_TIME_SUBMIT = ONE_TIME_SUBMIT,

    /// A secondary command buffer is executed entirely inside a render pass or dynamic rendering
    /// region. Ignored for primary command buffers.
    RENDER_PASS_CONTINUE = RENDER_PASS_CONTINUE,

    /// The command buffer can be resubmitted while it is pending.
    SIMULTANEOUS_USE = SIMULTANEOUS_USE,
}

vulkan_bitflags! {
    /// Flags to modify a dynamic rendering region.
    RenderingFlags = RenderingFlags(u32);

    /// The contents of the region are recorded in secondary command buffers.
    CONTENTS_SECONDARY_COMMAND_BUFFERS = CONTENTS_SECONDARY_COMMAND_BUFFERS,

    /// The region is suspended when it ends, to be resumed by a later region.
    SUSPENDING = SUSPENDING,

    /// The region resumes an earlier suspended region.
    RESUMING = RESUMING,
}

/// A dynamic rendering region, as passed to [`RenderingCommands::begin_rendering`].
#[derive(Clone, Debug)]
pub struct RenderingInfo {
    /// Additional properties of the rendering region.
    ///
    /// The default value is empty.
    pub flags: RenderingFlags,

    /// The top left corner of the rendered area, in pixels.
    ///
    /// The default value is `[0, 0]`.
    pub render_area_offset: [u32; 2],

    /// The width and height of the rendered area, in pixels.
    ///
    /// The default value is `[0, 0]`.
    pub render_area_extent: [u32; 2],

    /// How many array layers of each attachment are rendered to.
    ///
    /// If the region uses multiview (`view_mask` is not 0), then this value must be 0 or 1.
    ///
    /// The default value is `0`.
    pub layer_count: u32,

    /// The views that are rendered to, one bit per view. `0` disables multiview.
    ///
    /// The default value is `0`.
    pub view_mask: u32,

    /// The color attachment of each location. `None` leaves the location unbound.
    ///
    /// The default value is empty.
    pub color_attachments: Vec<Option<RenderingAttachmentInfo>>,

    /// The attachment that provides the depth aspect.
    ///
    /// The default value is `None`.
    pub depth_attachment: Option<RenderingAttachmentInfo>,

    /// The attachment that provides the stencil aspect.
    ///
    /// The default value is `None`.
    pub stencil_attachment: Option<RenderingAttachmentInfo>,

    /// The attachment that provides the fragment shading rate.
    ///
    /// The default value is `None`.
    pub fragment_shading_rate_attachment: Option<RenderingFragmentShadingRateAttachmentInfo>,

    /// The attachment that provides the fragment density map.
    ///
    /// The default value is `None`.
    pub fragment_density_map_attachment: Option<RenderingFragmentDensityMapAttachmentInfo>,

    /// If `Some`, single-sampled attachments are rendered to with this many samples and
    /// implicitly resolved.
    ///
    /// The default value is `None`.
    pub multisampled_render_to_single_sampled: Option<SampleCount>,

    /// Whether legacy dithering is enabled.
    ///
    /// The default value is `false`.
    pub legacy_dithering: bool,

    /// Custom sample locations for the depth/stencil attachment.
    ///
    /// The default value is `None`.
    pub sample_locations: Option<Arc<SampleLocationsInfo>>,

    pub _ne: crate::NonExhaustive,
}

impl Default for RenderingInfo {
    #[inline]
    fn default() -> Self {
        Self {
            flags: RenderingFlags::empty(),
            render_area_offset: [0, 0],
            render_area_extent: [0, 0],
            layer_count: 0,
            view_mask: 0,
            color_attachments: Vec::new(),
            depth_attachment: None,
            stencil_attachment: None,
            fragment_shading_rate_attachment: None,
            fragment_density_map_attachment: None,
            multisampled_render_to_single_sampled: None,
            legacy_dithering: false,
            sample_locations: None,
            _ne: crate::NonExhaustive(()),
        }
    }
}

/// One attachment of a rendering region.
#[derive(Clone, Debug)]
pub struct RenderingAttachmentInfo {
    /// The view that is rendered to.
    ///
    /// There is no default value.
    pub image_view: Arc<ImageView>,

    /// The image layout that `image_view` should be in during rendering.
    ///
    /// The default value is [`ImageLayout::ColorAttachmentOptimal`] if `image_view` has a color
    /// format, [`ImageLayout::DepthStencilAttachmentOptimal`] if `image_view` has a depth/stencil
    /// format.
    pub image_layout: ImageLayout,

    /// If `Some`, the layout that `image_view` is in before rendering begins. The implementation
    /// transitions it to `image_layout` as part of the load operation.
    ///
    /// Only valid together with [`LoadOp::Clear`].
    ///
    /// The default value is `None`.
    pub initial_layout: Option<ImageLayout>,

    /// If `Some`, the attachment is resolved when the region ends.
    ///
    /// The default value is `None`.
    pub resolve_info: Option<RenderingAttachmentResolveInfo>,

    /// How the contents are initialized when the region begins.
    ///
    /// The default value is [`LoadOp::DontCare`].
    pub load_op: LoadOp,

    /// Whether the contents are kept when the region ends.
    ///
    /// The default value is [`StoreOp::DontCare`].
    pub store_op: StoreOp,

    /// The value that [`LoadOp::Clear`] fills the attachment with.
    ///
    /// The default value is `None`.
    pub clear_value: Option<ClearValue>,

    pub _ne: crate::NonExhaustive,
}

impl RenderingAttachmentInfo {
    /// Returns the info for rendering to `image_view` in its attachment layout, without loading
    /// or storing it.
    #[inline]
    pub fn image_view(image_view: Arc<ImageView>) -> Self {
        let aspects = image_view.format().aspects();
        let image_layout = if aspects.intersects(ImageAspects::DEPTH | ImageAspects::STENCIL) {
            ImageLayout::DepthStencilAttachmentOptimal
        } else {
            ImageLayout::ColorAttachmentOptimal
        };

        Self {
            image_view,
            image_layout,
            initial_layout: None,
            resolve_info: None,
            load_op: LoadOp::DontCare,
            store_op: StoreOp::DontCare,
            clear_value: None,
            _ne: crate::NonExhaustive(()),
        }
    }
}

/// How a multisampled attachment is resolved at the end of a rendering region.
#[derive(Clone, Debug)]
pub struct RenderingAttachmentResolveInfo {
    /// How the samples of a pixel are combined.
    pub mode: ResolveMode,

    /// The single-sampled view that receives the result.
    ///
    /// `None` when multisampled rendering to a single-sampled attachment resolves into the
    /// attachment itself.
    pub image_view: Option<Arc<ImageView>>,

    /// The layout of the resolve target while it is written.
    pub image_layout: ImageLayout,
}

/// The fragment shading rate attachment of a rendering region.
#[derive(Clone, Debug)]
pub struct RenderingFragmentShadingRateAttachmentInfo {
    pub image_view: Arc<ImageView>,
    pub image_layout: ImageLayout,

    /// The size of the region of the framebuffer that each texel covers.
    pub texel_size: [u32; 2],
}

/// The fragment density map attachment of a rendering region.
#[derive(Clone, Debug)]
pub struct RenderingFragmentDensityMapAttachmentInfo {
    pub image_view: Arc<ImageView>,
    pub image_layout: ImageLayout,
}

/// What [`RenderPassRecorder::begin_render_pass`] begins.
#[derive(Clone, Debug)]
pub struct RenderPassBeginInfo {
    /// The render pass that is recorded.
    ///
    /// The default value is the render pass of `framebuffer`.
    pub render_pass: Arc<RenderPass>,

    /// The framebuffer providing the attachments, or their size only if it is imageless.
    ///
    /// There is no default value.
    pub framebuffer: Arc<Framebuffer>,

    /// The top left corner of the rendered area, in pixels.
    ///
    /// The default value is `[0, 0]`.
    pub render_area_offset: [u32; 2],

    /// The width and height of the rendered area, in pixels.
    ///
    /// The default value is [`framebuffer.extent()`](Framebuffer::extent).
    pub render_area_extent: [u32; 2],

    /// The clear value of each attachment, by attachment index. Only attachments that are
    /// cleared need one; the others can be `None` or left out at the end of the list.
    ///
    /// The default value is empty.
    pub clear_values: Vec<Option<ClearValue>>,

    /// The image views to use as attachments, if `framebuffer` is imageless.
    ///
    /// If not empty, these are used instead of the attachments of `framebuffer`.
    ///
    /// The default value is empty.
    pub attachments: Vec<Arc<ImageView>>,

    /// Custom sample locations for depth/stencil attachments.
    ///
    /// The default value is `None`.
    pub sample_locations: Option<RenderPassSampleLocationsInfo>,

    pub _ne: crate::NonExhaustive,
}

impl RenderPassBeginInfo {
    #[inline]
    pub fn framebuffer(framebuffer: Arc<Framebuffer>) -> Self {
        let render_area_extent = framebuffer.extent();

        Self {
            render_pass: framebuffer.render_pass().clone(),
            framebuffer,
            render_area_offset: [0, 0],
            render_area_extent,
            clear_values: Vec::new(),
            attachments: Vec::new(),
            sample_locations: None,
            _ne: crate::NonExhaustive(()),
        }
    }
}

/// Custom sample locations that a render pass uses.
#[derive(Clone, Debug, Default)]
pub struct RenderPassSampleLocationsInfo {
    /// For an attachment index, the sample locations that the attachment is in when the render
    /// pass begins.
    pub attachment_initial_sample_locations: Vec<(u32, SampleLocationsInfo)>,

    /// For a subpass index, the sample locations that rendering uses in that subpass.
    pub post_subpass_sample_locations: Vec<(u32, SampleLocationsInfo)>,
}

/// What a secondary command buffer inherits from the primary command buffer that executes it.
#[derive(Clone, Debug)]
pub struct CommandBufferInheritanceInfo {
    /// If `Some`, the secondary command buffer continues rendering that the primary command
    /// buffer began.
    ///
    /// The default value is `None`.
    pub render_pass: Option<CommandBufferInheritanceRenderPassType>,

    pub _ne: crate::NonExhaustive,
}

impl Default for CommandBufferInheritanceInfo {
    #[inline]
    fn default() -> Self {
        Self {
            render_pass: None,
            _ne: crate::NonExhaustive(()),
        }
    }
}

/// The kind of rendering that a secondary command buffer continues.
#[derive(Clone, Debug)]
pub enum CommandBufferInheritanceRenderPassType {
    /// A subpass of a render pass.
    BeginRenderPass(CommandBufferInheritanceRenderPassInfo),

    /// A region begun directly with dynamic rendering.
    BeginRendering(CommandBufferInheritanceRenderingInfo),
}

impl From<Subpass> for CommandBufferInheritanceRenderPassType {
    #[inline]
    fn from(val: Subpass) -> Self {
        Self::BeginRenderPass(val.into())
    }
}

impl From<CommandBufferInheritanceRenderPassInfo> for CommandBufferInheritanceRenderPassType {
    #[inline]
    fn from(val: CommandBufferInheritanceRenderPassInfo) -> Self {
        Self::BeginRenderPass(val)
    }
}

impl From<CommandBufferInheritanceRenderingInfo> for CommandBufferInheritanceRenderPassType {
    #[inline]
    fn from(val: CommandBufferInheritanceRenderingInfo) -> Self {
        Self::BeginRendering(val)
    }
}

/// The subpass that a secondary command buffer continues.
#[derive(Clone, Debug)]
pub struct CommandBufferInheritanceRenderPassInfo {
    /// The subpass that the command buffer is executed in.
    ///
    /// There is no default value.
    pub subpass: Subpass,

    /// The framebuffer of the render pass instance, if it is known when recording.
    ///
    /// The default value is `None`.
    pub framebuffer: Option<Arc<Framebuffer>>,
}

impl CommandBufferInheritanceRenderPassInfo {
    /// Returns the inheritance info for `subpass`, with an unknown framebuffer.
    #[inline]
    pub fn subpass(subpass: Subpass) -> Self {
        Self {
            subpass,
            framebuffer: None,
        }
    }
}

impl From<Subpass> for CommandBufferInheritanceRenderPassInfo {
    #[inline]
    fn from(subpass: Subpass) -> Self {
        Self::subpass(subpass)
    }
}

/// The rendering state that a secondary command buffer is recorded against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandBufferInheritanceRenderingInfo {
    /// Additional properties of the rendering region.
    ///
    /// The default value is empty.
    pub flags: RenderingFlags,

    /// The views that are rendered to, one bit per view. `0` disables multiview.
    ///
    /// The default value is `0`.
    pub view_mask: u32,

    /// The format of the color attachment at each location.
    ///
    /// `None` marks a location with no attachment.
    ///
    /// The default value is empty.
    pub color_attachment_formats: Vec<Option<Format>>,

    /// The format of the depth attachment, if any.
    ///
    /// The default value is `None`.
    pub depth_attachment_format: Option<Format>,

    /// The format of the stencil attachment, if any.
    ///
    /// The default value is `None`.
    pub stencil_attachment_format: Option<Format>,

    /// The sample counts that the attachments will have.
    ///
    /// The default value is [`SampleCounts::SAMPLE_1`].
    pub rasterization_samples: SampleCounts,
}

impl Default for CommandBufferInheritanceRenderingInfo {
    #[inline]
    fn default() -> Self {
        Self {
            flags: RenderingFlags::empty(),
            view_mask: 0,
            color_attachment_formats: Vec::new(),
            depth_attachment_format: None,
            stencil_attachment_format: None,
            rasterization_samples: SampleCounts::SAMPLE_1,
        }
    }
}
