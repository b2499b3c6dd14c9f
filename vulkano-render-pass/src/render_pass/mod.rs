// Copyright (c) 2025 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Description of the steps of the rendering process, and the images used as input or output.
//!
//! # Render passes and dynamic rendering
//!
//! A *render pass* describes the overall process of drawing a frame. It is subdivided into one or
//! more subpasses, each of which reads some attachments as input attachments and renders to
//! others. Dependencies between subpasses describe how data written by one subpass is read by a
//! later one.
//!
//! Dynamic rendering has no notion of subpasses. Every subpass is therefore recorded as its own
//! rendering region, with the layout transitions, load operations and barriers that the render
//! pass implied inserted between regions. When the device renders through a tile buffer, adjacent
//! subpasses that keep their render targets resident in the tile buffer are merged into one
//! region. See [`RenderPass::regions`] for the result of that planning.
//!
//! A *framebuffer* contains the list of image views that are attached during the drawing of each
//! subpass.

pub use self::{
    create::RenderPassCreationError,
    framebuffer::{Framebuffer, FramebufferCreateFlags, FramebufferCreateInfo},
    rendering::{
        inheritance_as_rendering_resume, inheritance_rendering_info_for, AttachmentSampleCountInfo,
        PipelineRenderingCreateInfo, RenderingAttachmentLocationInfo,
        RenderingInputAttachmentIndexInfo,
    },
};
use self::rendering::SubpassRenderingInfo;
use crate::{
    device::DeviceProperties,
    format::Format,
    image::{ImageAspects, ImageLayout, SampleCount},
    sync::{AccessFlags, DependencyFlags, MemoryBarrier, PipelineStages},
};
use std::{ops::Range, sync::Arc};

mod create;
pub(crate) mod dependency;
mod framebuffer;
mod fuse;
pub(crate) mod merge;
mod rendering;

/// An object representing the discrete steps in which rendering is done.
///
/// A render pass is made up of three parts:
/// - A list of attachments, which are image views that are inputs, outputs or intermediate stages
///   in the rendering process.
/// - One or more subpasses, which are the steps in which the rendering process takes place, and
///   the attachments that are used for each step.
/// - Dependencies, which describe how the input and output data of each subpass is to be passed
///   from one subpass to the next.
///
/// ```
/// use vulkano_render_pass::{
///     device::DeviceLimits,
///     format::Format,
///     image::ImageLayout,
///     render_pass::{
///         AttachmentDescription, AttachmentReference, LoadOp, RenderPass, RenderPassCreateInfo,
///         StoreOp, SubpassDescription,
///     },
/// };
///
/// let render_pass = RenderPass::new(
///     &DeviceLimits::default(),
///     RenderPassCreateInfo {
///         attachments: vec![AttachmentDescription {
///             format: Format::R8G8B8A8_UNORM,
///             load_op: LoadOp::Clear,
///             store_op: StoreOp::Store,
///             final_layout: ImageLayout::ColorAttachmentOptimal,
///             ..Default::default()
///         }],
///         subpasses: vec![SubpassDescription {
///             color_attachments: vec![Some(AttachmentReference {
///                 attachment: 0,
///                 layout: ImageLayout::ColorAttachmentOptimal,
///                 ..Default::default()
///             })],
///             ..Default::default()
///         }],
///         ..Default::default()
///     },
/// )
/// .unwrap();
///
/// assert_eq!(render_pass.regions(), [0..1]);
/// ```
#[derive(Debug)]
pub struct RenderPass {
    attachments: Vec<RenderPassAttachment>,
    subpasses: Vec<SubpassState>,
    dependencies: Vec<SubpassDependency>,
    merge_groups: Vec<MergeGroup>,
    regions: Vec<Range<u32>>,
    fragment_density_map: Option<FragmentDensityMapAttachment>,

    is_multiview: bool,
    view_mask: u32,
}

impl RenderPass {
    /// Creates a new `RenderPass`.
    ///
    /// The description is validated against `device`, normalized, and, if the device has a tile
    /// buffer, planned into merged rendering regions.
    pub fn new<D>(
        device: &D,
        create_info: RenderPassCreateInfo,
    ) -> Result<Arc<RenderPass>, RenderPassCreationError>
    where
        D: DeviceProperties + ?Sized,
    {
        Self::validate(device, &create_info)?;

        let mut render_pass = Self::build(create_info)?;
        render_pass.plan_and_fuse(device)?;

        Ok(Arc::new(render_pass))
    }

    /// Returns the attachments of the render pass.
    #[inline]
    pub fn attachments(&self) -> &[RenderPassAttachment] {
        &self.attachments
    }

    /// Returns the subpasses of the render pass.
    #[inline]
    pub fn subpasses(&self) -> &[SubpassState] {
        &self.subpasses
    }

    /// Returns the dependencies of the render pass.
    ///
    /// Dependencies that were given a memory barrier override carry the stages and access of that
    /// barrier.
    #[inline]
    pub fn dependencies(&self) -> &[SubpassDependency] {
        &self.dependencies
    }

    /// Returns the rendering regions that the subpasses are recorded as.
    ///
    /// The regions partition the subpass indices into consecutive, non-overlapping ranges. A range
    /// containing more than one subpass is a merged group.
    #[inline]
    pub fn regions(&self) -> &[Range<u32>] {
        &self.regions
    }

    /// Returns the fragment density map attachment, if any.
    #[inline]
    pub fn fragment_density_map(&self) -> Option<&FragmentDensityMapAttachment> {
        self.fragment_density_map.as_ref()
    }

    /// Returns whether the subpasses of the render pass use multiview rendering.
    #[inline]
    pub fn is_multiview(&self) -> bool {
        self.is_multiview
    }

    /// Returns the union of the view masks of all subpasses.
    ///
    /// For a render pass without multiview, this is `1`.
    #[inline]
    pub fn view_mask(&self) -> u32 {
        self.view_mask
    }

    /// Returns the granularity of the render area.
    ///
    /// Dynamic rendering has no render area alignment requirement, so this is always `[1, 1]`.
    #[inline]
    pub fn render_area_granularity(&self) -> [u32; 2] {
        [1, 1]
    }

    /// Returns the first subpass of the render pass.
    #[inline]
    pub fn first_subpass(self: Arc<Self>) -> Subpass {
        Subpass {
            render_pass: self,
            subpass_id: 0,
        }
    }

    /// Returns the render targets that subpass `subpass` renders to.
    ///
    /// For a subpass that is part of a merged group, these are the render targets of the whole
    /// group.
    ///
    /// # Panics
    ///
    /// - Panics if `subpass` is out of range.
    #[inline]
    pub fn targets(&self, subpass: u32) -> &RenderTargets {
        let state = &self.subpasses[subpass as usize];

        match state.merge_group {
            Some(id) => &self.merge_groups[id.0 as usize].targets,
            None => &state.targets,
        }
    }

    /// Returns the merged group with the given id.
    #[inline]
    pub fn merge_group(&self, id: MergeGroupId) -> &MergeGroup {
        &self.merge_groups[id.0 as usize]
    }

    /// Returns the last subpass of the rendering region that `subpass` is part of.
    pub(crate) fn region_end(&self, subpass: u32) -> u32 {
        self.regions
            .iter()
            .find(|region| region.contains(&subpass))
            .map_or(subpass, |region| region.end - 1)
    }

    /// Returns the first subpass of the rendering region that `subpass` is part of.
    pub(crate) fn region_start(&self, subpass: u32) -> u32 {
        self.regions
            .iter()
            .find(|region| region.contains(&subpass))
            .map_or(subpass, |region| region.start)
    }
}

/// Represents a subpass within a `RenderPass` object.
///
/// This struct is an equivalent to a tuple of a render pass and subpass index. Contrary to a
/// tuple, however, the existence of the subpass is checked when the object is created. When you
/// have a `Subpass` you are guaranteed that the given subpass does exist.
#[derive(Clone, Debug)]
pub struct Subpass {
    render_pass: Arc<RenderPass>,
    subpass_id: u32,
}

impl Subpass {
    /// Returns a handle that represents a subpass of a render pass.
    #[inline]
    pub fn from(render_pass: Arc<RenderPass>, id: u32) -> Option<Subpass> {
        if (id as usize) < render_pass.subpasses.len() {
            Some(Subpass {
                render_pass,
                subpass_id: id,
            })
        } else {
            None
        }
    }

    /// Returns the render pass of this subpass.
    #[inline]
    pub fn render_pass(&self) -> &Arc<RenderPass> {
        &self.render_pass
    }

    /// Returns the index of this subpass within the render pass.
    #[inline]
    pub fn index(&self) -> u32 {
        self.subpass_id
    }

    /// Returns whether this subpass is the last one in the render pass.
    #[inline]
    pub fn is_last_subpass(&self) -> bool {
        self.subpass_id as usize == self.render_pass.subpasses.len() - 1
    }

    /// Returns the subpass after this one, if there is one.
    #[inline]
    pub fn next_subpass(&self) -> Option<Subpass> {
        Subpass::from(self.render_pass.clone(), self.subpass_id + 1)
    }

    #[inline]
    pub(crate) fn state(&self) -> &SubpassState {
        &self.render_pass.subpasses[self.subpass_id as usize]
    }

    #[inline]
    pub(crate) fn info(&self) -> &SubpassRenderingInfo {
        &self.state().info
    }
}

impl From<Subpass> for (Arc<RenderPass>, u32) {
    #[inline]
    fn from(value: Subpass) -> (Arc<RenderPass>, u32) {
        (value.render_pass, value.subpass_id)
    }
}

/// Parameters to create a new `RenderPass`.
#[derive(Clone, Debug)]
pub struct RenderPassCreateInfo {
    /// The attachments available for the render pass.
    ///
    /// The default value is empty.
    pub attachments: Vec<AttachmentDescription>,

    /// The subpasses that make up this render pass.
    ///
    /// A render pass must contain at least one subpass.
    ///
    /// The default value is empty, which must be overridden.
    pub subpasses: Vec<SubpassDescription>,

    /// The dependencies between subpasses.
    ///
    /// The default value is empty.
    pub dependencies: Vec<SubpassDependency>,

    /// An attachment that is used as a fragment density map in every subpass.
    ///
    /// The attachment is never loaded or cleared; it is only transitioned to `layout` before each
    /// rendering region.
    ///
    /// The default value is `None`.
    pub fragment_density_map_attachment: Option<AttachmentReference>,

    pub _ne: crate::NonExhaustive,
}

impl Default for RenderPassCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            attachments: Vec::new(),
            subpasses: Vec::new(),
            dependencies: Vec::new(),
            fragment_density_map_attachment: None,
            _ne: crate::NonExhaustive(()),
        }
    }
}

/// Describes an attachment that will be used in a render pass.
#[derive(Clone, Copy, Debug)]
pub struct AttachmentDescription {
    /// The format of the image that is going to be bound.
    ///
    /// The default value is [`Format::UNDEFINED`], which must be overridden.
    pub format: Format,

    /// The number of samples of the image that is going to be bound.
    ///
    /// The default value is [`SampleCount::Sample1`].
    pub samples: SampleCount,

    /// What the implementation should do with the attachment at the start of the subpass that
    /// first uses it.
    ///
    /// The default value is [`LoadOp::DontCare`].
    pub load_op: LoadOp,

    /// What the implementation should do with the attachment at the end of the subpass that last
    /// uses it.
    ///
    /// The default value is [`StoreOp::DontCare`].
    pub store_op: StoreOp,

    /// The equivalent of `load_op` for the stencil component of the attachment, if any.
    /// Irrelevant if there is no stencil component.
    ///
    /// If `None`, `load_op` is used.
    ///
    /// The default value is `None`.
    pub stencil_load_op: Option<LoadOp>,

    /// The equivalent of `store_op` for the stencil component of the attachment, if any.
    /// Irrelevant if there is no stencil component.
    ///
    /// If `None`, `store_op` is used.
    ///
    /// The default value is `None`.
    pub stencil_store_op: Option<StoreOp>,

    /// The layout that the image must be in at the start of the render pass.
    ///
    /// The default value is [`ImageLayout::Undefined`].
    pub initial_layout: ImageLayout,

    /// The layout that the image will be transitioned to at the end of the render pass.
    ///
    /// The default value is [`ImageLayout::Undefined`], which must be overridden.
    pub final_layout: ImageLayout,

    /// The layout of the stencil aspect at the start of the render pass, if it differs from
    /// `initial_layout`.
    ///
    /// The default value is `None`.
    pub stencil_initial_layout: Option<ImageLayout>,

    /// The layout of the stencil aspect at the end of the render pass, if it differs from
    /// `final_layout`.
    ///
    /// The default value is `None`.
    pub stencil_final_layout: Option<ImageLayout>,

    pub _ne: crate::NonExhaustive,
}

impl Default for AttachmentDescription {
    #[inline]
    fn default() -> Self {
        Self {
            format: Format::UNDEFINED,
            samples: SampleCount::Sample1,
            load_op: LoadOp::DontCare,
            store_op: StoreOp::DontCare,
            stencil_load_op: None,
            stencil_store_op: None,
            initial_layout: ImageLayout::Undefined,
            final_layout: ImageLayout::Undefined,
            stencil_initial_layout: None,
            stencil_final_layout: None,
            _ne: crate::NonExhaustive(()),
        }
    }
}

/// Describes one of the subpasses of a render pass.
///
/// A subpass can use zero or more attachments of various types. Attachment types of which there
/// can be multiple are listed in a `Vec` in this structure. The index in these `Vec`s corresponds
/// to the index used for that attachment type in the shader.
///
/// If a particular index is not used in the shader, it can be set to `None` in this structure.
/// This is useful if an unused index needs to be skipped but a higher index needs to be
/// specified.
#[derive(Clone, Debug)]
pub struct SubpassDescription {
    /// If not `0`, enables multiview rendering, and specifies the view indices that are rendered
    /// to in this subpass. The value is a bitmask, so that that for example `0b11` will draw to
    /// the first two views and `0b101` will draw to the first and third view.
    ///
    /// If set to a nonzero value, it must be nonzero for all subpasses in the render pass.
    ///
    /// The default value is `0`.
    pub view_mask: u32,

    /// The attachments of the render pass that are to be used as input attachments in this
    /// subpass.
    ///
    /// The default value is empty.
    pub input_attachments: Vec<Option<AttachmentReference>>,

    /// The attachments of the render pass that are to be used as color attachments in this
    /// subpass.
    ///
    /// The number of color attachments must not be greater than
    /// [`DeviceProperties::max_color_attachments`].
    ///
    /// The default value is empty.
    pub color_attachments: Vec<Option<AttachmentReference>>,

    /// The attachments that the color attachments are resolved to at the end of the subpass.
    ///
    /// This list must either be empty or have the same length as `color_attachments`. Each
    /// resolve attachment is paired with the color attachment of the same index.
    ///
    /// The default value is empty.
    pub color_resolve_attachments: Vec<Option<AttachmentReference>>,

    /// The single attachment of the render pass that is to be used as depth/stencil attachment
    /// in this subpass.
    ///
    /// The default value is `None`.
    pub depth_stencil_attachment: Option<AttachmentReference>,

    /// The attachment that the depth/stencil attachment is resolved to at the end of the subpass.
    ///
    /// If set to `Some`, `depth_stencil_attachment` must also be `Some`, and at least one of
    /// `depth_resolve_mode` and `stencil_resolve_mode` must be `Some`.
    ///
    /// The default value is `None`.
    pub depth_stencil_resolve_attachment: Option<AttachmentReference>,

    /// How the depth aspect of the depth/stencil attachment is resolved.
    ///
    /// The default value is `None`.
    pub depth_resolve_mode: Option<ResolveMode>,

    /// How the stencil aspect of the depth/stencil attachment is resolved.
    ///
    /// The default value is `None`.
    pub stencil_resolve_mode: Option<ResolveMode>,

    /// An attachment that provides the fragment shading rate for this subpass.
    ///
    /// The default value is `None`.
    pub fragment_shading_rate_attachment: Option<AttachmentReference>,

    /// The size of the region of the framebuffer that each texel of
    /// `fragment_shading_rate_attachment` covers.
    ///
    /// The default value is `[0, 0]`.
    pub fragment_shading_rate_texel_size: [u32; 2],

    /// If `Some`, the single-sampled attachments of this subpass are rendered to as if they had
    /// the given number of samples, and are implicitly resolved at the end of the subpass.
    ///
    /// The default value is `None`.
    pub multisampled_render_to_single_sampled: Option<SampleCount>,

    /// Whether legacy dithering is enabled while rendering this subpass.
    ///
    /// The default value is `false`.
    pub legacy_dithering: bool,

    /// The indices of attachments of the render pass that will be preserved during this subpass.
    ///
    /// The default value is empty.
    pub preserve_attachments: Vec<u32>,

    pub _ne: crate::NonExhaustive,
}

impl Default for SubpassDescription {
    #[inline]
    fn default() -> Self {
        Self {
            view_mask: 0,
            input_attachments: Vec::new(),
            color_attachments: Vec::new(),
            color_resolve_attachments: Vec::new(),
            depth_stencil_attachment: None,
            depth_stencil_resolve_attachment: None,
            depth_resolve_mode: None,
            stencil_resolve_mode: None,
            fragment_shading_rate_attachment: None,
            fragment_shading_rate_texel_size: [0, 0],
            multisampled_render_to_single_sampled: None,
            legacy_dithering: false,
            preserve_attachments: Vec::new(),
            _ne: crate::NonExhaustive(()),
        }
    }
}

/// A reference in a subpass description to a particular attachment of the render pass.
#[derive(Clone, Copy, Debug)]
pub struct AttachmentReference {
    /// The number of the attachment being referred to.
    ///
    /// The default value is `0`.
    pub attachment: u32,

    /// The image layout that the attachment should be transitioned to at the start of the
    /// subpass.
    ///
    /// The default value is [`ImageLayout::Undefined`], which must be overridden.
    pub layout: ImageLayout,

    /// The layout of the stencil aspect, if it differs from `layout`.
    ///
    /// Ignored if the attachment has no stencil aspect.
    ///
    /// The default value is `None`.
    pub stencil_layout: Option<ImageLayout>,

    /// For references to input attachments, the aspects of the image that should be selected.
    /// For attachment types other than input attachments, the value is ignored.
    ///
    /// If empty, all aspects available in the attachment's `format` are selected. Otherwise the
    /// aspects must be available in the `format` of the attachment.
    ///
    /// The default value is [`ImageAspects::empty()`].
    pub aspects: ImageAspects,

    pub _ne: crate::NonExhaustive,
}

impl Default for AttachmentReference {
    #[inline]
    fn default() -> Self {
        Self {
            attachment: 0,
            layout: ImageLayout::Undefined,
            stencil_layout: None,
            aspects: ImageAspects::empty(),
            _ne: crate::NonExhaustive(()),
        }
    }
}

/// A dependency between two subpasses of a render pass.
///
/// If `src_subpass` or `dst_subpass` are set to `None`, this specifies an external dependency. An
/// external dependency specifies a dependency on commands that were submitted before the render
/// pass instance began (for `src_subpass`), or on commands that will be submitted after the
/// render pass instance ends (for `dst_subpass`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubpassDependency {
    /// The index of the subpass that writes the data that `dst_subpass` is going to use.
    ///
    /// `None` specifies an external dependency.
    ///
    /// The default value is `None`.
    pub src_subpass: Option<u32>,

    /// The index of the subpass that reads the data that `src_subpass` wrote.
    ///
    /// `None` specifies an external dependency.
    ///
    /// The default value is `None`.
    pub dst_subpass: Option<u32>,

    /// The pipeline stages that must be finished on `src_subpass` before the `dst_stages` of
    /// `dst_subpass` can start.
    ///
    /// The default value is [`PipelineStages::empty()`].
    pub src_stages: PipelineStages,

    /// The pipeline stages of `dst_subpass` that must wait for the `src_stages` of `src_subpass`
    /// to be finished.
    ///
    /// The default value is [`PipelineStages::empty()`].
    pub dst_stages: PipelineStages,

    /// The way `src_subpass` accesses the attachments on which we depend.
    ///
    /// The default value is [`AccessFlags::empty()`].
    pub src_access: AccessFlags,

    /// The way `dst_subpass` accesses the attachments on which we depend.
    ///
    /// The default value is [`AccessFlags::empty()`].
    pub dst_access: AccessFlags,

    /// Dependency flags that modify behavior of the subpass dependency.
    ///
    /// If `VIEW_LOCAL` is set, neither subpass may be external.
    ///
    /// The default value is [`DependencyFlags::empty()`].
    pub dependency_flags: DependencyFlags,

    /// If `dependency_flags` includes `VIEW_LOCAL`, each view `d` in `dst_subpass` depends on
    /// view `d + view_offset` in `src_subpass`.
    ///
    /// The default value is `0`.
    pub view_offset: i32,

    /// If `Some`, the stages and access of this barrier replace the four stage and access fields
    /// above.
    ///
    /// The default value is `None`.
    pub memory_barrier: Option<MemoryBarrier>,

    pub _ne: crate::NonExhaustive,
}

impl Default for SubpassDependency {
    #[inline]
    fn default() -> Self {
        Self {
            src_subpass: None,
            dst_subpass: None,
            src_stages: PipelineStages::empty(),
            dst_stages: PipelineStages::empty(),
            src_access: AccessFlags::empty(),
            dst_access: AccessFlags::empty(),
            dependency_flags: DependencyFlags::empty(),
            view_offset: 0,
            memory_barrier: None,
            _ne: crate::NonExhaustive(()),
        }
    }
}

vulkan_enum! {
    #[non_exhaustive]

    /// Describes what the implementation should do with an attachment at the start of the
    /// subpass.
    LoadOp = AttachmentLoadOp(i32);

    /// The content of the attachment will be loaded from memory. This is what you want if you
    /// want to draw over something existing.
    Load = LOAD,

    /// The content of the attachment will be filled by the implementation with a uniform value
    /// that you must provide when you start drawing.
    Clear = CLEAR,

    /// The attachment will have undefined content.
    DontCare = DONT_CARE,
}

vulkan_enum! {
    #[non_exhaustive]

    /// Describes what the implementation should do with an attachment after all the subpasses
    /// have completed.
    StoreOp = AttachmentStoreOp(i32);

    /// The attachment will be stored.
    Store = STORE,

    /// What happens is implementation-specific. The content of the image is undefined afterwards.
    DontCare = DONT_CARE,

    /// The attachment is not written by the rendering, so it is neither stored nor discarded.
    None = NONE,
}

vulkan_enum! {
    #[non_exhaustive]

    /// Possible resolve modes for attachments.
    ResolveMode = ResolveModeFlags(u32);

    /// The value of the first sample is used.
    SampleZero = SAMPLE_ZERO,

    /// The average of all samples is used.
    Average = AVERAGE,

    /// The minimum of all samples is used.
    Min = MIN,

    /// The maximum of all samples is used.
    Max = MAX,
}

vulkan_bitflags! {
    /// Flags that a graphics pipeline must be created with to be used in a subpass.
    PipelineCreateFlags = PipelineCreateFlags(u32);

    /// The subpass reads one of its color attachments as an input attachment.
    COLOR_ATTACHMENT_FEEDBACK_LOOP = COLOR_ATTACHMENT_FEEDBACK_LOOP_EXT,

    /// The subpass reads its depth/stencil attachment as an input attachment.
    DEPTH_STENCIL_ATTACHMENT_FEEDBACK_LOOP = DEPTH_STENCIL_ATTACHMENT_FEEDBACK_LOOP_EXT,

    /// The subpass uses a fragment shading rate attachment.
    RENDERING_FRAGMENT_SHADING_RATE_ATTACHMENT = RENDERING_FRAGMENT_SHADING_RATE_ATTACHMENT_KHR,

    /// The render pass uses a fragment density map.
    RENDERING_FRAGMENT_DENSITY_MAP_ATTACHMENT = RENDERING_FRAGMENT_DENSITY_MAP_ATTACHMENT_EXT,
}

/// An attachment of a render pass, after normalization.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct RenderPassAttachment {
    pub format: Format,

    /// The aspects of `format`.
    pub aspects: ImageAspects,

    pub samples: SampleCount,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub stencil_load_op: LoadOp,
    pub stencil_store_op: StoreOp,
    pub initial_layout: ImageLayout,
    pub final_layout: ImageLayout,

    /// [`ImageLayout::Undefined`] if the format has no stencil aspect.
    pub stencil_initial_layout: ImageLayout,

    /// [`ImageLayout::Undefined`] if the format has no stencil aspect.
    pub stencil_final_layout: ImageLayout,

    /// The union of the view masks of every subpass that references the attachment.
    pub view_mask: u32,
}

/// How a subpass uses one of the attachments it references.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttachmentUsage {
    Input,
    Color,
    DepthStencil,
    Resolve,
    FragmentShadingRate,
}

/// A reference from a subpass to an attachment, after normalization.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct SubpassAttachment {
    /// The index of the attachment in the render pass.
    pub attachment: u32,

    /// The aspects of the attachment that are referenced.
    pub aspects: ImageAspects,

    pub usage: AttachmentUsage,
    pub layout: ImageLayout,

    /// [`ImageLayout::Undefined`] if the attachment has no stencil aspect.
    pub stencil_layout: ImageLayout,

    /// The views for which this subpass is the last one in the render pass to use the
    /// attachment.
    pub last_subpass: u32,
}

/// The render targets of a subpass, or of a group of merged subpasses.
#[derive(Clone, Debug, Default)]
pub struct RenderTargets {
    pub(crate) colors: Vec<Option<SubpassAttachment>>,
    pub(crate) color_resolves: Vec<Option<SubpassAttachment>>,
    pub(crate) depth_stencil: Option<SubpassAttachment>,
    pub(crate) depth_stencil_resolve: Option<SubpassAttachment>,
    pub(crate) fragment_shading_rate: Option<SubpassAttachment>,
    pub(crate) fragment_shading_rate_texel_size: [u32; 2],
    pub(crate) view_mask: u32,
    pub(crate) depth_resolve_mode: Option<ResolveMode>,
    pub(crate) stencil_resolve_mode: Option<ResolveMode>,
    pub(crate) multisampled_render_to_single_sampled: Option<SampleCount>,
    pub(crate) legacy_dithering: bool,
    pub(crate) pipeline_flags: PipelineCreateFlags,
}

impl RenderTargets {
    /// Returns the color attachments.
    #[inline]
    pub fn colors(&self) -> &[Option<SubpassAttachment>] {
        &self.colors
    }

    /// Returns the attachment that color attachment `index` is resolved to.
    #[inline]
    pub fn color_resolve(&self, index: usize) -> Option<&SubpassAttachment> {
        self.color_resolves.get(index).and_then(Option::as_ref)
    }

    #[inline]
    pub fn depth_stencil(&self) -> Option<&SubpassAttachment> {
        self.depth_stencil.as_ref()
    }

    /// Returns the attachment that the depth/stencil attachment is resolved to.
    #[inline]
    pub fn depth_stencil_resolve(&self) -> Option<&SubpassAttachment> {
        self.depth_stencil_resolve.as_ref()
    }

    #[inline]
    pub fn fragment_shading_rate(&self) -> Option<&SubpassAttachment> {
        self.fragment_shading_rate.as_ref()
    }

    #[inline]
    pub fn fragment_shading_rate_texel_size(&self) -> [u32; 2] {
        self.fragment_shading_rate_texel_size
    }

    /// Returns the view mask. This is never zero.
    #[inline]
    pub fn view_mask(&self) -> u32 {
        self.view_mask
    }

    #[inline]
    pub fn depth_resolve_mode(&self) -> Option<ResolveMode> {
        self.depth_resolve_mode
    }

    #[inline]
    pub fn stencil_resolve_mode(&self) -> Option<ResolveMode> {
        self.stencil_resolve_mode
    }

    #[inline]
    pub fn multisampled_render_to_single_sampled(&self) -> Option<SampleCount> {
        self.multisampled_render_to_single_sampled
    }

    #[inline]
    pub fn legacy_dithering(&self) -> bool {
        self.legacy_dithering
    }

    #[inline]
    pub fn pipeline_flags(&self) -> PipelineCreateFlags {
        self.pipeline_flags
    }

    /// Returns every attachment reference of the render targets.
    pub(crate) fn references(&self) -> impl Iterator<Item = &SubpassAttachment> {
        (self.colors.iter().flatten())
            .chain(self.color_resolves.iter().flatten())
            .chain(&self.depth_stencil)
            .chain(&self.depth_stencil_resolve)
            .chain(&self.fragment_shading_rate)
    }

    pub(crate) fn references_mut(&mut self) -> impl Iterator<Item = &mut SubpassAttachment> {
        (self.colors.iter_mut().flatten())
            .chain(self.color_resolves.iter_mut().flatten())
            .chain(&mut self.depth_stencil)
            .chain(&mut self.depth_stencil_resolve)
            .chain(&mut self.fragment_shading_rate)
    }
}

/// How a subpass takes part in merging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SubpassMergeState {
    /// The subpass is recorded as a rendering region of its own.
    #[default]
    NotMerged,

    /// The subpass opens a merged rendering region.
    MergedFirst,

    /// The subpass is inside a merged rendering region.
    MergedMid,

    /// The subpass closes a merged rendering region.
    MergedLast,
}

/// Identifies a group of merged subpasses within a render pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MergeGroupId(pub(crate) u32);

/// A group of adjacent subpasses that are recorded as one rendering region.
#[derive(Clone, Debug)]
pub struct MergeGroup {
    pub(crate) subpasses: Range<u32>,
    pub(crate) targets: RenderTargets,
}

impl MergeGroup {
    /// Returns the subpasses of the group.
    #[inline]
    pub fn subpasses(&self) -> Range<u32> {
        self.subpasses.clone()
    }

    /// Returns the render targets of the group, which are the union of the render targets of its
    /// members.
    #[inline]
    pub fn targets(&self) -> &RenderTargets {
        &self.targets
    }
}

/// The state of a single subpass of a render pass.
#[derive(Clone, Debug)]
pub struct SubpassState {
    pub(crate) input_attachments: Vec<Option<SubpassAttachment>>,
    pub(crate) targets: RenderTargets,
    pub(crate) merge_state: SubpassMergeState,
    pub(crate) merge_group: Option<MergeGroupId>,
    pub(crate) color_locations: Vec<Option<u32>>,
    pub(crate) preserve_attachments: Vec<u32>,
    pub(crate) info: SubpassRenderingInfo,
}

impl SubpassState {
    /// Returns the input attachments.
    ///
    /// For a merged subpass, inputs that reference the same attachment are collapsed into one.
    #[inline]
    pub fn input_attachments(&self) -> &[Option<SubpassAttachment>] {
        &self.input_attachments
    }

    /// Returns the render targets of the subpass itself, regardless of merging.
    #[inline]
    pub fn own_targets(&self) -> &RenderTargets {
        &self.targets
    }

    #[inline]
    pub fn merge_state(&self) -> SubpassMergeState {
        self.merge_state
    }

    #[inline]
    pub fn merge_group(&self) -> Option<MergeGroupId> {
        self.merge_group
    }

    /// Returns, for each color attachment of the rendering region, the index of the color
    /// attachment of this subpass that it corresponds to.
    #[inline]
    pub fn color_locations(&self) -> &[Option<u32>] {
        &self.color_locations
    }

    #[inline]
    pub fn preserve_attachments(&self) -> &[u32] {
        &self.preserve_attachments
    }

    /// Returns every attachment reference of the subpass, including its inputs.
    pub(crate) fn references(&self) -> impl Iterator<Item = &SubpassAttachment> {
        self.input_attachments
            .iter()
            .flatten()
            .chain(self.targets.references())
    }

    pub(crate) fn references_mut(&mut self) -> impl Iterator<Item = &mut SubpassAttachment> {
        self.input_attachments
            .iter_mut()
            .flatten()
            .chain(self.targets.references_mut())
    }
}

/// The fragment density map attachment of a render pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct FragmentDensityMapAttachment {
    pub attachment: u32,
    pub layout: ImageLayout,
}

#[cfg(test)]
mod tests {
    use super::{
        AttachmentDescription, AttachmentReference, LoadOp, RenderPass, RenderPassCreateInfo,
        RenderPassCreationError, StoreOp, Subpass, SubpassDescription, SubpassMergeState,
    };
    use crate::{device::DeviceLimits, format::Format, image::ImageLayout};

    fn color_pass(subpass_count: usize) -> RenderPassCreateInfo {
        RenderPassCreateInfo {
            attachments: vec![AttachmentDescription {
                format: Format::R8G8B8A8_UNORM,
                load_op: LoadOp::Clear,
                store_op: StoreOp::Store,
                final_layout: ImageLayout::ColorAttachmentOptimal,
                ..Default::default()
            }],
            subpasses: (0..subpass_count)
                .map(|_| SubpassDescription {
                    color_attachments: vec![Some(AttachmentReference {
                        attachment: 0,
                        layout: ImageLayout::ColorAttachmentOptimal,
                        ..Default::default()
                    })],
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn empty() {
        match RenderPass::new(&DeviceLimits::default(), RenderPassCreateInfo::default()) {
            Err(RenderPassCreationError::NoSubpasses) => (),
            _ => panic!(),
        }
    }

    #[test]
    fn single_subpass_region() {
        let rp = RenderPass::new(&DeviceLimits::default(), color_pass(1)).unwrap();

        assert_eq!(rp.regions(), [0..1]);
        assert_eq!(rp.subpasses()[0].merge_state(), SubpassMergeState::NotMerged);
        assert_eq!(rp.view_mask(), 1);
        assert!(!rp.is_multiview());
        assert_eq!(rp.render_area_granularity(), [1, 1]);
    }

    #[test]
    fn subpass_navigation() {
        let rp = RenderPass::new(&DeviceLimits::default(), color_pass(2)).unwrap();

        let first = rp.clone().first_subpass();
        assert_eq!(first.index(), 0);
        assert!(!first.is_last_subpass());

        let second = first.next_subpass().unwrap();
        assert!(second.is_last_subpass());
        assert!(second.next_subpass().is_none());
        assert!(Subpass::from(rp, 2).is_none());
    }
}
