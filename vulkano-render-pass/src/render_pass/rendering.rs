// Copyright (c) 2025 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! What pipelines and secondary command buffers need to know about a subpass.
//!
//! A pipeline that is created for a subpass of a render pass is really created for the dynamic
//! rendering region that the subpass is recorded as. For a subpass that was merged with its
//! neighbours, the formats, input attachment indices and color locations describe the whole
//! region, so that every member is compiled against the same set of render targets.

use super::{
    FramebufferCreateFlags, PipelineCreateFlags, RenderPassAttachment, RenderTargets, Subpass,
    SubpassAttachment,
};
use crate::{
    command_buffer::{
        CommandBufferInheritanceInfo, CommandBufferInheritanceRenderPassType,
        CommandBufferInheritanceRenderingInfo, CommandBufferLevel, CommandBufferUsage,
        RenderingAttachmentInfo, RenderingFlags, RenderingFragmentShadingRateAttachmentInfo,
        RenderingInfo,
    },
    format::Format,
    image::{ImageAspects, SampleCount, SampleCounts},
    render_pass::{LoadOp, StoreOp},
};

/// Rendering state of a subpass that is derived once, when the render pass is created.
#[derive(Clone, Debug, Default)]
pub(crate) struct SubpassRenderingInfo {
    pub(crate) view_mask: u32,
    pub(crate) color_formats: Vec<Option<Format>>,
    pub(crate) color_samples: Vec<Option<SampleCount>>,
    pub(crate) depth_format: Option<Format>,
    pub(crate) stencil_format: Option<Format>,
    pub(crate) depth_stencil_samples: Option<SampleCount>,
    pub(crate) rasterization_samples: SampleCounts,
    pub(crate) color_input_indices: Vec<Option<u32>>,
    pub(crate) depth_input_index: Option<u32>,
    pub(crate) stencil_input_index: Option<u32>,
}

impl SubpassRenderingInfo {
    /// Derives the rendering info of a subpass that renders to `targets` and reads
    /// `input_attachments`.
    ///
    /// `view_mask` is the mask that dynamic rendering is begun with, so it is `0` for a render
    /// pass without multiview.
    pub(crate) fn new(
        targets: &RenderTargets,
        input_attachments: &[Option<SubpassAttachment>],
        attachments: &[RenderPassAttachment],
        view_mask: u32,
    ) -> Self {
        let color_formats: Vec<_> = targets
            .colors
            .iter()
            .map(|color| color.as_ref().map(|c| attachments[c.attachment as usize].format))
            .collect();
        let color_samples: Vec<_> = targets
            .colors
            .iter()
            .map(|color| color.as_ref().map(|c| attachments[c.attachment as usize].samples))
            .collect();

        let mut depth_format = None;
        let mut stencil_format = None;
        let mut depth_stencil_samples = None;

        if let Some(depth_stencil) = &targets.depth_stencil {
            let attachment = &attachments[depth_stencil.attachment as usize];

            if attachment.format.has_depth() {
                depth_format = Some(attachment.format);
            }

            if attachment.format.has_stencil() {
                stencil_format = Some(attachment.format);
            }

            depth_stencil_samples = Some(attachment.samples);
        }

        let rasterization_samples = color_samples
            .iter()
            .flatten()
            .chain(&depth_stencil_samples)
            .fold(SampleCounts::empty(), |samples, &s| samples | s.into());

        // The last input that aliases a render target wins.
        let input_index_of = |attachment: u32| {
            input_attachments
                .iter()
                .rposition(|input| input.as_ref().is_some_and(|i| i.attachment == attachment))
                .map(|index| index as u32)
        };

        let color_input_indices = targets
            .colors
            .iter()
            .map(|color| color.as_ref().and_then(|c| input_index_of(c.attachment)))
            .collect();

        let mut depth_input_index = None;
        let mut stencil_input_index = None;

        if let Some(depth_stencil) = &targets.depth_stencil {
            if let Some(index) = input_index_of(depth_stencil.attachment) {
                if depth_stencil.aspects.intersects(ImageAspects::DEPTH) {
                    depth_input_index = Some(index);
                }

                if depth_stencil.aspects.intersects(ImageAspects::STENCIL) {
                    stencil_input_index = Some(index);
                }
            }
        }

        SubpassRenderingInfo {
            view_mask,
            color_formats,
            color_samples,
            depth_format,
            stencil_format,
            depth_stencil_samples,
            rasterization_samples,
            color_input_indices,
            depth_input_index,
            stencil_input_index,
        }
    }
}

/// The dynamic rendering state that a graphics pipeline must be created with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineRenderingCreateInfo {
    /// The view mask, or `0` if the render pass doesn't use multiview.
    pub view_mask: u32,

    /// The formats of the color attachments. `None` for unused attachments.
    pub color_attachment_formats: Vec<Option<Format>>,

    pub depth_attachment_format: Option<Format>,
    pub stencil_attachment_format: Option<Format>,
}

/// Maps the attachments that are rendered to onto the input attachment indices that shaders read
/// them through.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderingInputAttachmentIndexInfo {
    /// For each color attachment, the input attachment index it is read through.
    pub color_attachment_input_indices: Vec<Option<u32>>,

    pub depth_input_attachment_index: Option<u32>,
    pub stencil_input_attachment_index: Option<u32>,
}

/// Maps the color attachments of a rendering region onto fragment shader output locations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderingAttachmentLocationInfo {
    /// For each color attachment of the rendering region, the output location that the subpass's
    /// shaders write it through. `None` if the subpass doesn't write it.
    pub color_attachment_locations: Vec<Option<u32>>,
}

/// The sample counts of the attachments of a subpass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachmentSampleCountInfo {
    pub color_attachment_samples: Vec<Option<SampleCount>>,
    pub depth_stencil_attachment_samples: Option<SampleCount>,
}

impl Subpass {
    /// Returns the dynamic rendering state that pipelines used in this subpass must be created
    /// with.
    pub fn pipeline_rendering_info(&self) -> PipelineRenderingCreateInfo {
        let info = self.info();

        PipelineRenderingCreateInfo {
            view_mask: info.view_mask,
            color_attachment_formats: info.color_formats.clone(),
            depth_attachment_format: info.depth_format,
            stencil_attachment_format: info.stencil_format,
        }
    }

    /// Returns, for every render target of this subpass, the input attachment index that it is
    /// also read through.
    pub fn input_attachment_indices(&self) -> RenderingInputAttachmentIndexInfo {
        let info = self.info();

        RenderingInputAttachmentIndexInfo {
            color_attachment_input_indices: info.color_input_indices.clone(),
            depth_input_attachment_index: info.depth_input_index,
            stencil_input_attachment_index: info.stencil_input_index,
        }
    }

    /// Returns the output locations of the color attachments of this subpass.
    ///
    /// The table is indexed by the color slot of the rendering region, and holds the index of
    /// the subpass's own color attachment that writes to that slot, or `None` if the subpass
    /// doesn't write to it. This is the direction of `VkRenderingAttachmentLocationInfo`, not a
    /// map from the subpass's own index to the slot.
    ///
    /// This is the identity mapping, unless the subpass was merged with other subpasses.
    #[inline]
    pub fn color_attachment_locations(&self) -> RenderingAttachmentLocationInfo {
        RenderingAttachmentLocationInfo {
            color_attachment_locations: self.state().color_locations.clone(),
        }
    }

    /// Returns the flags that pipelines used in this subpass must be created with.
    pub fn pipeline_create_flags(&self) -> PipelineCreateFlags {
        let mut flags = self.render_pass().targets(self.index()).pipeline_flags;

        if self.render_pass().fragment_density_map().is_some() {
            flags |= PipelineCreateFlags::RENDERING_FRAGMENT_DENSITY_MAP_ATTACHMENT;
        }

        flags
    }

    /// Returns the sample counts of the attachments of this subpass.
    pub fn attachment_sample_count_info(&self) -> AttachmentSampleCountInfo {
        let info = self.info();

        AttachmentSampleCountInfo {
            color_attachment_samples: info.color_samples.clone(),
            depth_stencil_attachment_samples: info.depth_stencil_samples,
        }
    }

    /// Returns the rendering state that a secondary command buffer executed inside this subpass
    /// inherits.
    pub fn inheritance_rendering_info(&self) -> CommandBufferInheritanceRenderingInfo {
        let info = self.info();

        CommandBufferInheritanceRenderingInfo {
            flags: RenderingFlags::CONTENTS_SECONDARY_COMMAND_BUFFERS,
            view_mask: info.view_mask,
            color_attachment_formats: info.color_formats.clone(),
            depth_attachment_format: info.depth_format,
            stencil_attachment_format: info.stencil_format,
            rasterization_samples: info.rasterization_samples,
        }
    }

    /// Returns the sample count that single-sampled attachments are rendered with, if this
    /// subpass enables multisampled rendering to single-sampled attachments.
    #[inline]
    pub fn multisampled_render_to_single_sampled(&self) -> Option<SampleCount> {
        self.render_pass()
            .targets(self.index())
            .multisampled_render_to_single_sampled
    }
}

/// Returns the dynamic rendering state that a secondary command buffer inherits, or `None` if it
/// doesn't inherit any.
///
/// A subpass of a render pass takes precedence over inherited dynamic rendering state.
pub fn inheritance_rendering_info_for(
    level: CommandBufferLevel,
    usage: CommandBufferUsage,
    inheritance: &CommandBufferInheritanceInfo,
) -> Option<CommandBufferInheritanceRenderingInfo> {
    // `RENDER_PASS_CONTINUE` is ignored for primary command buffers.
    if level == CommandBufferLevel::Primary
        || !usage.intersects(CommandBufferUsage::RENDER_PASS_CONTINUE)
    {
        return None;
    }

    match inheritance.render_pass.as_ref()? {
        CommandBufferInheritanceRenderPassType::BeginRenderPass(info) => {
            Some(info.subpass.inheritance_rendering_info())
        }
        CommandBufferInheritanceRenderPassType::BeginRendering(info) => Some(info.clone()),
    }
}

/// Returns a `RenderingInfo` that resumes the rendering region of the subpass that a secondary
/// command buffer inherits.
///
/// Returns `None` if the command buffer doesn't continue a subpass of a render pass, or if the
/// inherited framebuffer is unknown or imageless.
pub fn inheritance_as_rendering_resume(
    level: CommandBufferLevel,
    usage: CommandBufferUsage,
    inheritance: &CommandBufferInheritanceInfo,
) -> Option<RenderingInfo> {
    if level == CommandBufferLevel::Primary
        || !usage.intersects(CommandBufferUsage::RENDER_PASS_CONTINUE)
    {
        return None;
    }

    let info = match inheritance.render_pass.as_ref()? {
        CommandBufferInheritanceRenderPassType::BeginRenderPass(info) => info,
        CommandBufferInheritanceRenderPassType::BeginRendering(_) => return None,
    };
    let framebuffer = info.framebuffer.as_ref()?;

    if framebuffer.flags().intersects(FramebufferCreateFlags::IMAGELESS) {
        return None;
    }

    let render_pass = info.subpass.render_pass();
    let targets = render_pass.targets(info.subpass.index());

    let resume_attachment = |attachment: &SubpassAttachment, layout| RenderingAttachmentInfo {
        image_layout: layout,
        load_op: LoadOp::Load,
        store_op: StoreOp::Store,
        ..RenderingAttachmentInfo::image_view(
            framebuffer.attachments()[attachment.attachment as usize].clone(),
        )
    };

    let color_attachments = targets
        .colors
        .iter()
        .map(|color| {
            color
                .as_ref()
                .map(|color| resume_attachment(color, color.layout))
        })
        .collect();

    let mut depth_attachment = None;
    let mut stencil_attachment = None;

    if let Some(depth_stencil) = &targets.depth_stencil {
        let image_view = &framebuffer.attachments()[depth_stencil.attachment as usize];
        let aspects = image_view.format().aspects();

        if aspects.intersects(ImageAspects::DEPTH) {
            depth_attachment = Some(resume_attachment(depth_stencil, depth_stencil.layout));
        }

        if aspects.intersects(ImageAspects::STENCIL) {
            stencil_attachment = Some(resume_attachment(
                depth_stencil,
                depth_stencil.stencil_layout,
            ));
        }
    }

    let fragment_shading_rate_attachment =
        targets
            .fragment_shading_rate
            .as_ref()
            .map(|fsr| RenderingFragmentShadingRateAttachmentInfo {
                image_view: framebuffer.attachments()[fsr.attachment as usize].clone(),
                image_layout: fsr.layout,
                texel_size: targets.fragment_shading_rate_texel_size,
            });

    Some(RenderingInfo {
        flags: RenderingFlags::RESUMING,
        render_area_offset: [0, 0],
        render_area_extent: framebuffer.extent(),
        layer_count: framebuffer.layers(),
        view_mask: if render_pass.is_multiview() {
            targets.view_mask
        } else {
            0
        },
        color_attachments,
        depth_attachment,
        stencil_attachment,
        fragment_shading_rate_attachment,
        multisampled_render_to_single_sampled: targets.multisampled_render_to_single_sampled,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::{inheritance_as_rendering_resume, inheritance_rendering_info_for};
    use crate::{
        command_buffer::{
            CommandBufferInheritanceInfo, CommandBufferInheritanceRenderPassInfo,
            CommandBufferLevel, CommandBufferUsage, RenderingFlags,
        },
        format::Format,
        image::{ImageAspects, ImageLayout, SampleCount, SampleCounts},
        render_pass::{
            AttachmentDescription, AttachmentReference, Framebuffer, FramebufferCreateFlags,
            FramebufferCreateInfo, LoadOp, PipelineCreateFlags, RenderPass, RenderPassCreateInfo,
            StoreOp, Subpass, SubpassDescription,
        },
        test_util::{color_view, depth_stencil_view, test_device},
    };
    use std::sync::Arc;

    fn color_ref(attachment: u32) -> Option<AttachmentReference> {
        Some(AttachmentReference {
            attachment,
            layout: ImageLayout::ColorAttachmentOptimal,
            ..Default::default()
        })
    }

    fn gbuffer_pass() -> Arc<RenderPass> {
        RenderPass::new(
            &test_device(None),
            RenderPassCreateInfo {
                attachments: vec![
                    AttachmentDescription {
                        format: Format::R8G8B8A8_UNORM,
                        samples: SampleCount::Sample4,
                        load_op: LoadOp::Clear,
                        store_op: StoreOp::Store,
                        final_layout: ImageLayout::ColorAttachmentOptimal,
                        ..Default::default()
                    },
                    AttachmentDescription {
                        format: Format::R32_UINT,
                        samples: SampleCount::Sample4,
                        load_op: LoadOp::Clear,
                        final_layout: ImageLayout::ShaderReadOnlyOptimal,
                        ..Default::default()
                    },
                    AttachmentDescription {
                        format: Format::D24_UNORM_S8_UINT,
                        samples: SampleCount::Sample4,
                        load_op: LoadOp::Clear,
                        final_layout: ImageLayout::DepthStencilAttachmentOptimal,
                        ..Default::default()
                    },
                ],
                subpasses: vec![SubpassDescription {
                    input_attachments: vec![
                        None,
                        Some(AttachmentReference {
                            attachment: 2,
                            layout: ImageLayout::General,
                            aspects: ImageAspects::DEPTH,
                            ..Default::default()
                        }),
                    ],
                    color_attachments: vec![color_ref(0), None, color_ref(1)],
                    depth_stencil_attachment: Some(AttachmentReference {
                        attachment: 2,
                        layout: ImageLayout::DepthStencilAttachmentOptimal,
                        ..Default::default()
                    }),
                    ..Default::default()
                }],
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn pipeline_queries() {
        let subpass = gbuffer_pass().first_subpass();

        let info = subpass.pipeline_rendering_info();
        assert_eq!(info.view_mask, 0);
        assert_eq!(
            info.color_attachment_formats,
            [Some(Format::R8G8B8A8_UNORM), None, Some(Format::R32_UINT)],
        );
        assert_eq!(info.depth_attachment_format, Some(Format::D24_UNORM_S8_UINT));
        assert_eq!(info.stencil_attachment_format, Some(Format::D24_UNORM_S8_UINT));

        let indices = subpass.input_attachment_indices();
        assert_eq!(indices.color_attachment_input_indices, [None, None, None]);
        assert_eq!(indices.depth_input_attachment_index, Some(1));
        assert_eq!(indices.stencil_input_attachment_index, Some(1));

        assert_eq!(
            subpass.color_attachment_locations().color_attachment_locations,
            [Some(0), Some(1), Some(2)],
        );
        assert!(subpass
            .pipeline_create_flags()
            .contains(PipelineCreateFlags::DEPTH_STENCIL_ATTACHMENT_FEEDBACK_LOOP));

        let samples = subpass.attachment_sample_count_info();
        assert_eq!(
            samples.color_attachment_samples,
            [Some(SampleCount::Sample4), None, Some(SampleCount::Sample4)],
        );
        assert_eq!(
            samples.depth_stencil_attachment_samples,
            Some(SampleCount::Sample4),
        );

        let inheritance = subpass.inheritance_rendering_info();
        assert_eq!(
            inheritance.flags,
            RenderingFlags::CONTENTS_SECONDARY_COMMAND_BUFFERS,
        );
        assert_eq!(inheritance.rasterization_samples, SampleCounts::SAMPLE_4);
        assert_eq!(subpass.multisampled_render_to_single_sampled(), None);
    }

    #[test]
    fn inheritance_requires_continue() {
        let subpass = gbuffer_pass().first_subpass();
        let inheritance = CommandBufferInheritanceInfo {
            render_pass: Some(subpass.into()),
            ..Default::default()
        };

        assert!(inheritance_rendering_info_for(
            CommandBufferLevel::Primary,
            CommandBufferUsage::RENDER_PASS_CONTINUE,
            &inheritance,
        )
        .is_none());
        assert!(inheritance_rendering_info_for(
            CommandBufferLevel::Secondary,
            CommandBufferUsage::ONE_TIME_SUBMIT,
            &inheritance,
        )
        .is_none());
        assert!(inheritance_rendering_info_for(
            CommandBufferLevel::Secondary,
            CommandBufferUsage::RENDER_PASS_CONTINUE,
            &CommandBufferInheritanceInfo::default(),
        )
        .is_none());

        let info = inheritance_rendering_info_for(
            CommandBufferLevel::Secondary,
            CommandBufferUsage::RENDER_PASS_CONTINUE,
            &inheritance,
        )
        .unwrap();
        assert_eq!(info.color_attachment_formats.len(), 3);
    }

    #[test]
    fn resume_needs_framebuffer() {
        let render_pass = gbuffer_pass();
        let attachments = vec![
            color_view(Format::R8G8B8A8_UNORM, SampleCount::Sample4, [64, 32]),
            color_view(Format::R32_UINT, SampleCount::Sample4, [64, 32]),
            depth_stencil_view(Format::D24_UNORM_S8_UINT, SampleCount::Sample4, [64, 32]),
        ];

        let mut info = CommandBufferInheritanceRenderPassInfo::subpass(
            Subpass::from(render_pass.clone(), 0).unwrap(),
        );
        let inheritance = |info: &CommandBufferInheritanceRenderPassInfo| {
            CommandBufferInheritanceInfo {
                render_pass: Some(info.clone().into()),
                ..Default::default()
            }
        };

        assert!(inheritance_as_rendering_resume(
            CommandBufferLevel::Secondary,
            CommandBufferUsage::RENDER_PASS_CONTINUE,
            &inheritance(&info),
        )
        .is_none());

        info.framebuffer = Some(Framebuffer::new(
            render_pass.clone(),
            FramebufferCreateInfo {
                flags: FramebufferCreateFlags::IMAGELESS,
                extent: [64, 32],
                ..Default::default()
            },
        ));
        assert!(inheritance_as_rendering_resume(
            CommandBufferLevel::Secondary,
            CommandBufferUsage::RENDER_PASS_CONTINUE,
            &inheritance(&info),
        )
        .is_none());

        info.framebuffer = Some(Framebuffer::new(
            render_pass,
            FramebufferCreateInfo {
                attachments,
                ..Default::default()
            },
        ));
        let rendering = inheritance_as_rendering_resume(
            CommandBufferLevel::Secondary,
            CommandBufferUsage::RENDER_PASS_CONTINUE,
            &inheritance(&info),
        )
        .unwrap();

        assert_eq!(rendering.flags, RenderingFlags::RESUMING);
        assert_eq!(rendering.render_area_extent, [64, 32]);
        assert_eq!(rendering.layer_count, 1);
        assert_eq!(rendering.view_mask, 0);
        assert_eq!(rendering.color_attachments.len(), 3);
        assert!(rendering.color_attachments[1].is_none());

        let color = rendering.color_attachments[0].as_ref().unwrap();
        assert_eq!(color.load_op, LoadOp::Load);
        assert_eq!(color.store_op, StoreOp::Store);
        assert_eq!(color.image_layout, ImageLayout::ColorAttachmentOptimal);

        assert!(rendering.depth_attachment.is_some());
        assert!(rendering.stencil_attachment.is_some());
        assert!(rendering.fragment_shading_rate_attachment.is_none());
    }
}
