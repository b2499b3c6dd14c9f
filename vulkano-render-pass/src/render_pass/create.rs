// Copyright (c) 2025 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

use super::{
    rendering::SubpassRenderingInfo, AttachmentDescription, AttachmentReference,
    AttachmentUsage, FragmentDensityMapAttachment, PipelineCreateFlags, RenderPass,
    RenderPassAttachment, RenderPassCreateInfo, RenderTargets, SubpassAttachment,
    SubpassDependency, SubpassDescription, SubpassMergeState, SubpassState,
};
use crate::{
    device::DeviceProperties,
    image::{ImageAspects, ImageLayout},
    sync::DependencyFlags,
    try_vec, OomError,
};
use std::{
    error::Error,
    fmt::{Display, Error as FmtError, Formatter},
};

impl RenderPass {
    pub(super) fn validate<D>(
        device: &D,
        create_info: &RenderPassCreateInfo,
    ) -> Result<(), RenderPassCreationError>
    where
        D: DeviceProperties + ?Sized,
    {
        let RenderPassCreateInfo {
            attachments,
            subpasses,
            dependencies,
            fragment_density_map_attachment,
            _ne: _,
        } = create_info;

        /*
            Subpasses
        */

        // VUID-VkRenderPassCreateInfo2-subpassCount-arraylength
        if subpasses.is_empty() {
            return Err(RenderPassCreationError::NoSubpasses);
        }

        let is_multiview = subpasses[0].view_mask != 0;

        for (subpass_num, subpass) in subpasses.iter().enumerate() {
            let SubpassDescription {
                view_mask,
                input_attachments,
                color_attachments,
                color_resolve_attachments,
                depth_stencil_attachment,
                depth_stencil_resolve_attachment,
                depth_resolve_mode,
                stencil_resolve_mode,
                fragment_shading_rate_attachment,
                fragment_shading_rate_texel_size: _,
                multisampled_render_to_single_sampled: _,
                legacy_dithering: _,
                preserve_attachments,
                _ne: _,
            } = subpass;
            let subpass_num = subpass_num as u32;

            // VUID-VkRenderPassCreateInfo2-viewMask-03058
            if (*view_mask != 0) != is_multiview {
                return Err(RenderPassCreationError::SubpassMultiviewMismatch {
                    subpass: subpass_num,
                    multiview: *view_mask != 0,
                    first_subpass_multiview: is_multiview,
                });
            }

            // VUID-VkSubpassDescription2-colorAttachmentCount-03063
            if color_attachments.len() as u32 > device.max_color_attachments() {
                return Err(
                    RenderPassCreationError::SubpassColorAttachmentsCountExceeded {
                        subpass: subpass_num,
                        color_attachment_count: color_attachments.len() as u32,
                        max: device.max_color_attachments(),
                    },
                );
            }

            // VUID-VkRenderPassCreateInfo2-attachment-03051
            let check_attachment = |atch_ref: &AttachmentReference| {
                attachments.get(atch_ref.attachment as usize).ok_or(
                    RenderPassCreationError::SubpassAttachmentOutOfRange {
                        subpass: subpass_num,
                        attachment: atch_ref.attachment,
                    },
                )
            };

            let check_color_format = |atch_ref: &AttachmentReference,
                                      atch: &AttachmentDescription,
                                      usage: &'static str| {
                if atch.format.aspects() != ImageAspects::COLOR {
                    return Err(
                        RenderPassCreationError::SubpassAttachmentFormatUsageNotSupported {
                            subpass: subpass_num,
                            attachment: atch_ref.attachment,
                            usage,
                        },
                    );
                }

                Ok(())
            };

            /*
                Check input attachments
            */

            for atch_ref in input_attachments.iter().flatten() {
                let atch = check_attachment(atch_ref)?;

                // VUID-VkRenderPassCreateInfo2-attachment-02525
                if !atch.format.aspects().contains(atch_ref.aspects) {
                    return Err(
                        RenderPassCreationError::SubpassAttachmentAspectsNotCompatible {
                            subpass: subpass_num,
                            attachment: atch_ref.attachment,
                        },
                    );
                }
            }

            /*
                Check color attachments
            */

            for atch_ref in color_attachments.iter().flatten() {
                let atch = check_attachment(atch_ref)?;

                // VUID-VkSubpassDescription2-pColorAttachments-02898
                check_color_format(atch_ref, atch, "color")?;
            }

            /*
                Check resolve attachments
            */

            // VUID-VkSubpassDescription2-pResolveAttachments-parameter
            if !color_resolve_attachments.is_empty()
                && color_resolve_attachments.len() != color_attachments.len()
            {
                return Err(
                    RenderPassCreationError::SubpassResolveAttachmentsCountMismatch {
                        subpass: subpass_num,
                    },
                );
            }

            for (color_atch_ref, resolve_atch_ref) in
                color_attachments.iter().zip(color_resolve_attachments)
            {
                let Some(resolve_atch_ref) = resolve_atch_ref else {
                    continue;
                };

                // VUID-VkSubpassDescription2-pResolveAttachments-03065
                if color_atch_ref.is_none() {
                    return Err(RenderPassCreationError::SubpassResolveWithoutSource {
                        subpass: subpass_num,
                    });
                }

                let atch = check_attachment(resolve_atch_ref)?;
                check_color_format(resolve_atch_ref, atch, "resolve")?;
            }

            /*
                Check depth/stencil attachment
            */

            if let Some(atch_ref) = depth_stencil_attachment {
                let atch = check_attachment(atch_ref)?;
                let aspects = atch.format.aspects();

                // VUID-VkSubpassDescription2-pDepthStencilAttachment-02900
                if aspects.is_empty() || aspects.intersects(ImageAspects::COLOR) {
                    return Err(
                        RenderPassCreationError::SubpassAttachmentFormatUsageNotSupported {
                            subpass: subpass_num,
                            attachment: atch_ref.attachment,
                            usage: "depth/stencil",
                        },
                    );
                }
            }

            if let Some(atch_ref) = depth_stencil_resolve_attachment {
                // VUID-VkSubpassDescriptionDepthStencilResolve-pDepthStencilResolveAttachment-03177
                if depth_stencil_attachment.is_none() {
                    return Err(RenderPassCreationError::SubpassResolveWithoutSource {
                        subpass: subpass_num,
                    });
                }

                let atch = check_attachment(atch_ref)?;

                if !atch.format.is_depth_stencil() {
                    return Err(
                        RenderPassCreationError::SubpassAttachmentFormatUsageNotSupported {
                            subpass: subpass_num,
                            attachment: atch_ref.attachment,
                            usage: "depth/stencil resolve",
                        },
                    );
                }

                // VUID-VkSubpassDescriptionDepthStencilResolve-pDepthStencilResolveAttachment-03178
                if depth_resolve_mode.is_none() && stencil_resolve_mode.is_none() {
                    return Err(
                        RenderPassCreationError::SubpassDepthStencilResolveModesMissing {
                            subpass: subpass_num,
                        },
                    );
                }
            }

            /*
                Check fragment shading rate attachment
            */

            if let Some(atch_ref) = fragment_shading_rate_attachment {
                let atch = check_attachment(atch_ref)?;

                check_color_format(atch_ref, atch, "fragment shading rate")?;
            }

            /*
                Check preserve attachments
            */

            for &attachment in preserve_attachments {
                if attachment as usize >= attachments.len() {
                    return Err(RenderPassCreationError::SubpassAttachmentOutOfRange {
                        subpass: subpass_num,
                        attachment,
                    });
                }
            }
        }

        /*
            Dependencies
        */

        for (dependency_num, dependency) in dependencies.iter().enumerate() {
            let &SubpassDependency {
                src_subpass,
                dst_subpass,
                dependency_flags,
                ..
            } = dependency;
            let dependency_num = dependency_num as u32;

            for subpass in [src_subpass, dst_subpass].into_iter().flatten() {
                // VUID-VkRenderPassCreateInfo2-srcSubpass-02526
                // VUID-VkRenderPassCreateInfo2-dstSubpass-02527
                if subpass as usize >= subpasses.len() {
                    return Err(RenderPassCreationError::DependencySubpassOutOfRange {
                        dependency: dependency_num,
                        subpass,
                    });
                }
            }

            if dependency_flags.intersects(DependencyFlags::VIEW_LOCAL) {
                // VUID-VkSubpassDependency2-dependencyFlags-03090
                // VUID-VkSubpassDependency2-dependencyFlags-03091
                if src_subpass.is_none() || dst_subpass.is_none() {
                    return Err(
                        RenderPassCreationError::DependencyViewLocalExternalDependency {
                            dependency: dependency_num,
                        },
                    );
                }
            }

            if let (Some(src_subpass), Some(dst_subpass)) = (src_subpass, dst_subpass) {
                // VUID-VkSubpassDependency2-srcSubpass-03084
                if src_subpass > dst_subpass {
                    return Err(
                        RenderPassCreationError::DependencySourceSubpassAfterDestinationSubpass {
                            dependency: dependency_num,
                        },
                    );
                }
            }
        }

        /*
            Fragment density map
        */

        if let Some(atch_ref) = fragment_density_map_attachment {
            if atch_ref.attachment as usize >= attachments.len() {
                return Err(
                    RenderPassCreationError::FragmentDensityMapAttachmentOutOfRange {
                        attachment: atch_ref.attachment,
                    },
                );
            }
        }

        Ok(())
    }

    /// Builds the normalized render pass from a validated description. Subpasses are not merged
    /// yet.
    pub(super) fn build(
        create_info: RenderPassCreateInfo,
    ) -> Result<RenderPass, RenderPassCreationError> {
        let RenderPassCreateInfo {
            attachments: attachment_descs,
            subpasses: subpass_descs,
            dependencies: dependency_descs,
            fragment_density_map_attachment,
            _ne: _,
        } = create_info;

        let mut attachments = try_vec(attachment_descs.len())?;
        attachments.extend(attachment_descs.iter().map(RenderPassAttachment::from_description));

        let is_multiview = subpass_descs[0].view_mask != 0;
        let mut view_mask = 0;

        let mut subpasses = try_vec(subpass_descs.len())?;

        for desc in &subpass_descs {
            let subpass = SubpassState::from_description(desc, &attachments)?;
            view_mask |= subpass.targets.view_mask;
            subpasses.push(subpass);
        }

        // Walk backwards over the subpasses, so that the first reference that is seen for each
        // view of an attachment is its last use.
        for subpass in subpasses.iter_mut().rev() {
            let subpass_view_mask = subpass.targets.view_mask;

            for reference in subpass.references_mut() {
                reference.last_subpass =
                    subpass_view_mask & !attachments[reference.attachment as usize].view_mask;
            }

            // Done separately, so that an attachment referenced twice in the same subpass gets
            // the same `last_subpass` both times.
            for reference in subpass.references() {
                attachments[reference.attachment as usize].view_mask |= subpass_view_mask;
            }
        }

        for subpass in &mut subpasses {
            subpass.info = SubpassRenderingInfo::new(
                &subpass.targets,
                &subpass.input_attachments,
                &attachments,
                if is_multiview {
                    subpass.targets.view_mask
                } else {
                    0
                },
            );
        }

        let mut dependencies = try_vec(dependency_descs.len())?;
        dependencies.extend(dependency_descs.iter().map(SubpassDependency::normalized));

        let fragment_density_map =
            fragment_density_map_attachment.map(|atch_ref| FragmentDensityMapAttachment {
                attachment: atch_ref.attachment,
                layout: atch_ref.layout,
            });

        let regions = (0..subpasses.len() as u32).map(|i| i..i + 1).collect();

        Ok(RenderPass {
            attachments,
            subpasses,
            dependencies,
            merge_groups: Vec::new(),
            regions,
            fragment_density_map,
            is_multiview,
            view_mask,
        })
    }
}

impl RenderPassAttachment {
    fn from_description(desc: &AttachmentDescription) -> Self {
        let aspects = desc.format.aspects();
        let has_stencil = aspects.intersects(ImageAspects::STENCIL);
        let stencil_layout = |layout: Option<ImageLayout>, fallback: ImageLayout| {
            if has_stencil {
                layout.unwrap_or(fallback)
            } else {
                ImageLayout::Undefined
            }
        };

        RenderPassAttachment {
            format: desc.format,
            aspects,
            samples: desc.samples,
            load_op: desc.load_op,
            store_op: desc.store_op,
            stencil_load_op: desc.stencil_load_op.unwrap_or(desc.load_op),
            stencil_store_op: desc.stencil_store_op.unwrap_or(desc.store_op),
            initial_layout: desc.initial_layout,
            final_layout: desc.final_layout,
            stencil_initial_layout: stencil_layout(
                desc.stencil_initial_layout,
                desc.initial_layout,
            ),
            stencil_final_layout: stencil_layout(desc.stencil_final_layout, desc.final_layout),
            view_mask: 0,
        }
    }
}

impl SubpassAttachment {
    fn from_reference(
        atch_ref: &AttachmentReference,
        usage: AttachmentUsage,
        attachments: &[RenderPassAttachment],
    ) -> Self {
        let attachment = &attachments[atch_ref.attachment as usize];

        // Only input attachments can select a subset of the aspects.
        let aspects = if usage == AttachmentUsage::Input && !atch_ref.aspects.is_empty() {
            atch_ref.aspects
        } else {
            attachment.aspects
        };

        let stencil_layout = if attachment.aspects.intersects(ImageAspects::STENCIL) {
            atch_ref.stencil_layout.unwrap_or(atch_ref.layout)
        } else {
            ImageLayout::Undefined
        };

        SubpassAttachment {
            attachment: atch_ref.attachment,
            aspects,
            usage,
            layout: atch_ref.layout,
            stencil_layout,
            last_subpass: 0,
        }
    }
}

impl SubpassState {
    fn from_description(
        desc: &SubpassDescription,
        attachments: &[RenderPassAttachment],
    ) -> Result<Self, OomError> {
        let reference = |atch_ref: &AttachmentReference, usage| {
            SubpassAttachment::from_reference(atch_ref, usage, attachments)
        };
        let references = |atch_refs: &[Option<AttachmentReference>], usage| {
            let mut references = try_vec(atch_refs.len())?;
            references.extend(
                atch_refs
                    .iter()
                    .map(|atch_ref| atch_ref.as_ref().map(|r| reference(r, usage))),
            );

            Ok::<_, OomError>(references)
        };

        let mut input_attachments = references(&desc.input_attachments, AttachmentUsage::Input)?;
        let mut colors = references(&desc.color_attachments, AttachmentUsage::Color)?;
        let color_resolves =
            references(&desc.color_resolve_attachments, AttachmentUsage::Resolve)?;
        let mut depth_stencil = desc
            .depth_stencil_attachment
            .as_ref()
            .map(|r| reference(r, AttachmentUsage::DepthStencil));
        let depth_stencil_resolve = desc
            .depth_stencil_resolve_attachment
            .as_ref()
            .map(|r| reference(r, AttachmentUsage::Resolve));
        let fragment_shading_rate = desc
            .fragment_shading_rate_attachment
            .as_ref()
            .map(|r| reference(r, AttachmentUsage::FragmentShadingRate));

        let mut pipeline_flags = PipelineCreateFlags::empty();

        if fragment_shading_rate.is_some() {
            pipeline_flags |= PipelineCreateFlags::RENDERING_FRAGMENT_SHADING_RATE_ATTACHMENT;
        }

        // Inputs that are also rendered to form a feedback loop.
        for input in input_attachments.iter_mut().flatten() {
            for color in colors.iter_mut().flatten() {
                if color.attachment == input.attachment {
                    input.layout = ImageLayout::AttachmentFeedbackLoopOptimal;
                    color.layout = ImageLayout::AttachmentFeedbackLoopOptimal;
                    pipeline_flags |= PipelineCreateFlags::COLOR_ATTACHMENT_FEEDBACK_LOOP;
                }
            }

            if let Some(depth_stencil) = depth_stencil
                .as_mut()
                .filter(|ds| ds.attachment == input.attachment)
            {
                if input.aspects.intersects(ImageAspects::DEPTH) {
                    input.layout = ImageLayout::AttachmentFeedbackLoopOptimal;
                    depth_stencil.layout = ImageLayout::AttachmentFeedbackLoopOptimal;
                    pipeline_flags |= PipelineCreateFlags::DEPTH_STENCIL_ATTACHMENT_FEEDBACK_LOOP;
                }

                if input.aspects.intersects(ImageAspects::STENCIL) {
                    input.stencil_layout = ImageLayout::AttachmentFeedbackLoopOptimal;
                    depth_stencil.stencil_layout = ImageLayout::AttachmentFeedbackLoopOptimal;
                    pipeline_flags |= PipelineCreateFlags::DEPTH_STENCIL_ATTACHMENT_FEEDBACK_LOOP;
                }
            }
        }

        // Resolve modes only matter when something is resolved.
        let (depth_resolve_mode, stencil_resolve_mode) = if depth_stencil_resolve.is_some()
            || desc.multisampled_render_to_single_sampled.is_some()
        {
            (desc.depth_resolve_mode, desc.stencil_resolve_mode)
        } else {
            (None, None)
        };

        let mut color_locations = try_vec(colors.len())?;
        color_locations.extend((0..colors.len() as u32).map(Some));

        let mut preserve_attachments = try_vec(desc.preserve_attachments.len())?;
        preserve_attachments.extend_from_slice(&desc.preserve_attachments);

        Ok(SubpassState {
            input_attachments,
            targets: RenderTargets {
                colors,
                color_resolves,
                depth_stencil,
                depth_stencil_resolve,
                fragment_shading_rate,
                fragment_shading_rate_texel_size: desc.fragment_shading_rate_texel_size,
                view_mask: if desc.view_mask != 0 {
                    desc.view_mask
                } else {
                    1
                },
                depth_resolve_mode,
                stencil_resolve_mode,
                multisampled_render_to_single_sampled: desc.multisampled_render_to_single_sampled,
                legacy_dithering: desc.legacy_dithering,
                pipeline_flags,
            },
            merge_state: SubpassMergeState::NotMerged,
            merge_group: None,
            color_locations,
            preserve_attachments,
            info: SubpassRenderingInfo::default(),
        })
    }
}

/// Error that can happen when creating a `RenderPass`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderPassCreationError {
    /// Not enough memory.
    OomError(OomError),

    /// The render pass has no subpasses.
    NoSubpasses,

    /// An attachment index in a subpass is not less than the number of attachments in the render
    /// pass.
    SubpassAttachmentOutOfRange { subpass: u32, attachment: u32 },

    /// A reference to an attachment used as an input attachment in a subpass selects aspects that
    /// are not present in the format of the attachment.
    SubpassAttachmentAspectsNotCompatible { subpass: u32, attachment: u32 },

    /// An attachment used as an attachment in a subpass has a format that does not support that
    /// usage.
    SubpassAttachmentFormatUsageNotSupported {
        subpass: u32,
        attachment: u32,
        usage: &'static str,
    },

    /// The `max_color_attachments` limit has been exceeded for a subpass.
    SubpassColorAttachmentsCountExceeded {
        subpass: u32,
        color_attachment_count: u32,
        max: u32,
    },

    /// The `color_resolve_attachments` field of a subpass was not empty, but its length did not
    /// match the length of `color_attachments`.
    SubpassResolveAttachmentsCountMismatch { subpass: u32 },

    /// A resolve attachment in a subpass is `Some`, but the attachment that it resolves is
    /// `None`.
    SubpassResolveWithoutSource { subpass: u32 },

    /// A subpass has a depth/stencil resolve attachment, but neither a depth nor a stencil
    /// resolve mode.
    SubpassDepthStencilResolveModesMissing { subpass: u32 },

    /// The multiview state (whether `view_mask` is nonzero) of a subpass is different from the
    /// first subpass.
    SubpassMultiviewMismatch {
        subpass: u32,
        multiview: bool,
        first_subpass_multiview: bool,
    },

    /// A subpass index in a dependency is not less than the number of subpasses in the render
    /// pass.
    DependencySubpassOutOfRange { dependency: u32, subpass: u32 },

    /// In a dependency, the source subpass is later than the destination subpass.
    DependencySourceSubpassAfterDestinationSubpass { dependency: u32 },

    /// A dependency has the `VIEW_LOCAL` flag, but one of its subpasses is external.
    DependencyViewLocalExternalDependency { dependency: u32 },

    /// The fragment density map attachment index is not less than the number of attachments in
    /// the render pass.
    FragmentDensityMapAttachmentOutOfRange { attachment: u32 },
}

impl Error for RenderPassCreationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RenderPassCreationError::OomError(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for RenderPassCreationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Self::OomError(_) => write!(f, "not enough memory available"),
            Self::NoSubpasses => write!(f, "the render pass has no subpasses"),
            Self::SubpassAttachmentOutOfRange {
                subpass,
                attachment,
            } => write!(
                f,
                "the attachment index {} in subpass {} is not less than the number of attachments \
                in the render pass",
                attachment, subpass,
            ),
            Self::SubpassAttachmentAspectsNotCompatible {
                subpass,
                attachment,
            } => write!(
                f,
                "a reference to attachment {} used as an input attachment in subpass {} selects \
                aspects that are not present in the format of the attachment",
                attachment, subpass,
            ),
            Self::SubpassAttachmentFormatUsageNotSupported {
                subpass,
                attachment,
                usage,
            } => write!(
                f,
                "attachment {} used as {} attachment in subpass {} has a format that does not \
                support that usage",
                attachment, usage, subpass,
            ),
            Self::SubpassColorAttachmentsCountExceeded {
                subpass,
                color_attachment_count,
                max,
            } => write!(
                f,
                "subpass {} has {} color attachments, but the `max_color_attachments` limit is {}",
                subpass, color_attachment_count, max,
            ),
            Self::SubpassResolveAttachmentsCountMismatch { subpass } => write!(
                f,
                "the `color_resolve_attachments` field of subpass {} was not empty, but its length \
                did not match the length of `color_attachments`",
                subpass,
            ),
            Self::SubpassResolveWithoutSource { subpass } => write!(
                f,
                "a resolve attachment in subpass {} is `Some`, but the attachment that it \
                resolves is `None`",
                subpass,
            ),
            Self::SubpassDepthStencilResolveModesMissing { subpass } => write!(
                f,
                "subpass {} has a depth/stencil resolve attachment, but both \
                `depth_resolve_mode` and `stencil_resolve_mode` are `None`",
                subpass,
            ),
            Self::SubpassMultiviewMismatch {
                subpass,
                multiview,
                first_subpass_multiview,
            } => write!(
                f,
                "the multiview state (whether `view_mask` is nonzero) of subpass {} is {}, which \
                is different from the first subpass ({})",
                subpass, multiview, first_subpass_multiview,
            ),
            Self::DependencySubpassOutOfRange {
                dependency,
                subpass,
            } => write!(
                f,
                "the subpass index {} in dependency {} is not less than the number of subpasses \
                in the render pass",
                subpass, dependency,
            ),
            Self::DependencySourceSubpassAfterDestinationSubpass { dependency } => write!(
                f,
                "in dependency {}, the source subpass is later than the destination subpass",
                dependency,
            ),
            Self::DependencyViewLocalExternalDependency { dependency } => write!(
                f,
                "dependency {} has the `VIEW_LOCAL` dependency flag, but `src_subpass` or \
                `dst_subpass` are `None`",
                dependency,
            ),
            Self::FragmentDensityMapAttachmentOutOfRange { attachment } => write!(
                f,
                "the fragment density map attachment index {} is not less than the number of \
                attachments in the render pass",
                attachment,
            ),
        }
    }
}

impl From<OomError> for RenderPassCreationError {
    fn from(err: OomError) -> RenderPassCreationError {
        RenderPassCreationError::OomError(err)
    }
}
