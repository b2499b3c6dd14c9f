// Copyright (c) 2025 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

use super::{
    RenderPassBeginInfo, RenderingAttachmentInfo, RenderingAttachmentResolveInfo,
    RenderingCommands, RenderingFragmentDensityMapAttachmentInfo,
    RenderingFragmentShadingRateAttachmentInfo, RenderingInfo,
};
use crate::{
    bits,
    format::{ClearValue, Format},
    image::{
        ImageAspects, ImageCreateFlags, ImageLayout, ImageSubresourceRange, ImageType, ImageUsage,
        ImageView, SampleCount, SampleLocationsInfo,
    },
    last_bit,
    render_pass::{
        dependency::{stage_access_for_layout, IMPLICIT_EXTERNAL_ENTRY, IMPLICIT_EXTERNAL_EXIT},
        Framebuffer, FramebufferCreateFlags, LoadOp, RenderPass, RenderTargets, ResolveMode,
        StoreOp, Subpass, SubpassMergeState,
    },
    sync::{DependencyFlags, DependencyInfo, ImageMemoryBarrier, MemoryBarrier},
    try_vec, OomError,
};
use ash::vk;
use log::trace;
use smallvec::smallvec;
use std::{
    error::Error,
    fmt::{Display, Error as FmtError, Formatter},
    sync::Arc,
};

/// The number of views whose layouts are tracked per attachment.
const MAX_VIEWS: usize = 32;

/// Records render passes into a command buffer that only knows dynamic rendering.
///
/// The recorder owns the state of the render pass instance that is being recorded: which subpass
/// is current, which views of each attachment have been loaded, and the layout that every view of
/// every attachment is in. Each method translates one render pass command into barriers and
/// rendering regions on the [`RenderingCommands`] it is given.
///
/// A subpass that is part of a merged group doesn't begin a rendering region of its own. The
/// region is begun by the first subpass of the group and ended by the last, and the subpasses in
/// between only insert framebuffer-local barriers.
#[derive(Debug, Default)]
pub struct RenderPassRecorder {
    state: Option<RenderPassState>,
}

impl RenderPassRecorder {
    /// Returns a recorder that is outside of any render pass.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins a render pass, and its first subpass.
    pub fn begin_render_pass<C>(
        &mut self,
        cmd: &mut C,
        begin_info: RenderPassBeginInfo,
    ) -> Result<(), RenderPassRecordingError>
    where
        C: RenderingCommands + ?Sized,
    {
        // VUID-vkCmdBeginRenderPass2-renderpass
        if self.state.is_some() {
            return Err(RenderPassRecordingError::ForbiddenInsideRenderPass);
        }

        let mut state = RenderPassState::new(begin_info)?;
        trace!(
            "beginning a render pass with {} attachments, recorded as regions {:?}",
            state.attachments.len(),
            state.render_pass.regions(),
        );
        state.begin_subpass(cmd)?;
        self.state = Some(state);

        Ok(())
    }

    /// Ends the current subpass and begins the next one.
    pub fn next_subpass<C>(&mut self, cmd: &mut C) -> Result<(), RenderPassRecordingError>
    where
        C: RenderingCommands + ?Sized,
    {
        // VUID-vkCmdNextSubpass2-renderpass
        let state = self
            .state
            .as_mut()
            .ok_or(RenderPassRecordingError::ForbiddenOutsideRenderPass)?;
        let subpass_count = state.render_pass.subpasses().len() as u32;

        // VUID-vkCmdNextSubpass2-None-03102
        if state.subpass + 1 >= subpass_count {
            return Err(RenderPassRecordingError::NumSubpassesMismatch {
                actual: subpass_count,
                current: state.subpass,
            });
        }

        state.end_subpass(cmd);
        state.subpass += 1;
        state.begin_subpass(cmd)
    }

    /// Ends the render pass. The current subpass must be the last one.
    ///
    /// Every attachment is transitioned to its final layout.
    pub fn end_render_pass<C>(&mut self, cmd: &mut C) -> Result<(), RenderPassRecordingError>
    where
        C: RenderingCommands + ?Sized,
    {
        // VUID-vkCmdEndRenderPass2-renderpass
        let state = self
            .state
            .as_mut()
            .ok_or(RenderPassRecordingError::ForbiddenOutsideRenderPass)?;
        let render_pass = state.render_pass.clone();
        let subpass_count = render_pass.subpasses().len() as u32;

        // VUID-vkCmdEndRenderPass2-None-03103
        if state.subpass + 1 != subpass_count {
            return Err(RenderPassRecordingError::NumSubpassesMismatch {
                actual: subpass_count,
                current: state.subpass,
            });
        }

        let view_count = render_pass.view_mask().count_ones();
        let mut image_barriers = try_vec(
            render_pass
                .attachments()
                .iter()
                .map(|attachment| (view_count * attachment.aspects.count()) as usize)
                .sum(),
        )?;

        state.end_subpass(cmd);

        for (index, attachment) in render_pass.attachments().iter().enumerate() {
            state.transition_attachment(
                index,
                render_pass.view_mask(),
                attachment.final_layout,
                attachment.stencil_final_layout,
                &mut image_barriers,
            );
        }

        if !image_barriers.is_empty() {
            trace!(
                "transitioning {} subresources to their final layouts",
                image_barriers.len(),
            );
            cmd.pipeline_barrier(&DependencyInfo {
                image_memory_barriers: image_barriers.into(),
                ..Default::default()
            });
        }

        self.state = None;

        Ok(())
    }

    /// Returns the subpass that is being recorded, or `None` if outside a render pass.
    #[inline]
    pub fn current_subpass(&self) -> Option<Subpass> {
        let state = self.state.as_ref()?;

        Subpass::from(state.render_pass.clone(), state.subpass)
    }

    /// Looks up the attachment whose image view belongs to `image`, and returns its index with
    /// the layout and stencil layout it is currently in.
    ///
    /// The layouts are those of the first view of the current subpass. Returns `None` if outside a
    /// render pass or if no attachment uses `image`.
    pub fn attachment_layout(&self, image: vk::Image) -> Option<(u32, ImageLayout, ImageLayout)> {
        let state = self.state.as_ref()?;
        let first_view = state.current_view_mask().trailing_zeros() as usize;

        state
            .attachments
            .iter()
            .enumerate()
            .find(|(_, attachment)| attachment.image_view.image() == image)
            .map(|(index, attachment)| {
                let view = &attachment.views[first_view];

                (index as u32, view.layout, view.stencil_layout)
            })
    }

    /// Records that the views of attachment `attachment` that the current subpass renders to are
    /// now in `layout` and `stencil_layout`.
    ///
    /// This is for commands recorded inside the subpass that change the layout of an attachment
    /// behind the recorder's back.
    pub fn set_attachment_layout(
        &mut self,
        attachment: u32,
        layout: ImageLayout,
        stencil_layout: ImageLayout,
    ) -> Result<(), RenderPassRecordingError> {
        let state = self
            .state
            .as_mut()
            .ok_or(RenderPassRecordingError::ForbiddenOutsideRenderPass)?;
        let attachment_count = state.attachments.len() as u32;

        if attachment >= attachment_count {
            return Err(RenderPassRecordingError::AttachmentIndexOutOfRange {
                attachment,
                attachment_count,
            });
        }

        let view_mask = state.current_view_mask();
        state.set_layouts(attachment as usize, view_mask, layout, stencil_layout);

        Ok(())
    }
}

#[derive(Debug)]
struct RenderPassState {
    render_pass: Arc<RenderPass>,
    framebuffer: Arc<Framebuffer>,
    subpass: u32,
    render_area_offset: [u32; 2],
    render_area_extent: [u32; 2],
    attachments: Vec<AttachmentState>,

    /// `Some` if the render pass was begun with custom sample locations.
    post_subpass_sample_locations: Option<Vec<(u32, Arc<SampleLocationsInfo>)>>,
}

#[derive(Debug)]
struct AttachmentState {
    image_view: Arc<ImageView>,
    clear_value: Option<ClearValue>,

    /// The views whose load operation has been performed.
    views_loaded: u32,
    views: [AttachmentViewState; MAX_VIEWS],
}

#[derive(Clone, Debug, Default)]
struct AttachmentViewState {
    layout: ImageLayout,
    stencil_layout: ImageLayout,
    sample_locations: Option<Arc<SampleLocationsInfo>>,
}

impl RenderPassState {
    fn new(begin_info: RenderPassBeginInfo) -> Result<Self, RenderPassRecordingError> {
        let RenderPassBeginInfo {
            render_pass,
            framebuffer,
            render_area_offset,
            render_area_extent,
            clear_values,
            attachments,
            sample_locations,
            _ne: _,
        } = begin_info;

        let required = render_pass.attachments().len() as u32;
        let imageless = framebuffer
            .flags()
            .intersects(FramebufferCreateFlags::IMAGELESS);

        // VUID-VkRenderPassBeginInfo-framebuffer-03207
        if imageless && attachments.is_empty() && required != 0 {
            return Err(RenderPassRecordingError::FramebufferImagelessWithoutAttachments);
        }

        let image_views = if imageless || !attachments.is_empty() {
            attachments.as_slice()
        } else {
            framebuffer.attachments()
        };

        // VUID-VkRenderPassBeginInfo-framebuffer-03208
        if image_views.len() as u32 != required {
            return Err(RenderPassRecordingError::AttachmentCountMismatch {
                required,
                provided: image_views.len() as u32,
            });
        }

        let mut attachment_states = try_vec(image_views.len())?;

        for (index, (image_view, attachment)) in image_views
            .iter()
            .zip(render_pass.attachments())
            .enumerate()
        {
            let index = index as u32;

            // VUID-VkFramebufferCreateInfo-pAttachments-00880
            // VUID-VkRenderPassBeginInfo-framebuffer-03216
            if image_view.format() != attachment.format {
                return Err(RenderPassRecordingError::AttachmentFormatMismatch {
                    attachment: index,
                    required: attachment.format,
                    provided: image_view.format(),
                });
            }

            // VUID-VkFramebufferCreateInfo-pAttachments-00881
            // VUID-VkRenderPassBeginInfo-framebuffer-03217
            if image_view.samples() != attachment.samples {
                return Err(RenderPassRecordingError::AttachmentSamplesMismatch {
                    attachment: index,
                    required: attachment.samples,
                    provided: image_view.samples(),
                });
            }

            // A shading rate attachment with too few layers is read from its first layer.
            if !image_view
                .usage()
                .intersects(ImageUsage::FRAGMENT_SHADING_RATE_ATTACHMENT)
                && last_bit(attachment.view_mask) > image_view.layer_count()
            {
                return Err(RenderPassRecordingError::AttachmentLayerCountTooSmall {
                    attachment: index,
                    required: last_bit(attachment.view_mask),
                    provided: image_view.layer_count(),
                });
            }

            attachment_states.push(AttachmentState {
                image_view: image_view.clone(),
                clear_value: clear_values.get(index as usize).copied().flatten(),
                views_loaded: 0,
                views: std::array::from_fn(|_| AttachmentViewState {
                    layout: attachment.initial_layout,
                    stencil_layout: attachment.stencil_initial_layout,
                    sample_locations: None,
                }),
            });
        }

        let mut post_subpass_sample_locations = None;

        if let Some(sample_locations) = sample_locations {
            for (attachment, locations) in sample_locations.attachment_initial_sample_locations {
                let state = attachment_states.get_mut(attachment as usize).ok_or(
                    RenderPassRecordingError::AttachmentIndexOutOfRange {
                        attachment,
                        attachment_count: required,
                    },
                )?;

                if !supports_sample_locations(&state.image_view) {
                    continue;
                }

                let locations = Arc::new(locations);

                for view in &mut state.views {
                    view.sample_locations = Some(locations.clone());
                }
            }

            let mut post_subpass =
                try_vec(sample_locations.post_subpass_sample_locations.len())?;
            post_subpass.extend(
                sample_locations
                    .post_subpass_sample_locations
                    .into_iter()
                    .map(|(subpass, locations)| (subpass, Arc::new(locations))),
            );
            post_subpass_sample_locations = Some(post_subpass);
        }

        Ok(RenderPassState {
            render_pass,
            framebuffer,
            subpass: 0,
            render_area_offset,
            render_area_extent,
            attachments: attachment_states,
            post_subpass_sample_locations,
        })
    }

    /// The view mask of the current subpass itself.
    fn current_view_mask(&self) -> u32 {
        self.render_pass.subpasses()[self.subpass as usize]
            .own_targets()
            .view_mask()
    }

    fn layer_count(&self) -> u32 {
        if self.render_pass.is_multiview() {
            1
        } else {
            self.framebuffer.layers()
        }
    }

    /// The view mask that dynamic rendering is begun with.
    fn rendering_view_mask(&self, view_mask: u32) -> u32 {
        if self.render_pass.is_multiview() {
            view_mask
        } else {
            0
        }
    }

    fn set_layouts(
        &mut self,
        attachment: usize,
        view_mask: u32,
        layout: ImageLayout,
        stencil_layout: ImageLayout,
    ) {
        let views = &mut self.attachments[attachment].views;

        for view in bits(view_mask) {
            views[view as usize].layout = layout;
            views[view as usize].stencil_layout = stencil_layout;
        }
    }

    fn begin_subpass<C>(&mut self, cmd: &mut C) -> Result<(), RenderPassRecordingError>
    where
        C: RenderingCommands + ?Sized,
    {
        let render_pass = self.render_pass.clone();
        let subpass = self.subpass;

        match render_pass.subpasses()[subpass as usize].merge_state() {
            SubpassMergeState::MergedMid | SubpassMergeState::MergedLast => {
                // The rendering region is already open, and the first subpass of the group
                // handled everything else.
                self.framebuffer_local_barrier(cmd);

                return Ok(());
            }
            SubpassMergeState::NotMerged | SubpassMergeState::MergedFirst => (),
        }

        let targets = render_pass.targets(subpass);
        let region_end = render_pass.region_end(subpass);

        let color_attachments = self.prepare_color_attachments(targets)?;
        let (depth_attachment, stencil_attachment, sample_locations) =
            self.prepare_depth_stencil_attachments(targets);

        self.begin_subpass_barriers(cmd, subpass, region_end)?;
        self.load_attachments(cmd, subpass, region_end);

        let fragment_shading_rate_attachment = targets.fragment_shading_rate().map(|sp_att| {
            RenderingFragmentShadingRateAttachmentInfo {
                image_view: self.attachments[sp_att.attachment as usize]
                    .image_view
                    .clone(),
                image_layout: sp_att.layout,
                texel_size: targets.fragment_shading_rate_texel_size(),
            }
        });

        // The density map always has a load op of `Load` or `DontCare`, so it never needs to be
        // loaded.
        let fragment_density_map_attachment =
            render_pass.fragment_density_map().map(|fragment_density_map| {
                RenderingFragmentDensityMapAttachmentInfo {
                    image_view: self.attachments[fragment_density_map.attachment as usize]
                        .image_view
                        .clone(),
                    image_layout: fragment_density_map.layout,
                }
            });

        let rendering_info = RenderingInfo {
            render_area_offset: self.render_area_offset,
            render_area_extent: self.render_area_extent,
            layer_count: self.layer_count(),
            view_mask: self.rendering_view_mask(targets.view_mask()),
            color_attachments,
            depth_attachment,
            stencil_attachment,
            fragment_shading_rate_attachment,
            fragment_density_map_attachment,
            multisampled_render_to_single_sampled: targets.multisampled_render_to_single_sampled(),
            legacy_dithering: targets.legacy_dithering(),
            sample_locations,
            ..Default::default()
        };

        trace!(
            "subpass {}: beginning rendering for subpasses {}..={}",
            subpass,
            subpass,
            region_end,
        );
        cmd.begin_rendering(&rendering_info);

        Ok(())
    }

    fn prepare_color_attachments(
        &mut self,
        targets: &RenderTargets,
    ) -> Result<Vec<Option<RenderingAttachmentInfo>>, OomError> {
        let render_pass = self.render_pass.clone();
        let view_mask = targets.view_mask();
        let mut color_attachments = try_vec(targets.colors().len())?;

        for (index, sp_att) in targets.colors().iter().enumerate() {
            let Some(sp_att) = sp_att else {
                color_attachments.push(None);
                continue;
            };

            let attachment = sp_att.attachment as usize;
            let rp_att = &render_pass.attachments()[attachment];
            let image_view = self.attachments[attachment].image_view.clone();

            let mut color_attachment = RenderingAttachmentInfo {
                image_layout: sp_att.layout,
                ..RenderingAttachmentInfo::image_view(image_view.clone())
            };

            if view_mask & self.attachments[attachment].views_loaded == 0 {
                let att_state = &mut self.attachments[attachment];
                color_attachment.load_op = rp_att.load_op;
                color_attachment.clear_value = att_state.clear_value;
                att_state.views_loaded |= view_mask;

                if let Some((initial_layout, _)) = self.initial_layout(attachment, view_mask) {
                    if initial_layout != sp_att.layout {
                        color_attachment.initial_layout = Some(initial_layout);
                        self.set_layouts(
                            attachment,
                            view_mask,
                            sp_att.layout,
                            ImageLayout::Undefined,
                        );
                    }
                }
            } else {
                color_attachment.load_op = LoadOp::Load;
            }

            // Overlapping view masks may store views that a later subpass overwrites anyway.
            color_attachment.store_op = if view_mask & !sp_att.last_subpass == 0 {
                rp_att.store_op
            } else {
                StoreOp::Store
            };

            if let Some(resolve) = targets.color_resolve(index) {
                let res_state = &mut self.attachments[resolve.attachment as usize];

                // The resolve overwrites the whole attachment, which stands in for its load.
                res_state.views_loaded |= view_mask;

                color_attachment.resolve_info = Some(RenderingAttachmentResolveInfo {
                    mode: color_resolve_mode(res_state.image_view.format()),
                    image_view: Some(res_state.image_view.clone()),
                    image_layout: resolve.layout,
                });
            } else if targets.multisampled_render_to_single_sampled().is_some()
                && rp_att.samples == SampleCount::Sample1
            {
                color_attachment.resolve_info = Some(RenderingAttachmentResolveInfo {
                    mode: color_resolve_mode(image_view.format()),
                    image_view: None,
                    image_layout: sp_att.layout,
                });
            }

            color_attachments.push(Some(color_attachment));
        }

        Ok(color_attachments)
    }

    fn prepare_depth_stencil_attachments(
        &mut self,
        targets: &RenderTargets,
    ) -> (
        Option<RenderingAttachmentInfo>,
        Option<RenderingAttachmentInfo>,
        Option<Arc<SampleLocationsInfo>>,
    ) {
        let Some(sp_att) = targets.depth_stencil() else {
            return (None, None, None);
        };

        let render_pass = self.render_pass.clone();
        let view_mask = targets.view_mask();
        let attachment = sp_att.attachment as usize;
        let rp_att = &render_pass.attachments()[attachment];
        let image_view = self.attachments[attachment].image_view.clone();

        let mut depth_attachment = rp_att.aspects.intersects(ImageAspects::DEPTH).then(|| {
            RenderingAttachmentInfo {
                image_layout: sp_att.layout,
                ..RenderingAttachmentInfo::image_view(image_view.clone())
            }
        });
        let mut stencil_attachment =
            rp_att
                .aspects
                .intersects(ImageAspects::STENCIL)
                .then(|| RenderingAttachmentInfo {
                    image_layout: sp_att.stencil_layout,
                    ..RenderingAttachmentInfo::image_view(image_view.clone())
                });

        if view_mask & self.attachments[attachment].views_loaded == 0 {
            let att_state = &mut self.attachments[attachment];
            let clear_value = att_state.clear_value;
            att_state.views_loaded |= view_mask;

            if let Some(depth) = &mut depth_attachment {
                depth.load_op = rp_att.load_op;
                depth.clear_value = clear_value;
            }

            if let Some(stencil) = &mut stencil_attachment {
                stencil.load_op = rp_att.stencil_load_op;
                stencil.clear_value = clear_value;
            }

            if let Some((initial_layout, initial_stencil_layout)) =
                self.initial_layout(attachment, view_mask)
            {
                if let Some(depth) = &mut depth_attachment {
                    if sp_att.layout != initial_layout {
                        depth.initial_layout = Some(initial_layout);
                    }
                }

                if let Some(stencil) = &mut stencil_attachment {
                    if sp_att.stencil_layout != initial_stencil_layout {
                        stencil.initial_layout = Some(initial_stencil_layout);
                    }
                }

                self.set_layouts(attachment, view_mask, sp_att.layout, sp_att.stencil_layout);
            }
        } else {
            for attachment_info in [&mut depth_attachment, &mut stencil_attachment]
                .into_iter()
                .flatten()
            {
                attachment_info.load_op = LoadOp::Load;
            }
        }

        let is_last_use = view_mask & !sp_att.last_subpass == 0;

        if let Some(depth) = &mut depth_attachment {
            depth.store_op = if is_last_use {
                rp_att.store_op
            } else {
                StoreOp::Store
            };
        }

        if let Some(stencil) = &mut stencil_attachment {
            stencil.store_op = if is_last_use {
                rp_att.stencil_store_op
            } else {
                StoreOp::Store
            };
        }

        // Multiview passes are treated as one single-view pass per view, so the locations are
        // tracked per view.
        let mut sample_locations = None;

        if let Some(post_subpass) = &self.post_subpass_sample_locations {
            if supports_sample_locations(&image_view) {
                sample_locations = post_subpass
                    .iter()
                    .find(|(subpass, _)| *subpass == self.subpass)
                    .map(|(_, locations)| locations.clone());

                for view in bits(view_mask) {
                    self.attachments[attachment].views[view as usize].sample_locations =
                        sample_locations.clone();
                }
            }
        }

        let resolve = targets.depth_stencil_resolve();
        let single_sampled = targets.multisampled_render_to_single_sampled().is_some()
            && rp_att.samples == SampleCount::Sample1;

        if resolve.is_some() || single_sampled {
            // A resolve mode is ignored if the resolve target doesn't have the aspect.
            let resolve_aspects =
                render_pass.attachments()[resolve.unwrap_or(sp_att).attachment as usize].aspects;
            let resolve_view = resolve.map(|resolve| {
                self.attachments[resolve.attachment as usize]
                    .image_view
                    .clone()
            });
            let mut resolved_aspects = ImageAspects::empty();

            if let Some(mode) = targets
                .depth_resolve_mode()
                .filter(|_| resolve_aspects.intersects(ImageAspects::DEPTH))
            {
                if let Some(depth) = &mut depth_attachment {
                    depth.resolve_info = Some(RenderingAttachmentResolveInfo {
                        mode,
                        image_view: resolve_view.clone(),
                        image_layout: resolve.map_or(sp_att.layout, |resolve| resolve.layout),
                    });
                }

                resolved_aspects |= ImageAspects::DEPTH;
            }

            if let Some(mode) = targets
                .stencil_resolve_mode()
                .filter(|_| resolve_aspects.intersects(ImageAspects::STENCIL))
            {
                if let Some(stencil) = &mut stencil_attachment {
                    stencil.resolve_info = Some(RenderingAttachmentResolveInfo {
                        mode,
                        image_view: resolve_view,
                        image_layout: resolve
                            .map_or(sp_att.stencil_layout, |resolve| resolve.stencil_layout),
                    });
                }

                resolved_aspects |= ImageAspects::STENCIL;
            }

            if let Some(resolve) = resolve {
                // Only a resolve of every aspect overwrites the whole target.
                if resolved_aspects == rp_att.aspects {
                    self.attachments[resolve.attachment as usize].views_loaded |= view_mask;
                }
            }
        }

        (depth_attachment, stencil_attachment, sample_locations)
    }

    /// Returns the layouts that the views in `view_mask` of `attachment` are in, if the load
    /// operation can transition them to the subpass layout as part of beginning rendering.
    ///
    /// This needs every aspect to be cleared and the whole image to be covered by the render
    /// area, and all views to share one layout.
    fn initial_layout(
        &self,
        attachment: usize,
        view_mask: u32,
    ) -> Option<(ImageLayout, ImageLayout)> {
        let rp_att = &self.render_pass.attachments()[attachment];
        let att_state = &self.attachments[attachment];
        let image_view = &att_state.image_view;

        let has_main_aspect = rp_att
            .aspects
            .intersects(ImageAspects::COLOR | ImageAspects::DEPTH);
        let has_stencil = rp_att.aspects.intersects(ImageAspects::STENCIL);

        if (has_main_aspect && rp_att.load_op != LoadOp::Clear)
            || (has_stencil && rp_att.stencil_load_op != LoadOp::Clear)
        {
            return None;
        }

        let [width, height, _] = image_view.extent();

        if self.render_area_offset != [0, 0] || self.render_area_extent != [width, height] {
            return None;
        }

        let mut view_mask = view_mask;

        if image_view.image_type() == ImageType::Dim3d {
            // The view must cover the whole 3D image.
            if image_view.base_array_layer() != 0 {
                return None;
            }

            if self.render_pass.is_multiview() {
                let is_contiguous = view_mask & view_mask.wrapping_add(1) == 0;

                if !is_contiguous || last_bit(view_mask) != image_view.layer_count() {
                    return None;
                }
            } else if self.framebuffer.layers() != image_view.layer_count() {
                return None;
            }

            view_mask = 1;
        }

        let mut layout = None;
        let mut stencil_layout = None;

        for view in bits(view_mask) {
            let view_state = &att_state.views[view as usize];

            if has_main_aspect {
                match layout {
                    None => layout = Some(view_state.layout),
                    Some(layout) if layout != view_state.layout => return None,
                    Some(_) => (),
                }
            }

            if has_stencil {
                match stencil_layout {
                    None => stencil_layout = Some(view_state.stencil_layout),
                    Some(layout) if layout != view_state.stencil_layout => return None,
                    Some(_) => (),
                }
            }
        }

        Some((
            layout.unwrap_or(ImageLayout::Undefined),
            stencil_layout.unwrap_or(ImageLayout::Undefined),
        ))
    }

    /// Emits the barriers that must execute before the rendering region of subpasses
    /// `first..=last` begins.
    fn begin_subpass_barriers<C>(
        &mut self,
        cmd: &mut C,
        first: u32,
        last: u32,
    ) -> Result<(), OomError>
    where
        C: RenderingCommands + ?Sized,
    {
        let render_pass = self.render_pass.clone();
        let subpasses = render_pass.subpasses();
        let mut memory_barrier: Option<MemoryBarrier> = None;

        for dependency in render_pass.dependencies() {
            let Some(dst) = dependency.dst_subpass else {
                continue;
            };

            if !(first..=last).contains(&dst) {
                continue;
            }

            if let Some(src) = dependency.src_subpass {
                // Dependencies within the region become framebuffer-local barriers.
                if (first..dst).contains(&src) {
                    continue;
                }

                if !dependency.views_intersect(
                    subpasses[src as usize].own_targets().view_mask(),
                    subpasses[dst as usize].own_targets().view_mask(),
                ) {
                    continue;
                }
            }

            memory_barrier
                .get_or_insert_with(MemoryBarrier::default)
                .merge(&dependency.barrier());
        }

        if first == 0 {
            memory_barrier
                .get_or_insert_with(MemoryBarrier::default)
                .merge(&IMPLICIT_EXTERNAL_ENTRY);
        }

        let targets = render_pass.targets(first);
        let members = &subpasses[first as usize..=last as usize];
        let fragment_density_map = render_pass.fragment_density_map();
        let barrier_count = |attachment: u32, view_mask: u32| {
            (view_mask.count_ones()
                * render_pass.attachments()[attachment as usize].aspects.count())
                as usize
        };

        let mut capacity: usize = targets
            .references()
            .map(|sp_att| barrier_count(sp_att.attachment, targets.view_mask()))
            .sum();

        for member in members {
            let view_mask = member.own_targets().view_mask();
            capacity += member
                .input_attachments()
                .iter()
                .flatten()
                .map(|input| barrier_count(input.attachment, view_mask))
                .sum::<usize>();

            if fragment_density_map.is_some() {
                capacity += view_mask.count_ones() as usize;
            }
        }

        let mut image_barriers = try_vec(capacity)?;

        // Attachments whose layout was already set by the load operation are skipped here.
        for sp_att in targets.references() {
            self.transition_attachment(
                sp_att.attachment as usize,
                targets.view_mask(),
                sp_att.layout,
                sp_att.stencil_layout,
                &mut image_barriers,
            );
        }

        for member in members {
            let view_mask = member.own_targets().view_mask();

            for input in member.input_attachments().iter().flatten() {
                // An input that is also rendered to stays in the render target layout.
                if targets
                    .references()
                    .any(|sp_att| sp_att.attachment == input.attachment)
                {
                    continue;
                }

                self.transition_attachment(
                    input.attachment as usize,
                    view_mask,
                    input.layout,
                    input.stencil_layout,
                    &mut image_barriers,
                );
            }

            if let Some(fragment_density_map) = fragment_density_map {
                self.transition_attachment(
                    fragment_density_map.attachment as usize,
                    view_mask,
                    fragment_density_map.layout,
                    ImageLayout::Undefined,
                    &mut image_barriers,
                );
            }
        }

        if memory_barrier.is_some() || !image_barriers.is_empty() {
            trace!(
                "subpass {}: barrier with {} image transitions",
                first,
                image_barriers.len(),
            );
            cmd.pipeline_barrier(&DependencyInfo {
                dependency_flags: DependencyFlags::empty(),
                memory_barriers: memory_barrier.into_iter().collect(),
                image_memory_barriers: image_barriers.into(),
            });
        }

        Ok(())
    }

    /// Emits the barrier for the framebuffer-local dependencies into the current subpass, which
    /// is inside a merged rendering region.
    fn framebuffer_local_barrier<C>(&self, cmd: &mut C)
    where
        C: RenderingCommands + ?Sized,
    {
        let mut memory_barrier: Option<MemoryBarrier> = None;

        for dependency in self.render_pass.dependencies() {
            if dependency.dst_subpass != Some(self.subpass)
                || !dependency
                    .dependency_flags
                    .intersects(DependencyFlags::BY_REGION)
            {
                continue;
            }

            memory_barrier
                .get_or_insert_with(MemoryBarrier::default)
                .merge(&dependency.barrier());
        }

        if let Some(memory_barrier) = memory_barrier {
            trace!("subpass {}: framebuffer-local barrier", self.subpass);
            cmd.pipeline_barrier(&DependencyInfo {
                dependency_flags: DependencyFlags::BY_REGION,
                memory_barriers: smallvec![memory_barrier],
                ..Default::default()
            });
        }
    }

    /// Performs the load operations that beginning the rendering region of subpasses
    /// `first..=last` didn't.
    fn load_attachments<C>(&mut self, cmd: &mut C, first: u32, last: u32)
    where
        C: RenderingCommands + ?Sized,
    {
        let render_pass = self.render_pass.clone();

        for member in &render_pass.subpasses()[first as usize..=last as usize] {
            let view_mask = member.own_targets().view_mask();

            for sp_att in member.references() {
                self.load_attachment(
                    cmd,
                    sp_att.attachment as usize,
                    view_mask,
                    sp_att.layout,
                    sp_att.stencil_layout,
                );
            }
        }
    }

    /// Clears the views in `view_mask` of `attachment` that haven't been loaded yet, with a
    /// rendering region of its own.
    fn load_attachment<C>(
        &mut self,
        cmd: &mut C,
        attachment: usize,
        view_mask: u32,
        layout: ImageLayout,
        stencil_layout: ImageLayout,
    ) where
        C: RenderingCommands + ?Sized,
    {
        let render_pass = self.render_pass.clone();
        let rp_att = &render_pass.attachments()[attachment];
        let att_state = &mut self.attachments[attachment];

        let view_mask = view_mask & !att_state.views_loaded;

        if view_mask == 0 {
            return;
        }

        att_state.views_loaded |= view_mask;

        let clears_main_aspect = rp_att
            .aspects
            .intersects(ImageAspects::COLOR | ImageAspects::DEPTH)
            && rp_att.load_op == LoadOp::Clear;
        let clears_stencil = rp_att.aspects.intersects(ImageAspects::STENCIL)
            && rp_att.stencil_load_op == LoadOp::Clear;

        // Anything but a clear leaves the contents as they are.
        if !clears_main_aspect && !clears_stencil {
            return;
        }

        let image_view = att_state.image_view.clone();
        let clear_value = att_state.clear_value;
        let attachment_info = |image_layout, load_op| RenderingAttachmentInfo {
            image_layout,
            load_op,
            store_op: StoreOp::Store,
            clear_value,
            ..RenderingAttachmentInfo::image_view(image_view.clone())
        };

        let mut rendering_info = RenderingInfo {
            render_area_offset: self.render_area_offset,
            render_area_extent: self.render_area_extent,
            layer_count: self.layer_count(),
            view_mask: self.rendering_view_mask(view_mask),
            ..Default::default()
        };

        if rp_att
            .aspects
            .intersects(ImageAspects::DEPTH | ImageAspects::STENCIL)
        {
            if rp_att.aspects.intersects(ImageAspects::DEPTH) {
                rendering_info.depth_attachment = Some(attachment_info(layout, rp_att.load_op));
            }

            if rp_att.aspects.intersects(ImageAspects::STENCIL) {
                rendering_info.stencil_attachment =
                    Some(attachment_info(stencil_layout, rp_att.stencil_load_op));
            }
        } else {
            rendering_info.color_attachments = vec![Some(attachment_info(layout, rp_att.load_op))];
        }

        trace!(
            "clearing views {:#b} of attachment {} outside of the subpass",
            view_mask,
            attachment,
        );
        cmd.begin_rendering(&rendering_info);
        cmd.end_rendering();
    }

    fn end_subpass<C>(&self, cmd: &mut C)
    where
        C: RenderingCommands + ?Sized,
    {
        let render_pass = &self.render_pass;
        let subpass = self.subpass;

        match render_pass.subpasses()[subpass as usize].merge_state() {
            // The last subpass of the group ends the rendering region.
            SubpassMergeState::MergedFirst | SubpassMergeState::MergedMid => return,
            SubpassMergeState::NotMerged | SubpassMergeState::MergedLast => (),
        }

        trace!("subpass {}: ending rendering", subpass);
        cmd.end_rendering();

        let group_first = render_pass.region_start(subpass);
        let mut memory_barrier: Option<MemoryBarrier> = None;

        for dependency in render_pass.dependencies() {
            if dependency.dst_subpass.is_some() {
                continue;
            }

            if dependency
                .src_subpass
                .is_some_and(|src| (group_first..=subpass).contains(&src))
            {
                memory_barrier
                    .get_or_insert_with(MemoryBarrier::default)
                    .merge(&dependency.barrier());
            }
        }

        if subpass as usize == render_pass.subpasses().len() - 1 {
            memory_barrier
                .get_or_insert_with(MemoryBarrier::default)
                .merge(&IMPLICIT_EXTERNAL_EXIT);
        }

        if let Some(memory_barrier) = memory_barrier {
            cmd.pipeline_barrier(&DependencyInfo {
                memory_barriers: smallvec![memory_barrier],
                ..Default::default()
            });
        }
    }

    /// Transitions the views in `view_mask` of `attachment` to `layout` and `stencil_layout`,
    /// pushing the needed barriers onto `barriers`.
    fn transition_attachment(
        &mut self,
        attachment: usize,
        view_mask: u32,
        layout: ImageLayout,
        stencil_layout: ImageLayout,
        barriers: &mut Vec<ImageMemoryBarrier>,
    ) {
        let aspects = self.render_pass.attachments()[attachment].aspects;
        let is_multiview = self.render_pass.is_multiview();
        let framebuffer_layers = self.framebuffer.layers();
        let AttachmentState {
            image_view, views, ..
        } = &mut self.attachments[attachment];

        // Transitions of a view of a 3D image apply to the whole mip level, so a single layout is
        // tracked for all of its views.
        let is_3d = image_view.image_type() == ImageType::Dim3d;
        let view_mask = if is_3d { 1 } else { view_mask };

        for view in bits(view_mask) {
            let view_state = &mut views[view as usize];

            if view_state.layout == layout && view_state.stencil_layout == stencil_layout {
                continue;
            }

            let array_layers = if is_3d {
                0..image_view.extent()[2]
            } else if is_multiview {
                let layer = image_view.base_array_layer() + view;
                layer..layer + 1
            } else {
                let base = image_view.base_array_layer();
                base..base + framebuffer_layers
            };
            let base_mip_level = image_view.base_mip_level();

            transition_image_range(
                image_view.image(),
                ImageSubresourceRange {
                    aspects,
                    mip_levels: base_mip_level..base_mip_level + 1,
                    array_layers,
                },
                (view_state.layout, layout),
                (view_state.stencil_layout, stencil_layout),
                view_state.sample_locations.as_ref(),
                barriers,
            );

            view_state.layout = layout;
            view_state.stencil_layout = stencil_layout;
        }
    }
}

/// Pushes barriers that transition `range` of `image` between layouts. Depth and stencil get
/// separate barriers when their layouts differ.
fn transition_image_range(
    image: vk::Image,
    range: ImageSubresourceRange,
    (old_layout, new_layout): (ImageLayout, ImageLayout),
    (old_stencil_layout, new_stencil_layout): (ImageLayout, ImageLayout),
    sample_locations: Option<&Arc<SampleLocationsInfo>>,
    barriers: &mut Vec<ImageMemoryBarrier>,
) {
    let depth_stencil = ImageAspects::DEPTH | ImageAspects::STENCIL;
    let mut aspects_left = range.aspects;

    while !aspects_left.is_empty() {
        let mut aspects = aspects_left;

        if aspects == depth_stencil
            && (old_layout != old_stencil_layout || new_layout != new_stencil_layout)
        {
            aspects = ImageAspects::DEPTH;
        }

        let (old, new) = if aspects == ImageAspects::STENCIL {
            (old_stencil_layout, new_stencil_layout)
        } else {
            (old_layout, new_layout)
        };

        if old != new {
            let (src_stages, src_access) = stage_access_for_layout(old, aspects);
            let (dst_stages, dst_access) = stage_access_for_layout(new, aspects);

            barriers.push(ImageMemoryBarrier {
                src_stages,
                src_access,
                dst_stages,
                dst_access,
                old_layout: old,
                new_layout: new,
                image,
                subresource_range: ImageSubresourceRange {
                    aspects,
                    ..range.clone()
                },
                sample_locations: sample_locations.cloned(),
            });
        }

        aspects_left -= aspects;
    }
}

fn color_resolve_mode(format: Format) -> ResolveMode {
    if format.is_integer() {
        ResolveMode::SampleZero
    } else {
        ResolveMode::Average
    }
}

/// Custom sample locations only apply to depth/stencil images that were created for them.
fn supports_sample_locations(image_view: &ImageView) -> bool {
    image_view
        .format()
        .aspects()
        .intersects(ImageAspects::DEPTH | ImageAspects::STENCIL)
        && image_view
            .image_flags()
            .intersects(ImageCreateFlags::SAMPLE_LOCATIONS_COMPATIBLE_DEPTH)
}

/// Error that can happen when recording a render pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderPassRecordingError {
    /// Not enough memory.
    OomError(OomError),

    /// Operation forbidden inside of a render pass.
    ForbiddenInsideRenderPass,

    /// Operation forbidden outside of a render pass.
    ForbiddenOutsideRenderPass,

    /// Tried to end a render pass with subpasses remaining, or tried to go to next subpass with no
    /// subpass remaining.
    NumSubpassesMismatch {
        /// Actual number of subpasses in the current render pass.
        actual: u32,
        /// Current subpass index before the failing command.
        current: u32,
    },

    /// The number of image views given for the render pass is not the number of attachments of
    /// the render pass.
    AttachmentCountMismatch { required: u32, provided: u32 },

    /// The format of an image view is not the format of the attachment it is used for.
    AttachmentFormatMismatch {
        attachment: u32,
        required: Format,
        provided: Format,
    },

    /// The sample count of an image view is not the sample count of the attachment it is used for.
    AttachmentSamplesMismatch {
        attachment: u32,
        required: SampleCount,
        provided: SampleCount,
    },

    /// An image view has fewer layers than the views of the subpasses that use it.
    AttachmentLayerCountTooSmall {
        attachment: u32,
        required: u32,
        provided: u32,
    },

    /// An attachment index is not less than the number of attachments of the render pass.
    AttachmentIndexOutOfRange {
        attachment: u32,
        attachment_count: u32,
    },

    /// The framebuffer is imageless, but no image views were given when beginning the render
    /// pass.
    FramebufferImagelessWithoutAttachments,
}

impl Error for RenderPassRecordingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RenderPassRecordingError::OomError(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for RenderPassRecordingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Self::OomError(_) => write!(f, "not enough memory available"),
            Self::ForbiddenInsideRenderPass => {
                write!(f, "operation forbidden inside a render pass")
            }
            Self::ForbiddenOutsideRenderPass => {
                write!(f, "operation forbidden outside a render pass")
            }
            Self::NumSubpassesMismatch { actual, current } => write!(
                f,
                "tried to end a render pass with subpasses remaining, or tried to go to next \
                subpass with no subpass remaining (current subpass {} of {})",
                current, actual,
            ),
            Self::AttachmentCountMismatch { required, provided } => write!(
                f,
                "{} image views were provided, but the render pass has {} attachments",
                provided, required,
            ),
            Self::AttachmentFormatMismatch {
                attachment,
                required,
                provided,
            } => write!(
                f,
                "the image view for attachment {} has format {:?}, but the attachment has format \
                {:?}",
                attachment, provided, required,
            ),
            Self::AttachmentSamplesMismatch {
                attachment,
                required,
                provided,
            } => write!(
                f,
                "the image view for attachment {} has {:?} samples, but the attachment has {:?} \
                samples",
                attachment, provided, required,
            ),
            Self::AttachmentLayerCountTooSmall {
                attachment,
                required,
                provided,
            } => write!(
                f,
                "the image view for attachment {} has {} layers, but the subpasses that use it \
                need at least {}",
                attachment, provided, required,
            ),
            Self::AttachmentIndexOutOfRange {
                attachment,
                attachment_count,
            } => write!(
                f,
                "attachment index {} is not less than the number of attachments ({})",
                attachment, attachment_count,
            ),
            Self::FramebufferImagelessWithoutAttachments => write!(
                f,
                "the framebuffer is imageless, but no image views were provided",
            ),
        }
    }
}

impl From<OomError> for RenderPassRecordingError {
    fn from(err: OomError) -> Self {
        Self::OomError(err)
    }
}
