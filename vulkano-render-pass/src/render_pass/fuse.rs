// Copyright (c) 2025 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

use super::{
    create::RenderPassCreationError,
    merge::{self, MergeContext},
    rendering::SubpassRenderingInfo,
    MergeGroup, MergeGroupId, PipelineCreateFlags, RenderPass, RenderTargets, SubpassAttachment,
    SubpassMergeState,
};
use crate::{device::DeviceProperties, try_vec, OomError};
use log::debug;

impl RenderPass {
    /// Merges the subpasses of the render pass that can share a rendering region on `device`.
    pub(super) fn plan_and_fuse<D>(&mut self, device: &D) -> Result<(), RenderPassCreationError>
    where
        D: DeviceProperties + ?Sized,
    {
        let Some(budget) = device.tile_buffer_size() else {
            debug!("the device has no tile buffer, subpasses are not merged");
            return Ok(());
        };

        let plan = merge::plan(self, device, budget);

        self.merge_groups
            .try_reserve(plan.groups.len())
            .map_err(OomError::from)?;

        for ctx in &plan.groups {
            self.fuse(ctx)?;
        }

        self.regions = plan.regions;

        Ok(())
    }

    /// Builds the shared render targets of the range in `ctx`, and points its members at them.
    fn fuse(&mut self, ctx: &MergeContext) -> Result<(), RenderPassCreationError> {
        let members = ctx.first as usize..=ctx.last as usize;
        let subpasses = &self.subpasses;

        /* Colors */

        let color_count = ctx.color_count() as usize;
        let mut colors = try_vec(color_count)?;
        let mut color_resolves = try_vec(color_count)?;

        for slot in 0..color_count {
            colors.push(ctx.color(subpasses, slot).cloned());
            color_resolves.push(ctx.colors[slot].and_then(|slot| {
                subpasses[slot.subpass as usize]
                    .targets
                    .color_resolve(slot.index as usize)
                    .cloned()
            }));
        }

        if color_resolves.iter().all(Option::is_none) {
            color_resolves.clear();
        }

        /* Depth/stencil */

        let depth_stencil = ctx
            .depth_stencil(subpasses, ctx.depth)
            .or_else(|| ctx.depth_stencil(subpasses, ctx.stencil))
            .cloned();
        let depth_stencil_resolve = subpasses[members.clone()]
            .iter()
            .find_map(|subpass| subpass.targets.depth_stencil_resolve.clone());

        let first_targets = &subpasses[ctx.first as usize].targets;
        let mut targets = RenderTargets {
            colors,
            color_resolves,
            depth_stencil,
            depth_stencil_resolve,
            fragment_shading_rate: None,
            fragment_shading_rate_texel_size: [0, 0],
            view_mask: 0,
            depth_resolve_mode: None,
            stencil_resolve_mode: None,
            multisampled_render_to_single_sampled: first_targets
                .multisampled_render_to_single_sampled,
            legacy_dithering: first_targets.legacy_dithering,
            pipeline_flags: PipelineCreateFlags::empty(),
        };

        for subpass in &subpasses[members.clone()] {
            let own = &subpass.targets;
            targets.view_mask |= own.view_mask;
            targets.depth_resolve_mode = own.depth_resolve_mode.or(targets.depth_resolve_mode);
            targets.stencil_resolve_mode =
                own.stencil_resolve_mode.or(targets.stencil_resolve_mode);

            for input in subpass.input_attachments.iter().flatten() {
                if targets
                    .colors
                    .iter()
                    .flatten()
                    .any(|color| color.attachment == input.attachment)
                {
                    targets.pipeline_flags |= PipelineCreateFlags::COLOR_ATTACHMENT_FEEDBACK_LOOP;
                }

                if targets
                    .depth_stencil
                    .as_ref()
                    .is_some_and(|ds| ds.attachment == input.attachment)
                {
                    targets.pipeline_flags |=
                        PipelineCreateFlags::DEPTH_STENCIL_ATTACHMENT_FEEDBACK_LOOP;
                }
            }
        }

        // The region stores an attachment only after the last member that uses it.
        for reference in targets.references_mut() {
            reference.last_subpass = subpasses[members.clone()]
                .iter()
                .flat_map(|subpass| subpass.references())
                .filter(|r| r.attachment == reference.attachment)
                .fold(0, |views, r| views | r.last_subpass);
        }

        /* Members */

        let group_id = MergeGroupId(self.merge_groups.len() as u32);
        let info_view_mask = if self.is_multiview {
            targets.view_mask
        } else {
            0
        };

        for index in members {
            let merge_state = if index == ctx.first as usize {
                SubpassMergeState::MergedFirst
            } else if index == ctx.last as usize {
                SubpassMergeState::MergedLast
            } else {
                SubpassMergeState::MergedMid
            };

            let subpass = &self.subpasses[index];

            let mut color_locations = try_vec(color_count)?;
            color_locations.extend(targets.colors.iter().map(|color| {
                let color = color.as_ref()?;

                subpass
                    .targets
                    .colors
                    .iter()
                    .position(|own| {
                        own.as_ref()
                            .is_some_and(|own| own.attachment == color.attachment)
                    })
                    .map(|local| local as u32)
            }));

            let input_attachments = dedup_inputs(&subpass.input_attachments)?;
            let info = SubpassRenderingInfo::new(
                &targets,
                &input_attachments,
                &self.attachments,
                info_view_mask,
            );

            let subpass = &mut self.subpasses[index];
            subpass.merge_state = merge_state;
            subpass.merge_group = Some(group_id);
            subpass.color_locations = color_locations;
            subpass.input_attachments = input_attachments;
            subpass.info = info;
        }

        debug!(
            "subpasses {}..={} render to {} color attachments{}",
            ctx.first,
            ctx.last,
            color_count,
            if targets.depth_stencil.is_some() {
                " and a depth/stencil attachment"
            } else {
                ""
            },
        );

        self.merge_groups.push(MergeGroup {
            subpasses: ctx.first..ctx.last + 1,
            targets,
        });

        Ok(())
    }
}

/// Collapses the inputs that read the same attachment into one, keeping the views of all of
/// them in `last_subpass`. Unused inputs are dropped.
fn dedup_inputs(
    inputs: &[Option<SubpassAttachment>],
) -> Result<Vec<Option<SubpassAttachment>>, RenderPassCreationError> {
    let mut deduped: Vec<Option<SubpassAttachment>> = try_vec(inputs.len())?;

    for input in inputs.iter().flatten() {
        let existing = deduped
            .iter_mut()
            .flatten()
            .find(|existing| existing.attachment == input.attachment);

        match existing {
            Some(existing) => existing.last_subpass |= input.last_subpass,
            None => deduped.push(Some(input.clone())),
        }
    }

    Ok(deduped)
}
