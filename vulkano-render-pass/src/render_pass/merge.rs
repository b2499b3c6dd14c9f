// Copyright (c) 2025 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Planning of which adjacent subpasses are recorded as one rendering region.
//!
//! The planner grows a range of subpasses one subpass at a time, as long as the render targets of
//! the whole range can be bound at once and every dependency inside the range is
//! framebuffer-local. A range is only kept if it actually reuses a render target across
//! subpasses, and if its color attachments fit in the tile buffer.

use super::{RenderPass, ResolveMode, SubpassAttachment, SubpassState};
use crate::{bits, device::DeviceProperties, image::ImageAspects, last_bit};
use log::debug;
use smallvec::SmallVec;
use std::ops::Range;

/// The most color attachments a merged range can bind.
pub(crate) const MAX_COLOR_SLOTS: usize = 8;

/// Width and height in pixels of the tile that the tile buffer has to hold.
const TILE_SIZE: u64 = 16;

/// A render target of a merged range, identified by the subpass that first uses it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct MergeSlot {
    /// The subpass that owns the reference.
    pub(crate) subpass: u32,
    /// The index of the color attachment in `subpass`. Unused for depth and stencil.
    pub(crate) index: u32,
    /// The number of subpasses of the range that use the slot.
    pub(crate) access_count: u32,
    /// The last subpass of the range that uses the slot.
    pub(crate) last_access: u32,
}

impl MergeSlot {
    fn new(subpass: u32, index: u32, access_count: u32) -> Self {
        MergeSlot {
            subpass,
            index,
            access_count,
            last_access: subpass,
        }
    }
}

/// The state of a range of subpasses that is being considered for merging.
#[derive(Clone, Debug)]
pub(crate) struct MergeContext {
    pub(crate) first: u32,
    pub(crate) last: u32,
    pub(crate) colors: [Option<MergeSlot>; MAX_COLOR_SLOTS],
    pub(crate) depth: Option<MergeSlot>,
    pub(crate) stencil: Option<MergeSlot>,
}

impl MergeContext {
    /// Starts a range that only contains `first`.
    pub(crate) fn new(subpasses: &[SubpassState], first: u32) -> Self {
        let targets = &subpasses[first as usize].targets;
        let mut colors = [None; MAX_COLOR_SLOTS];

        for (index, color) in targets.colors.iter().enumerate().take(MAX_COLOR_SLOTS) {
            if color.is_some() {
                colors[index] = Some(MergeSlot::new(first, index as u32, 1));
            }
        }

        let (depth, stencil) = match &targets.depth_stencil {
            Some(depth_stencil) => (
                depth_stencil
                    .aspects
                    .intersects(ImageAspects::DEPTH)
                    .then(|| MergeSlot::new(first, 0, 1)),
                depth_stencil
                    .aspects
                    .intersects(ImageAspects::STENCIL)
                    .then(|| MergeSlot::new(first, 0, 1)),
            ),
            None => (None, None),
        };

        MergeContext {
            first,
            last: first,
            colors,
            depth,
            stencil,
        }
    }

    /// Returns the mask of the color slots that are in use.
    pub(crate) fn used_color_mask(&self) -> u32 {
        self.colors
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .fold(0, |mask, (index, _)| mask | 1 << index)
    }

    /// Returns the number of color attachments of the merged range.
    pub(crate) fn color_count(&self) -> u32 {
        last_bit(self.used_color_mask())
    }

    /// Returns the reference that color slot `slot` holds.
    pub(crate) fn color<'a>(
        &self,
        subpasses: &'a [SubpassState],
        slot: usize,
    ) -> Option<&'a SubpassAttachment> {
        let slot = self.colors[slot]?;

        subpasses[slot.subpass as usize].targets.colors[slot.index as usize].as_ref()
    }

    /// Returns the depth/stencil reference that `slot` holds.
    pub(crate) fn depth_stencil<'a>(
        &self,
        subpasses: &'a [SubpassState],
        slot: Option<MergeSlot>,
    ) -> Option<&'a SubpassAttachment> {
        subpasses[slot?.subpass as usize].targets.depth_stencil.as_ref()
    }

    /// Returns whether a render target that `first` uses is used again by a later subpass of
    /// the range.
    fn has_reuse(&self) -> bool {
        (self.colors.iter().flatten())
            .chain(&self.depth)
            .chain(&self.stencil)
            .any(|slot| slot.subpass == self.first && slot.access_count > 1)
    }
}

/// Returns the range extended with the subpass after it, or `None` if that subpass can't join
/// the range.
pub(crate) fn can_merge_next(
    render_pass: &RenderPass,
    ctx: &MergeContext,
    max_color_attachments: u32,
) -> Option<MergeContext> {
    let subpasses = &render_pass.subpasses;
    let candidate = ctx.last + 1;

    if candidate as usize >= subpasses.len() {
        return None;
    }

    let first_targets = &subpasses[ctx.first as usize].targets;
    let next = &subpasses[candidate as usize];
    let next_targets = &next.targets;

    if first_targets.fragment_shading_rate.is_some()
        || next_targets.fragment_shading_rate.is_some()
    {
        return None;
    }

    // A merged range binds at most `MAX_COLOR_SLOTS` colors.
    if [first_targets, next_targets]
        .iter()
        .any(|targets| targets.colors.len() > MAX_COLOR_SLOTS)
    {
        return None;
    }

    let modes_conflict = |a: Option<ResolveMode>, b: Option<ResolveMode>| {
        matches!((a, b), (Some(a), Some(b)) if a != b)
    };

    if modes_conflict(
        first_targets.depth_resolve_mode,
        next_targets.depth_resolve_mode,
    ) || modes_conflict(
        first_targets.stencil_resolve_mode,
        next_targets.stencil_resolve_mode,
    ) {
        return None;
    }

    if first_targets.legacy_dithering != next_targets.legacy_dithering
        || first_targets.multisampled_render_to_single_sampled
            != next_targets.multisampled_render_to_single_sampled
    {
        return None;
    }

    // Every dependency from inside the range must be satisfiable without ending rendering.
    let blocked = render_pass.dependencies.iter().any(|dependency| {
        dependency.dst_subpass == Some(candidate)
            && dependency
                .src_subpass
                .is_some_and(|src| (ctx.first..=candidate).contains(&src))
            && !dependency.is_framebuffer_local()
    });

    if blocked {
        return None;
    }

    let mut next_ctx = ctx.clone();
    next_ctx.last = candidate;

    /* Depth/stencil */

    let next_depth_stencil = next_targets.depth_stencil.as_ref();

    if let Some(depth_stencil) = next_depth_stencil {
        for slot in [ctx.depth, ctx.stencil] {
            if let Some(established) = ctx.depth_stencil(subpasses, slot) {
                if established.attachment != depth_stencil.attachment {
                    return None;
                }
            }
        }
    }

    /* Colors */

    let used_color_mask = ctx.used_color_mask();
    let slot_limit = max_color_attachments.min(MAX_COLOR_SLOTS as u32);
    let free_mask = !used_color_mask & ((1 << slot_limit) - 1);

    let mut accessed_mask = 0u32;
    let mut missing: SmallVec<[u32; MAX_COLOR_SLOTS]> = SmallVec::new();

    for (index, color) in next_targets.colors.iter().enumerate() {
        let Some(color) = color else {
            continue;
        };

        let existing = bits(used_color_mask).find(|&slot| {
            ctx.color(subpasses, slot as usize)
                .is_some_and(|c| c.attachment == color.attachment)
        });

        match existing {
            Some(slot) => accessed_mask |= 1 << slot,
            None => missing.push(index as u32),
        }
    }

    if missing.len() as u32 > free_mask.count_ones() {
        return None;
    }

    for (index, slot) in missing.into_iter().zip(bits(free_mask)) {
        next_ctx.colors[slot as usize] = Some(MergeSlot::new(candidate, index, 0));
        accessed_mask |= 1 << slot;
    }

    let mut accessed_depth = false;
    let mut accessed_stencil = false;

    if let Some(depth_stencil) = next_depth_stencil {
        if depth_stencil
            .aspects
            .intersects(ImageAspects::DEPTH)
        {
            next_ctx
                .depth
                .get_or_insert(MergeSlot::new(candidate, 0, 0));
            accessed_depth = true;
        }

        if depth_stencil
            .aspects
            .intersects(ImageAspects::STENCIL)
        {
            next_ctx
                .stencil
                .get_or_insert(MergeSlot::new(candidate, 0, 0));
            accessed_stencil = true;
        }
    }

    /* Inputs that read a render target of the range */

    for input in next.input_attachments.iter().flatten() {
        for slot in bits(next_ctx.used_color_mask()) {
            if next_ctx
                .color(subpasses, slot as usize)
                .is_some_and(|c| c.attachment == input.attachment)
            {
                accessed_mask |= 1 << slot;
            }
        }

        if next_ctx
            .depth_stencil(subpasses, next_ctx.depth)
            .is_some_and(|ds| ds.attachment == input.attachment)
        {
            accessed_depth = true;
        }

        if next_ctx
            .depth_stencil(subpasses, next_ctx.stencil)
            .is_some_and(|ds| ds.attachment == input.attachment)
        {
            accessed_stencil = true;
        }
    }

    let touch = |slot: &mut Option<MergeSlot>| {
        if let Some(slot) = slot {
            slot.last_access = candidate;
            slot.access_count += 1;
        }
    };

    for slot in bits(accessed_mask) {
        touch(&mut next_ctx.colors[slot as usize]);
    }

    if accessed_depth {
        touch(&mut next_ctx.depth);
    }

    if accessed_stencil {
        touch(&mut next_ctx.stencil);
    }

    Some(next_ctx)
}

/// Returns whether the color attachments of the range fit in a tile buffer of `budget` bytes.
pub(crate) fn fits_in_tile_buffer<D>(
    render_pass: &RenderPass,
    ctx: &MergeContext,
    device: &D,
    budget: u32,
) -> bool
where
    D: DeviceProperties + ?Sized,
{
    let bytes_per_pixel: u64 = bits(ctx.used_color_mask())
        .filter_map(|slot| ctx.color(&render_pass.subpasses, slot as usize))
        .map(|color| {
            let attachment = &render_pass.attachments[color.attachment as usize];
            let bytes_per_sample = if device.is_blend_internal(attachment.format) {
                4
            } else {
                attachment.format.block_size().next_power_of_two()
            };

            bytes_per_sample * u64::from(attachment.samples.count())
        })
        .sum();

    bytes_per_pixel * TILE_SIZE * TILE_SIZE <= u64::from(budget)
}

/// The outcome of planning a render pass.
#[derive(Debug, Default)]
pub(crate) struct MergePlan {
    /// Consecutive ranges that partition the subpasses.
    pub(crate) regions: Vec<Range<u32>>,
    /// The accepted ranges with more than one subpass, in order.
    pub(crate) groups: Vec<MergeContext>,
}

/// Plans which subpasses of `render_pass` are merged, for a tile buffer of `budget` bytes.
pub(crate) fn plan<D>(render_pass: &RenderPass, device: &D, budget: u32) -> MergePlan
where
    D: DeviceProperties + ?Sized,
{
    let subpass_count = render_pass.subpasses.len() as u32;
    let max_color_attachments = device.max_color_attachments();
    let mut plan = MergePlan::default();

    let mut first = 0;
    let mut last = subpass_count.saturating_sub(1);

    while first < subpass_count {
        let mut ctx = MergeContext::new(&render_pass.subpasses, first);

        while ctx.last < last {
            match can_merge_next(render_pass, &ctx, max_color_attachments) {
                Some(next) => ctx = next,
                None => break,
            }
        }

        if ctx.first == ctx.last {
            plan.regions.push(first..first + 1);
            first += 1;
            last = subpass_count - 1;
            continue;
        }

        if !ctx.has_reuse() {
            debug!(
                "subpasses {}..={} share no render target with subpass {}, not merging",
                ctx.first, ctx.last, ctx.first,
            );
            plan.regions.push(first..first + 1);
            first += 1;
            last = subpass_count - 1;
            continue;
        }

        if !fits_in_tile_buffer(render_pass, &ctx, device, budget) {
            debug!(
                "subpasses {}..={} exceed the tile buffer, evicting subpass {}",
                ctx.first, ctx.last, ctx.last,
            );
            last = ctx.last - 1;
            continue;
        }

        debug!("merging subpasses {}..={}", ctx.first, ctx.last);
        plan.regions.push(ctx.first..ctx.last + 1);
        first = ctx.last + 1;
        last = subpass_count - 1;
        plan.groups.push(ctx);
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::{can_merge_next, fits_in_tile_buffer, plan, MergeContext};
    use crate::{
        device::DeviceLimits,
        format::Format,
        image::{ImageLayout, SampleCount},
        render_pass::{
            AttachmentDescription, AttachmentReference, LoadOp, RenderPass,
            RenderPassCreateInfo, StoreOp, SubpassDependency, SubpassDescription,
            SubpassMergeState,
        },
        sync::{AccessFlags, DependencyFlags, PipelineStages},
        test_util::test_device,
    };
    use std::sync::Arc;

    fn attachment(format: Format, samples: SampleCount) -> AttachmentDescription {
        AttachmentDescription {
            format,
            samples,
            load_op: LoadOp::Clear,
            store_op: StoreOp::Store,
            final_layout: ImageLayout::General,
            ..Default::default()
        }
    }

    fn reference(attachment: u32, layout: ImageLayout) -> Option<AttachmentReference> {
        Some(AttachmentReference {
            attachment,
            layout,
            ..Default::default()
        })
    }

    fn writes(colors: &[u32]) -> SubpassDescription {
        SubpassDescription {
            color_attachments: colors
                .iter()
                .map(|&a| reference(a, ImageLayout::ColorAttachmentOptimal))
                .collect(),
            ..Default::default()
        }
    }

    fn reads(inputs: &[u32], colors: &[u32]) -> SubpassDescription {
        SubpassDescription {
            input_attachments: inputs
                .iter()
                .map(|&a| reference(a, ImageLayout::ShaderReadOnlyOptimal))
                .collect(),
            ..writes(colors)
        }
    }

    fn local(src: u32, dst: u32) -> SubpassDependency {
        SubpassDependency {
            src_subpass: Some(src),
            dst_subpass: Some(dst),
            src_stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            dst_stages: PipelineStages::FRAGMENT_SHADER,
            src_access: AccessFlags::COLOR_ATTACHMENT_WRITE,
            dst_access: AccessFlags::INPUT_ATTACHMENT_READ,
            dependency_flags: DependencyFlags::BY_REGION,
            ..Default::default()
        }
    }

    fn render_pass(
        tile_buffer_size: Option<u32>,
        attachments: Vec<AttachmentDescription>,
        subpasses: Vec<SubpassDescription>,
        dependencies: Vec<SubpassDependency>,
    ) -> Arc<RenderPass> {
        RenderPass::new(
            &test_device(tile_buffer_size),
            RenderPassCreateInfo {
                attachments,
                subpasses,
                dependencies,
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn assert_partition(rp: &RenderPass) {
        let mut next = 0;

        for region in rp.regions() {
            assert_eq!(region.start, next);
            assert!(region.end > region.start);
            next = region.end;
        }

        assert_eq!(next as usize, rp.subpasses().len());
    }

    #[test]
    fn partition() {
        let _ = env_logger::builder().is_test(true).try_init();

        // 0 and 1 share attachment 0, 2 renders elsewhere, 3 reads what 2 wrote.
        let rp = render_pass(
            Some(1 << 16),
            vec![
                attachment(Format::R8G8B8A8_UNORM, SampleCount::Sample1),
                attachment(Format::R8G8B8A8_UNORM, SampleCount::Sample1),
                attachment(Format::R16G16B16A16_SFLOAT, SampleCount::Sample1),
            ],
            vec![
                writes(&[0]),
                reads(&[0], &[1]),
                writes(&[2]),
                reads(&[2], &[1]),
            ],
            vec![local(0, 1), local(2, 3)],
        );

        assert_partition(&rp);
        assert_eq!(rp.regions().first(), Some(&(0..4)));
    }

    #[test]
    fn unrelated_subpasses_stay_apart() {
        let rp = render_pass(
            Some(1 << 16),
            vec![
                attachment(Format::R8G8B8A8_UNORM, SampleCount::Sample1),
                attachment(Format::R8G8B8A8_UNORM, SampleCount::Sample1),
            ],
            vec![writes(&[0]), writes(&[1])],
            vec![],
        );

        assert_eq!(rp.regions(), [0..1, 1..2]);
    }

    #[test]
    fn non_local_dependency_splits() {
        let rp = render_pass(
            Some(1 << 16),
            vec![attachment(Format::R8G8B8A8_UNORM, SampleCount::Sample1)],
            vec![writes(&[0]), reads(&[0], &[])],
            vec![SubpassDependency {
                dependency_flags: DependencyFlags::empty(),
                ..local(0, 1)
            }],
        );

        assert_eq!(rp.regions(), [0..1, 1..2]);
    }

    #[test]
    fn fragment_shading_rate_never_merged() {
        let rp = render_pass(
            Some(1 << 16),
            vec![
                attachment(Format::R8G8B8A8_UNORM, SampleCount::Sample1),
                attachment(Format::R8_UINT, SampleCount::Sample1),
            ],
            vec![
                writes(&[0]),
                SubpassDescription {
                    fragment_shading_rate_attachment: reference(
                        1,
                        ImageLayout::FragmentShadingRateAttachmentOptimal,
                    ),
                    fragment_shading_rate_texel_size: [16, 16],
                    ..reads(&[0], &[0])
                },
                reads(&[0], &[0]),
            ],
            vec![local(0, 1), local(1, 2)],
        );

        assert_partition(&rp);
        assert_eq!(rp.regions(), [0..1, 1..2, 2..3]);

        let ctx = MergeContext::new(&rp.subpasses, 0);
        assert!(can_merge_next(&rp, &ctx, 8).is_none());
    }

    #[test]
    fn tile_budget() {
        let create = |budget| {
            render_pass(
                Some(budget),
                vec![
                    attachment(Format::R8G8B8A8_UNORM, SampleCount::Sample4),
                    attachment(Format::R32G32B32A32_SFLOAT, SampleCount::Sample4),
                ],
                vec![writes(&[0, 1]), reads(&[0], &[0, 1])],
                vec![local(0, 1)],
            )
        };

        // (4 + 16) bytes * 4 samples * 16 * 16
        let exact = 20 * 4 * 256;

        let rp = create(exact);
        assert_eq!(rp.regions(), [0..2]);

        let ctx = MergeContext::new(&rp.subpasses, 0);
        let ctx = can_merge_next(&rp, &ctx, 8).unwrap();
        let device = test_device(Some(exact));
        assert!(fits_in_tile_buffer(&rp, &ctx, &device, exact));
        assert!(!fits_in_tile_buffer(&rp, &ctx, &device, exact - 1));

        let rp = create(exact - 1);
        assert_eq!(rp.regions(), [0..1, 1..2]);
    }

    #[test]
    fn blend_internal_formats() {
        let rp = render_pass(
            None,
            vec![attachment(Format::R8G8_UNORM, SampleCount::Sample1)],
            vec![writes(&[0]), reads(&[0], &[0])],
            vec![local(0, 1)],
        );

        let ctx = MergeContext::new(&rp.subpasses, 0);
        let ctx = can_merge_next(&rp, &ctx, 8).unwrap();

        let mut device = test_device(None);
        assert!(fits_in_tile_buffer(&rp, &ctx, &device, 2 * 256));

        device.internal_blend_formats.push(Format::R8G8_UNORM);
        assert!(!fits_in_tile_buffer(&rp, &ctx, &device, 2 * 256));
        assert!(fits_in_tile_buffer(&rp, &ctx, &device, 4 * 256));
    }

    #[test]
    fn color_slots() {
        let rp = render_pass(
            None,
            vec![
                attachment(Format::R8G8B8A8_UNORM, SampleCount::Sample1),
                attachment(Format::R8G8B8A8_UNORM, SampleCount::Sample1),
                attachment(Format::R8G8B8A8_UNORM, SampleCount::Sample1),
            ],
            vec![writes(&[0, 1]), reads(&[0], &[2, 1])],
            vec![local(0, 1)],
        );

        let ctx = MergeContext::new(&rp.subpasses, 0);
        assert_eq!(ctx.used_color_mask(), 0b11);

        let ctx = can_merge_next(&rp, &ctx, 8).unwrap();
        assert_eq!(ctx.used_color_mask(), 0b111);

        let slot = ctx.colors[2].unwrap();
        assert_eq!((slot.subpass, slot.index, slot.access_count), (1, 0, 1));

        // Attachment 0 is read as an input, attachment 1 is rendered to again.
        assert_eq!(ctx.colors[0].unwrap().access_count, 2);
        assert_eq!(ctx.colors[1].unwrap().access_count, 2);
        assert_eq!(ctx.colors[1].unwrap().last_access, 1);

        // No room for the new color.
        let ctx = MergeContext::new(&rp.subpasses, 0);
        assert!(can_merge_next(&rp, &ctx, 2).is_none());
    }

    #[test]
    fn depth_stencil_must_match() {
        let rp = render_pass(
            None,
            vec![
                attachment(Format::D32_SFLOAT, SampleCount::Sample1),
                attachment(Format::D32_SFLOAT, SampleCount::Sample1),
            ],
            vec![
                SubpassDescription {
                    depth_stencil_attachment: reference(
                        0,
                        ImageLayout::DepthStencilAttachmentOptimal,
                    ),
                    ..Default::default()
                },
                SubpassDescription {
                    depth_stencil_attachment: reference(
                        1,
                        ImageLayout::DepthStencilAttachmentOptimal,
                    ),
                    ..Default::default()
                },
            ],
            vec![],
        );

        let ctx = MergeContext::new(&rp.subpasses, 0);
        assert!(ctx.depth.is_some());
        assert!(ctx.stencil.is_none());
        assert!(can_merge_next(&rp, &ctx, 8).is_none());
    }

    #[test]
    fn no_tile_buffer() {
        let rp = render_pass(
            None,
            vec![attachment(Format::R8G8B8A8_UNORM, SampleCount::Sample1)],
            vec![writes(&[0]), reads(&[0], &[0])],
            vec![local(0, 1)],
        );

        assert_eq!(rp.regions(), [0..1, 1..2]);
        assert_eq!(plan(&rp, &test_device(None), 1 << 16).groups.len(), 1);
    }

    #[test]
    fn more_colors_than_slots() {
        let device = DeviceLimits {
            max_color_attachments: 9,
            ..test_device(Some(1 << 20))
        };
        let all: Vec<u32> = (0..9).collect();
        let create = |subpasses| {
            RenderPass::new(
                &device,
                RenderPassCreateInfo {
                    attachments: (0..9)
                        .map(|_| attachment(Format::R8G8B8A8_UNORM, SampleCount::Sample1))
                        .collect(),
                    subpasses,
                    dependencies: vec![local(0, 1)],
                    ..Default::default()
                },
            )
            .unwrap()
        };

        // Nine colors, then a subpass that reads one of them back.
        let rp = create(vec![writes(&all), reads(&[0], &[0])]);
        assert_eq!(rp.regions(), [0..1, 1..2]);
        assert_eq!(rp.subpasses()[0].merge_state(), SubpassMergeState::NotMerged);
        assert_eq!(rp.targets(0).colors().len(), 9);

        let ctx = MergeContext::new(&rp.subpasses, 0);
        assert!(can_merge_next(&rp, &ctx, 9).is_none());

        // The same with the nine colors on the second subpass.
        let rp = create(vec![writes(&[0]), reads(&[0], &all)]);
        assert_eq!(rp.regions(), [0..1, 1..2]);
        assert_eq!(rp.subpasses()[1].merge_state(), SubpassMergeState::NotMerged);
        assert_eq!(rp.targets(1).colors().len(), 9);
    }

    #[test]
    fn unused_color_before_used_one() {
        let rp = render_pass(
            None,
            vec![
                attachment(Format::R8G8B8A8_UNORM, SampleCount::Sample1),
                attachment(Format::R8G8B8A8_UNORM, SampleCount::Sample1),
            ],
            vec![
                writes(&[0]),
                SubpassDescription {
                    color_attachments: vec![
                        None,
                        reference(1, ImageLayout::ColorAttachmentOptimal),
                    ],
                    ..reads(&[0], &[])
                },
            ],
            vec![local(0, 1)],
        );

        let ctx = MergeContext::new(&rp.subpasses, 0);
        let ctx = can_merge_next(&rp, &ctx, 8).unwrap();
        assert_eq!(ctx.used_color_mask(), 0b11);

        let slot = ctx.colors[1].unwrap();
        assert_eq!((slot.subpass, slot.index, slot.access_count), (1, 1, 1));

        // Only one free slot is left below the limit.
        let ctx = MergeContext::new(&rp.subpasses, 0);
        assert!(can_merge_next(&rp, &ctx, 1).is_none());
    }
}
