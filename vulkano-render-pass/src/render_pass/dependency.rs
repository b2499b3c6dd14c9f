// Copyright (c) 2025 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Properties of subpass dependencies, and the stages and accesses implied by image layouts.

use super::SubpassDependency;
use crate::{
    image::{ImageAspects, ImageLayout},
    sync::{AccessFlags, DependencyFlags, MemoryBarrier, PipelineStages},
};

/// The stages that a framebuffer-local dependency may wait on.
const FRAMEBUFFER_SPACE_SRC_STAGES: PipelineStages = PipelineStages::FRAGMENT_SHADER
    .union(PipelineStages::EARLY_FRAGMENT_TESTS)
    .union(PipelineStages::LATE_FRAGMENT_TESTS)
    .union(PipelineStages::COLOR_ATTACHMENT_OUTPUT)
    .union(PipelineStages::TOP_OF_PIPE);

/// The stages that a framebuffer-local dependency may block.
const FRAMEBUFFER_SPACE_DST_STAGES: PipelineStages = PipelineStages::FRAGMENT_SHADER
    .union(PipelineStages::EARLY_FRAGMENT_TESTS)
    .union(PipelineStages::LATE_FRAGMENT_TESTS)
    .union(PipelineStages::COLOR_ATTACHMENT_OUTPUT)
    .union(PipelineStages::BOTTOM_OF_PIPE);

/// The dependency from commands before the render pass into its first subpass, that exists even
/// if the render pass doesn't declare one.
pub(crate) const IMPLICIT_EXTERNAL_ENTRY: MemoryBarrier = MemoryBarrier {
    src_stages: PipelineStages::empty(),
    src_access: AccessFlags::empty(),
    dst_stages: PipelineStages::ALL_COMMANDS,
    dst_access: AccessFlags::INPUT_ATTACHMENT_READ
        .union(AccessFlags::COLOR_ATTACHMENT_READ)
        .union(AccessFlags::COLOR_ATTACHMENT_WRITE)
        .union(AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ)
        .union(AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE),
};

/// The dependency from the last subpass to commands after the render pass, that exists even if
/// the render pass doesn't declare one.
pub(crate) const IMPLICIT_EXTERNAL_EXIT: MemoryBarrier = MemoryBarrier {
    src_stages: PipelineStages::ALL_COMMANDS,
    src_access: AccessFlags::COLOR_ATTACHMENT_WRITE
        .union(AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE),
    dst_stages: PipelineStages::empty(),
    dst_access: AccessFlags::empty(),
};

impl SubpassDependency {
    /// Returns the memory barrier that this dependency describes.
    #[inline]
    pub(crate) fn barrier(&self) -> MemoryBarrier {
        MemoryBarrier {
            src_stages: self.src_stages,
            src_access: self.src_access,
            dst_stages: self.dst_stages,
            dst_access: self.dst_access,
        }
    }

    /// Returns the dependency with its memory barrier override, if any, folded into the stage
    /// and access masks.
    pub(crate) fn normalized(&self) -> SubpassDependency {
        let mut dependency = *self;

        if let Some(barrier) = dependency.memory_barrier.take() {
            dependency.src_stages = barrier.src_stages;
            dependency.dst_stages = barrier.dst_stages;
            dependency.src_access = barrier.src_access;
            dependency.dst_access = barrier.dst_access;
        }

        dependency
    }

    /// Returns whether the dependency can be satisfied without leaving a rendering region.
    ///
    /// External dependencies are always considered local, since they never separate two subpasses
    /// of the same region.
    pub fn is_framebuffer_local(&self) -> bool {
        if self.src_subpass.is_none() || self.dst_subpass.is_none() {
            return true;
        }

        FRAMEBUFFER_SPACE_SRC_STAGES.contains(self.src_stages)
            && FRAMEBUFFER_SPACE_DST_STAGES.contains(self.dst_stages)
            && self.dependency_flags.intersects(DependencyFlags::BY_REGION)
    }

    /// Returns whether a view-local dependency has any views in common between a source subpass
    /// with `src_view_mask` and a destination subpass with `dst_view_mask`.
    ///
    /// Always returns `true` for dependencies that aren't view-local.
    pub(crate) fn views_intersect(&self, src_view_mask: u32, dst_view_mask: u32) -> bool {
        if !self.dependency_flags.intersects(DependencyFlags::VIEW_LOCAL) {
            return true;
        }

        // Destination view `d` depends on source view `d + view_offset`.
        let shifted = if self.view_offset >= 0 {
            dst_view_mask.checked_shl(self.view_offset as u32)
        } else {
            dst_view_mask.checked_shr(self.view_offset.unsigned_abs())
        };

        src_view_mask & shifted.unwrap_or(0) != 0
    }
}

/// Returns the pipeline stages and memory accesses that can touch `aspects` of an image while it
/// is in `layout`.
pub(crate) fn stage_access_for_layout(
    layout: ImageLayout,
    aspects: ImageAspects,
) -> (PipelineStages, AccessFlags) {
    let mut stages = PipelineStages::empty();
    let mut access = AccessFlags::empty();

    if layout.supports_input_attachment() {
        stages |= PipelineStages::FRAGMENT_SHADER;
        access |= AccessFlags::INPUT_ATTACHMENT_READ;
    }

    let writable = !layout.are_all_aspects_read_only(aspects);

    if aspects.intersects(ImageAspects::DEPTH | ImageAspects::STENCIL) {
        stages |= PipelineStages::EARLY_FRAGMENT_TESTS | PipelineStages::LATE_FRAGMENT_TESTS;
        access |= AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ;

        if writable {
            // The attachment may also be a resolve target.
            stages |= PipelineStages::ALL_TRANSFER;
            access |= AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE | AccessFlags::TRANSFER_WRITE;
        }
    } else if writable {
        stages |= PipelineStages::COLOR_ATTACHMENT_OUTPUT | PipelineStages::ALL_TRANSFER;
        access |= AccessFlags::COLOR_ATTACHMENT_READ
            | AccessFlags::COLOR_ATTACHMENT_WRITE
            | AccessFlags::TRANSFER_WRITE;
    }

    (stages, access)
}

#[cfg(test)]
mod tests {
    use super::{stage_access_for_layout, IMPLICIT_EXTERNAL_ENTRY};
    use crate::{
        image::{ImageAspects, ImageLayout},
        render_pass::SubpassDependency,
        sync::{AccessFlags, DependencyFlags, MemoryBarrier, PipelineStages},
    };

    fn local_dependency() -> SubpassDependency {
        SubpassDependency {
            src_subpass: Some(0),
            dst_subpass: Some(1),
            src_stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            dst_stages: PipelineStages::FRAGMENT_SHADER,
            src_access: AccessFlags::COLOR_ATTACHMENT_WRITE,
            dst_access: AccessFlags::INPUT_ATTACHMENT_READ,
            dependency_flags: DependencyFlags::BY_REGION,
            ..Default::default()
        }
    }

    #[test]
    fn framebuffer_local() {
        assert!(local_dependency().is_framebuffer_local());

        let dependency = SubpassDependency {
            dependency_flags: DependencyFlags::empty(),
            ..local_dependency()
        };
        assert!(!dependency.is_framebuffer_local());

        let dependency = SubpassDependency {
            dst_stages: PipelineStages::VERTEX_SHADER,
            ..local_dependency()
        };
        assert!(!dependency.is_framebuffer_local());

        // `BOTTOM_OF_PIPE` is only allowed on the destination side.
        let dependency = SubpassDependency {
            src_stages: PipelineStages::BOTTOM_OF_PIPE,
            ..local_dependency()
        };
        assert!(!dependency.is_framebuffer_local());

        let dependency = SubpassDependency {
            src_subpass: None,
            dependency_flags: DependencyFlags::empty(),
            src_stages: PipelineStages::ALL_COMMANDS,
            ..local_dependency()
        };
        assert!(dependency.is_framebuffer_local());
    }

    #[test]
    fn memory_barrier_override() {
        let dependency = SubpassDependency {
            memory_barrier: Some(MemoryBarrier {
                src_stages: PipelineStages::LATE_FRAGMENT_TESTS,
                src_access: AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                dst_stages: PipelineStages::FRAGMENT_SHADER,
                dst_access: AccessFlags::SHADER_READ,
            }),
            ..local_dependency()
        }
        .normalized();

        assert!(dependency.memory_barrier.is_none());
        assert_eq!(dependency.src_stages, PipelineStages::LATE_FRAGMENT_TESTS);
        assert_eq!(dependency.dst_access, AccessFlags::SHADER_READ);
        assert_eq!(dependency.dependency_flags, DependencyFlags::BY_REGION);
    }

    #[test]
    fn view_local_offsets() {
        let dependency = SubpassDependency {
            dependency_flags: DependencyFlags::VIEW_LOCAL,
            view_offset: 1,
            ..local_dependency()
        };

        // Destination view 0 reads source view 1.
        assert!(dependency.views_intersect(0b10, 0b01));
        assert!(!dependency.views_intersect(0b01, 0b01));

        let dependency = SubpassDependency {
            view_offset: -1,
            ..dependency
        };
        assert!(dependency.views_intersect(0b01, 0b10));
        assert!(!dependency.views_intersect(0b10, 0b10));

        assert!(local_dependency().views_intersect(0b01, 0b10));
    }

    #[test]
    fn layout_stages() {
        let (stages, access) =
            stage_access_for_layout(ImageLayout::ColorAttachmentOptimal, ImageAspects::COLOR);
        assert_eq!(
            stages,
            PipelineStages::COLOR_ATTACHMENT_OUTPUT | PipelineStages::ALL_TRANSFER,
        );
        assert!(access.contains(AccessFlags::COLOR_ATTACHMENT_WRITE));
        assert!(!access.intersects(AccessFlags::INPUT_ATTACHMENT_READ));

        let (stages, access) =
            stage_access_for_layout(ImageLayout::ShaderReadOnlyOptimal, ImageAspects::COLOR);
        assert_eq!(stages, PipelineStages::FRAGMENT_SHADER);
        assert_eq!(access, AccessFlags::INPUT_ATTACHMENT_READ);

        let depth_stencil = ImageAspects::DEPTH | ImageAspects::STENCIL;
        let (stages, access) =
            stage_access_for_layout(ImageLayout::DepthStencilReadOnlyOptimal, depth_stencil);
        assert!(stages.contains(PipelineStages::EARLY_FRAGMENT_TESTS));
        assert!(!stages.intersects(PipelineStages::ALL_TRANSFER));
        assert!(!access.intersects(AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE));

        let (_, access) = stage_access_for_layout(
            ImageLayout::DepthReadOnlyStencilAttachmentOptimal,
            depth_stencil,
        );
        assert!(access.contains(AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE));

        let (stages, access) = stage_access_for_layout(ImageLayout::Undefined, ImageAspects::COLOR);
        assert!(stages.is_empty());
        assert!(access.is_empty());
    }

    #[test]
    fn implicit_entry_is_destination_only() {
        assert!(IMPLICIT_EXTERNAL_ENTRY.src_stages.is_empty());
        assert_eq!(IMPLICIT_EXTERNAL_ENTRY.dst_stages, PipelineStages::ALL_COMMANDS);
    }
}
