// Copyright (c) 2025 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Synchronization primitives emitted while recording a render pass.
//!
//! All barriers use the synchronization2 flag types, so 64-bit stage and access masks are
//! available everywhere.

use crate::image::{ImageLayout, ImageSubresourceRange, SampleLocationsInfo};
use ash::vk;
use smallvec::SmallVec;
use std::sync::Arc;

vulkan_bitflags! {
    /// A set of stages in the device pipeline.
    PipelineStages = PipelineStageFlags2(u64);

    TOP_OF_PIPE = TOP_OF_PIPE,
    DRAW_INDIRECT = DRAW_INDIRECT,
    VERTEX_INPUT = VERTEX_INPUT,
    VERTEX_SHADER = VERTEX_SHADER,
    FRAGMENT_SHADER = FRAGMENT_SHADER,
    EARLY_FRAGMENT_TESTS = EARLY_FRAGMENT_TESTS,
    LATE_FRAGMENT_TESTS = LATE_FRAGMENT_TESTS,
    COLOR_ATTACHMENT_OUTPUT = COLOR_ATTACHMENT_OUTPUT,
    COMPUTE_SHADER = COMPUTE_SHADER,
    ALL_TRANSFER = ALL_TRANSFER,
    BOTTOM_OF_PIPE = BOTTOM_OF_PIPE,
    HOST = HOST,
    ALL_GRAPHICS = ALL_GRAPHICS,
    ALL_COMMANDS = ALL_COMMANDS,
    FRAGMENT_SHADING_RATE_ATTACHMENT = FRAGMENT_SHADING_RATE_ATTACHMENT_KHR,
    FRAGMENT_DENSITY_PROCESS = FRAGMENT_DENSITY_PROCESS_EXT,
}

vulkan_bitflags! {
    /// A set of memory access types that are included in a memory dependency.
    AccessFlags = AccessFlags2(u64);

    INDIRECT_COMMAND_READ = INDIRECT_COMMAND_READ,
    INDEX_READ = INDEX_READ,
    VERTEX_ATTRIBUTE_READ = VERTEX_ATTRIBUTE_READ,
    UNIFORM_READ = UNIFORM_READ,
    INPUT_ATTACHMENT_READ = INPUT_ATTACHMENT_READ,
    SHADER_READ = SHADER_READ,
    SHADER_WRITE = SHADER_WRITE,
    COLOR_ATTACHMENT_READ = COLOR_ATTACHMENT_READ,
    COLOR_ATTACHMENT_WRITE = COLOR_ATTACHMENT_WRITE,
    DEPTH_STENCIL_ATTACHMENT_READ = DEPTH_STENCIL_ATTACHMENT_READ,
    DEPTH_STENCIL_ATTACHMENT_WRITE = DEPTH_STENCIL_ATTACHMENT_WRITE,
    TRANSFER_READ = TRANSFER_READ,
    TRANSFER_WRITE = TRANSFER_WRITE,
    HOST_READ = HOST_READ,
    HOST_WRITE = HOST_WRITE,
    MEMORY_READ = MEMORY_READ,
    MEMORY_WRITE = MEMORY_WRITE,
}

vulkan_bitflags! {
    /// Flags that modify how execution and memory dependencies are formed.
    DependencyFlags = DependencyFlags(u32);

    /// For framebuffer-space pipeline stages, the dependency is per framebuffer region instead
    /// of covering the whole framebuffer.
    BY_REGION = BY_REGION,

    DEVICE_GROUP = DEVICE_GROUP,

    /// For multiview render passes, the dependency is between corresponding views of the source
    /// and destination subpasses, offset by the dependency's view offset.
    VIEW_LOCAL = VIEW_LOCAL,
}

/// Dependency info for barriers in a pipeline barrier command.
#[derive(Clone, Debug, Default)]
pub struct DependencyInfo {
    /// Flags to modify how the execution and memory dependencies are formed.
    pub dependency_flags: DependencyFlags,

    /// Memory barriers for global operations and accesses, not limited to a single resource.
    pub memory_barriers: SmallVec<[MemoryBarrier; 1]>,

    /// Memory barriers for individual images.
    pub image_memory_barriers: SmallVec<[ImageMemoryBarrier; 8]>,
}

impl DependencyInfo {
    /// Returns `true` if `self` doesn't contain any barriers.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.memory_barriers.is_empty() && self.image_memory_barriers.is_empty()
    }
}

/// A memory barrier that is applied globally.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryBarrier {
    /// The pipeline stages in the source scope to wait for.
    pub src_stages: PipelineStages,

    /// The memory accesses in the source scope to make available and visible.
    pub src_access: AccessFlags,

    /// The pipeline stages in the destination scope that must wait for `src_stages`.
    pub dst_stages: PipelineStages,

    /// The memory accesses in the destination scope that must wait for `src_access` to be made
    /// available and visible.
    pub dst_access: AccessFlags,
}

impl MemoryBarrier {
    /// Widens `self` so that it also covers `other`.
    #[inline]
    pub fn merge(&mut self, other: &MemoryBarrier) {
        self.src_stages |= other.src_stages;
        self.src_access |= other.src_access;
        self.dst_stages |= other.dst_stages;
        self.dst_access |= other.dst_access;
    }
}

impl From<MemoryBarrier> for vk::MemoryBarrier2<'static> {
    #[inline]
    fn from(val: MemoryBarrier) -> Self {
        vk::MemoryBarrier2::default()
            .src_stage_mask(val.src_stages.into())
            .src_access_mask(val.src_access.into())
            .dst_stage_mask(val.dst_stages.into())
            .dst_access_mask(val.dst_access.into())
    }
}

/// A memory barrier that is applied to a single image, and that may transition its layout.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageMemoryBarrier {
    pub src_stages: PipelineStages,
    pub src_access: AccessFlags,
    pub dst_stages: PipelineStages,
    pub dst_access: AccessFlags,

    /// The layout that the image is transitioned from.
    pub old_layout: ImageLayout,

    /// The layout that the image is transitioned to.
    pub new_layout: ImageLayout,

    /// The image to apply the barrier to.
    pub image: vk::Image,

    /// The subresources of `image` to apply the barrier to.
    pub subresource_range: ImageSubresourceRange,

    /// The sample locations that the transition must use, for depth/stencil images that were
    /// created with custom sample location support.
    pub sample_locations: Option<Arc<SampleLocationsInfo>>,
}

#[cfg(test)]
mod tests {
    use super::{AccessFlags, MemoryBarrier, PipelineStages};

    #[test]
    fn merge_barriers() {
        let mut barrier = MemoryBarrier {
            src_stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            src_access: AccessFlags::COLOR_ATTACHMENT_WRITE,
            ..Default::default()
        };
        barrier.merge(&MemoryBarrier {
            dst_stages: PipelineStages::FRAGMENT_SHADER,
            dst_access: AccessFlags::INPUT_ATTACHMENT_READ,
            ..Default::default()
        });

        assert_eq!(barrier.src_stages, PipelineStages::COLOR_ATTACHMENT_OUTPUT);
        assert_eq!(barrier.dst_stages, PipelineStages::FRAGMENT_SHADER);
        assert_eq!(barrier.dst_access, AccessFlags::INPUT_ATTACHMENT_READ);
        assert_eq!(
            format!("{:?}", barrier.src_access | AccessFlags::SHADER_READ),
            "SHADER_READ | COLOR_ATTACHMENT_WRITE",
        );
    }
}
