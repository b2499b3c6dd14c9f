// Copyright (c) 2025 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Helpers shared by the unit tests.

use crate::{
    command_buffer::{RenderingCommands, RenderingInfo},
    device::DeviceLimits,
    format::Format,
    image::{ImageSubresourceRange, ImageUsage, ImageView, ImageViewCreateInfo, SampleCount},
    sync::DependencyInfo,
    Handle,
};
use ash::vk;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// Handles are never dereferenced, they only need to be distinct.
static NEXT_HANDLE: AtomicU64 = AtomicU64::new(0x1000);

fn next_handle() -> u64 {
    NEXT_HANDLE.fetch_add(1, Ordering::Relaxed)
}

/// A command that was recorded into [`RecordingCommands`].
#[derive(Clone, Debug)]
pub(crate) enum Command {
    Begin(RenderingInfo),
    End,
    Barrier(DependencyInfo),
}

/// A command buffer that remembers what was recorded into it.
#[derive(Debug, Default)]
pub(crate) struct RecordingCommands {
    pub(crate) commands: Vec<Command>,
}

impl RenderingCommands for RecordingCommands {
    fn begin_rendering(&mut self, rendering_info: &RenderingInfo) {
        self.commands.push(Command::Begin(rendering_info.clone()));
    }

    fn end_rendering(&mut self) {
        self.commands.push(Command::End);
    }

    fn pipeline_barrier(&mut self, dependency_info: &DependencyInfo) {
        self.commands.push(Command::Barrier(dependency_info.clone()));
    }
}

/// Returns the limits of a device, with a tile buffer of `tile_buffer_size` bytes.
pub(crate) fn test_device(tile_buffer_size: Option<u32>) -> DeviceLimits {
    DeviceLimits {
        tile_buffer_size,
        ..Default::default()
    }
}

fn view(
    format: Format,
    samples: SampleCount,
    usage: ImageUsage,
    extent: [u32; 2],
) -> Arc<ImageView> {
    ImageView::new(
        vk::ImageView::from_raw(next_handle()),
        vk::Image::from_raw(next_handle()),
        ImageViewCreateInfo {
            format,
            samples,
            usage,
            extent: [extent[0], extent[1], 1],
            subresource_range: ImageSubresourceRange {
                aspects: format.aspects(),
                mip_levels: 0..1,
                array_layers: 0..1,
            },
            ..Default::default()
        },
    )
}

/// Returns a single-layer view of a new color image.
pub(crate) fn color_view(
    format: Format,
    samples: SampleCount,
    extent: [u32; 2],
) -> Arc<ImageView> {
    view(
        format,
        samples,
        ImageUsage::COLOR_ATTACHMENT | ImageUsage::INPUT_ATTACHMENT,
        extent,
    )
}

/// Returns a single-layer view of a new depth/stencil image.
pub(crate) fn depth_stencil_view(
    format: Format,
    samples: SampleCount,
    extent: [u32; 2],
) -> Arc<ImageView> {
    view(
        format,
        samples,
        ImageUsage::DEPTH_STENCIL_ATTACHMENT | ImageUsage::INPUT_ATTACHMENT,
        extent,
    )
}
