//! Depth buffer management.
//!
//! The depth image lives in device-local memory chosen explicitly through
//! [`DeviceMemory`]; its format is the first candidate the adapter supports
//! as an optimally tiled depth attachment.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use meshview_rhi::device::Device;
use meshview_rhi::instance::Instance;
use meshview_rhi::memory::DeviceMemory;
use meshview_rhi::{RhiError, RhiResult};

/// Depth-only formats in order of preference.
///
/// `D16_UNORM` is always supported as a depth attachment, so the search
/// only fails on a non-conformant driver.
pub const DEPTH_FORMAT_CANDIDATES: [vk::Format; 3] = [
    vk::Format::D32_SFLOAT,
    vk::Format::X8_D24_UNORM_PACK32,
    vk::Format::D16_UNORM,
];

/// Returns the first candidate whose optimal-tiling features include depth attachment.
pub fn choose_depth_format(
    candidates: &[vk::Format],
    optimal_features: impl Fn(vk::Format) -> vk::FormatFeatureFlags,
) -> Option<vk::Format> {
    candidates.iter().copied().find(|&format| {
        optimal_features(format).contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
    })
}

/// Queries the adapter and picks a depth format from [`DEPTH_FORMAT_CANDIDATES`].
pub fn find_depth_format(instance: &Instance, device: &Device) -> RhiResult<vk::Format> {
    choose_depth_format(&DEPTH_FORMAT_CANDIDATES, |format| unsafe {
        instance
            .handle()
            .get_physical_device_format_properties(device.physical_device(), format)
            .optimal_tiling_features
    })
    .ok_or(RhiError::NoSuitableDepthFormat)
}

/// Depth image, its memory and a depth-aspect view.
///
/// Drop order: view, image, then memory.
pub struct DepthBuffer {
    device: Arc<Device>,
    image: vk::Image,
    image_view: vk::ImageView,
    // Declared after the handles so it is freed last.
    _memory: DeviceMemory,
    format: vk::Format,
    extent: vk::Extent2D,
}

impl DepthBuffer {
    /// Creates a depth buffer of `extent` in `format`.
    pub fn new(device: Arc<Device>, extent: vk::Extent2D, format: vk::Format) -> RhiResult<Self> {
        if extent.width == 0 || extent.height == 0 {
            return Err(RhiError::InvalidHandle(
                "Depth buffer dimensions must be greater than 0".to_string(),
            ));
        }

        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = unsafe { device.handle().create_image(&image_info, None)? };

        let memory = match Self::allocate_and_bind(&device, image) {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.handle().destroy_image(image, None) };
                return Err(e);
            }
        };

        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::DEPTH)
                    .level_count(1)
                    .layer_count(1),
            );

        let image_view = match unsafe { device.handle().create_image_view(&view_info, None) } {
            Ok(view) => view,
            Err(e) => {
                unsafe { device.handle().destroy_image(image, None) };
                return Err(e.into());
            }
        };

        info!(
            "Created depth buffer: {}x{} ({:?})",
            extent.width, extent.height, format
        );

        Ok(Self {
            device,
            image,
            image_view,
            _memory: memory,
            format,
            extent,
        })
    }

    fn allocate_and_bind(device: &Arc<Device>, image: vk::Image) -> RhiResult<DeviceMemory> {
        let requirements = unsafe { device.handle().get_image_memory_requirements(image) };
        let memory = DeviceMemory::allocate(
            device.clone(),
            requirements,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;
        unsafe {
            device
                .handle()
                .bind_image_memory(image, memory.handle(), 0)?;
        }
        Ok(memory)
    }

    #[inline]
    pub fn image_view(&self) -> vk::ImageView {
        self.image_view
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }
}

impl Drop for DepthBuffer {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_image_view(self.image_view, None);
            self.device.handle().destroy_image(self.image, None);
        }
        debug!(
            "Destroyed depth buffer: {}x{}",
            self.extent.width, self.extent.height
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_candidate_is_depth_only() {
        assert_eq!(DEPTH_FORMAT_CANDIDATES[0], vk::Format::D32_SFLOAT);
    }

    #[test]
    fn test_no_candidate_carries_stencil() {
        for format in DEPTH_FORMAT_CANDIDATES {
            assert!(
                !matches!(
                    format,
                    vk::Format::S8_UINT
                        | vk::Format::D16_UNORM_S8_UINT
                        | vk::Format::D24_UNORM_S8_UINT
                        | vk::Format::D32_SFLOAT_S8_UINT
                ),
                "{format:?} has a stencil aspect"
            );
        }
    }

    #[test]
    fn test_choose_depth_format_prefers_first_supported() {
        let chosen = choose_depth_format(&DEPTH_FORMAT_CANDIDATES, |format| {
            if format == vk::Format::D32_SFLOAT {
                vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT
                    | vk::FormatFeatureFlags::SAMPLED_IMAGE
            } else {
                vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT
            }
        });
        assert_eq!(chosen, Some(vk::Format::D32_SFLOAT));
    }

    #[test]
    fn test_choose_depth_format_skips_unsupported() {
        let chosen = choose_depth_format(&DEPTH_FORMAT_CANDIDATES, |format| {
            if format == vk::Format::X8_D24_UNORM_PACK32 {
                vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT
            } else {
                vk::FormatFeatureFlags::SAMPLED_IMAGE
            }
        });
        assert_eq!(chosen, Some(vk::Format::X8_D24_UNORM_PACK32));
    }

    #[test]
    fn test_choose_depth_format_none_supported() {
        let chosen =
            choose_depth_format(&DEPTH_FORMAT_CANDIDATES, |_| vk::FormatFeatureFlags::empty());
        assert_eq!(chosen, None);
    }
}
