//! Physical device (GPU) selection.
//!
//! A candidate is suitable when it has:
//! 1. a queue family with graphics support and one that can present to the
//!    surface (the same family or two different ones),
//! 2. every required device extension (`VK_KHR_swapchain`),
//! 3. at least one surface format and one present mode.
//!
//! Among suitable candidates discrete GPUs are preferred. A candidate whose
//! capability queries fail is skipped like an unsuitable one.

use std::ffi::CStr;

use ash::vk;
use tracing::{debug, info, warn};

use crate::error::{RhiError, RhiResult};
use crate::instance::{find_missing, fixed_array_name};
use crate::surface::Surface;
use crate::swapchain::SwapchainSupportDetails;

/// Device extensions every candidate must support.
pub const REQUIRED_DEVICE_EXTENSIONS: &[&CStr] = &[ash::khr::swapchain::NAME];

/// Queue family search state while scanning a device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    /// Index of the queue family that supports graphics operations.
    pub graphics_family: Option<u32>,
    /// Index of the queue family that supports presentation to a surface.
    pub present_family: Option<u32>,
}

impl QueueFamilyIndices {
    /// Checks if both graphics and present families were found.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.graphics_family.is_some() && self.present_family.is_some()
    }

    /// The resolved families, once both roles are filled.
    pub fn resolve(&self) -> Option<QueueFamilies> {
        match (self.graphics_family, self.present_family) {
            (Some(graphics), Some(present)) => Some(QueueFamilies { graphics, present }),
            _ => None,
        }
    }
}

/// Graphics and present family indices of the selected device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueFamilies {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilies {
    /// Deduplicated family list; each entry gets one logical queue.
    pub fn unique(&self) -> Vec<u32> {
        if self.graphics == self.present {
            vec![self.graphics]
        } else {
            vec![self.graphics, self.present]
        }
    }
}

/// Information about the selected physical device.
#[derive(Clone)]
pub struct PhysicalDeviceInfo {
    /// Vulkan physical device handle.
    pub device: vk::PhysicalDevice,
    /// Device properties (name, limits, API version, etc.).
    pub properties: vk::PhysicalDeviceProperties,
    /// Memory properties (heap sizes, memory types).
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    /// Graphics and present queue families.
    pub queue_families: QueueFamilies,
}

impl PhysicalDeviceInfo {
    /// Returns the device name as a string.
    pub fn device_name(&self) -> std::borrow::Cow<'_, str> {
        fixed_array_name(&self.properties.device_name).to_string_lossy()
    }

    /// Returns a human-readable string for the device type.
    pub fn device_type_name(&self) -> &'static str {
        device_type_name(self.properties.device_type)
    }

    /// Returns the Vulkan API version supported by the device.
    pub fn api_version(&self) -> (u32, u32, u32) {
        let version = self.properties.api_version;
        (
            vk::api_version_major(version),
            vk::api_version_minor(version),
            vk::api_version_patch(version),
        )
    }
}

impl std::fmt::Debug for PhysicalDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (major, minor, patch) = self.api_version();
        f.debug_struct("PhysicalDeviceInfo")
            .field("name", &self.device_name())
            .field("type", &self.device_type_name())
            .field("api_version", &format!("{}.{}.{}", major, minor, patch))
            .field("queue_families", &self.queue_families)
            .finish()
    }
}

/// Selects the most suitable physical device for rendering to `surface`.
///
/// With `print_diagnostics` set, every candidate is logged along with the
/// reason it was skipped.
///
/// # Errors
///
/// Returns the Vulkan error if devices cannot be enumerated, and
/// [`RhiError::NoSuitableGpu`] if no candidate satisfies the queue,
/// extension and swapchain requirements.
pub fn select_physical_device(
    instance: &ash::Instance,
    surface: &Surface,
    print_diagnostics: bool,
) -> RhiResult<PhysicalDeviceInfo> {
    let devices = unsafe { instance.enumerate_physical_devices()? };

    if devices.is_empty() {
        warn!("No Vulkan-capable GPUs found");
        return Err(RhiError::NoSuitableGpu);
    }

    info!("Found {} GPU(s)", devices.len());

    let mut best: Option<(PhysicalDeviceInfo, u32)> = None;

    for device in devices {
        let Some(info) = check_device_suitability(instance, device, surface, print_diagnostics)
        else {
            continue;
        };
        let score = rate_device_type(info.properties.device_type);
        if print_diagnostics {
            info!(
                "Found suitable device: {} ({})",
                info.device_name(),
                info.device_type_name()
            );
        }
        if best.as_ref().is_none_or(|(_, best_score)| score > *best_score) {
            best = Some((info, score));
        }
    }

    let Some((selected, _)) = best else {
        warn!("No suitable GPU found with required capabilities");
        return Err(RhiError::NoSuitableGpu);
    };

    let (major, minor, patch) = selected.api_version();
    info!(
        "Selected GPU: '{}' ({}) - Vulkan {}.{}.{}, graphics family {}, present family {}",
        selected.device_name(),
        selected.device_type_name(),
        major,
        minor,
        patch,
        selected.queue_families.graphics,
        selected.queue_families.present
    );

    Ok(selected)
}

/// Returns `Some` if `device` meets every requirement and answered every query.
fn check_device_suitability(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: &Surface,
    print_diagnostics: bool,
) -> Option<PhysicalDeviceInfo> {
    let properties = unsafe { instance.get_physical_device_properties(device) };
    let device_name = fixed_array_name(&properties.device_name).to_string_lossy();

    if print_diagnostics {
        info!(
            "Candidate device: {} ({})",
            device_name,
            device_type_name(properties.device_type)
        );
    }

    let indices = query_or_skip(
        &device_name,
        "queue family",
        find_queue_families(instance, device, surface),
    )?;
    let Some(queue_families) = indices.resolve() else {
        debug!(
            "GPU '{}' skipped: missing queue families (graphics={}, present={})",
            device_name,
            indices.graphics_family.is_some(),
            indices.present_family.is_some()
        );
        return None;
    };

    let available = query_or_skip(&device_name, "device extension", unsafe {
        instance.enumerate_device_extension_properties(device)
    })?;
    let available_names: Vec<&CStr> = available
        .iter()
        .map(|ext| fixed_array_name(&ext.extension_name))
        .collect();
    if let Some(missing) = find_missing(REQUIRED_DEVICE_EXTENSIONS, &available_names) {
        debug!(
            "GPU '{}' skipped: device extension {} not supported",
            device_name,
            missing.to_string_lossy()
        );
        return None;
    }

    let support = query_or_skip(
        &device_name,
        "swapchain support",
        SwapchainSupportDetails::query(device, surface.handle(), surface.loader()),
    )?;
    if !support.is_adequate() {
        debug!("GPU '{}' skipped: inadequate swapchain support", device_name);
        return None;
    }

    let memory_properties = unsafe { instance.get_physical_device_memory_properties(device) };

    Some(PhysicalDeviceInfo {
        device,
        properties,
        memory_properties,
        queue_families,
    })
}

/// Turns a failed per-candidate query into a skip, logged at debug level.
fn query_or_skip<T, E: std::fmt::Display>(
    device_name: &str,
    query: &str,
    result: Result<T, E>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("GPU '{}' skipped: {} query failed: {}", device_name, query, e);
            None
        }
    }
}

/// Scans the queue families of `device` for graphics and present support.
fn find_queue_families(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: &Surface,
) -> RhiResult<QueueFamilyIndices> {
    let families = unsafe { instance.get_physical_device_queue_family_properties(device) };

    let mut present_support = Vec::with_capacity(families.len());
    for i in 0..families.len() as u32 {
        let supported = unsafe {
            surface
                .loader()
                .get_physical_device_surface_support(device, i, surface.handle())?
        };
        present_support.push(supported);
    }

    Ok(pick_queue_families(&families, &present_support))
}

/// Picks graphics and present families from queried properties.
///
/// A family offering both roles is preferred so that a single queue can be
/// used; otherwise the first family for each role is taken.
pub fn pick_queue_families(
    families: &[vk::QueueFamilyProperties],
    present_support: &[bool],
) -> QueueFamilyIndices {
    let mut indices = QueueFamilyIndices::default();

    for (i, family) in families.iter().enumerate() {
        if family.queue_count == 0 {
            continue;
        }
        let i = i as u32;
        let graphics = family.queue_flags.contains(vk::QueueFlags::GRAPHICS);
        let present = present_support.get(i as usize).copied().unwrap_or(false);

        if graphics && present {
            return QueueFamilyIndices {
                graphics_family: Some(i),
                present_family: Some(i),
            };
        }
        if graphics && indices.graphics_family.is_none() {
            indices.graphics_family = Some(i);
        }
        if present && indices.present_family.is_none() {
            indices.present_family = Some(i);
        }
    }

    indices
}

fn device_type_name(device_type: vk::PhysicalDeviceType) -> &'static str {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => "Discrete GPU",
        vk::PhysicalDeviceType::INTEGRATED_GPU => "Integrated GPU",
        vk::PhysicalDeviceType::VIRTUAL_GPU => "Virtual GPU",
        vk::PhysicalDeviceType::CPU => "CPU",
        _ => "Other",
    }
}

fn rate_device_type(device_type: vk::PhysicalDeviceType) -> u32 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 1000,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 100,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 10,
        vk::PhysicalDeviceType::CPU => 1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_query_skips_the_candidate() {
        let failed: Result<u32, vk::Result> = Err(vk::Result::ERROR_SURFACE_LOST_KHR);
        assert_eq!(query_or_skip("gpu0", "swapchain support", failed), None);

        let failed: RhiResult<u32> = Err(RhiError::NoSuitableGpu);
        assert_eq!(query_or_skip("gpu0", "queue family", failed), None);

        assert_eq!(query_or_skip::<_, vk::Result>("gpu1", "device extension", Ok(7)), Some(7));
    }

    fn family(flags: vk::QueueFlags, count: u32) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: count,
            ..Default::default()
        }
    }

    #[test]
    fn test_queue_family_indices_default() {
        let indices = QueueFamilyIndices::default();
        assert!(!indices.is_complete());
        assert!(indices.resolve().is_none());
    }

    #[test]
    fn test_queue_family_indices_incomplete() {
        let indices = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: None,
        };
        assert!(!indices.is_complete());
        assert!(indices.resolve().is_none());
    }

    #[test]
    fn test_unique_families_same() {
        let families = QueueFamilies {
            graphics: 1,
            present: 1,
        };
        assert_eq!(families.unique(), vec![1]);
    }

    #[test]
    fn test_unique_families_split() {
        let families = QueueFamilies {
            graphics: 0,
            present: 3,
        };
        assert_eq!(families.unique(), vec![0, 3]);
    }

    #[test]
    fn test_pick_prefers_combined_family() {
        let families = [
            family(vk::QueueFlags::GRAPHICS, 1),
            family(vk::QueueFlags::TRANSFER, 1),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE, 1),
        ];
        let present = [false, true, true];
        let indices = pick_queue_families(&families, &present);
        assert_eq!(
            indices.resolve(),
            Some(QueueFamilies {
                graphics: 2,
                present: 2
            })
        );
    }

    #[test]
    fn test_pick_accepts_different_families() {
        let families = [
            family(vk::QueueFlags::GRAPHICS, 1),
            family(vk::QueueFlags::TRANSFER, 1),
        ];
        let present = [false, true];
        let indices = pick_queue_families(&families, &present);
        assert_eq!(
            indices.resolve(),
            Some(QueueFamilies {
                graphics: 0,
                present: 1
            })
        );
    }

    #[test]
    fn test_pick_skips_empty_families() {
        let families = [
            family(vk::QueueFlags::GRAPHICS, 0),
            family(vk::QueueFlags::GRAPHICS, 2),
        ];
        let present = [true, true];
        let indices = pick_queue_families(&families, &present);
        assert_eq!(indices.graphics_family, Some(1));
        assert_eq!(indices.present_family, Some(1));
    }

    #[test]
    fn test_pick_without_present_is_incomplete() {
        let families = [family(vk::QueueFlags::GRAPHICS, 1)];
        let indices = pick_queue_families(&families, &[false]);
        assert_eq!(indices.graphics_family, Some(0));
        assert!(!indices.is_complete());
    }

    #[test]
    fn test_required_device_extensions() {
        assert_eq!(REQUIRED_DEVICE_EXTENSIONS, &[c"VK_KHR_swapchain"]);
    }

    #[test]
    fn test_discrete_outranks_integrated() {
        assert!(
            rate_device_type(vk::PhysicalDeviceType::DISCRETE_GPU)
                > rate_device_type(vk::PhysicalDeviceType::INTEGRATED_GPU)
        );
    }
}
