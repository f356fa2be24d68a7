//! Vulkan instance management.
//!
//! This module handles VkInstance creation, required layer/extension
//! validation, and the validation-layer debug messenger.
//!
//! # Overview
//!
//! The caller supplies the instance extensions the windowing layer needs.
//! Before the instance is created every required layer and extension is
//! matched against what the loader enumerates; anything missing is a fatal
//! configuration error ([`RhiError::MissingLayer`] / [`RhiError::MissingExtension`]).
//!
//! # Example
//!
//! ```no_run
//! use meshview_rhi::instance::{Instance, InstanceDesc};
//!
//! let desc = InstanceDesc {
//!     required_extensions: vec![ash::khr::surface::NAME.to_owned()],
//!     enable_validation: cfg!(debug_assertions),
//!     print_diagnostics: false,
//! };
//! let instance = Instance::new(&desc).expect("Failed to create Vulkan instance");
//! let vk_instance = instance.handle();
//! ```

use std::ffi::{CStr, CString, c_char};

use ash::{Entry, vk};
use tracing::{error, info, warn};

use crate::error::{RhiError, RhiResult};

/// The Khronos validation layer name.
pub const VALIDATION_LAYER_NAME: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Parameters for [`Instance::new`].
#[derive(Debug, Clone, Default)]
pub struct InstanceDesc {
    /// Instance extensions the surface provider requires
    pub required_extensions: Vec<CString>,
    /// Enable the Khronos validation layer and a debug messenger
    pub enable_validation: bool,
    /// Log available and required layers/extensions while matching
    pub print_diagnostics: bool,
}

/// Vulkan instance wrapper.
///
/// Owns the loader entry, the instance and, when validation is on, the debug
/// messenger. Dropping it destroys the messenger before the instance.
pub struct Instance {
    /// Vulkan entry point loader
    entry: Entry,
    /// Vulkan instance handle
    instance: ash::Instance,
    /// Debug utils extension loader (only present when validation is enabled)
    debug_utils: Option<ash::ext::debug_utils::Instance>,
    /// Debug messenger handle (only present when validation is enabled)
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl Instance {
    /// Creates a new Vulkan instance.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Vulkan library cannot be loaded
    /// - A required layer or extension is not available
    /// - Instance creation fails
    /// - Debug messenger setup fails (when validation is enabled)
    pub fn new(desc: &InstanceDesc) -> RhiResult<Self> {
        let entry = unsafe { Entry::load()? };

        let available_layers = unsafe { entry.enumerate_instance_layer_properties()? };
        let available_layer_names: Vec<&CStr> = available_layers
            .iter()
            .map(|layer| fixed_array_name(&layer.layer_name))
            .collect();

        let required_layers = required_layers(desc.enable_validation);

        if desc.print_diagnostics {
            log_names("available layers", &available_layer_names);
            log_names("required layers", &required_layers);
        }

        if let Some(missing) = find_missing(&required_layers, &available_layer_names) {
            return Err(RhiError::MissingLayer(missing.to_string_lossy().into_owned()));
        }
        if desc.print_diagnostics {
            for layer in &required_layers {
                info!("Found required layer: {}", layer.to_string_lossy());
            }
        }

        let available_extensions = unsafe { entry.enumerate_instance_extension_properties(None)? };
        let available_extension_names: Vec<&CStr> = available_extensions
            .iter()
            .map(|ext| fixed_array_name(&ext.extension_name))
            .collect();

        let mut required_extensions: Vec<&CStr> = desc
            .required_extensions
            .iter()
            .map(CString::as_c_str)
            .collect();
        if desc.enable_validation && !required_extensions.contains(&ash::ext::debug_utils::NAME) {
            required_extensions.push(ash::ext::debug_utils::NAME);
        }

        if desc.print_diagnostics {
            log_names("available extensions", &available_extension_names);
            log_names("required extensions", &required_extensions);
        }

        if let Some(missing) = find_missing(&required_extensions, &available_extension_names) {
            return Err(RhiError::MissingExtension(
                missing.to_string_lossy().into_owned(),
            ));
        }
        if desc.print_diagnostics {
            for extension in &required_extensions {
                info!("Found required extension: {}", extension.to_string_lossy());
            }
        }

        let app_info = vk::ApplicationInfo::default()
            .application_name(c"meshview")
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(c"No Engine")
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_2);

        let extension_ptrs: Vec<*const c_char> =
            required_extensions.iter().map(|e| e.as_ptr()).collect();
        let layer_ptrs: Vec<*const c_char> = required_layers.iter().map(|l| l.as_ptr()).collect();

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs);

        let instance = unsafe { entry.create_instance(&create_info, None)? };

        info!(
            "Vulkan instance created (API 1.2, {} extension(s), {} layer(s))",
            extension_ptrs.len(),
            layer_ptrs.len()
        );

        let (debug_utils, debug_messenger) = if desc.enable_validation {
            let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
            match Self::setup_debug_messenger(&debug_utils) {
                Ok(messenger) => {
                    info!("Debug messenger created");
                    (Some(debug_utils), Some(messenger))
                }
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            }
        } else {
            (None, None)
        };

        Ok(Self {
            entry,
            instance,
            debug_utils,
            debug_messenger,
        })
    }

    /// Returns the Vulkan instance handle.
    #[inline]
    pub fn handle(&self) -> &ash::Instance {
        &self.instance
    }

    /// Returns the Vulkan entry point loader.
    #[inline]
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Sets up the debug messenger for validation layer callbacks.
    fn setup_debug_messenger(
        debug_utils: &ash::ext::debug_utils::Instance,
    ) -> RhiResult<vk::DebugUtilsMessengerEXT> {
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        let messenger = unsafe { debug_utils.create_debug_utils_messenger(&create_info, None)? };
        Ok(messenger)
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe {
            if let (Some(debug_utils), Some(messenger)) = (&self.debug_utils, self.debug_messenger)
            {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
        info!("Vulkan instance destroyed");
    }
}

/// Layers requested for the given validation setting.
pub fn required_layers(enable_validation: bool) -> Vec<&'static CStr> {
    if enable_validation {
        vec![VALIDATION_LAYER_NAME]
    } else {
        Vec::new()
    }
}

/// Returns the first entry of `required` that does not appear in `available`.
pub fn find_missing<'a>(required: &[&'a CStr], available: &[&CStr]) -> Option<&'a CStr> {
    required
        .iter()
        .copied()
        .find(|name| !available.contains(name))
}

/// Reads a NUL-terminated name out of a fixed-size Vulkan char array.
pub(crate) fn fixed_array_name(raw: &[c_char]) -> &CStr {
    // Vulkan guarantees these arrays are NUL-terminated.
    unsafe { CStr::from_ptr(raw.as_ptr()) }
}

fn log_names(label: &str, names: &[&CStr]) {
    info!("{}:", label);
    for name in names {
        info!("\t{}", name.to_string_lossy());
    }
}

/// Debug callback function for validation layer messages.
///
/// Messages are forwarded to `tracing` at a level matching their severity.
///
/// # Safety
///
/// This function is called from the Vulkan driver and must follow the
/// Vulkan specification for debug callbacks.
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }

    let callback_data = unsafe { &*p_callback_data };
    let message = if callback_data.p_message.is_null() {
        std::borrow::Cow::Borrowed("(no message)")
    } else {
        unsafe { CStr::from_ptr(callback_data.p_message).to_string_lossy() }
    };

    let type_str = match message_type {
        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL => "General",
        vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION => "Validation",
        vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE => "Performance",
        _ => "Unknown",
    };

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => error!("[Vulkan {}] {}", type_str, message),
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            warn!("[Vulkan {}] {}", type_str, message)
        }
        _ => info!("[Vulkan {}] {}", type_str, message),
    }

    vk::FALSE
}
