/// GpuContext - instance, surface and logical device shared by the backend
///
/// Owns the Vulkan objects that live for the whole backend lifetime.
/// Everything created from the device (swapchain, frame slots, render
/// passes, pipelines) must be destroyed before this is dropped.

use ash::vk;
use mana_engine::mana::render::ContextConfig;
use mana_engine::mana::surface::SurfaceProvider;
use mana_engine::mana::Result;
use mana_engine::{mana_debug, mana_error, mana_info, mana_warn};
use std::ffi::{CStr, CString};

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Queue family indices used by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct QueueFamilies {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilies {
    pub fn is_shared(&self) -> bool {
        self.graphics == self.present
    }
}

/// Pick graphics and present queue families, preferring one family that does both
pub(crate) fn select_queue_families(
    families: &[vk::QueueFamilyProperties],
    supports_present: impl Fn(u32) -> bool,
) -> Option<QueueFamilies> {
    let graphics: Vec<u32> = families
        .iter()
        .enumerate()
        .filter(|(_, family)| family.queue_count > 0 && family.queue_flags.contains(vk::QueueFlags::GRAPHICS))
        .map(|(index, _)| index as u32)
        .collect();

    if let Some(&both) = graphics.iter().find(|&&index| supports_present(index)) {
        return Some(QueueFamilies { graphics: both, present: both });
    }

    let graphics = *graphics.first()?;
    let present = (0..families.len() as u32).find(|&index| supports_present(index))?;
    Some(QueueFamilies { graphics, present })
}

/// Preference order among physical device types (higher is better)
pub(crate) fn device_type_score(device_type: vk::PhysicalDeviceType) -> u32 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 4,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 3,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 2,
        vk::PhysicalDeviceType::CPU => 1,
        _ => 0,
    }
}

/// Shared GPU context for all backend objects.
pub(crate) struct GpuContext {
    /// Vulkan entry (kept alive for the loaded library)
    _entry: ash::Entry,
    pub instance: ash::Instance,
    pub surface_loader: ash::khr::surface::Instance,
    pub surface: vk::SurfaceKHR,
    pub physical_device: vk::PhysicalDevice,
    pub device_name: String,
    pub device: ash::Device,
    pub queue_families: QueueFamilies,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
    /// Debug utils loader and messenger (validation builds only)
    debug_messenger: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
}

impl GpuContext {
    /// Create instance, surface and device for `surface`
    pub fn new(surface: &dyn SurfaceProvider, config: &ContextConfig) -> Result<Self> {
        let handles = surface.native_handles().map_err(|e| {
            mana_error!("mana::vulkan", "Surface has no native handles: {}", e);
            e
        })?;

        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| init_err!("Failed to load Vulkan library: {:?}", e))?;

            let app_name = CString::new(config.app_name.as_str())
                .map_err(|e| init_err!("Invalid application name: {}", e))?;
            let (major, minor, patch) = config.app_version;

            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"Mana")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_2);

            let mut extension_names = ash_window::enumerate_required_extensions(handles.display)
                .map_err(|e| init_err!("Failed to get required extensions: {}", e))?
                .to_vec();

            let validation = Self::validation_enabled(&entry, config);
            if validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }
            let layer_names = if validation {
                vec![VALIDATION_LAYER.as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| init_err!("Failed to create Vulkan instance: {:?}", e))?;

            let debug_messenger = if validation {
                Self::create_debug_messenger(&entry, &instance)
            } else {
                None
            };

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
            let vk_surface = match ash_window::create_surface(&entry, &instance, handles.display, handles.window, None) {
                Ok(vk_surface) => vk_surface,
                Err(e) => {
                    Self::destroy_instance(&instance, debug_messenger);
                    return Err(init_err!("Failed to create surface: {:?}", e));
                }
            };

            let (physical_device, queue_families) =
                match Self::pick_physical_device(&instance, &surface_loader, vk_surface) {
                    Ok(selection) => selection,
                    Err(e) => {
                        surface_loader.destroy_surface(vk_surface, None);
                        Self::destroy_instance(&instance, debug_messenger);
                        return Err(e);
                    }
                };

            let properties = instance.get_physical_device_properties(physical_device);
            let device_name = properties
                .device_name_as_c_str()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "Unknown device".to_string());

            let device = match Self::create_device(&instance, physical_device, queue_families) {
                Ok(device) => device,
                Err(e) => {
                    surface_loader.destroy_surface(vk_surface, None);
                    Self::destroy_instance(&instance, debug_messenger);
                    return Err(e);
                }
            };

            let graphics_queue = device.get_device_queue(queue_families.graphics, 0);
            let present_queue = device.get_device_queue(queue_families.present, 0);

            mana_info!("mana::vulkan", "Using GPU '{}' ({:?}), graphics queue family {}, present queue family {}",
                device_name, properties.device_type, queue_families.graphics, queue_families.present);

            Ok(Self {
                _entry: entry,
                instance,
                surface_loader,
                surface: vk_surface,
                physical_device,
                device_name,
                device,
                queue_families,
                graphics_queue,
                present_queue,
                debug_messenger,
            })
        }
    }

    /// Validation is used only when requested, compiled in and installed
    fn validation_enabled(entry: &ash::Entry, config: &ContextConfig) -> bool {
        if !config.enable_validation {
            return false;
        }
        if !cfg!(feature = "vulkan-validation") {
            mana_debug!("mana::vulkan", "Validation requested but the vulkan-validation feature is disabled");
            return false;
        }

        let layers = unsafe { entry.enumerate_instance_layer_properties() }.unwrap_or_default();
        let available = layers.iter().any(|layer| {
            layer.layer_name_as_c_str().map(|name| name == VALIDATION_LAYER).unwrap_or(false)
        });
        if !available {
            mana_warn!("mana::vulkan", "Validation requested but {:?} is not installed", VALIDATION_LAYER);
        }
        available
    }

    #[cfg(feature = "vulkan-validation")]
    fn create_debug_messenger(
        entry: &ash::Entry,
        instance: &ash::Instance,
    ) -> Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
        let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);
        crate::debug::reset_validation_stats();

        match unsafe { debug_utils.create_debug_utils_messenger(&crate::debug::messenger_create_info(), None) } {
            Ok(messenger) => Some((debug_utils, messenger)),
            Err(e) => {
                mana_warn!("mana::vulkan", "Failed to create debug messenger, continuing without: {:?}", e);
                None
            }
        }
    }

    #[cfg(not(feature = "vulkan-validation"))]
    fn create_debug_messenger(
        _entry: &ash::Entry,
        _instance: &ash::Instance,
    ) -> Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
        None
    }

    unsafe fn pick_physical_device(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<(vk::PhysicalDevice, QueueFamilies)> {
        let physical_devices = instance
            .enumerate_physical_devices()
            .map_err(|e| init_err!("Failed to enumerate physical devices: {:?}", e))?;

        let mut best: Option<(u32, vk::PhysicalDevice, QueueFamilies)> = None;
        for physical_device in physical_devices {
            if !Self::supports_swapchain(instance, physical_device) {
                continue;
            }

            let families = instance.get_physical_device_queue_family_properties(physical_device);
            let selected = select_queue_families(&families, |index| {
                surface_loader
                    .get_physical_device_surface_support(physical_device, index, surface)
                    .unwrap_or(false)
            });
            let Some(queue_families) = selected else {
                continue;
            };

            let score = device_type_score(instance.get_physical_device_properties(physical_device).device_type);
            if best.map_or(true, |(best_score, _, _)| score > best_score) {
                best = Some((score, physical_device, queue_families));
            }
        }

        best.map(|(_, physical_device, queue_families)| (physical_device, queue_families))
            .ok_or_else(|| init_err!("No Vulkan GPU with graphics and present support found"))
    }

    unsafe fn supports_swapchain(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> bool {
        instance
            .enumerate_device_extension_properties(physical_device)
            .map(|extensions| {
                extensions.iter().any(|extension| {
                    extension.extension_name_as_c_str().map(|name| name == ash::khr::swapchain::NAME).unwrap_or(false)
                })
            })
            .unwrap_or(false)
    }

    unsafe fn create_device(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        queue_families: QueueFamilies,
    ) -> Result<ash::Device> {
        let queue_priorities = [1.0];
        let mut queue_create_infos = vec![
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(queue_families.graphics)
                .queue_priorities(&queue_priorities),
        ];
        if !queue_families.is_shared() {
            queue_create_infos.push(
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(queue_families.present)
                    .queue_priorities(&queue_priorities),
            );
        }

        let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];
        let device_features = vk::PhysicalDeviceFeatures::default();

        let device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&device_extension_names)
            .enabled_features(&device_features);

        instance
            .create_device(physical_device, &device_create_info, None)
            .map_err(|e| init_err!("Failed to create logical device: {:?}", e))
    }

    unsafe fn destroy_instance(
        instance: &ash::Instance,
        debug_messenger: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    ) {
        if let Some((debug_utils, messenger)) = debug_messenger {
            debug_utils.destroy_debug_utils_messenger(messenger, None);
        }
        instance.destroy_instance(None);
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();
            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);
            Self::destroy_instance(&self.instance, self.debug_messenger.take());
        }
        mana_debug!("mana::vulkan", "Device '{}' destroyed", self.device_name);
    }
}

#[cfg(test)]
#[path = "vulkan_context_tests.rs"]
mod tests;
