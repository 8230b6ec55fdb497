// Vulkan device - Core GPU interface
//
// Responsibilities:
// - Physical device selection (prefer discrete GPU, require presentation support)
// - Queue family discovery (graphics + present)
// - Logical device + queue creation

use anyhow::{Context, Result};
use ash::vk;
use std::ffi::CStr;
use std::sync::Arc;

use super::{Instance, Surface};

/// Queue family indices required for rendering and presentation.
#[derive(Clone, Copy, Debug, Default)]
pub struct QueueFamilies {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

impl QueueFamilies {
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }

    /// Unique family indices, for logical device queue creation.
    pub fn unique(&self) -> Vec<u32> {
        let mut families = Vec::with_capacity(2);
        if let Some(graphics) = self.graphics {
            families.push(graphics);
        }
        if let Some(present) = self.present {
            if !families.contains(&present) {
                families.push(present);
            }
        }
        families
    }
}

/// Vulkan device wrapper with automatic cleanup.
pub struct VulkanDevice {
    pub device: ash::Device,
    pub physical_device: vk::PhysicalDevice,
    pub queue_families: QueueFamilies,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
    pub properties: vk::PhysicalDeviceProperties,
    instance: Arc<Instance>,
}

impl VulkanDevice {
    /// Select a physical device able to present to `surface` and build the
    /// logical device and queues on it.
    pub fn new(instance: Arc<Instance>, surface: &Surface) -> Result<Arc<Self>> {
        let (physical_device, queue_families) = Self::pick_physical_device(&instance, surface)?;

        let properties = unsafe {
            instance
                .instance
                .get_physical_device_properties(physical_device)
        };
        log::info!(
            "Selected GPU: {} (Vulkan {}.{}.{})",
            unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }.to_string_lossy(),
            vk::api_version_major(properties.api_version),
            vk::api_version_minor(properties.api_version),
            vk::api_version_patch(properties.api_version),
        );

        let (device, graphics_queue, present_queue) =
            Self::create_logical_device(&instance, physical_device, queue_families)?;

        Ok(Arc::new(Self {
            device,
            physical_device,
            queue_families,
            graphics_queue,
            present_queue,
            properties,
            instance,
        }))
    }

    fn pick_physical_device(
        instance: &Instance,
        surface: &Surface,
    ) -> Result<(vk::PhysicalDevice, QueueFamilies)> {
        let devices = unsafe { instance.instance.enumerate_physical_devices() }
            .context("Failed to enumerate physical devices")?;

        if devices.is_empty() {
            anyhow::bail!("No Vulkan-capable GPU found");
        }

        let mut best: Option<(vk::PhysicalDevice, QueueFamilies)> = None;
        let mut best_score = 0;

        for device in devices {
            let families = Self::find_queue_families(instance, device, surface);
            if !families.is_complete() {
                continue;
            }
            if !Self::check_device_extension_support(instance, device)? {
                continue;
            }
            if !Self::check_surface_support(device, surface)? {
                continue;
            }

            let props = unsafe { instance.instance.get_physical_device_properties(device) };
            let score = match props.device_type {
                vk::PhysicalDeviceType::DISCRETE_GPU => 1000,
                vk::PhysicalDeviceType::INTEGRATED_GPU => 100,
                _ => 1,
            };

            if score > best_score {
                best_score = score;
                best = Some((device, families));
            }
        }

        best.ok_or_else(|| anyhow::anyhow!("No suitable GPU found"))
    }

    fn find_queue_families(
        instance: &Instance,
        device: vk::PhysicalDevice,
        surface: &Surface,
    ) -> QueueFamilies {
        let queue_families = unsafe {
            instance
                .instance
                .get_physical_device_queue_family_properties(device)
        };

        let mut families = QueueFamilies::default();

        for (i, family) in queue_families.iter().enumerate() {
            let i = i as u32;
            if family.queue_count == 0 {
                continue;
            }

            if families.graphics.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
            {
                families.graphics = Some(i);
            }

            if families.present.is_none() {
                let supported = unsafe {
                    surface
                        .loader
                        .get_physical_device_surface_support(device, i, surface.handle())
                        .unwrap_or(false)
                };
                if supported {
                    families.present = Some(i);
                }
            }

            if families.is_complete() {
                break;
            }
        }

        families
    }

    fn check_device_extension_support(
        instance: &Instance,
        device: vk::PhysicalDevice,
    ) -> Result<bool> {
        let extensions = unsafe {
            instance
                .instance
                .enumerate_device_extension_properties(device)
        }
        .context("Failed to enumerate device extensions")?;

        let found = extensions.iter().any(|ext| {
            let name = unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) };
            name == ash::khr::swapchain::NAME
        });

        Ok(found)
    }

    /// A device is only usable if the surface reports at least one format
    /// and one present mode.
    fn check_surface_support(device: vk::PhysicalDevice, surface: &Surface) -> Result<bool> {
        let formats = unsafe {
            surface
                .loader
                .get_physical_device_surface_formats(device, surface.handle())
        }
        .context("Failed to query surface formats")?;

        let present_modes = unsafe {
            surface
                .loader
                .get_physical_device_surface_present_modes(device, surface.handle())
        }
        .context("Failed to query surface present modes")?;

        Ok(!formats.is_empty() && !present_modes.is_empty())
    }

    fn create_logical_device(
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        queue_families: QueueFamilies,
    ) -> Result<(ash::Device, vk::Queue, vk::Queue)> {
        let graphics_family = queue_families
            .graphics
            .context("Missing graphics queue family")?;
        let present_family = queue_families
            .present
            .context("Missing present queue family")?;

        let queue_priorities = [1.0];
        let queue_create_infos: Vec<_> = queue_families
            .unique()
            .into_iter()
            .map(|family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&queue_priorities)
            })
            .collect();

        let extensions = [ash::khr::swapchain::NAME.as_ptr()];
        let features = vk::PhysicalDeviceFeatures::default();

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extensions)
            .enabled_features(&features);

        let device = unsafe {
            instance
                .instance
                .create_device(physical_device, &create_info, None)
        }
        .context("Failed to create logical device")?;

        let graphics_queue = unsafe { device.get_device_queue(graphics_family, 0) };
        let present_queue = unsafe { device.get_device_queue(present_family, 0) };

        Ok((device, graphics_queue, present_queue))
    }

    /// Wait for the device to be idle (e.g. before swapchain recreation or cleanup).
    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.device.device_wait_idle() }?;
        Ok(())
    }

    #[inline]
    pub fn instance(&self) -> &Instance {
        &self.instance
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        let _ = self.wait_idle();
        unsafe {
            self.device.destroy_device(None);
        }
        log::info!("Logical device destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_families_completeness() {
        let empty = QueueFamilies::default();
        assert!(!empty.is_complete());

        let graphics_only = QueueFamilies {
            graphics: Some(0),
            present: None,
        };
        assert!(!graphics_only.is_complete());

        let both = QueueFamilies {
            graphics: Some(0),
            present: Some(1),
        };
        assert!(both.is_complete());
    }

    #[test]
    fn unique_families_deduplicates_shared_index() {
        let shared = QueueFamilies {
            graphics: Some(0),
            present: Some(0),
        };
        assert_eq!(shared.unique(), vec![0]);

        let split = QueueFamilies {
            graphics: Some(0),
            present: Some(2),
        };
        assert_eq!(split.unique(), vec![0, 2]);
    }
}
