//! Unit tests for physical device and queue family selection
//!
//! Pure selection logic, no GPU required.

use super::*;

fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
    vk::QueueFamilyProperties {
        queue_flags: flags,
        queue_count: 1,
        ..Default::default()
    }
}

#[test]
fn test_prefers_family_with_graphics_and_present() {
    let families = [
        family(vk::QueueFlags::TRANSFER),
        family(vk::QueueFlags::GRAPHICS),
        family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE),
    ];

    let selected = select_queue_families(&families, |index| index != 1).unwrap();
    assert_eq!(selected, QueueFamilies { graphics: 2, present: 2 });
    assert!(selected.is_shared());
}

#[test]
fn test_split_graphics_and_present_families() {
    let families = [
        family(vk::QueueFlags::GRAPHICS),
        family(vk::QueueFlags::TRANSFER),
    ];

    let selected = select_queue_families(&families, |index| index == 1).unwrap();
    assert_eq!(selected, QueueFamilies { graphics: 0, present: 1 });
    assert!(!selected.is_shared());
}

#[test]
fn test_no_graphics_family() {
    let families = [family(vk::QueueFlags::COMPUTE), family(vk::QueueFlags::TRANSFER)];
    assert_eq!(select_queue_families(&families, |_| true), None);
}

#[test]
fn test_no_present_support() {
    let families = [family(vk::QueueFlags::GRAPHICS)];
    assert_eq!(select_queue_families(&families, |_| false), None);
}

#[test]
fn test_empty_families_are_skipped() {
    let mut empty = family(vk::QueueFlags::GRAPHICS);
    empty.queue_count = 0;
    let families = [empty, family(vk::QueueFlags::GRAPHICS)];

    let selected = select_queue_families(&families, |_| true).unwrap();
    assert_eq!(selected.graphics, 1);
}

#[test]
fn test_discrete_gpu_preferred() {
    let discrete = device_type_score(vk::PhysicalDeviceType::DISCRETE_GPU);
    let integrated = device_type_score(vk::PhysicalDeviceType::INTEGRATED_GPU);
    let cpu = device_type_score(vk::PhysicalDeviceType::CPU);
    let other = device_type_score(vk::PhysicalDeviceType::OTHER);

    assert!(discrete > integrated);
    assert!(integrated > cpu);
    assert!(cpu > other);
}
