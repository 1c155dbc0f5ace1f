/// FrameSlot - per-frame-in-flight command pool and synchronization
///
/// The CPU records frame N+1 into one slot while the GPU may still execute
/// frame N from another. A slot is reused only after its fence signals.

use ash::vk;
use mana_engine::mana::Result;
use mana_engine::mana_err;

pub(crate) struct FrameSlot {
    device: ash::Device,
    command_pool: vk::CommandPool,
    /// Command buffers allocated from the pool, reused across frames
    command_buffers: Vec<vk::CommandBuffer>,
    /// Number of command buffers handed out since the last reset
    used: usize,
    /// Signaled when the GPU finished the slot's last submission
    in_flight: vk::Fence,
    /// Signaled when the acquired image is ready to be rendered to
    image_available: vk::Semaphore,
}

impl FrameSlot {
    pub fn new(device: &ash::Device, queue_family: u32) -> Result<Self> {
        unsafe {
            let pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(queue_family)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT);
            let command_pool = device
                .create_command_pool(&pool_info, None)
                .map_err(|e| init_err!("Failed to create frame command pool: {:?}", e))?;

            // Signaled so the first wait returns immediately
            let fence_info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);
            let in_flight = match device.create_fence(&fence_info, None) {
                Ok(fence) => fence,
                Err(e) => {
                    device.destroy_command_pool(command_pool, None);
                    return Err(init_err!("Failed to create frame fence: {:?}", e));
                }
            };

            let image_available = match device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None) {
                Ok(semaphore) => semaphore,
                Err(e) => {
                    device.destroy_fence(in_flight, None);
                    device.destroy_command_pool(command_pool, None);
                    return Err(init_err!("Failed to create image-available semaphore: {:?}", e));
                }
            };

            Ok(Self {
                device: device.clone(),
                command_pool,
                command_buffers: Vec::new(),
                used: 0,
                in_flight,
                image_available,
            })
        }
    }

    pub fn fence(&self) -> vk::Fence {
        self.in_flight
    }

    pub fn image_available(&self) -> vk::Semaphore {
        self.image_available
    }

    /// Block until the slot's previous submission is done
    pub fn wait(&self) -> Result<()> {
        unsafe {
            self.device
                .wait_for_fences(&[self.in_flight], true, u64::MAX)
                .map_err(|e| mana_err!("mana::vulkan", "Failed to wait for frame fence: {:?}", e))
        }
    }

    /// Recycle every command buffer of the slot (after `wait`)
    pub fn reset(&mut self) -> Result<()> {
        unsafe {
            self.device
                .reset_command_pool(self.command_pool, vk::CommandPoolResetFlags::empty())
                .map_err(|e| mana_err!("mana::vulkan", "Failed to reset frame command pool: {:?}", e))?;
        }
        self.used = 0;
        Ok(())
    }

    /// Re-arm the fence right before the slot's submission
    pub fn reset_fence(&self) -> Result<()> {
        unsafe {
            self.device
                .reset_fences(&[self.in_flight])
                .map_err(|e| mana_err!("mana::vulkan", "Failed to reset frame fence: {:?}", e))
        }
    }

    /// Next free primary command buffer, allocated on first use
    pub fn next_command_buffer(&mut self) -> Result<vk::CommandBuffer> {
        if self.used == self.command_buffers.len() {
            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(self.command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let buffers = unsafe { self.device.allocate_command_buffers(&allocate_info) }
                .map_err(|e| mana_err!("mana::vulkan", "Failed to allocate command buffer: {:?}", e))?;
            self.command_buffers.extend(buffers);
        }

        let command_buffer = self.command_buffers[self.used];
        self.used += 1;
        Ok(command_buffer)
    }
}

impl Drop for FrameSlot {
    fn drop(&mut self) {
        unsafe {
            // Command buffers are freed with the pool
            self.device.destroy_command_pool(self.command_pool, None);
            self.device.destroy_fence(self.in_flight, None);
            self.device.destroy_semaphore(self.image_available, None);
        }
    }
}
