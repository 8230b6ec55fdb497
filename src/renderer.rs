// Render manager - owns the Vulkan object graph and drives the frame loop
//
// Resources are held in reverse creation order so dropping the manager tears
// them down children-first. Every fallible step propagates its error; the
// caller decides whether a failed frame is fatal.

use anyhow::{Context, Result};
use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use std::sync::Arc;

use crate::backend::{
    Framebuffers, FrameSync, GraphicsPipeline, Instance, RenderPass, ShaderModule, Surface,
    Swapchain, VulkanDevice,
};
use crate::config::Config;
use crate::frame::{AcquireOutcome, FrameCursor, PresentOutcome};
use crate::lifecycle::LifecyclePhase;

/// Command pool plus one primary buffer per frame in flight.
struct Commands {
    pool: vk::CommandPool,
    buffers: Vec<vk::CommandBuffer>,
    device: Arc<VulkanDevice>,
}

impl Commands {
    fn new(device: Arc<VulkanDevice>, count: usize) -> Result<Self> {
        let graphics_family = device
            .queue_families
            .graphics
            .context("Missing graphics queue family")?;

        let pool_info = vk::CommandPoolCreateInfo::default()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(graphics_family);

        let pool = unsafe { device.device.create_command_pool(&pool_info, None) }
            .context("Failed to create command pool")?;

        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count as u32);

        let buffers = match unsafe { device.device.allocate_command_buffers(&alloc_info) } {
            Ok(buffers) => buffers,
            Err(e) => {
                unsafe {
                    device.device.destroy_command_pool(pool, None);
                }
                return Err(e).context("Failed to allocate command buffers");
            }
        };

        Ok(Self {
            pool,
            buffers,
            device,
        })
    }
}

impl Drop for Commands {
    fn drop(&mut self) {
        unsafe {
            // Destroying the pool frees its buffers
            self.device.device.destroy_command_pool(self.pool, None);
        }
    }
}

/// Owns every Vulkan object and renders one frame at a time.
///
/// Field order mirrors reverse creation order; `Drop` relies on it.
pub struct RenderManager {
    frames: Vec<FrameSync>,
    commands: Commands,
    framebuffers: Framebuffers,
    pipeline: GraphicsPipeline,
    render_pass: RenderPass,
    swapchain: Swapchain,
    device: Arc<VulkanDevice>,
    surface: Surface,
    _instance: Arc<Instance>,

    cursor: FrameCursor,
    phase: LifecyclePhase,
    clear_color: [f32; 4],
    present_mode: vk::PresentModeKHR,
}

impl RenderManager {
    /// Run the full setup sequence: instance, surface, device, swapchain,
    /// render pass, pipeline, framebuffers, commands, per-frame sync.
    pub fn new(
        config: &Config,
        display_handle: RawDisplayHandle,
        window_handle: RawWindowHandle,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let instance = Arc::new(Instance::new(
            &config.window.title,
            display_handle,
            config.debug.validation_layers,
        )?);
        let surface = Surface::new(instance.clone(), display_handle, window_handle)?;
        let device = VulkanDevice::new(instance.clone(), &surface)?;

        let present_mode = config.present_mode();
        let swapchain = Swapchain::new(device.clone(), &surface, width, height, present_mode)?;

        let render_pass = RenderPass::new(device.clone(), swapchain.format)?;

        let vert_shader =
            ShaderModule::from_file(device.clone(), config.shaders.vertex.as_ref())?;
        let frag_shader =
            ShaderModule::from_file(device.clone(), config.shaders.fragment.as_ref())?;
        let pipeline =
            GraphicsPipeline::new(device.clone(), &render_pass, &vert_shader, &frag_shader)?;

        let framebuffers = Framebuffers::new(
            device.clone(),
            &render_pass,
            &swapchain.image_views,
            swapchain.extent,
        )?;

        let frame_count = config.graphics.max_frames_in_flight.max(1);
        let commands = Commands::new(device.clone(), frame_count)?;

        let frames = (0..frame_count)
            .map(|_| FrameSync::new(device.clone()))
            .collect::<Result<Vec<_>>>()?;

        log::info!(
            "Renderer initialized: {} frames in flight, {} framebuffers",
            frame_count,
            framebuffers.len()
        );

        Ok(Self {
            frames,
            commands,
            framebuffers,
            pipeline,
            render_pass,
            swapchain,
            device,
            surface,
            _instance: instance,
            cursor: FrameCursor::new(frame_count),
            phase: LifecyclePhase::Initialized,
            clear_color: config.graphics.clear_color,
            present_mode,
        })
    }

    /// Mark the swapchain stale after a window resize. The rebuild happens
    /// on the next `draw_frame`, once a usable size is known.
    pub fn note_resized(&mut self) {
        if self.phase == LifecyclePhase::Initialized {
            self.transition(LifecyclePhase::SwapchainStale);
        }
    }

    /// Render and present one frame at the given window size.
    ///
    /// A zero-sized window skips the frame entirely. An out-of-date
    /// swapchain at acquire abandons the frame before the fence is reset,
    /// rebuilds, and returns; the frame index is not advanced for abandoned
    /// frames and advances exactly once for completed ones.
    pub fn draw_frame(&mut self, width: u32, height: u32) -> Result<()> {
        if !self.phase.can_draw() {
            anyhow::bail!("draw_frame called in {} phase", self.phase);
        }

        // Minimized; nothing to present
        if width == 0 || height == 0 {
            return Ok(());
        }

        if self.phase == LifecyclePhase::SwapchainStale {
            self.recreate_swapchain(width, height)?;
        }

        let frame_index = self.cursor.index();
        self.frames[frame_index].wait()?;

        let (image_index, suboptimal) =
            match self.swapchain.acquire(self.frames[frame_index].image_available)? {
                AcquireOutcome::Ready {
                    image_index,
                    suboptimal,
                } => (image_index, suboptimal),
                AcquireOutcome::OutOfDate => {
                    // Fence still signaled; the abandoned frame can be retried
                    self.transition(LifecyclePhase::SwapchainStale);
                    self.recreate_swapchain(width, height)?;
                    return Ok(());
                }
            };

        self.frames[frame_index].reset_fence()?;

        let command_buffer = self.commands.buffers[frame_index];
        self.record_commands(command_buffer, image_index)?;
        self.submit(command_buffer, frame_index)?;

        let presented = self.swapchain.present(
            self.device.present_queue,
            image_index,
            self.frames[frame_index].render_finished,
        )?;

        if (presented == PresentOutcome::Stale || suboptimal)
            && self.phase == LifecyclePhase::Initialized
        {
            self.transition(LifecyclePhase::SwapchainStale);
        }

        // The single place the frame index moves
        self.cursor.advance();

        Ok(())
    }

    /// Record the full frame into `command_buffer`: one render pass, the
    /// triangle pipeline, viewport and scissor covering the swapchain.
    ///
    /// Begin/end pairs for both the buffer and the render pass are emitted
    /// unconditionally by this single function.
    fn record_commands(
        &self,
        command_buffer: vk::CommandBuffer,
        image_index: u32,
    ) -> Result<()> {
        let device = &self.device.device;

        unsafe {
            device
                .reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())
                .context("Failed to reset command buffer")?;

            let begin_info = vk::CommandBufferBeginInfo::default();
            device
                .begin_command_buffer(command_buffer, &begin_info)
                .context("Failed to begin command buffer")?;

            let clear_values = [vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: self.clear_color,
                },
            }];
            let render_pass_begin = vk::RenderPassBeginInfo::default()
                .render_pass(self.render_pass.handle())
                .framebuffer(self.framebuffers.get(image_index))
                .render_area(vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent: self.swapchain.extent,
                })
                .clear_values(&clear_values);

            device.cmd_begin_render_pass(
                command_buffer,
                &render_pass_begin,
                vk::SubpassContents::INLINE,
            );

            device.cmd_bind_pipeline(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline.handle(),
            );

            let viewport = vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: self.swapchain.extent.width as f32,
                height: self.swapchain.extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            };
            device.cmd_set_viewport(command_buffer, 0, &[viewport]);

            let scissor = vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: self.swapchain.extent,
            };
            device.cmd_set_scissor(command_buffer, 0, &[scissor]);

            device.cmd_draw(command_buffer, 3, 1, 0, 0);

            device.cmd_end_render_pass(command_buffer);
            device
                .end_command_buffer(command_buffer)
                .context("Failed to end command buffer")?;
        }

        Ok(())
    }

    fn submit(&self, command_buffer: vk::CommandBuffer, frame_index: usize) -> Result<()> {
        let frame = &self.frames[frame_index];

        let wait_semaphores = [frame.image_available];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [command_buffer];
        let signal_semaphores = [frame.render_finished];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.device.device.queue_submit(
                self.device.graphics_queue,
                &[submit_info],
                frame.in_flight_fence,
            )
        }
        .context("Failed to submit draw commands")
    }

    /// Rebuild the swapchain and framebuffers at the new size. A zero size
    /// leaves the renderer stale until the window is usable again.
    fn recreate_swapchain(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Ok(());
        }

        self.device.wait_idle()?;

        // Framebuffers reference the old image views; clear them first
        self.framebuffers.clear();
        self.swapchain
            .recreate(&self.surface, width, height, self.present_mode)?;
        self.framebuffers.rebuild(
            &self.render_pass,
            &self.swapchain.image_views,
            self.swapchain.extent,
        )?;

        self.transition(LifecyclePhase::Initialized);
        log::info!(
            "Swapchain recreated at {}x{}",
            self.swapchain.extent.width,
            self.swapchain.extent.height
        );
        Ok(())
    }

    /// Block until all submitted GPU work has finished.
    pub fn wait_idle(&self) -> Result<()> {
        self.device.wait_idle()
    }

    fn transition(&mut self, next: LifecyclePhase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal lifecycle transition {} -> {}",
            self.phase,
            next
        );
        log::debug!("Lifecycle: {} -> {}", self.phase, next);
        self.phase = next;
    }
}

impl Drop for RenderManager {
    fn drop(&mut self) {
        if self.phase.can_transition_to(LifecyclePhase::ShuttingDown) {
            self.transition(LifecyclePhase::ShuttingDown);
        }
        // In-flight frames must drain before any resource is destroyed
        if let Err(e) = self.device.wait_idle() {
            log::error!("Failed to wait for device idle during shutdown: {e:#}");
        }
        self.transition(LifecyclePhase::Destroyed);
        log::info!("Renderer shut down");
        // Fields drop in declaration order: sync, commands, framebuffers,
        // pipeline, render pass, swapchain, device, surface, instance.
    }
}
