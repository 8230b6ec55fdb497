// Vulkan backend modules

pub mod device;
pub mod instance;
pub mod pipeline;
pub mod shader;
pub mod surface;
pub mod swapchain;
pub mod sync;

pub use device::VulkanDevice;
pub use instance::Instance;
pub use pipeline::{Framebuffers, GraphicsPipeline, RenderPass};
pub use shader::ShaderModule;
pub use surface::Surface;
pub use swapchain::Swapchain;
pub use sync::FrameSync;
