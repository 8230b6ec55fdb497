// Shader module loading
//
// Shaders arrive as precompiled SPIR-V binaries on disk and are consumed as
// opaque words. A missing or malformed binary aborts startup with an error
// instead of handing the pipeline an invalid module.

use anyhow::{Context, Result};
use ash::vk;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use super::VulkanDevice;

/// Read a SPIR-V binary from disk into aligned words.
///
/// Validates the word alignment and magic number via `ash::util::read_spv`.
pub fn load_spirv(path: &Path) -> Result<Vec<u32>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read shader binary {}", path.display()))?;

    let mut cursor = Cursor::new(bytes);
    ash::util::read_spv(&mut cursor)
        .with_context(|| format!("Invalid SPIR-V binary {}", path.display()))
}

/// A compiled shader module, destroyed with its device-scoped handle.
pub struct ShaderModule {
    handle: vk::ShaderModule,
    device: Arc<VulkanDevice>,
}

impl ShaderModule {
    /// Load the binary at `path` and create a module from it.
    pub fn from_file(device: Arc<VulkanDevice>, path: &Path) -> Result<Self> {
        let code = load_spirv(path)?;
        Self::from_words(device, &code)
    }

    pub fn from_words(device: Arc<VulkanDevice>, code: &[u32]) -> Result<Self> {
        let create_info = vk::ShaderModuleCreateInfo::default().code(code);

        let handle = unsafe { device.device.create_shader_module(&create_info, None) }
            .context("Failed to create shader module")?;

        Ok(Self { handle, device })
    }

    #[inline]
    pub fn handle(&self) -> vk::ShaderModule {
        self.handle
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.device.destroy_shader_module(self.handle, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const SPIRV_MAGIC: u32 = 0x0723_0203;

    fn temp_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("dawns-ballad-shader-test-{}-{}", std::process::id(), name));
        path
    }

    #[test]
    fn missing_shader_file_is_an_error() {
        let err = load_spirv(Path::new("shaders/does-not-exist.spv")).unwrap_err();
        assert!(err.to_string().contains("does-not-exist.spv"));
    }

    #[test]
    fn misaligned_binary_is_rejected() {
        let path = temp_path("misaligned.spv");
        std::fs::write(&path, [0x03, 0x02, 0x23, 0x07, 0xff]).unwrap();

        let result = load_spirv(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let path = temp_path("wrong-magic.spv");
        std::fs::write(&path, 0xdead_beef_u32.to_le_bytes()).unwrap();

        let result = load_spirv(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn valid_header_loads_as_words() {
        let path = temp_path("valid.spv");
        let mut bytes = Vec::new();
        // Magic, version 1.0, generator, bound, schema
        for word in [SPIRV_MAGIC, 0x0001_0000, 0, 1, 0] {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        std::fs::write(&path, &bytes).unwrap();

        let words = load_spirv(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(words.len(), 5);
        assert_eq!(words[0], SPIRV_MAGIC);
    }
}
