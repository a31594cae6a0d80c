//! Error types for glowswarm.
//!
//! Only construction can fail: GPU setup, shader loading and window creation.
//! Once the frame loop runs, transient problems (a full pool, a stale free-list
//! count, a lost surface) are absorbed and logged instead.

use std::fmt;
use std::path::PathBuf;

/// Errors that can occur during GPU initialization.
#[derive(Debug)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    SurfaceCreation(wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    NoAdapter,
    /// Failed to create GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
    /// Failed to map buffer for reading.
    BufferMapping(String),
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::SurfaceCreation(e) => write!(f, "Failed to create GPU surface: {}", e),
            GpuError::NoAdapter => write!(f, "No compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support."),
            GpuError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
            GpuError::BufferMapping(msg) => write!(f, "Failed to map GPU buffer: {}", msg),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::SurfaceCreation(e) => Some(e),
            GpuError::DeviceCreation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wgpu::CreateSurfaceError> for GpuError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        GpuError::SurfaceCreation(e)
    }
}

impl From<wgpu::RequestDeviceError> for GpuError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        GpuError::DeviceCreation(e)
    }
}

/// Errors that can occur while loading shader sources.
#[derive(Debug)]
pub enum ShaderError {
    /// A required shader file does not exist.
    Missing(PathBuf),
    /// The file exists but could not be read.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::Missing(path) => write!(f, "Shader file not found: {}", path.display()),
            ShaderError::Io { path, source } => {
                write!(f, "Failed to read shader {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ShaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShaderError::Missing(_) => None,
            ShaderError::Io { source, .. } => Some(source),
        }
    }
}

/// Errors that can occur when running the sandbox.
#[derive(Debug)]
pub enum GlowError {
    /// Failed to create event loop.
    EventLoop(winit::error::EventLoopError),
    /// Failed to create window.
    Window(winit::error::OsError),
    /// GPU initialization failed.
    Gpu(GpuError),
    /// Shader sources could not be loaded.
    Shader(ShaderError),
}

impl fmt::Display for GlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlowError::EventLoop(e) => write!(f, "Failed to create event loop: {}", e),
            GlowError::Window(e) => write!(f, "Failed to create window: {}", e),
            GlowError::Gpu(e) => write!(f, "GPU error: {}", e),
            GlowError::Shader(e) => write!(f, "Shader error: {}", e),
        }
    }
}

impl std::error::Error for GlowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GlowError::EventLoop(e) => Some(e),
            GlowError::Window(e) => Some(e),
            GlowError::Gpu(e) => Some(e),
            GlowError::Shader(e) => Some(e),
        }
    }
}

impl From<winit::error::EventLoopError> for GlowError {
    fn from(e: winit::error::EventLoopError) -> Self {
        GlowError::EventLoop(e)
    }
}

impl From<winit::error::OsError> for GlowError {
    fn from(e: winit::error::OsError) -> Self {
        GlowError::Window(e)
    }
}

impl From<GpuError> for GlowError {
    fn from(e: GpuError) -> Self {
        GlowError::Gpu(e)
    }
}

impl From<ShaderError> for GlowError {
    fn from(e: ShaderError) -> Self {
        GlowError::Shader(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_shader_error_display() {
        let err = ShaderError::Missing(PathBuf::from("shaders/update.wgsl"));
        assert_eq!(err.to_string(), "Shader file not found: shaders/update.wgsl");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_glow_error_wraps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: GlowError = ShaderError::Io {
            path: PathBuf::from("bloom.wgsl"),
            source: io,
        }
        .into();
        assert!(err.to_string().starts_with("Shader error: Failed to read shader bloom.wgsl"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_no_adapter_message() {
        let err: GlowError = GpuError::NoAdapter.into();
        assert!(err.to_string().contains("No compatible GPU adapter"));
    }
}
