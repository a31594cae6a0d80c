//! WGSL sources for every GPU pass.
//!
//! The built-in set is compiled into the binary. A directory override replaces
//! all of them at once and must contain every file; a missing file is an error
//! rather than a silent fallback.

use std::borrow::Cow;
use std::path::Path;

use crate::error::ShaderError;

/// File names, in the order [`ShaderSet::iter`] yields them.
pub const SHADER_FILES: [&str; 8] = [
    "update.wgsl",
    "add.wgsl",
    "splat.wgsl",
    "resolve.wgsl",
    "primitives.wgsl",
    "bloom.wgsl",
    "tonemap.wgsl",
    "blit.wgsl",
];

/// One source string per pass.
#[derive(Debug, Clone)]
pub struct ShaderSet {
    pub update: Cow<'static, str>,
    pub add: Cow<'static, str>,
    pub splat: Cow<'static, str>,
    pub resolve: Cow<'static, str>,
    pub primitives: Cow<'static, str>,
    pub bloom: Cow<'static, str>,
    pub tonemap: Cow<'static, str>,
    pub blit: Cow<'static, str>,
}

impl ShaderSet {
    pub fn builtin() -> Self {
        Self {
            update: Cow::Borrowed(include_str!("shaders/update.wgsl")),
            add: Cow::Borrowed(include_str!("shaders/add.wgsl")),
            splat: Cow::Borrowed(include_str!("shaders/splat.wgsl")),
            resolve: Cow::Borrowed(include_str!("shaders/resolve.wgsl")),
            primitives: Cow::Borrowed(include_str!("shaders/primitives.wgsl")),
            bloom: Cow::Borrowed(include_str!("shaders/bloom.wgsl")),
            tonemap: Cow::Borrowed(include_str!("shaders/tonemap.wgsl")),
            blit: Cow::Borrowed(include_str!("shaders/blit.wgsl")),
        }
    }

    /// Load every file in [`SHADER_FILES`] from `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, ShaderError> {
        let dir = dir.as_ref();
        let load = |name: &str| -> Result<Cow<'static, str>, ShaderError> {
            let path = dir.join(name);
            match std::fs::read_to_string(&path) {
                Ok(src) => Ok(Cow::Owned(src)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ShaderError::Missing(path)),
                Err(source) => Err(ShaderError::Io { path, source }),
            }
        };

        let set = Self {
            update: load(SHADER_FILES[0])?,
            add: load(SHADER_FILES[1])?,
            splat: load(SHADER_FILES[2])?,
            resolve: load(SHADER_FILES[3])?,
            primitives: load(SHADER_FILES[4])?,
            bloom: load(SHADER_FILES[5])?,
            tonemap: load(SHADER_FILES[6])?,
            blit: load(SHADER_FILES[7])?,
        };
        log::info!("loaded shaders from {}", dir.display());
        Ok(set)
    }

    /// `(file name, source)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        let sources = [
            &self.update,
            &self.add,
            &self.splat,
            &self.resolve,
            &self.primitives,
            &self.bloom,
            &self.tonemap,
            &self.blit,
        ];
        SHADER_FILES
            .into_iter()
            .zip(sources)
            .map(|(name, src)| (name, src.as_ref()))
    }
}

impl Default for ShaderSet {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Compile a WGSL source into a module.
pub(crate) fn module(device: &wgpu::Device, label: &str, source: &str) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("glowswarm-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_builtin_has_every_entry_point() {
        let set = ShaderSet::builtin();
        assert_eq!(set.iter().count(), SHADER_FILES.len());
        assert!(set.update.contains("fn main"));
        assert!(set.bloom.contains("fn fs_downsample"));
        assert!(set.bloom.contains("fn fs_upsample"));
        assert!(set.primitives.contains("fn vs_line"));
    }

    #[test]
    fn test_from_dir_roundtrip() {
        let dir = scratch_dir("full");
        for (name, src) in ShaderSet::builtin().iter() {
            std::fs::write(dir.join(name), src).unwrap();
        }
        let loaded = ShaderSet::from_dir(&dir).unwrap();
        assert_eq!(loaded.tonemap, ShaderSet::builtin().tonemap);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = scratch_dir("partial");
        std::fs::write(dir.join("update.wgsl"), "// only one").unwrap();
        match ShaderSet::from_dir(&dir) {
            Err(ShaderError::Missing(path)) => assert!(path.ends_with("add.wgsl")),
            other => panic!("expected missing add.wgsl, got {:?}", other.map(|_| ())),
        }
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
