//! Every built-in WGSL source must parse and validate, and the structs shared
//! with Rust must have the same size on both sides.

use glowswarm::color::PackedRgba;
use glowswarm::gpu::primitives::Primitive;
use glowswarm::shaders::{ShaderSet, SHADER_FILES};
use glowswarm::{ObstacleBox, Particle};

fn validate(name: &str, source: &str) -> Result<naga::Module, String> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| format!("{}: WGSL parse error: {}", name, e.emit_to_string(source)))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|e| format!("{}: WGSL validation error: {:?}", name, e))?;

    Ok(module)
}

fn struct_span(module: &naga::Module, name: &str) -> Option<u32> {
    module.types.iter().find_map(|(_, ty)| match &ty.inner {
        naga::TypeInner::Struct { span, .. } if ty.name.as_deref() == Some(name) => Some(*span),
        _ => None,
    })
}

fn module(name: &str) -> naga::Module {
    let set = ShaderSet::builtin();
    let source = set
        .iter()
        .find(|(file, _)| *file == name)
        .map(|(_, src)| src.to_string())
        .unwrap_or_else(|| panic!("no built-in shader {}", name));
    validate(name, &source).unwrap()
}

fn entry_points(module: &naga::Module) -> Vec<&str> {
    module.entry_points.iter().map(|e| e.name.as_str()).collect()
}

#[test]
fn test_every_builtin_shader_validates() {
    let set = ShaderSet::builtin();
    let mut checked = 0;
    for (name, source) in set.iter() {
        if let Err(e) = validate(name, source) {
            panic!("{}", e);
        }
        checked += 1;
    }
    assert_eq!(checked, SHADER_FILES.len());
}

#[test]
fn test_particle_layout_matches() {
    let size = std::mem::size_of::<Particle>() as u32;
    assert_eq!(size, 24);
    for name in ["update.wgsl", "add.wgsl", "splat.wgsl"] {
        assert_eq!(struct_span(&module(name), "Particle"), Some(size), "{}", name);
    }
}

#[test]
fn test_update_uniforms_layout() {
    let m = module("update.wgsl");
    assert_eq!(struct_span(&m, "Uniforms"), Some(48));
    assert_eq!(
        struct_span(&m, "ObstacleBox"),
        Some(std::mem::size_of::<ObstacleBox>() as u32)
    );
}

#[test]
fn test_primitive_layout_matches() {
    let m = module("primitives.wgsl");
    assert_eq!(
        struct_span(&m, "Primitive"),
        Some(std::mem::size_of::<Primitive>() as u32)
    );
    assert_eq!(std::mem::size_of::<PackedRgba>(), 8);
}

#[test]
fn test_small_uniform_blocks_are_one_row() {
    assert_eq!(struct_span(&module("splat.wgsl"), "FrameInfo"), Some(16));
    assert_eq!(struct_span(&module("resolve.wgsl"), "FrameInfo"), Some(16));
    assert_eq!(struct_span(&module("bloom.wgsl"), "BloomUniforms"), Some(16));
    assert_eq!(struct_span(&module("tonemap.wgsl"), "TonemapUniforms"), Some(16));
}

#[test]
fn test_kernels_treat_nan_lifetime_as_dead() {
    let set = ShaderSet::builtin();
    for name in ["add.wgsl", "update.wgsl"] {
        let (_, source) = set.iter().find(|(file, _)| *file == name).unwrap();
        assert!(source.contains("!(p.lifetime > 0.0)"), "{}", name);
    }
}

#[test]
fn test_entry_points() {
    assert_eq!(entry_points(&module("update.wgsl")), vec!["main"]);
    assert_eq!(entry_points(&module("add.wgsl")), vec!["main"]);
    assert_eq!(entry_points(&module("splat.wgsl")), vec!["main"]);

    let primitives = module("primitives.wgsl");
    for entry in ["vs_primitive", "vs_line", "fs_main"] {
        assert!(entry_points(&primitives).contains(&entry), "missing {}", entry);
    }

    let bloom = module("bloom.wgsl");
    for entry in ["vs_main", "fs_downsample", "fs_upsample"] {
        assert!(entry_points(&bloom).contains(&entry), "missing {}", entry);
    }

    for name in ["resolve.wgsl", "tonemap.wgsl", "blit.wgsl"] {
        let m = module(name);
        assert!(entry_points(&m).contains(&"vs_main"), "{}", name);
        assert!(entry_points(&m).contains(&"fs_main"), "{}", name);
    }
}
