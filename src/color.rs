//! Half-precision color and vector packing.
//!
//! Emissive colors travel as two `u32` words, each holding a pair of IEEE 754
//! half floats (`RG` in the first word, `BA` in the second). Velocities use a
//! single word holding `XY`. The layout matches WGSL's `pack2x16float` /
//! `unpack2x16float`, so the same bytes are valid on both sides of the bus.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec4};
use half::f16;

/// Pack two floats into one word, low half first (same as WGSL `pack2x16float`).
#[inline]
pub fn pack_half2(a: f32, b: f32) -> u32 {
    let lo = f16::from_f32(a).to_bits() as u32;
    let hi = f16::from_f32(b).to_bits() as u32;
    lo | (hi << 16)
}

/// Inverse of [`pack_half2`].
#[inline]
pub fn unpack_half2(word: u32) -> (f32, f32) {
    let lo = f16::from_bits((word & 0xFFFF) as u16).to_f32();
    let hi = f16::from_bits((word >> 16) as u16).to_f32();
    (lo, hi)
}

/// An RGBA color stored as four half floats.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct PackedRgba(pub [u32; 2]);

impl PackedRgba {
    /// Fully transparent black.
    pub const ZERO: Self = Self([0, 0]);

    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self([pack_half2(r, g), pack_half2(b, a)])
    }

    /// Unpack to linear floats.
    pub fn to_vec4(self) -> Vec4 {
        let (r, g) = unpack_half2(self.0[0]);
        let (b, a) = unpack_half2(self.0[1]);
        Vec4::new(r, g, b, a)
    }
}

impl From<Vec4> for PackedRgba {
    fn from(c: Vec4) -> Self {
        Self::new(c.x, c.y, c.z, c.w)
    }
}

impl From<PackedRgba> for Vec4 {
    fn from(c: PackedRgba) -> Self {
        c.to_vec4()
    }
}

/// A 2D vector stored as two half floats.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct PackedVec2(pub u32);

impl PackedVec2 {
    pub const ZERO: Self = Self(0);

    pub fn to_vec2(self) -> Vec2 {
        let (x, y) = unpack_half2(self.0);
        Vec2::new(x, y)
    }
}

impl From<Vec2> for PackedVec2 {
    fn from(v: Vec2) -> Self {
        Self(pack_half2(v.x, v.y))
    }
}

impl From<PackedVec2> for Vec2 {
    fn from(v: PackedVec2) -> Self {
        v.to_vec2()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_word_layout_matches_pack2x16float() {
        // 1.0 in binary16 is 0x3C00, 2.0 is 0x4000
        assert_eq!(pack_half2(1.0, 2.0), 0x4000_3C00);
        assert_eq!(pack_half2(0.0, 0.0), 0);
    }

    #[test]
    fn test_hdr_range_survives_packing() {
        // Flicker tones run up to 200; bloom relies on values well above 1.0
        let c = PackedRgba::new(200.0, 0.5, 1024.0, 1.0).to_vec4();
        assert_eq!(c, Vec4::new(200.0, 0.5, 1024.0, 1.0));
    }

    #[test]
    fn test_half_precision_rounding() {
        let v = PackedVec2::from(Vec2::new(0.1, -3.3)).to_vec2();
        assert!((v.x - 0.1).abs() < 1e-3);
        assert!((v.y + 3.3).abs() < 3e-3);
    }

    #[test]
    fn test_zero_is_all_bits_clear() {
        assert_eq!(PackedRgba::from(Vec4::ZERO), PackedRgba::ZERO);
        assert_eq!(PackedVec2::from(Vec2::ZERO), PackedVec2::ZERO);
    }
}
