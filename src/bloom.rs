//! Bloom mip-chain bookkeeping.
//!
//! The GPU bloom filter is a chain of render passes over a half-resolution
//! scratch texture. [`BloomPlan`] works out, ahead of any GPU work, which
//! texture and mip each pass reads and writes, their sizes and the blend
//! strength, so the encoder in [`gpu::bloom`](crate::gpu::bloom) just walks
//! the list.
//!
//! For `passes = 3` on a `W x H` target:
//!
//! ```text
//! down: target (W)    -> scratch mip 0 (W/2)
//!       scratch mip 0 -> scratch mip 1 (W/4)
//!       scratch mip 1 -> scratch mip 2 (W/8)
//! up:   scratch mip 2 -> scratch mip 1   strength 1
//!       scratch mip 1 -> scratch mip 0   strength 1
//!       scratch mip 0 -> target          strength = configured
//! ```

/// A texture level touched by a bloom pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BloomLevel {
    /// The full-resolution HDR target.
    Target,
    /// A mip of the scratch texture.
    Scratch(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BloomPassKind {
    Downsample,
    Upsample,
}

/// One render pass of the bloom chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloomPass {
    pub kind: BloomPassKind,
    pub source: BloomLevel,
    pub source_extent: (u32, u32),
    pub target: BloomLevel,
    pub target_extent: (u32, u32),
    /// Blend weight of the written color. Downsample passes overwrite and use 1.
    pub strength: f32,
}

impl BloomPass {
    /// `1 / source_extent`, handed to the shader for tap offsets.
    pub fn source_texel(&self) -> [f32; 2] {
        [
            1.0 / self.source_extent.0 as f32,
            1.0 / self.source_extent.1 as f32,
        ]
    }
}

/// Largest pass count, up to `requested`, that keeps `extent >> passes` non-zero.
pub fn fitting_passes(extent: (u32, u32), requested: u32) -> u32 {
    let smallest = extent.0.min(extent.1);
    if smallest == 0 {
        return 0;
    }
    requested.min(smallest.ilog2())
}

/// The full pass list for one bloom configuration and target size.
#[derive(Debug, Clone, PartialEq)]
pub struct BloomPlan {
    extent: (u32, u32),
    width: f32,
    passes: Vec<BloomPass>,
}

impl BloomPlan {
    /// Plan a bloom over a `extent` target with `passes` mip levels.
    ///
    /// # Panics
    ///
    /// Panics if `extent >> passes` is zero on either axis. That means the pass
    /// count does not fit the render resolution, which is a configuration bug.
    pub fn new(extent: (u32, u32), passes: u32, strength: f32, width: f32) -> Self {
        let shifted = (
            extent.0.checked_shr(passes).unwrap_or(0),
            extent.1.checked_shr(passes).unwrap_or(0),
        );
        assert!(
            shifted.0 > 0 && shifted.1 > 0,
            "bloom target {}x{} is too small for {} passes",
            extent.0,
            extent.1,
            passes
        );

        let size_at = |level: BloomLevel| match level {
            BloomLevel::Target => extent,
            BloomLevel::Scratch(mip) => (extent.0 >> (mip + 1), extent.1 >> (mip + 1)),
        };

        let mut list = Vec::with_capacity(passes as usize * 2);

        for i in 0..passes {
            let source = if i == 0 {
                BloomLevel::Target
            } else {
                BloomLevel::Scratch(i - 1)
            };
            let target = BloomLevel::Scratch(i);
            list.push(BloomPass {
                kind: BloomPassKind::Downsample,
                source,
                source_extent: size_at(source),
                target,
                target_extent: size_at(target),
                strength: 1.0,
            });
        }

        for i in (0..passes).rev() {
            let source = BloomLevel::Scratch(i);
            let target = if i == 0 {
                BloomLevel::Target
            } else {
                BloomLevel::Scratch(i - 1)
            };
            list.push(BloomPass {
                kind: BloomPassKind::Upsample,
                source,
                source_extent: size_at(source),
                target,
                target_extent: size_at(target),
                strength: if i == 0 { strength } else { 1.0 },
            });
        }

        Self {
            extent,
            width,
            passes: list,
        }
    }

    pub fn extent(&self) -> (u32, u32) {
        self.extent
    }

    /// Size of mip 0 of the scratch texture.
    pub fn scratch_extent(&self) -> (u32, u32) {
        (self.extent.0 >> 1, self.extent.1 >> 1)
    }

    /// Mip count the scratch texture needs.
    pub fn scratch_mips(&self) -> u32 {
        (self.passes.len() / 2) as u32
    }

    /// Upsample filter radius.
    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn passes(&self) -> &[BloomPass] {
        &self.passes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_pass_chain() {
        let plan = BloomPlan::new((64, 32), 3, 0.25, 1.0);
        assert_eq!(plan.scratch_extent(), (32, 16));
        assert_eq!(plan.scratch_mips(), 3);

        let passes = plan.passes();
        assert_eq!(passes.len(), 6);

        assert_eq!(passes[0].source, BloomLevel::Target);
        assert_eq!(passes[0].source_extent, (64, 32));
        assert_eq!(passes[0].target, BloomLevel::Scratch(0));
        assert_eq!(passes[0].target_extent, (32, 16));

        assert_eq!(passes[2].source, BloomLevel::Scratch(1));
        assert_eq!(passes[2].target_extent, (8, 4));

        assert_eq!(passes[3].kind, BloomPassKind::Upsample);
        assert_eq!(passes[3].source, BloomLevel::Scratch(2));
        assert_eq!(passes[3].target, BloomLevel::Scratch(1));
        assert_eq!(passes[3].target_extent, (16, 8));

        assert_eq!(passes[5].source, BloomLevel::Scratch(0));
        assert_eq!(passes[5].target, BloomLevel::Target);
        assert_eq!(passes[5].target_extent, (64, 32));
    }

    #[test]
    fn test_strength_only_on_final_composite() {
        let plan = BloomPlan::new((256, 256), 4, 0.1, 1.0);
        let (last, rest) = plan.passes().split_last().unwrap();
        assert_eq!(last.strength, 0.1);
        assert!(rest.iter().all(|p| p.strength == 1.0));
    }

    #[test]
    fn test_fitting_passes_clamps_to_extent() {
        assert_eq!(fitting_passes((1280, 720), 6), 6);
        assert_eq!(fitting_passes((64, 8), 6), 3);
        assert_eq!(fitting_passes((1, 1), 6), 0);
        assert_eq!(fitting_passes((0, 100), 2), 0);
        let passes = fitting_passes((40, 12), 8);
        assert_eq!(BloomPlan::new((40, 12), passes, 1.0, 1.0).scratch_mips(), passes);
    }

    #[test]
    fn test_exact_fit_is_allowed() {
        let plan = BloomPlan::new((8, 8), 3, 1.0, 1.0);
        assert_eq!(plan.passes()[2].target_extent, (1, 1));
    }

    #[test]
    fn test_zero_passes_is_empty() {
        assert!(BloomPlan::new((4, 4), 0, 1.0, 1.0).passes().is_empty());
    }

    #[test]
    #[should_panic(expected = "too small")]
    fn test_degenerate_extent_panics() {
        BloomPlan::new((8, 100), 4, 1.0, 1.0);
    }

    #[test]
    #[should_panic(expected = "too small")]
    fn test_huge_pass_count_panics() {
        BloomPlan::new((1 << 20, 1 << 20), 40, 1.0, 1.0);
    }

    #[test]
    fn test_source_texel() {
        let plan = BloomPlan::new((100, 50), 1, 1.0, 1.0);
        assert_eq!(plan.passes()[0].source_texel(), [0.01, 0.02]);
    }
}
