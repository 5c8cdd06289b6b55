use crate::coords::Extent;

/// Largest supported power: factor 16.
const MAX_POWER: u32 = 4;

/// Power-of-two downscale ratio, applied to both axes.
///
/// `Factor::ONE` means no resizing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Factor(u32);

impl Factor {
    pub const ONE: Factor = Factor(1);
    pub const TWO: Factor = Factor(2);
    pub const FOUR: Factor = Factor(4);
    pub const EIGHT: Factor = Factor(8);
    pub const SIXTEEN: Factor = Factor(16);
    pub const MAX: Factor = Factor::SIXTEEN;

    /// Sample count per axis.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn power(self) -> u32 {
        self.0.trailing_zeros()
    }

    #[inline]
    pub const fn is_one(self) -> bool {
        self.0 == 1
    }

    /// Next factor up, or `None` at the ceiling.
    #[inline]
    fn doubled(self) -> Option<Self> {
        (self.power() < MAX_POWER).then(|| Factor(self.0 << 1))
    }
}

impl Default for Factor {
    fn default() -> Self {
        Self::ONE
    }
}

impl TryFrom<u32> for Factor {
    type Error = u32;

    /// Accepts 1, 2, 4, 8 and 16; returns the rejected value otherwise.
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if value.is_power_of_two() && value <= Self::MAX.0 {
            Ok(Factor(value))
        } else {
            Err(value)
        }
    }
}

impl std::fmt::Display for Factor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x", self.0)
    }
}

/// Picks the largest factor (at most `max`) that keeps `source / factor` at
/// least as large as `target` on both axes.
///
/// When source and target disagree on orientation (one portrait, one
/// landscape) the target is transposed first, so a rotated display still gets
/// a matching image. An empty target yields `Factor::ONE`.
pub fn select_factor(source: Extent, target: Extent, max: Factor) -> Factor {
    if target.is_empty() {
        return Factor::ONE;
    }

    // Heuristic: only exact rotations are recognized. A target whose aspect
    // matches neither the source nor its rotation is compared as-is.
    let target = if source.is_portrait() != target.is_portrait() {
        target.transposed()
    } else {
        target
    };

    let mut factor = Factor::ONE;
    let mut shrunk = source.halved();
    while factor < max && shrunk.covers(target) {
        let Some(next) = factor.doubled() else { break };
        factor = next;
        shrunk = shrunk.halved();
    }
    factor
}
