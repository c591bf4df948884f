//! Size partitioning for a generation run.
//!
//! Splits a byte budget across N files by randomized round-robin
//! water-filling:
//!
//! 1. every slot starts at `base_size`
//! 2. passes over the slots add a random increment in `[0, cap]`, clamped to
//!    what is left and rounded down to a whole record, until nothing is left
//! 3. the result is shuffled so size does not correlate with file index
//!
//! Every size stays a multiple of [`RECORD_WIDTH`] and the sizes always sum to
//! the (record-aligned) target.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConfigError, Error, Result};
use crate::record::RECORD_WIDTH;

/// Inputs to [`plan_sizes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionParams {
    /// Bytes the sizes must add up to. Rounded down to a whole record.
    pub target_total: u64,
    pub file_count: usize,
    /// Starting size of each slot; must be a whole number of records.
    pub base_size: u64,
    /// Largest increment added to a slot in one step.
    pub increment_cap: u64,
    /// Growth passes allowed before giving up.
    pub max_passes: u64,
}

impl PartitionParams {
    /// Record-aligned target.
    #[must_use]
    pub fn aligned_total(&self) -> u64 {
        self.target_total - self.target_total % RECORD_WIDTH
    }

    /// Bytes left to distribute after every slot gets `base_size`.
    pub fn initial_remaining(&self) -> Result<u64> {
        let floor = (self.file_count as u64)
            .checked_mul(self.base_size)
            .ok_or_else(|| validation("file_count * base_size overflows u64"))?;
        self.aligned_total().checked_sub(floor).ok_or_else(|| {
            validation(format!(
                "total size {} is smaller than {} files * base size {} = {floor}",
                self.aligned_total(),
                self.file_count,
                self.base_size
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.file_count == 0 {
            return Err(validation("file_count must be at least 1"));
        }
        if self.base_size % RECORD_WIDTH != 0 {
            return Err(validation(format!(
                "base size {} is not a multiple of {RECORD_WIDTH}",
                self.base_size
            )));
        }
        let remaining = self.initial_remaining()?;
        if remaining > 0 && self.increment_cap < RECORD_WIDTH {
            return Err(validation(format!(
                "increment cap {} is below one record ({RECORD_WIDTH} bytes); nothing can grow",
                self.increment_cap
            )));
        }
        if remaining > 0 && self.max_passes == 0 {
            return Err(validation("max_passes must be at least 1"));
        }
        Ok(())
    }
}

/// Ordered per-file byte counts for one generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizePlan {
    sizes: Vec<u64>,
    /// Growth passes the water-filling loop ran (0 for uniform plans).
    passes: u64,
}

impl SizePlan {
    /// `file_count` files of exactly `file_size` bytes each.
    pub fn uniform(file_count: usize, file_size: u64) -> Result<Self> {
        if file_count == 0 {
            return Err(validation("file_count must be at least 1"));
        }
        if file_size % RECORD_WIDTH != 0 {
            return Err(validation(format!(
                "file size {file_size} is not a multiple of {RECORD_WIDTH}"
            )));
        }
        (file_count as u64)
            .checked_mul(file_size)
            .ok_or_else(|| validation("file_count * file_size overflows u64"))?;
        Ok(Self {
            sizes: vec![file_size; file_count],
            passes: 0,
        })
    }

    #[must_use]
    pub fn sizes(&self) -> &[u64] {
        &self.sizes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    #[must_use]
    pub fn passes(&self) -> u64 {
        self.passes
    }

    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.sizes.iter().sum()
    }

    /// Records per file.
    pub fn record_counts(&self) -> impl Iterator<Item = u64> + '_ {
        self.sizes.iter().map(|size| size / RECORD_WIDTH)
    }
}

/// Compute a shuffled size plan that sums to the record-aligned target.
pub fn plan_sizes<R: Rng + ?Sized>(params: &PartitionParams, rng: &mut R) -> Result<SizePlan> {
    params.validate()?;

    let target = params.aligned_total();
    if target != params.target_total {
        warn!(
            requested = params.target_total,
            aligned = target,
            "Target size is not a whole number of records; rounding down"
        );
    }

    let mut sizes = vec![params.base_size; params.file_count];
    let mut remaining = params.initial_remaining()?;
    let mut passes = 0u64;

    'fill: while remaining > 0 {
        if passes == params.max_passes {
            return Err(ConfigError::NoConvergence { passes, remaining }.into());
        }
        passes += 1;

        for slot in &mut sizes {
            let draw = rng.random_range(0..=params.increment_cap).min(remaining);
            let step = draw - draw % RECORD_WIDTH;
            *slot += step;
            remaining -= step;
            if remaining == 0 {
                break 'fill;
            }
        }
    }

    sizes.shuffle(rng);

    for size in &mut sizes {
        *size -= *size % RECORD_WIDTH;
    }
    let total: u64 = sizes.iter().sum();
    if total != target {
        return Err(Error::InvariantViolation(format!(
            "size plan sums to {total}, expected {target}"
        )));
    }

    debug!(
        files = sizes.len(),
        total_bytes = total,
        passes,
        "Computed size plan"
    );

    Ok(SizePlan { sizes, passes })
}

fn validation(msg: impl Into<String>) -> Error {
    ConfigError::ValidationError(msg.into()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;

    fn params(target_total: u64, file_count: usize, base_size: u64) -> PartitionParams {
        PartitionParams {
            target_total,
            file_count,
            base_size,
            increment_cap: 2 * MIB,
            max_passes: 1_000_000,
        }
    }

    fn assert_plan_invariants(plan: &SizePlan, p: &PartitionParams) {
        assert_eq!(plan.len(), p.file_count);
        assert_eq!(plan.total_bytes(), p.aligned_total());
        for &size in plan.sizes() {
            assert_eq!(size % RECORD_WIDTH, 0, "size {size} not record aligned");
            assert!(size >= p.base_size, "size {size} below base {}", p.base_size);
        }
    }

    #[test]
    fn sums_to_target() {
        let p = params(100 * MIB, 100, 16 * KIB);
        let plan = plan_sizes(&p, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_plan_invariants(&plan, &p);
        assert!(plan.passes() >= 1);
    }

    #[test]
    fn small_scenario_grows_sixteen_bytes() {
        let p = params(64, 2, 24);
        for seed in 0..50 {
            let plan = plan_sizes(&p, &mut StdRng::seed_from_u64(seed)).unwrap();
            assert_plan_invariants(&plan, &p);
            let mut sorted = plan.sizes().to_vec();
            sorted.sort_unstable();
            assert!(
                sorted == [24, 40] || sorted == [32, 32],
                "unexpected plan {sorted:?}"
            );
        }
    }

    #[test]
    fn single_file_gets_everything() {
        let p = params(10 * MIB + 8, 1, 16 * KIB);
        let plan = plan_sizes(&p, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(plan.sizes(), &[10 * MIB + 8]);
    }

    #[test]
    fn unaligned_target_is_rounded_down() {
        let p = params(4096 + 5, 1, 8);
        let plan = plan_sizes(&p, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(plan.sizes(), &[4096]);
    }

    #[test]
    fn exact_floor_skips_growth() {
        let p = params(8 * 16 * KIB, 8, 16 * KIB);
        let plan = plan_sizes(&p, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(plan.passes(), 0);
        assert!(plan.sizes().iter().all(|&s| s == 16 * KIB));
    }

    #[test]
    fn target_below_floor_is_config_error() {
        let p = params(1000, 4, 256);
        let err = plan_sizes(&p, &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::ValidationError(_))));
    }

    #[test]
    fn zero_files_is_config_error() {
        let p = params(1024, 0, 8);
        assert!(plan_sizes(&p, &mut StdRng::seed_from_u64(0)).is_err());
    }

    #[test]
    fn unaligned_base_is_config_error() {
        let p = params(1024, 2, 12);
        assert!(plan_sizes(&p, &mut StdRng::seed_from_u64(0)).is_err());
    }

    #[test]
    fn tiny_cap_cannot_grow() {
        let p = PartitionParams {
            increment_cap: 7,
            ..params(1024, 2, 8)
        };
        assert!(plan_sizes(&p, &mut StdRng::seed_from_u64(0)).is_err());
    }

    #[test]
    fn pass_limit_reports_no_convergence() {
        let p = PartitionParams {
            increment_cap: 8,
            max_passes: 2,
            ..params(MIB, 2, 8)
        };
        let err = plan_sizes(&p, &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::NoConvergence { passes: 2, .. })
        ));
    }

    #[test]
    fn same_seed_same_plan() {
        let p = params(32 * MIB, 16, 16 * KIB);
        let a = plan_sizes(&p, &mut StdRng::seed_from_u64(77)).unwrap();
        let b = plan_sizes(&p, &mut StdRng::seed_from_u64(77)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn uniform_plan() {
        let plan = SizePlan::uniform(4, 1024).unwrap();
        assert_eq!(plan.sizes(), &[1024; 4]);
        assert_eq!(plan.record_counts().collect::<Vec<_>>(), vec![128; 4]);
        assert!(SizePlan::uniform(4, 1020).is_err());
        assert!(SizePlan::uniform(0, 1024).is_err());
    }
}
