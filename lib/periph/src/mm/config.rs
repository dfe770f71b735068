/*++

Licensed under the Apache-2.0 license.

File Name:

    config.rs

Abstract:

    File contains the build-time parameters of the Montgomery multiplier and
    the per-width layout derived from them.

--*/

use std::fmt;

/// Words per operand page. Each operand (X, Y, P, P', Z) occupies one page.
pub const PAGE_WORDS: usize = 64;

/// Widest accumulation chain the model supports.
pub const MAX_CHAIN_BITS: u32 = 96;

/// Smallest supported modulus width in bits.
pub const MIN_NN: u32 = 8;

/// Build-time parameters of the multiplier instance.
///
/// These mirror what would be synthesis generics on the real block: they are
/// fixed when the peripheral is created and checked once, fatally, at that
/// point. Only `nn` can change afterwards, and only when `nn_dynamic` is set.
#[derive(Clone, Debug)]
pub struct MmConfig {
    /// Modulus width in bits.
    pub nn: u32,
    /// Limb width in bits.
    pub ww: u32,
    /// Number of multiply-accumulate units in the chain.
    pub ndsp: usize,
    /// Read latency of every memory bank, in cycles.
    pub sramlat: u32,
    /// Operands and result live in separate banks with their own clock
    /// resynchronization on the go/done handshake.
    pub split_rams: bool,
    /// The NN register accepts new widths while the block is idle.
    pub nn_dynamic: bool,
    /// Width of the accumulation chain running through the unit array.
    pub macc_chain_bits: u32,
}

impl Default for MmConfig {
    fn default() -> Self {
        Self {
            nn: 256,
            ww: 16,
            ndsp: 4,
            sramlat: 2,
            split_rams: false,
            nn_dynamic: false,
            macc_chain_bits: 48,
        }
    }
}

/// Rejected parameter combinations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    LimbWidthOutOfRange { ww: u32 },
    UnitCountOutOfRange { ndsp: usize },
    SramLatencyOutOfRange { sramlat: u32, max: u32 },
    ChainTooNarrow { required: u32, macc_chain_bits: u32 },
    ChainTooWide { macc_chain_bits: u32 },
    WidthOutOfRange { nn: u32, min: u32, max: u32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::LimbWidthOutOfRange { ww } => {
                write!(f, "limb width {} outside 4..=32", ww)
            }
            ConfigError::UnitCountOutOfRange { ndsp } => {
                write!(f, "unit count {} outside 1..=255", ndsp)
            }
            ConfigError::SramLatencyOutOfRange { sramlat, max } => {
                write!(f, "memory read latency {} outside 1..={}", sramlat, max)
            }
            ConfigError::ChainTooNarrow {
                required,
                macc_chain_bits,
            } => write!(
                f,
                "{}-bit accumulation chain cannot hold {}-bit partial products",
                macc_chain_bits, required
            ),
            ConfigError::ChainTooWide { macc_chain_bits } => write!(
                f,
                "{}-bit accumulation chain exceeds the {}-bit model limit",
                macc_chain_bits, MAX_CHAIN_BITS
            ),
            ConfigError::WidthOutOfRange { nn, min, max } => {
                write!(f, "modulus width {} outside {}..={}", nn, min, max)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl MmConfig {
    /// Checks every fixed parameter and the layout of the initial width.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(4..=32).contains(&self.ww) {
            return Err(ConfigError::LimbWidthOutOfRange { ww: self.ww });
        }
        if self.ndsp == 0 || self.ndsp > 255 {
            return Err(ConfigError::UnitCountOutOfRange { ndsp: self.ndsp });
        }
        // A unit's resident operand is reloaded for the next burst while the
        // tail of the current one is still draining; the interior slack only
        // covers that reuse distance for latencies up to ndsp + 3. The CSR
        // readout packs the latency into eight bits, which caps it further.
        let max_lat = (self.ndsp as u32 + 3).min(255);
        if self.sramlat == 0 || self.sramlat > max_lat {
            return Err(ConfigError::SramLatencyOutOfRange {
                sramlat: self.sramlat,
                max: max_lat,
            });
        }
        if self.macc_chain_bits > MAX_CHAIN_BITS {
            return Err(ConfigError::ChainTooWide {
                macc_chain_bits: self.macc_chain_bits,
            });
        }
        let required = 2 * self.ww + ceil_log2(self.ndsp) + 1;
        if required > self.macc_chain_bits {
            return Err(ConfigError::ChainTooNarrow {
                required,
                macc_chain_bits: self.macc_chain_bits,
            });
        }
        self.layout(self.nn).map(|_| ())
    }

    /// Derives the limb layout and burst schedule for a modulus width.
    ///
    /// All timing below is expressed in the canonical per-burst frame: active
    /// units load their resident limbs over the first `n` cycles, the streamed
    /// operand follows over `w` cycles, and the slack tail keeps consecutive
    /// bursts (or the end of the phase) free of port and register reuse
    /// hazards.
    pub fn layout(&self, nn: u32) -> Result<NnLayout, ConfigError> {
        let max_nn = PAGE_WORDS as u32 * self.ww - 4;
        if !(MIN_NN..=max_nn).contains(&nn) {
            return Err(ConfigError::WidthOutOfRange {
                nn,
                min: MIN_NN,
                max: max_nn,
            });
        }
        let w = ((nn + 4 + self.ww - 1) / self.ww) as usize;
        let wmin = ((nn + 2) / self.ww) as usize;
        let sh = (nn + 2) % self.ww;
        let bursts = (w + self.ndsp - 1) / self.ndsp;
        let last_units = w - (bursts - 1) * self.ndsp;
        debug_assert!(w <= PAGE_WORDS);
        debug_assert!(wmin < w);
        Ok(NnLayout {
            nn,
            w,
            wmin,
            sh,
            bursts,
            last_units,
            ndsp: self.ndsp,
            sramlat: self.sramlat,
        })
    }
}

/// Limb layout and burst schedule for one modulus width.
///
/// The redundant radix is `R = 2^(nn + 2)`; operands and results are carried
/// in `w = ceil((nn + 4) / ww)` limbs so that values up to `4 * P^2` stay
/// representable across a phase. `wmin` and `sh` locate the radix bit inside
/// the limb vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NnLayout {
    pub nn: u32,
    /// Limbs per operand.
    pub w: usize,
    /// Limb index holding the radix bit.
    pub wmin: usize,
    /// Bit offset of the radix bit inside limb `wmin`.
    pub sh: u32,
    /// Bursts per phase.
    pub bursts: usize,
    /// Active units in the final burst.
    pub last_units: usize,
    /// Unit count, copied from the fixed configuration.
    pub ndsp: usize,
    /// Memory read latency, copied from the fixed configuration.
    pub sramlat: u32,
}

impl NnLayout {
    /// Active units in the given burst.
    pub fn units(&self, burst: usize) -> usize {
        if burst + 1 == self.bursts {
            self.last_units
        } else {
            self.ndsp
        }
    }

    /// Weight of the first coefficient the given burst produces.
    pub fn base_weight(&self, burst: usize) -> usize {
        burst * self.ndsp
    }

    /// Coefficients the given burst produces, including the flush term.
    pub fn terms(&self, burst: usize) -> usize {
        self.w + self.units(burst)
    }

    /// Highest coefficient weight of a phase.
    pub fn top_weight(&self) -> usize {
        2 * self.w - 1
    }

    /// Limbs of the recoding operand alpha that carry information.
    pub fn alpha_limbs(&self) -> usize {
        if self.sh == 0 {
            self.wmin
        } else {
            self.wmin + 1
        }
    }

    /// Idle tail appended to the given burst.
    ///
    /// Interior bursts only need to keep the next burst's resident reload off
    /// the still-draining unit registers; the final burst of a phase waits for
    /// the full accumulate-resolve-shift pipeline to empty.
    pub fn slack(&self, burst: usize) -> u64 {
        let n = self.units(burst) as u64;
        let ndsp = self.ndsp as u64;
        let lat = u64::from(self.sramlat);
        if burst + 1 == self.bursts {
            n + ndsp + lat + 4
        } else {
            2 * ndsp + 4 - lat
        }
    }

    /// Cycles from the first resident read of a burst to the first resident
    /// read of the next (or to the end of the phase).
    pub fn burst_len(&self, burst: usize) -> u64 {
        self.units(burst) as u64 + self.w as u64 + self.slack(burst)
    }

    /// Cycles per phase. All three phases share the same schedule.
    pub fn phase_len(&self) -> u64 {
        (self.bursts as u64 - 1) * self.burst_len(0) + self.burst_len(self.bursts - 1)
    }
}

/// Mask selecting the low `ww` bits of a limb.
pub(crate) fn limb_mask(ww: u32) -> u32 {
    if ww == 32 {
        u32::MAX
    } else {
        (1u32 << ww) - 1
    }
}

fn ceil_log2(n: usize) -> u32 {
    if n <= 1 {
        0
    } else {
        usize::BITS - (n - 1).leading_zeros()
    }
}
