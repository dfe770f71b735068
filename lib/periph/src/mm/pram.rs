/*++

Licensed under the Apache-2.0 license.

File Name:

    pram.rs

Abstract:

    File contains the product-term memory. The low region carries the running
    coefficient terms of the main product across all three phases; a separate
    region holds the sub-radix partials of the recoding phase so they never
    clobber the main terms.

--*/

use crate::mm::config::{NnLayout, PAGE_WORDS};
use crate::mm::ctrl::Phase;
use crate::mm::mem::{ReadTag, SyncRam};

const TERM_BASE: usize = 0;
const ALPHA_PARTIAL_BASE: usize = 2 * PAGE_WORDS;
const PRAM_WORDS: usize = 3 * PAGE_WORDS;

/// True when the coefficient `t` of `burst` folds a previously stored
/// partial term into the sum.
///
/// The product phases accumulate across bursts, so every non-flush term of a
/// later burst has a stored predecessor. The recoding phase only tracks
/// weights at or below the radix limb, and the interleave phase adds its
/// stream onto the main product terms unconditionally.
pub fn mustread(phase: Phase, burst: usize, t: usize, layout: &NnLayout) -> bool {
    let weight = layout.base_weight(burst) + t;
    match phase {
        Phase::Xy => burst > 0 && t < layout.w,
        Phase::Sp => burst > 0 && t < layout.w && weight <= layout.wmin,
        Phase::Ap => true,
    }
}

/// True when no later burst contributes to coefficient `t` of `burst`.
pub fn is_final(burst: usize, t: usize, layout: &NnLayout) -> bool {
    burst + 1 == layout.bursts || t < layout.ndsp
}

/// The product-term memory bank and its read lock.
pub struct TermStore {
    ram: SyncRam,
    /// Latched when the top weight of the interleave phase has been fetched;
    /// the stored value is dead from that point until the phase ends.
    rdlock: bool,
}

impl TermStore {
    pub fn new(latency: u32) -> Self {
        Self {
            ram: SyncRam::new("pram", PRAM_WORDS, latency),
            rdlock: false,
        }
    }

    pub fn tick(&mut self) -> Option<(usize, u32)> {
        match self.ram.tick() {
            Some((ReadTag::Term { weight }, val)) => Some((weight, val)),
            Some(_) => {
                debug_assert!(false, "foreign tag in term pipe");
                None
            }
            None => None,
        }
    }

    pub fn issue_fetch(&mut self, phase: Phase, weight: usize, top_weight: usize) {
        if self.rdlock {
            debug_assert!(false, "term fetch while locked");
            return;
        }
        let addr = match phase {
            Phase::Sp => ALPHA_PARTIAL_BASE + weight,
            Phase::Xy | Phase::Ap => TERM_BASE + weight,
        };
        self.ram.issue_read(addr, ReadTag::Term { weight });
        if phase == Phase::Ap && weight == top_weight {
            self.rdlock = true;
        }
    }

    pub fn write_term(&mut self, weight: usize, val: u32) {
        self.ram.write(TERM_BASE + weight, val);
    }

    pub fn write_alpha_partial(&mut self, weight: usize, val: u32) {
        self.ram.write(ALPHA_PARTIAL_BASE + weight, val);
    }

    pub fn locked(&self) -> bool {
        self.rdlock
    }

    /// Phase transitions (and resets) release the lock.
    pub fn unlock(&mut self) {
        self.rdlock = false;
    }

    pub fn reset_pipe(&mut self) {
        self.ram.reset_pipe();
        self.rdlock = false;
    }
}
