/*++

Licensed under the Apache-2.0 license.

File Name:

    brl.rs

Abstract:

    File contains the result shifter. Final interleave-phase terms stream in
    with ascending weight; the shifter divides by the redundant radix on the
    fly by pairing each term with its predecessor and writes the result limbs
    out one behind the stream.

--*/

use crate::mm::config::{limb_mask, NnLayout};

/// The output barrel shifter.
pub struct Barrel {
    ww: u32,
    w: usize,
    wmin: usize,
    sh: u32,
    prev: Option<u32>,
}

impl Barrel {
    pub fn new(ww: u32, layout: &NnLayout) -> Self {
        Self {
            ww,
            w: layout.w,
            wmin: layout.wmin,
            sh: layout.sh,
            prev: None,
        }
    }

    /// Reconfigures the shifter for a new width. State is only retained
    /// within one phase, so this is legal whenever the block is idle.
    pub fn set_layout(&mut self, layout: &NnLayout) {
        self.w = layout.w;
        self.wmin = layout.wmin;
        self.sh = layout.sh;
        self.prev = None;
    }

    /// Consumes one final term and possibly emits one result limb.
    ///
    /// With the radix on a limb boundary every term at or above `wmin` maps
    /// straight to a result limb. Otherwise limb `u - wmin - 1` completes
    /// when term `u` arrives, as the OR of the two neighbors' shifted halves.
    pub fn consume(&mut self, weight: usize, value: u32) -> Option<(usize, u32)> {
        if weight < self.wmin {
            return None;
        }
        if self.sh == 0 {
            let limb = weight - self.wmin;
            if limb < self.w {
                return Some((limb, value));
            }
            return None;
        }
        let emitted = self.prev.map(|prev| {
            let lo = u64::from(prev) >> self.sh;
            let hi = u64::from(value) << (self.ww - self.sh);
            ((lo | hi) & u64::from(limb_mask(self.ww))) as u32
        });
        self.prev = Some(value);
        match emitted {
            Some(out) if weight > self.wmin && weight - self.wmin - 1 < self.w => {
                Some((weight - self.wmin - 1, out))
            }
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.prev = None;
    }
}
