/*++

Licensed under the Apache-2.0 license.

File Name:

    acc.rs

Abstract:

    File contains the coefficient accumulator. Each cycle it folds one chain
    coefficient with the previously stored partial term, the running carry and
    the burst-boundary carry, then splits the sum into a resolved limb and a
    new carry.

--*/

use std::collections::VecDeque;

/// One resolved coefficient term.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolved {
    pub weight: usize,
    pub value: u32,
    /// No later burst contributes to this weight.
    pub final_term: bool,
}

/// The term accumulator.
///
/// The shadow queue keeps the most recently resolved terms. A term fetch
/// whose memory word was captured before the latest write to the same weight
/// is patched from the shadow, which is why its depth tracks the read
/// latency.
pub struct Accumulator {
    ww: u32,
    limb_mask: u128,
    carry0: u128,
    carry1: Option<(usize, u128)>,
    shadow: VecDeque<(usize, u32)>,
    shadow_depth: usize,
    fetched: Option<(usize, u32)>,
}

impl Accumulator {
    pub fn new(ww: u32, sramlat: u32) -> Self {
        Self {
            ww,
            limb_mask: u128::from(crate::mm::config::limb_mask(ww)),
            carry0: 0,
            carry1: None,
            shadow: VecDeque::new(),
            shadow_depth: sramlat as usize + 2,
            fetched: None,
        }
    }

    /// Accepts a term arriving from the product-term memory.
    pub fn deliver_term(&mut self, weight: usize, value: u32) {
        debug_assert!(self.fetched.is_none(), "unconsumed term fetch");
        self.fetched = Some((weight, value));
    }

    /// Resolves one coefficient: chain output in, limb plus carry out.
    pub fn process(&mut self, weight: usize, coefficient: u128, mustread: bool, final_term: bool) -> Resolved {
        let prior = if mustread {
            let (fetch_weight, raw) = self.fetched.take().unwrap_or((weight, 0));
            debug_assert_eq!(fetch_weight, weight, "term fetch out of step");
            self.bypass(fetch_weight).unwrap_or(raw)
        } else {
            debug_assert!(self.fetched.is_none(), "unexpected term fetch");
            0
        };

        let mut sum = coefficient + u128::from(prior) + self.carry0;
        if let Some((carry_weight, carry)) = self.carry1 {
            if carry_weight == weight {
                sum += carry;
                self.carry1 = None;
            }
        }

        let value = (sum & self.limb_mask) as u32;
        self.carry0 = sum >> self.ww;

        self.shadow.push_back((weight, value));
        if self.shadow.len() > self.shadow_depth {
            self.shadow.pop_front();
        }

        Resolved {
            weight,
            value,
            final_term,
        }
    }

    /// Parks the carry left over from a burst's flush term. It is folded
    /// back in when the next burst resolves exactly `carry_weight`.
    pub fn end_burst(&mut self, carry_weight: usize) {
        if self.carry0 != 0 {
            debug_assert!(self.carry1.is_none(), "burst carry overrun");
            self.carry1 = Some((carry_weight, self.carry0));
            self.carry0 = 0;
        }
    }

    /// A full phase always resolves to exactly the limbs it stores, so both
    /// carries must be spent by its final burst.
    pub fn end_phase(&mut self) {
        debug_assert_eq!(self.carry0, 0, "carry past the top weight");
        debug_assert!(self.carry1.is_none(), "burst carry past the phase");
        self.carry0 = 0;
        self.carry1 = None;
        self.shadow.clear();
        self.fetched = None;
    }

    pub fn reset(&mut self) {
        self.carry0 = 0;
        self.carry1 = None;
        self.shadow.clear();
        self.fetched = None;
    }

    fn bypass(&self, weight: usize) -> Option<u32> {
        self.shadow
            .iter()
            .rev()
            .find(|&&(w, _)| w == weight)
            .map(|&(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_carry_chain() {
        // ww = 4: limbs are nibbles.
        let mut acc = Accumulator::new(4, 1);
        let r = acc.process(0, 0x13, false, false);
        assert_eq!(r.value, 0x3);
        // 0x13 >> 4 carries into the next weight.
        let r = acc.process(1, 0x0, false, false);
        assert_eq!(r.value, 0x1);
        let r = acc.process(2, 0xff, false, true);
        assert_eq!(r.value, 0xf);
        let r = acc.process(3, 0x0, false, true);
        assert_eq!(r.value, 0xf);
    }

    #[test]
    fn test_prior_term_is_added() {
        let mut acc = Accumulator::new(8, 1);
        acc.deliver_term(5, 0x80);
        let r = acc.process(5, 0x85, true, false);
        assert_eq!(r.value, 0x05);
        let r = acc.process(6, 0x0, false, false);
        assert_eq!(r.value, 0x1);
    }

    #[test]
    fn test_burst_carry_applies_at_exact_weight() {
        let mut acc = Accumulator::new(8, 1);
        acc.process(2, 0x1ff, false, false);
        acc.end_burst(3);
        // Other weights resolve untouched by the parked carry.
        let r = acc.process(1, 0x5, false, false);
        assert_eq!(r.value, 0x5);
        // The parked carry lands only on weight 3.
        let r = acc.process(3, 0x2, false, false);
        assert_eq!(r.value, 0x2 + 0x1);
    }

    #[test]
    fn test_shadow_patches_stale_fetch() {
        let mut acc = Accumulator::new(8, 2);
        // Weight 7 resolves to 0x44 …
        acc.process(7, 0x44, false, false);
        // … and a fetch that captured the word before that write returns a
        // stale 0x11, which the shadow overrides.
        acc.deliver_term(7, 0x11);
        let r = acc.process(7, 0x10, true, false);
        assert_eq!(r.value, 0x54);
    }

    #[test]
    fn test_shadow_depth_is_bounded() {
        let mut acc = Accumulator::new(8, 1);
        // Depth is sramlat + 2 = 3; weight 0 falls out after three more
        // resolutions and the stale fetch value is used as-is.
        acc.process(0, 0x7, false, false);
        acc.process(1, 0x0, false, false);
        acc.process(2, 0x0, false, false);
        acc.process(3, 0x0, false, false);
        acc.deliver_term(0, 0x2);
        let r = acc.process(0, 0x0, true, false);
        assert_eq!(r.value, 0x2);
    }

    #[test]
    fn test_end_phase_clears_shadow() {
        let mut acc = Accumulator::new(8, 1);
        acc.process(3, 0x9, false, true);
        acc.end_phase();
        acc.deliver_term(3, 0x1);
        let r = acc.process(3, 0x0, true, false);
        assert_eq!(r.value, 0x1);
    }

    #[test]
    #[should_panic(expected = "carry past the top weight")]
    fn test_unspent_carry_is_fatal() {
        let mut acc = Accumulator::new(4, 1);
        acc.process(0, 0x13, false, true);
        acc.end_phase();
    }
}
