/*++

Licensed under the Apache-2.0 license.

File Name:

    dsp.rs

Abstract:

    File contains the multiply-accumulate unit array. Each unit carries two
    A-cascade registers, a resident B register, a registered product and one
    stage of the accumulation chain; the chain output of the last unit feeds
    the accumulator one coefficient per cycle.

--*/

/// Per-cycle control of one unit.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnitCtl {
    /// Load the resident operand register with this limb.
    pub load_b: Option<u32>,
    /// Product register enable. While clear the product stage contributes
    /// zero, which keeps inactive units and out-of-window cycles from
    /// corrupting the chain.
    pub m_enable: bool,
    /// Chain register enable. While clear the chain stage holds zero.
    pub p_enable: bool,
}

#[derive(Clone, Copy, Default)]
struct MaccUnit {
    a1: u32,
    a2: u32,
    b: u32,
    m: u64,
}

/// The systolic unit array.
pub struct MaccChain {
    units: Vec<MaccUnit>,
    p: Vec<u128>,
    chain_mask: u128,
}

impl MaccChain {
    pub fn new(ndsp: usize, macc_chain_bits: u32) -> Self {
        Self {
            units: vec![MaccUnit::default(); ndsp],
            p: vec![0; ndsp],
            chain_mask: (1u128 << macc_chain_bits) - 1,
        }
    }

    pub fn ndsp(&self) -> usize {
        self.units.len()
    }

    /// Advances every register by one cycle and returns the chain output
    /// as captured at the end of the previous cycle.
    ///
    /// Update order matters: the chain stage consumes the previous product
    /// and previous upstream chain value, the product stage consumes the
    /// previous second cascade register, and the cascade shifts last.
    pub fn tick(&mut self, a_in: u32, ctl: &[UnitCtl]) -> u128 {
        debug_assert_eq!(ctl.len(), self.units.len());
        let n = self.units.len();
        let out = self.p[n - 1];

        for i in (0..n).rev() {
            let new_p = if ctl[i].p_enable {
                let upstream = if i == 0 { 0 } else { self.p[i - 1] };
                let p = upstream + u128::from(self.units[i].m);
                debug_assert!(p <= self.chain_mask, "accumulation chain overflow");
                p & self.chain_mask
            } else {
                0
            };
            self.p[i] = new_p;
        }

        for i in (0..n).rev() {
            let unit = &mut self.units[i];
            unit.m = if ctl[i].m_enable {
                u64::from(unit.a2) * u64::from(unit.b)
            } else {
                0
            };
            let cascade_in = if i == 0 {
                a_in
            } else {
                // The upstream unit's second cascade register, still holding
                // its value from the end of the previous cycle.
                self.units[i - 1].a2
            };
            let unit = &mut self.units[i];
            unit.a2 = unit.a1;
            unit.a1 = cascade_in;
            if let Some(b) = ctl[i].load_b {
                unit.b = b;
            }
        }

        out
    }

    pub fn reset(&mut self) {
        for unit in self.units.iter_mut() {
            *unit = MaccUnit::default();
        }
        for p in self.p.iter_mut() {
            *p = 0;
        }
    }
}
