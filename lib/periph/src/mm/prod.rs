/*++

Licensed under the Apache-2.0 license.

File Name:

    prod.rs

Abstract:

    File contains the operand producer: the deterministic per-cycle schedule
    of one phase. It places resident and stream reads on the memory ports,
    opens the unit product windows and pins down the cycle on which each
    coefficient reaches the accumulator.

--*/

use crate::mm::config::NnLayout;
use crate::mm::ctrl::Phase;
use crate::mm::dsp::UnitCtl;
use crate::mm::mem::{Memories, OperandPage, ReadTag, TramPage};

/// Position of a phase cycle inside its burst frame.
///
/// A burst frame spans the cycles from one burst's first resident read to the
/// next. Reads are frame-local, but the accumulate stream of a burst may
/// trail into the following frames, so coefficient positions are tabulated
/// against absolute phase cycles instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BurstPos {
    pub burst: usize,
    /// Frame-relative cycle.
    pub cycle: u64,
}

/// The phase sequencer.
///
/// All three phases run the identical schedule; only the pages the reads
/// target differ. The coefficient and fetch tables are rebuilt whenever the
/// width changes, and their construction doubles as a proof that the
/// accumulator consumes at most one coefficient per cycle.
pub struct Producer {
    layout: NnLayout,
    burst_start: Vec<u64>,
    /// Indexed by phase cycle: the (burst, t) whose chain output the
    /// accumulator consumes on that cycle.
    coeff: Vec<Option<(usize, usize)>>,
    /// Indexed by phase cycle: the (burst, t) whose stored term is fetched
    /// on that cycle so it arrives alongside the chain output.
    fetch: Vec<Option<(usize, usize)>>,
}

impl Producer {
    pub fn new(layout: NnLayout) -> Self {
        let mut prod = Self {
            layout,
            burst_start: Vec::new(),
            coeff: Vec::new(),
            fetch: Vec::new(),
        };
        prod.rebuild();
        prod
    }

    pub fn set_layout(&mut self, layout: NnLayout) {
        self.layout = layout;
        self.rebuild();
    }

    pub fn layout(&self) -> &NnLayout {
        &self.layout
    }

    fn rebuild(&mut self) {
        let l = &self.layout;
        let len = l.phase_len() as usize;
        self.burst_start.clear();
        self.coeff.clear();
        self.coeff.resize(len, None);
        self.fetch.clear();
        self.fetch.resize(len, None);

        let mut start = 0u64;
        for burst in 0..l.bursts {
            self.burst_start.push(start);
            let n = l.units(burst) as u64;
            let lat = u64::from(l.sramlat);
            // Coefficient t of a burst reaches the accumulator n + ndsp +
            // sramlat + 3 cycles into the burst; its term fetch leads that by
            // the read latency.
            let coeff_base = start + n + l.ndsp as u64 + lat + 3;
            let fetch_base = coeff_base - lat;
            for t in 0..l.terms(burst) {
                let cc = (coeff_base + t as u64) as usize;
                let fc = (fetch_base + t as u64) as usize;
                debug_assert!(cc < len && fc < len);
                debug_assert!(self.coeff[cc].is_none(), "coefficient slot collision");
                debug_assert!(self.fetch[fc].is_none(), "fetch slot collision");
                self.coeff[cc] = Some((burst, t));
                self.fetch[fc] = Some((burst, t));
            }
            start += l.burst_len(burst);
        }
        debug_assert_eq!(start, l.phase_len());
    }

    /// Maps a phase cycle to its burst frame.
    pub fn pos(&self, phase_cycle: u64) -> BurstPos {
        let l = &self.layout;
        let interior = l.burst_len(0);
        let body = (l.bursts as u64 - 1) * interior;
        if phase_cycle < body {
            BurstPos {
                burst: (phase_cycle / interior) as usize,
                cycle: phase_cycle % interior,
            }
        } else {
            BurstPos {
                burst: l.bursts - 1,
                cycle: phase_cycle - body,
            }
        }
    }

    /// Issues this cycle's operand reads.
    ///
    /// The resident operand of the burst loads over cycles `0..n`, one limb
    /// per unit; the streamed operand follows over the next `w` cycles. The
    /// product phase takes both from the operand bank, the later phases take
    /// their resident pages from the working RAM.
    pub fn issue_reads(&self, phase: Phase, pos: &BurstPos, mems: &mut Memories) {
        let l = &self.layout;
        let n = l.units(pos.burst) as u64;
        if pos.cycle < n {
            let limb = l.base_weight(pos.burst) + pos.cycle as usize;
            let tag = ReadTag::Resident {
                unit: pos.cycle as usize,
            };
            match phase {
                Phase::Xy => mems.issue_operand_read(OperandPage::X, limb, tag),
                Phase::Sp => mems.issue_tram_read(TramPage::S, limb, tag),
                Phase::Ap => mems.issue_tram_read(TramPage::Alpha, limb, tag),
            }
        } else if pos.cycle < n + l.w as u64 {
            let limb = (pos.cycle - n) as usize;
            let tag = ReadTag::Stream { limb };
            let page = match phase {
                Phase::Xy => OperandPage::Y,
                Phase::Sp => OperandPage::Pprime,
                Phase::Ap => OperandPage::P,
            };
            mems.issue_operand_read(page, limb, tag);
        }
    }

    /// Fills in the product and chain window controls for this cycle.
    ///
    /// Unit `i` multiplies stream limbs `0..w` against its resident limb over
    /// the window opening `n + sramlat + 2 + 2i` cycles into the unit's
    /// burst, the cascade delay of limb 0 at its position. Inactive units
    /// never open their window. Chain registers release one unit per cycle at
    /// the start of the phase and stay enabled so trailing bursts drain
    /// through.
    pub fn unit_ctls(&self, phase_cycle: u64, ctls: &mut [UnitCtl]) {
        let l = &self.layout;
        let frame = self.pos(phase_cycle).burst;
        let first_units = l.units(0) as u64;
        let lat = u64::from(l.sramlat);
        for (i, ctl) in ctls.iter_mut().enumerate() {
            ctl.load_b = None;
            // A window can trail past its frame, but never further than the
            // next one, so the current and previous bursts cover every case.
            ctl.m_enable = (frame.saturating_sub(1)..=frame).any(|burst| {
                i < l.units(burst) && {
                    let n = l.units(burst) as u64;
                    let open = self.burst_start[burst] + n + lat + 2 + 2 * i as u64;
                    phase_cycle >= open && phase_cycle < open + l.w as u64
                }
            });
            ctl.p_enable = phase_cycle >= first_units + lat + 3 + i as u64;
        }
    }

    /// The (burst, t) whose chain output the accumulator consumes this
    /// cycle.
    pub fn coefficient_slot(&self, phase_cycle: u64) -> Option<(usize, usize)> {
        self.coeff[phase_cycle as usize]
    }

    /// The (burst, t) whose stored term must be fetched this cycle.
    pub fn fetch_slot(&self, phase_cycle: u64) -> Option<(usize, usize)> {
        self.fetch[phase_cycle as usize]
    }
}
