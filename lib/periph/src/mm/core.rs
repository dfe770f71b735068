/*++

Licensed under the Apache-2.0 license.

File Name:

    core.rs

Abstract:

    File contains the top level of the multiplier model. One call to `tick`
    advances the whole datapath by one compute-domain clock: memory pipes
    move, last cycle's results land in their banks, the producer issues this
    cycle's reads and window controls, the unit chain shifts, and the
    accumulator resolves at most one coefficient.

--*/

use crate::mm::acc::{Accumulator, Resolved};
use crate::mm::brl::Barrel;
use crate::mm::config::{ConfigError, MmConfig, NnLayout};
use crate::mm::ctrl::{phase_of, Context, Events, Phase, StateMachine, States};
use crate::mm::dsp::{MaccChain, UnitCtl};
use crate::mm::mem::{Memories, OperandPage, ReadTag, TramPage};
use crate::mm::pram::{self, TermStore};
use crate::mm::prod::Producer;

/// Writes resolved on one cycle and committed to their banks on the next.
#[derive(Default)]
struct PendingWrites {
    /// Product-term region of the term bank.
    term: Option<(usize, u32)>,
    /// Recoding-partial region of the term bank.
    alpha_partial: Option<(usize, u32)>,
    /// Working RAM page write.
    tram: Option<(TramPage, usize, u32)>,
    /// Result limb.
    z: Option<(usize, u32)>,
}

impl PendingWrites {
    fn is_empty(&self) -> bool {
        self.term.is_none()
            && self.alpha_partial.is_none()
            && self.tram.is_none()
            && self.z.is_none()
    }
}

/// The multiplier core.
///
/// Computes `X * Y * R^-1 mod P` for `R = 2^(nn+2)`, with the result in
/// `[0, 2P)`, in three phases over the same burst schedule: the operand
/// product, the recoding product that derives alpha, and the interleaved
/// accumulate whose upper limbs stream through the output shifter.
pub struct MmCore {
    cfg: MmConfig,
    layout: NnLayout,
    /// Layout restored by a soft reset.
    reset_layout: NnLayout,
    prod: Producer,
    chain: MaccChain,
    acc: Accumulator,
    brl: Barrel,
    terms: TermStore,
    mems: Memories,
    sm: StateMachine<Context>,
    ctls: Vec<UnitCtl>,
    phase_cycle: u64,
    /// Synchronizer ticks left in SyncIn or SyncOut.
    sync_left: u64,
    /// Ticks consumed by the operation in flight (or the last one).
    cycles: u64,
    op_done: bool,
    pending: PendingWrites,
}

impl MmCore {
    pub fn new(cfg: MmConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let layout = cfg.layout(cfg.nn)?;
        Ok(Self {
            prod: Producer::new(layout),
            chain: MaccChain::new(cfg.ndsp, cfg.macc_chain_bits),
            acc: Accumulator::new(cfg.ww, cfg.sramlat),
            brl: Barrel::new(cfg.ww, &layout),
            terms: TermStore::new(cfg.sramlat),
            mems: Memories::new(cfg.split_rams, cfg.sramlat),
            sm: StateMachine::new(Context),
            ctls: vec![UnitCtl::default(); cfg.ndsp],
            layout,
            reset_layout: layout,
            cfg,
            phase_cycle: 0,
            sync_left: 0,
            cycles: 0,
            op_done: false,
            pending: PendingWrites::default(),
        })
    }

    pub fn config(&self) -> &MmConfig {
        &self.cfg
    }

    pub fn layout(&self) -> &NnLayout {
        &self.layout
    }

    /// Current modulus width. Tracks `set_nn`, not the fixed configuration.
    pub fn nn(&self) -> u32 {
        self.layout.nn
    }

    /// Rebuilds the schedule for a new modulus width.
    ///
    /// Only legal while idle; the caller gates on readiness.
    pub fn set_nn(&mut self, nn: u32) -> Result<(), ConfigError> {
        debug_assert!(self.is_ready());
        let layout = self.cfg.layout(nn)?;
        self.layout = layout;
        self.prod.set_layout(layout);
        self.brl.set_layout(&layout);
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.sm.state(), States::Idle)
    }

    /// Phase of the operation in flight, if one is computing.
    pub fn phase(&self) -> Option<Phase> {
        phase_of(self.sm.state())
    }

    /// Ticks a complete operation takes under the current layout.
    pub fn predicted_ticks(&self) -> u64 {
        2 * self.sync_ticks() + 3 * self.layout.phase_len()
    }

    /// Ticks consumed by the operation in flight, or by the last completed
    /// one.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Returns the completion flag and clears it.
    pub fn take_done(&mut self) -> bool {
        let done = self.op_done;
        self.op_done = false;
        done
    }

    /// Starts an operation. Returns false (and does nothing) if one is
    /// already in flight.
    pub fn go(&mut self) -> bool {
        if self.sm.process_event(Events::Go).is_err() {
            return false;
        }
        self.reset_datapath();
        self.cycles = 0;
        self.op_done = false;
        self.sync_left = self.sync_ticks();
        log::debug!(
            "mm: go accepted, nn={} w={} bursts={} predicted_ticks={}",
            self.layout.nn,
            self.layout.w,
            self.layout.bursts,
            self.predicted_ticks()
        );
        true
    }

    /// Aborts any operation in flight and restores the reset-time layout.
    /// Memory contents persist.
    pub fn soft_reset(&mut self) {
        let _ = self.sm.process_event(Events::Reset);
        self.reset_datapath();
        self.layout = self.reset_layout;
        self.prod.set_layout(self.reset_layout);
        self.brl.set_layout(&self.reset_layout);
        self.op_done = false;
        self.sync_left = 0;
    }

    pub fn host_write_operand(&mut self, page: OperandPage, limb: usize, value: u32) {
        self.mems.host_write(page, limb, value);
    }

    pub fn host_read_operand(&self, page: OperandPage, limb: usize) -> u32 {
        self.mems.host_read(page, limb)
    }

    /// Advances the model by one compute-domain clock.
    pub fn tick(&mut self) {
        if self.is_ready() {
            return;
        }
        self.cycles += 1;
        if matches!(self.sm.state(), States::SyncIn) {
            self.sync_left -= 1;
            if self.sync_left == 0 {
                let _ = self.sm.process_event(Events::SyncDone);
                self.phase_cycle = 0;
            }
            return;
        }
        if matches!(self.sm.state(), States::SyncOut) {
            self.sync_left -= 1;
            if self.sync_left == 0 {
                let _ = self.sm.process_event(Events::SyncDone);
                self.op_done = true;
                log::debug!("mm: done after {} cycles", self.cycles);
            }
            return;
        }
        let phase = phase_of(self.sm.state());
        if let Some(phase) = phase {
            self.phase_tick(phase);
        }
    }

    /// Go/done handshake ticks on each side of the compute phases. With
    /// split banks the handshake crosses a second clock domain.
    fn sync_ticks(&self) -> u64 {
        if self.cfg.split_rams {
            3
        } else {
            1
        }
    }

    fn reset_datapath(&mut self) {
        self.chain.reset();
        self.acc.reset();
        self.brl.reset();
        self.terms.reset_pipe();
        self.mems.reset_pipes();
        self.pending = PendingWrites::default();
        self.phase_cycle = 0;
    }

    fn phase_tick(&mut self, phase: Phase) {
        let pos = self.prod.pos(self.phase_cycle);

        // Memory pipes move first; whatever was issued `sramlat` cycles ago
        // arrives now.
        let store_out = self.mems.store_tick();
        let tram_out = self.mems.tram_tick();
        let term_out = self.terms.tick();

        // Last cycle's resolved values land in their banks before any read
        // issued this cycle can capture them.
        self.apply_pending();

        self.prod.unit_ctls(self.phase_cycle, &mut self.ctls);

        let mut a_in = 0;
        for out in [store_out, tram_out] {
            if let Some((tag, data)) = out {
                match tag {
                    ReadTag::Resident { unit } => self.ctls[unit].load_b = Some(data),
                    ReadTag::Stream { .. } => a_in = data,
                    ReadTag::Term { .. } => debug_assert!(false, "term tag on an operand port"),
                }
            }
        }
        if let Some((weight, value)) = term_out {
            self.acc.deliver_term(weight, value);
        }

        self.prod.issue_reads(phase, &pos, &mut self.mems);
        if let Some((burst, t)) = self.prod.fetch_slot(self.phase_cycle) {
            if pram::mustread(phase, burst, t, &self.layout) {
                let weight = self.layout.base_weight(burst) + t;
                self.terms
                    .issue_fetch(phase, weight, self.layout.top_weight());
            }
        }

        let coefficient = self.chain.tick(a_in, &self.ctls);

        if let Some((burst, t)) = self.prod.coefficient_slot(self.phase_cycle) {
            let weight = self.layout.base_weight(burst) + t;
            let must = pram::mustread(phase, burst, t, &self.layout);
            let fin = pram::is_final(burst, t, &self.layout);
            let resolved = self.acc.process(weight, coefficient, must, fin);
            self.dispose(phase, resolved);
            if t + 1 == self.layout.terms(burst) {
                let carry_weight = self.layout.base_weight(burst) + self.layout.terms(burst);
                self.acc.end_burst(carry_weight);
            }
        }

        self.phase_cycle += 1;
        if self.phase_cycle == self.layout.phase_len() {
            self.end_phase();
        }
    }

    fn apply_pending(&mut self) {
        if let Some((weight, value)) = self.pending.term.take() {
            self.terms.write_term(weight, value);
        }
        if let Some((weight, value)) = self.pending.alpha_partial.take() {
            self.terms.write_alpha_partial(weight, value);
        }
        if let Some((page, limb, value)) = self.pending.tram.take() {
            self.mems.write_tram(page, limb, value);
        }
        if let Some((limb, value)) = self.pending.z.take() {
            self.mems.write_z(limb, value);
        }
    }

    /// Routes one resolved coefficient to its destination bank.
    ///
    /// The product phase keeps every term and retires final low limbs into
    /// the working S page. The recoding phase retires the masked alpha limbs
    /// (zero above the radix limb, so the interleave phase reads exactly `w`
    /// meaningful limbs) and stores sub-radix partials for later bursts. The
    /// interleave phase writes partials back over the product terms and
    /// streams final terms through the shifter into the result page.
    fn dispose(&mut self, phase: Phase, r: Resolved) {
        match phase {
            Phase::Xy => {
                self.pending.term = Some((r.weight, r.value));
                if r.final_term && r.weight < self.layout.w {
                    self.pending.tram = Some((TramPage::S, r.weight, r.value));
                }
            }
            Phase::Sp => {
                if r.final_term && r.weight < self.layout.w {
                    let value = if r.weight < self.layout.wmin {
                        r.value
                    } else if r.weight == self.layout.wmin && self.layout.sh > 0 {
                        r.value & ((1u32 << self.layout.sh) - 1)
                    } else {
                        0
                    };
                    self.pending.tram = Some((TramPage::Alpha, r.weight, value));
                } else if !r.final_term && r.weight <= self.layout.wmin {
                    self.pending.alpha_partial = Some((r.weight, r.value));
                }
            }
            Phase::Ap => {
                if r.final_term {
                    if let Some((limb, value)) = self.brl.consume(r.weight, r.value) {
                        self.pending.z = Some((limb, value));
                    }
                } else {
                    self.pending.term = Some((r.weight, r.value));
                }
            }
        }
    }

    fn end_phase(&mut self) {
        debug_assert!(self.pending.is_empty(), "writes left at phase boundary");
        if let Some(phase) = phase_of(self.sm.state()) {
            log::debug!("mm: {:?} phase complete at cycle {}", phase, self.cycles);
        }
        self.acc.end_phase();
        self.terms.unlock();
        self.brl.reset();
        self.phase_cycle = 0;
        let _ = self.sm.process_event(Events::PhaseDone);
        if matches!(self.sm.state(), States::SyncOut) {
            self.sync_left = self.sync_ticks();
        }
    }
}
