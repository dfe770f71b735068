/*++

Licensed under the Apache-2.0 license.

File Name:

    mont_mul.rs

Abstract:

    File contains the bus-facing Montgomery multiplier peripheral.

--*/

use crate::mm::{limb_mask, ConfigError, MmConfig, MmCore, OperandPage, Phase};
use ecmm_emu_bus::{
    ActionHandle, BusError, Clock, ReadOnlyRegister, ReadWriteRegister, Timer, WriteOnlyRegister,
};
use ecmm_emu_derive::Bus;
use ecmm_emu_types::{EmuData, EmuSize};
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::register_bitfields;
use tock_registers::registers::InMemoryRegister;

register_bitfields! [
    u32,

    /// Control Register Fields
    Control [
        GO OFFSET(0) NUMBITS(1) [],
        RSVD OFFSET(1) NUMBITS(31) [],
    ],

    /// Status Register Fields
    Status [
        READY OFFSET(0) NUMBITS(1) [],
        VALID OFFSET(1) NUMBITS(1) [],
        BUSY OFFSET(2) NUMBITS(1) [],
        PHASE OFFSET(3) NUMBITS(2) [
            IDLE = 0,
            XY = 1,
            SP = 2,
            AP = 3,
        ],
        RSVD OFFSET(5) NUMBITS(27) [],
    ],

    /// Build Configuration Register Fields
    Config [
        NDSP OFFSET(0) NUMBITS(8) [],
        SRAMLAT OFFSET(8) NUMBITS(8) [],
        WW OFFSET(16) NUMBITS(6) [],
        RSVD OFFSET(22) NUMBITS(2) [],
        SPLIT OFFSET(24) NUMBITS(1) [],
        NN_DYN OFFSET(25) NUMBITS(1) [],
    ],

    /// Interrupt Enable Register Fields
    IrqEnable [
        DONE OFFSET(0) NUMBITS(1) [],
        RSVD OFFSET(1) NUMBITS(31) [],
    ],

    /// Interrupt Status Register Fields
    IrqStatus [
        DONE OFFSET(0) NUMBITS(1) [],
        RSVD OFFSET(1) NUMBITS(31) [],
    ],
];

/// Montgomery Multiplier Peripheral
#[derive(Bus)]
#[poll_fn(bus_poll)]
#[warm_reset_fn(bus_warm_reset)]
pub struct MontMul {
    /// Name 0 register
    #[register(offset = 0x0000_0000)]
    name0: ReadOnlyRegister<u32>,

    /// Name 1 register
    #[register(offset = 0x0000_0004)]
    name1: ReadOnlyRegister<u32>,

    /// Version 0 register
    #[register(offset = 0x0000_0008)]
    version0: ReadOnlyRegister<u32>,

    /// Version 1 register
    #[register(offset = 0x0000_000c)]
    version1: ReadOnlyRegister<u32>,

    /// Control register
    #[register(offset = 0x0000_0010, write_fn = on_write_control)]
    control: ReadWriteRegister<u32, Control::Register>,

    /// Build configuration register
    #[register(offset = 0x0000_0018)]
    config: ReadOnlyRegister<u32, Config::Register>,

    /// Interrupt enable register
    #[register(offset = 0x0000_0028)]
    irq_enable: ReadWriteRegister<u32, IrqEnable::Register>,

    /// Interrupt status register, write-one-to-clear
    #[register(offset = 0x0000_002c, write_fn = on_write_irq_status)]
    irq_status: ReadWriteRegister<u32, IrqStatus::Register>,

    /// Soft reset register
    #[register(offset = 0x0000_0030, write_fn = on_write_soft_reset)]
    soft_reset: WriteOnlyRegister<u32>,

    /// Registers computed on access: status, the operand width, the cycle
    /// counter pair and the five operand windows.
    #[register(offset = 0x0000_0014, read_fn = on_read_status, write_fn = on_write_read_only)]
    #[register(offset = 0x0000_001c, read_fn = on_read_nn, write_fn = on_write_nn)]
    #[register(offset = 0x0000_0020, read_fn = on_read_cycles_lo, write_fn = on_write_read_only)]
    #[register(offset = 0x0000_0024, read_fn = on_read_cycles_hi, write_fn = on_write_read_only)]
    #[register_array(offset = 0x0000_0100, item_size = 4, len = 64, read_fn = on_read_x, write_fn = on_write_x)]
    #[register_array(offset = 0x0000_0200, item_size = 4, len = 64, read_fn = on_read_y, write_fn = on_write_y)]
    #[register_array(offset = 0x0000_0300, item_size = 4, len = 64, read_fn = on_read_p, write_fn = on_write_p)]
    #[register_array(offset = 0x0000_0400, item_size = 4, len = 64, read_fn = on_read_pprime, write_fn = on_write_pprime)]
    #[register_array(offset = 0x0000_0500, item_size = 4, len = 64, read_fn = on_read_result, write_fn = on_write_result)]
    _fieldless_regs: (),

    /// Multiplier datapath model
    core: MmCore,

    /// Result-valid flag; set when an operation retires, cleared by go
    valid: bool,

    /// Timer
    timer: Timer,

    /// Clock time the datapath was last stepped to
    last_step_time: u64,

    /// Pending poll while an operation is in flight
    op_poll_action: Option<ActionHandle>,
}

impl MontMul {
    /// Name0 Register Value
    const NAME0_VAL: EmuData = 0x746E6F6D; // mont
    /// Name1 Register Value
    const NAME1_VAL: EmuData = 0x006C756D; // mul

    /// Version0 Register Value
    const VERSION0_VAL: EmuData = 0x30302E31; // 1.00
    /// Version1 Register Value
    const VERSION1_VAL: EmuData = 0x00000000;

    /// Creates a new multiplier with the given build parameters.
    ///
    /// # Errors
    ///
    /// * `ConfigError` - When the parameters describe a block that could not
    ///   be synthesized. Nothing is recoverable about that; callers are
    ///   expected to treat it as fatal.
    pub fn new(clock: &Clock, cfg: MmConfig) -> Result<Self, ConfigError> {
        let core = MmCore::new(cfg)?;
        let cfg = core.config();
        let config = Config::NDSP.val(cfg.ndsp as u32)
            + Config::SRAMLAT.val(cfg.sramlat)
            + Config::WW.val(cfg.ww)
            + Config::SPLIT.val(cfg.split_rams as u32)
            + Config::NN_DYN.val(cfg.nn_dynamic as u32);
        Ok(Self {
            name0: ReadOnlyRegister::new(Self::NAME0_VAL),
            name1: ReadOnlyRegister::new(Self::NAME1_VAL),
            version0: ReadOnlyRegister::new(Self::VERSION0_VAL),
            version1: ReadOnlyRegister::new(Self::VERSION1_VAL),
            control: ReadWriteRegister::new(0),
            config: ReadOnlyRegister::new(config.value),
            irq_enable: ReadWriteRegister::new(0),
            irq_status: ReadWriteRegister::new(0),
            soft_reset: WriteOnlyRegister::new(0),
            _fieldless_regs: (),
            core,
            valid: false,
            timer: Timer::new(clock),
            last_step_time: 0,
            op_poll_action: None,
        })
    }

    /// On Write callback for `control` register
    ///
    /// The GO bit self-clears; the stored register always reads zero.
    fn on_write_control(&mut self, size: EmuSize, val: EmuData) -> Result<(), BusError> {
        if size != EmuSize::Word {
            Err(BusError::StoreAccessFault)?
        }
        let control = InMemoryRegister::<u32, Control::Register>::new(val);
        if control.is_set(Control::GO) {
            if self.core.go() {
                self.valid = false;
                self.last_step_time = self.timer.now();
                self.op_poll_action = Some(self.timer.schedule_poll_in(1));
            } else {
                log::debug!("mont_mul: GO while an operation is in flight; dropped");
            }
        }
        Ok(())
    }

    /// On Read callback for `status` register
    fn on_read_status(&self, size: EmuSize) -> Result<EmuData, BusError> {
        if size != EmuSize::Word {
            Err(BusError::LoadAccessFault)?
        }
        let phase = match self.core.phase() {
            None => Status::PHASE::IDLE,
            Some(Phase::Xy) => Status::PHASE::XY,
            Some(Phase::Sp) => Status::PHASE::SP,
            Some(Phase::Ap) => Status::PHASE::AP,
        };
        let status = Status::READY.val(self.core.is_ready() as u32)
            + Status::VALID.val(self.valid as u32)
            + Status::BUSY.val(!self.core.is_ready() as u32)
            + phase;
        Ok(status.value)
    }

    /// On Read callback for `nn` register
    fn on_read_nn(&self, size: EmuSize) -> Result<EmuData, BusError> {
        if size != EmuSize::Word {
            Err(BusError::LoadAccessFault)?
        }
        Ok(self.core.nn())
    }

    /// On Write callback for `nn` register
    ///
    /// Accepted only when the build allows dynamic widths and the block is
    /// idle; anything else leaves the current layout untouched.
    fn on_write_nn(&mut self, size: EmuSize, val: EmuData) -> Result<(), BusError> {
        if size != EmuSize::Word {
            Err(BusError::StoreAccessFault)?
        }
        if !self.core.config().nn_dynamic {
            log::debug!("mont_mul: NN is fixed in this build; write of {} dropped", val);
            return Ok(());
        }
        if !self.core.is_ready() {
            log::debug!("mont_mul: NN write while busy dropped");
            return Ok(());
        }
        if let Err(err) = self.core.set_nn(val) {
            log::debug!("mont_mul: NN write of {} rejected: {}", val, err);
        }
        Ok(())
    }

    /// On Read callback for `cycles_lo` register
    fn on_read_cycles_lo(&self, size: EmuSize) -> Result<EmuData, BusError> {
        if size != EmuSize::Word {
            Err(BusError::LoadAccessFault)?
        }
        Ok(self.core.cycles() as u32)
    }

    /// On Read callback for `cycles_hi` register
    fn on_read_cycles_hi(&self, size: EmuSize) -> Result<EmuData, BusError> {
        if size != EmuSize::Word {
            Err(BusError::LoadAccessFault)?
        }
        Ok((self.core.cycles() >> 32) as u32)
    }

    /// On Write callback shared by the read-only computed registers
    fn on_write_read_only(&mut self, _size: EmuSize, _val: EmuData) -> Result<(), BusError> {
        Err(BusError::StoreAccessFault)
    }

    /// On Write callback for `irq_status` register
    fn on_write_irq_status(&mut self, size: EmuSize, val: EmuData) -> Result<(), BusError> {
        if size != EmuSize::Word {
            Err(BusError::StoreAccessFault)?
        }
        // Write-one-to-clear.
        self.irq_status.reg.set(self.irq_status.reg.get() & !val);
        Ok(())
    }

    /// On Write callback for `soft_reset` register
    ///
    /// Any write value forces the reset.
    fn on_write_soft_reset(&mut self, size: EmuSize, _val: EmuData) -> Result<(), BusError> {
        if size != EmuSize::Word {
            Err(BusError::StoreAccessFault)?
        }
        self.reset_engine();
        Ok(())
    }

    /// On Read callback for the `x` operand window
    fn on_read_x(&self, size: EmuSize, index: usize) -> Result<EmuData, BusError> {
        self.operand_read(size, OperandPage::X, index)
    }

    /// On Write callback for the `x` operand window
    fn on_write_x(&mut self, size: EmuSize, index: usize, val: EmuData) -> Result<(), BusError> {
        self.operand_write(size, OperandPage::X, index, val)
    }

    /// On Read callback for the `y` operand window
    fn on_read_y(&self, size: EmuSize, index: usize) -> Result<EmuData, BusError> {
        self.operand_read(size, OperandPage::Y, index)
    }

    /// On Write callback for the `y` operand window
    fn on_write_y(&mut self, size: EmuSize, index: usize, val: EmuData) -> Result<(), BusError> {
        self.operand_write(size, OperandPage::Y, index, val)
    }

    /// On Read callback for the `p` operand window
    fn on_read_p(&self, size: EmuSize, index: usize) -> Result<EmuData, BusError> {
        self.operand_read(size, OperandPage::P, index)
    }

    /// On Write callback for the `p` operand window
    fn on_write_p(&mut self, size: EmuSize, index: usize, val: EmuData) -> Result<(), BusError> {
        self.operand_write(size, OperandPage::P, index, val)
    }

    /// On Read callback for the `p_prime` operand window
    fn on_read_pprime(&self, size: EmuSize, index: usize) -> Result<EmuData, BusError> {
        self.operand_read(size, OperandPage::Pprime, index)
    }

    /// On Write callback for the `p_prime` operand window
    fn on_write_pprime(
        &mut self,
        size: EmuSize,
        index: usize,
        val: EmuData,
    ) -> Result<(), BusError> {
        self.operand_write(size, OperandPage::Pprime, index, val)
    }

    /// On Read callback for the `result` window
    fn on_read_result(&self, size: EmuSize, index: usize) -> Result<EmuData, BusError> {
        self.operand_read(size, OperandPage::Z, index)
    }

    /// On Write callback for the `result` window
    fn on_write_result(
        &mut self,
        _size: EmuSize,
        _index: usize,
        _val: EmuData,
    ) -> Result<(), BusError> {
        Err(BusError::StoreAccessFault)
    }

    fn operand_read(
        &self,
        size: EmuSize,
        page: OperandPage,
        index: usize,
    ) -> Result<EmuData, BusError> {
        if size != EmuSize::Word {
            Err(BusError::LoadAccessFault)?
        }
        Ok(self.core.host_read_operand(page, index))
    }

    /// Operand writes land only while the block is idle; a write during an
    /// operation is dropped, matching the locked host port of the real block.
    fn operand_write(
        &mut self,
        size: EmuSize,
        page: OperandPage,
        index: usize,
        val: EmuData,
    ) -> Result<(), BusError> {
        if size != EmuSize::Word {
            Err(BusError::StoreAccessFault)?
        }
        if !self.core.is_ready() {
            log::debug!("mont_mul: operand write while busy dropped");
            return Ok(());
        }
        self.core
            .host_write_operand(page, index, val & limb_mask(self.core.config().ww));
        Ok(())
    }

    /// Aborts any operation in flight and clears the interrupt state.
    /// Operand memory contents persist across the reset.
    fn reset_engine(&mut self) {
        self.core.soft_reset();
        if let Some(action) = self.op_poll_action.take() {
            self.timer.cancel(action);
        }
        self.valid = false;
        self.control.reg.set(0);
        self.irq_enable.reg.set(0);
        self.irq_status.reg.set(0);
    }

    /// Called by Bus::poll() to advance the datapath to the current time.
    fn bus_poll(&mut self) {
        if self.timer.fired(&mut self.op_poll_action) {
            let now = self.timer.now();
            let delta = now.saturating_sub(self.last_step_time);
            self.last_step_time = now;
            for _ in 0..delta {
                self.core.tick();
            }
            if self.core.take_done() {
                self.valid = true;
                if self.irq_enable.reg.is_set(IrqEnable::DONE) {
                    self.irq_status.reg.modify(IrqStatus::DONE::SET);
                }
            }
            if !self.core.is_ready() {
                self.op_poll_action = Some(self.timer.schedule_poll_in(1));
            }
        }
    }

    /// Called by Bus::warm_reset() on a warm reset cycle.
    fn bus_warm_reset(&mut self) {
        self.reset_engine();
    }
}
