/*++

Licensed under the Apache-2.0 license.

File Name:

    root_bus.rs

Abstract:

    File contains the root Bus implementation for the Montgomery multiplier
    emulator.

--*/

use crate::MontMul;
use ecmm_emu_bus::Clock;
use ecmm_emu_derive::Bus;
use ecmm_emu_types::EmuAddr;

use crate::mm::{ConfigError, MmConfig};

/// Base address of the Montgomery multiplier register window.
pub const MONT_MUL_BASE: EmuAddr = 0x3000_0000;

/// Root bus of the emulated accelerator.
#[derive(Bus)]
pub struct MmRootBus {
    /// Montgomery multiplier
    #[peripheral(offset = 0x3000_0000, mask = 0x0000_0fff)]
    pub mont_mul: MontMul,
}

impl MmRootBus {
    /// Creates the root bus with a multiplier built from `cfg`.
    pub fn new(clock: &Clock, cfg: MmConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            mont_mul: MontMul::new(clock, cfg)?,
        })
    }
}
