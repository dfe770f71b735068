/*++

Licensed under the Apache-2.0 license.

File Name:

    bus.rs

Abstract:

    Defines the Bus trait and error type for the memory map of the emulator.

--*/

use ecmm_emu_types::{EmuAddr, EmuData, EmuSize};

/// Represents an abstract memory bus. Used to read and write from SoC
/// peripherals and memories.
pub trait Bus {
    /// Read data of specified size from given address
    ///
    /// # Arguments
    ///
    /// * `size` - Size of the read
    /// * `addr` - Address to read from
    ///
    /// # Error
    ///
    /// * `BusError` - Exception with cause `BusError::LoadAccessFault` or `BusError::LoadAddrMisaligned`
    fn read(&mut self, size: EmuSize, addr: EmuAddr) -> Result<EmuData, BusError>;

    /// Write data of specified size to given address
    ///
    /// # Arguments
    ///
    /// * `size` - Size of the write
    /// * `addr` - Address to write
    /// * `val` - Data to write
    ///
    /// # Error
    ///
    /// * `BusError` - Exception with cause `BusError::StoreAccessFault` or `BusError::StoreAddrMisaligned`
    fn write(&mut self, size: EmuSize, addr: EmuAddr, val: EmuData) -> Result<(), BusError>;

    /// This method is used to notify peripherals of the passage of time. The
    /// peripheral can use this to execute simulations of hardware background
    /// tasks. To schedule a callback to poll() at a particular time, use
    /// [`crate::Timer`].
    fn poll(&mut self) {
        // By default, do nothing
    }

    /// This method is used to notify peripherals that a warm reset has been
    /// requested, and all device state should be reset to the same state it
    /// was after Bus construction (besides memories, which are generally
    /// preserved across warm resets).
    fn warm_reset(&mut self) {
        // By default, do nothing
    }
}

/// Bus fault
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusError {
    /// Load address misaligned
    LoadAddrMisaligned,

    /// Load access fault
    LoadAccessFault,

    /// Store address misaligned
    StoreAddrMisaligned,

    /// Store access fault
    StoreAccessFault,
}
