/*++

Licensed under the Apache-2.0 license.

File Name:

    fake_bus.rs

Abstract:

    File contains code for a fake implementation of the Bus trait.

--*/
use ecmm_emu_types::{EmuAddr, EmuData, EmuSize};

use crate::{testing::Log, Bus, BusError};
use std::fmt::Write;

/// A Bus implementation that records every call to a shared [`Log`] and
/// returns caller-provided results, for driving code that owns a bus.
///
/// # Example
///
/// ```
/// use ecmm_emu_bus::{Bus, testing::FakeBus};
/// use ecmm_emu_types::EmuSize;
///
/// let mut fake_bus = FakeBus::new();
/// fake_bus.read_result = Ok(35);
/// assert_eq!(fake_bus.read(EmuSize::HalfWord, 0xdeadcafe), Ok(35));
/// assert_eq!("read(EmuSize::HalfWord, 0xdeadcafe)\n", fake_bus.log.take());
/// ```
pub struct FakeBus {
    pub log: Log,
    pub read_result: Result<EmuData, crate::BusError>,
    pub write_result: Result<(), crate::BusError>,
}
impl FakeBus {
    pub fn new() -> Self {
        Self {
            log: Log::new(),
            read_result: Ok(0),
            write_result: Ok(()),
        }
    }
}
impl Default for FakeBus {
    fn default() -> Self {
        Self::new()
    }
}
impl Bus for FakeBus {
    fn read(&mut self, size: EmuSize, addr: EmuAddr) -> Result<EmuData, BusError> {
        writeln!(self.log.w(), "read(EmuSize::{size:?}, {addr:#x})").unwrap();
        self.read_result
    }

    fn write(&mut self, size: EmuSize, addr: EmuAddr, val: EmuData) -> Result<(), BusError> {
        writeln!(self.log.w(), "write(EmuSize::{size:?}, {addr:#x}, {val:#x})").unwrap();
        self.write_result
    }

    fn poll(&mut self) {
        writeln!(self.log.w(), "poll()").unwrap();
    }

    fn warm_reset(&mut self) {
        writeln!(self.log.w(), "warm_reset()").unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_bus() {
        let mut fake_bus = FakeBus::new();

        assert_eq!(fake_bus.read(EmuSize::HalfWord, 0xdeadcafe), Ok(0));
        assert_eq!("read(EmuSize::HalfWord, 0xdeadcafe)\n", fake_bus.log.take());

        assert_eq!(fake_bus.write(EmuSize::Word, 0xf00dcafe, 0x537), Ok(()));
        assert_eq!(
            "write(EmuSize::Word, 0xf00dcafe, 0x537)\n",
            fake_bus.log.take()
        );

        fake_bus.read_result = Err(BusError::LoadAccessFault);
        assert_eq!(
            fake_bus.read(EmuSize::Byte, 0x12345678),
            Err(BusError::LoadAccessFault)
        );
        assert_eq!("read(EmuSize::Byte, 0x12345678)\n", fake_bus.log.take());

        fake_bus.write_result = Err(BusError::StoreAddrMisaligned);
        assert_eq!(
            fake_bus.write(EmuSize::Word, 0x131, 0x1),
            Err(BusError::StoreAddrMisaligned)
        );
        assert_eq!("write(EmuSize::Word, 0x131, 0x1)\n", fake_bus.log.take());

        fake_bus.poll();
        assert_eq!("poll()\n", fake_bus.log.take());

        fake_bus.warm_reset();
        assert_eq!("warm_reset()\n", fake_bus.log.take());
    }
}
