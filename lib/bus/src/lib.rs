/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the ECC Montgomery multiplier emulator bus library.

--*/
mod bus;
mod clock;
mod register;
pub mod testing;

pub use crate::bus::{Bus, BusError};
pub use crate::clock::{ActionHandle, Clock, Timer, TimerAction};
pub use crate::register::{
    ReadOnlyRegister, ReadWriteRegister, Register, RegisterArray, WriteOnlyRegister,
};
