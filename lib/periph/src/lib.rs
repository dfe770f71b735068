/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the Montgomery multiplier emulator peripheral
    library.

--*/

pub mod mm;
mod mont_mul;
mod root_bus;

pub use mont_mul::MontMul;
pub use root_bus::{MmRootBus, MONT_MUL_BASE};
