/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the ECC Montgomery multiplier emulator crypto
    library.

--*/

mod limbs;
mod mont;

pub use limbs::{from_limbs, to_limbs};
pub use mont::{MontCtx, MontError};
