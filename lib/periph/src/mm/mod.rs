/*++

Licensed under the Apache-2.0 license.

File Name:

    mod.rs

Abstract:

    File contains the cycle-level model of the word-serial Montgomery
    multiplier datapath.

--*/

mod acc;
mod brl;
mod config;
mod core;
mod ctrl;
mod dsp;
mod mem;
mod pram;
mod prod;

pub use self::core::MmCore;
pub use config::{ConfigError, MmConfig, NnLayout, PAGE_WORDS};
pub(crate) use config::limb_mask;
pub use ctrl::Phase;
pub use mem::OperandPage;
