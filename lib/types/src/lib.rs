/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the ECC Montgomery-Multiplier Emulator Types library.

--*/

mod macros;

/// Bus Data width
pub type EmuData = u32;

/// Bus Address width
pub type EmuAddr = u32;

emu_enum!(
    /// Bus IO Operation size
    #[derive(Debug, Eq, PartialEq, Copy, Clone)]
    pub EmuSize;
    usize;
    {
        Byte = 1,
        HalfWord = 2,
        Word = 4,
    };
    Invalid
);
