/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Contains derive procedural macros used in the ECC Montgomery multiplier
    emulator.

--*/
mod bus;
mod util;

#[cfg(not(test))]
#[proc_macro_derive(
    Bus,
    attributes(peripheral, register, register_array, poll_fn, warm_reset_fn)
)]
pub fn derive_bus(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    crate::bus::derive_bus(input.into()).into()
}
