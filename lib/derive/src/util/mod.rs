/*++

Licensed under the Apache-2.0 license.

File Name:

    mod.rs

Abstract:

    General-purpose utilities used by the derive macros.

--*/
pub mod literal;
pub mod sort;
pub mod token_iter;
