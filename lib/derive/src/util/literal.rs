/*++

Licensed under the Apache-2.0 license.

File Name:

    literal.rs

Abstract:

    File contains helpers for reading and emitting numeric literal tokens.

--*/
use std::str::FromStr;

use proc_macro2::{Literal, TokenTree};

use crate::util::token_iter::DisplayToken;

fn literal_digits(token: &TokenTree) -> Option<String> {
    match token {
        TokenTree::Literal(literal) => Some(literal.to_string().replace('_', "")),
        _ => None,
    }
}

/// Parses a decimal or `0x` literal token as a usize.
pub fn parse_usize(literal: &TokenTree) -> usize {
    if let Some(digits) = literal_digits(literal) {
        let parsed = match digits.strip_prefix("0x") {
            Some(hex) => usize::from_str_radix(hex, 16),
            None => usize::from_str(&digits),
        };
        if let Ok(val) = parsed {
            return val;
        }
    }
    panic!(
        "Expected numeric literal, found {}",
        &DisplayToken(&Some(literal.clone()))
    );
}

/// Parses a `0x` literal token as a u32. Decimal is rejected; addresses and
/// masks are always written in hex.
pub fn parse_hex_u32(literal: TokenTree) -> u32 {
    if let Some(digits) = literal_digits(&literal) {
        if let Some(hex) = digits.strip_prefix("0x") {
            if let Ok(val) = u32::from_str_radix(hex, 16) {
                return val;
            }
        }
    }
    panic!(
        "Expected hex literal, found {}",
        &DisplayToken(&Some(literal))
    );
}

/// Renders `val` as a `0xhhhh_hhhh` literal token.
pub fn hex_literal_u32(val: u32) -> TokenTree {
    TokenTree::Literal(
        Literal::from_str(&format!("0x{:04x}_{:04x}", val >> 16, val & 0xffff)).unwrap(),
    )
}
