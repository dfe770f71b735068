/*++

Licensed under the Apache-2.0 license.

File Name:

    token_iter.rs

Abstract:

    General-purpose functions for manipulating token iterators.

--*/
use std::{collections::HashMap, fmt::Display};

use proc_macro2::{Delimiter, Group, Ident, Spacing, TokenStream, TokenTree};

pub struct Attribute {
    #[allow(dead_code)]
    pub name: Ident,
    pub args: HashMap<String, TokenTree>,
}

pub struct FieldWithAttributes {
    pub attr_name: String,
    pub field_name: Option<Ident>,
    pub field_type: TokenStream,
    pub attributes: Vec<Attribute>,
}

pub struct DisplayToken<'a>(pub &'a Option<TokenTree>);
impl<'a> Display for DisplayToken<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(TokenTree::Ident(i)) => write!(f, "identifier {}", i),
            Some(TokenTree::Literal(l)) => write!(f, "literal {}", l),
            Some(TokenTree::Punct(p)) => write!(f, "punctuation '{}'", p),
            Some(TokenTree::Group(g)) => write!(f, "group {}", g),
            None => write!(f, "<none>"),
        }
    }
}

pub fn expect_ident(iter: &mut impl Iterator<Item = TokenTree>) -> Ident {
    let token = iter.next();
    if let Some(TokenTree::Ident(ref ident)) = token {
        return ident.clone();
    }
    panic!("Expected identifier, found {}", DisplayToken(&token))
}

pub fn expect_literal_or_ident(iter: &mut impl Iterator<Item = TokenTree>) -> TokenTree {
    let token = iter.next();
    match token {
        Some(TokenTree::Literal(literal)) => TokenTree::Literal(literal),
        Some(TokenTree::Ident(ident)) => TokenTree::Ident(ident),
        _ => panic!(
            "Expected literal or identifier, found {}",
            DisplayToken(&token)
        ),
    }
}

pub fn expect_punct_of(iter: &mut impl Iterator<Item = TokenTree>, expected: char) {
    let token = iter.next();
    if let Some(TokenTree::Punct(ref punct)) = token {
        if punct.as_char() == expected {
            return;
        }
    }
    panic!(
        "Expected punctuation '{}', found {}",
        expected,
        DisplayToken(&token)
    )
}

pub fn expect_group(iter: &mut impl Iterator<Item = TokenTree>, delimiter: Delimiter) -> Group {
    let token = iter.next();
    if let Some(TokenTree::Group(ref group)) = token {
        if group.delimiter() == delimiter {
            return group.clone();
        }
    }
    panic!(
        "Expected group with delimiter '{:?}', found {}",
        delimiter,
        DisplayToken(&token)
    )
}

pub fn skip_to_struct_with_attributes(iter: &mut impl Iterator<Item = TokenTree>) -> Vec<Group> {
    let mut prev_token_was_hash = false;
    let mut attributes = Vec::new();
    loop {
        match iter.next() {
            Some(TokenTree::Ident(ident)) => {
                if ident == "struct" {
                    return attributes;
                }
            }
            Some(TokenTree::Punct(punct)) if punct.as_char() == '#' => {
                prev_token_was_hash = true;
                continue;
            }
            Some(TokenTree::Group(group))
                if group.delimiter() == Delimiter::Bracket && prev_token_was_hash =>
            {
                attributes.push(group);
            }
            None => panic!("Unexpected end of tokens while searching for struct"),
            _ => {}
        };
        prev_token_was_hash = false;
    }
}

pub fn collect_while(
    iter: &mut impl Iterator<Item = TokenTree>,
    mut pred: impl FnMut(&TokenTree) -> bool,
) -> TokenStream {
    let mut result = TokenStream::new();
    loop {
        match iter.next() {
            Some(t) => {
                if pred(&t) {
                    result.extend(Some(t));
                } else {
                    return result;
                }
            }
            None => return result,
        }
    }
}

pub fn skip_to_group(iter: &mut impl Iterator<Item = TokenTree>, delimiter: Delimiter) -> Group {
    loop {
        match iter.next() {
            Some(TokenTree::Group(group)) => {
                if group.delimiter() == delimiter {
                    return group;
                }
            }
            None => panic!("Unexpected end of tokens while searching for group"),
            _ => {}
        };
    }
}

pub fn skip_to_attribute_or_ident(iter: &mut impl Iterator<Item = TokenTree>) -> Option<TokenTree> {
    loop {
        match iter.next() {
            Some(TokenTree::Punct(punct)) => {
                if punct.as_char() == '#' && punct.spacing() == Spacing::Alone {
                    if let Some(TokenTree::Group(group)) = iter.next() {
                        if group.delimiter() == Delimiter::Bracket {
                            return Some(TokenTree::Group(group));
                        }
                    }
                }
            }
            Some(TokenTree::Ident(ident)) => {
                if ident == "pub" {
                    continue;
                }
                return Some(TokenTree::Ident(ident));
            }
            None => return None,
            _ => {}
        };
    }
}

pub fn skip_to_field_with_attributes(
    iter: &mut impl Iterator<Item = TokenTree>,
    attribute_name_pred: impl Fn(&str) -> bool,
    no_field_required_pred: impl Fn(&Attribute) -> bool,
) -> Option<FieldWithAttributes> {
    let mut attr_name = String::new();
    let mut attributes = Vec::new();
    loop {
        match skip_to_attribute_or_ident(iter) {
            Some(TokenTree::Group(group)) => {
                let mut iter = group.stream().into_iter();
                let attribute_ident = expect_ident(&mut iter);
                attr_name = attribute_ident.to_string();
                if !attribute_name_pred(&attr_name) {
                    continue;
                }
                let params = expect_group(&mut iter, Delimiter::Parenthesis);
                let mut iter = params.stream().into_iter();
                let mut args = HashMap::new();
                loop {
                    let key = expect_ident(&mut iter);
                    expect_punct_of(&mut iter, '=');
                    let value = expect_literal_or_ident(&mut iter);
                    args.insert(key.to_string(), value);
                    let token = iter.next();
                    match token {
                        Some(TokenTree::Punct(ref punct)) => {
                            if punct.as_char() == ',' {
                                continue;
                            }
                        }
                        None => break,
                        _ => {}
                    }
                    panic!("Unexpected token {:?}", token)
                }
                let attribute = Attribute {
                    name: attribute_ident,
                    args,
                };
                attributes.push(attribute);
                if no_field_required_pred(attributes.last().unwrap()) {
                    return Some(FieldWithAttributes {
                        attr_name,
                        field_name: None,
                        field_type: TokenStream::new(),
                        attributes,
                    });
                }
            }
            Some(TokenTree::Ident(ident)) => {
                expect_punct_of(iter, ':');
                let mut depth = 0;
                let field_type = collect_while(iter, |t| match t {
                    TokenTree::Punct(p) if p.as_char() == '<' => {
                        depth += 1;
                        true
                    }
                    TokenTree::Punct(p) if p.as_char() == '>' => {
                        depth -= 1;
                        true
                    }
                    TokenTree::Punct(p) => depth != 0 || p.as_char() != ',',
                    _ => true,
                });

                return Some(FieldWithAttributes {
                    attr_name,
                    field_name: Some(ident),
                    field_type,
                    attributes,
                });
            }
            None => return None,
            _ => unreachable!(),
        }
    }
}
