//! Minimal Solidity ABI encoder covering the parameter kinds used by the
//! verification call and the outer `addInput` call.

use sha3::{Digest, Keccak256};

const WORD: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Address([u8; 20]),
    FixedBytes32([u8; 32]),
    Int(i128),
    Bytes(Vec<u8>),
    FixedBytes32Array(Vec<[u8; 32]>),
}

impl Token {
    fn is_dynamic(&self) -> bool {
        matches!(self, Token::Bytes(_) | Token::FixedBytes32Array(_))
    }

    fn head(&self) -> [u8; WORD] {
        match self {
            Token::Address(address) => {
                let mut word = [0u8; WORD];
                word[WORD - 20..].copy_from_slice(address);
                word
            }
            Token::FixedBytes32(value) => *value,
            Token::Int(value) => int_word(*value),
            // dynamic heads are offsets, filled in by `encode`
            Token::Bytes(_) | Token::FixedBytes32Array(_) => [0u8; WORD],
        }
    }

    fn tail(&self) -> Vec<u8> {
        match self {
            Token::Bytes(bytes) => {
                let mut out = Vec::with_capacity(WORD + padded_len(bytes.len()));
                out.extend_from_slice(&usize_word(bytes.len()));
                out.extend_from_slice(bytes);
                out.resize(WORD + padded_len(bytes.len()), 0);
                out
            }
            Token::FixedBytes32Array(items) => {
                let mut out = Vec::with_capacity(WORD * (items.len() + 1));
                out.extend_from_slice(&usize_word(items.len()));
                for item in items {
                    out.extend_from_slice(item);
                }
                out
            }
            _ => Vec::new(),
        }
    }
}

/// Encodes `tokens` as a tuple: static heads first, dynamic data appended in order.
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut heads = Vec::with_capacity(head_len);
    let mut tails = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            heads.extend_from_slice(&usize_word(head_len + tails.len()));
            tails.extend_from_slice(&token.tail());
        } else {
            heads.extend_from_slice(&token.head());
        }
    }

    heads.extend_from_slice(&tails);
    heads
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// First four bytes of the keccak-256 hash of a canonical function signature.
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// `selector ∥ encode(tokens)`.
pub fn encode_call(signature: &str, tokens: &[Token]) -> Vec<u8> {
    let mut out = function_selector(signature).to_vec();
    out.extend_from_slice(&encode(tokens));
    out
}

fn padded_len(len: usize) -> usize {
    len.div_ceil(WORD) * WORD
}

fn usize_word(value: usize) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&(value as u64).to_be_bytes());
    word
}

fn int_word(value: i128) -> [u8; WORD] {
    let fill = if value < 0 { 0xff } else { 0x00 };
    let mut word = [fill; WORD];
    word[WORD - 16..].copy_from_slice(&value.to_be_bytes());
    word
}
