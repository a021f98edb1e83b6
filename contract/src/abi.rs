//! Minimal Solidity ABI codec for the voting contract's functions.
//!
//! Only the shapes the contract uses are supported: `uint256`, `address`,
//! `bool` and a single dynamic `string`. Every value occupies 32-byte words.

use chainvote_types::VoterAddress;

use crate::ContractError;

pub const WORD: usize = 32;

/// Four-byte function selectors (first bytes of the keccak-256 of the signature).
pub mod selector {
    pub const VOTING_ACTIVE: [u8; 4] = [0x40, 0x8e, 0x27, 0x27];
    pub const TOTAL_CANDIDATES: [u8; 4] = [0x38, 0x66, 0x96, 0x5c];
    pub const TOTAL_VOTES: [u8; 4] = [0x0d, 0x15, 0xfd, 0x77];
    pub const ADMIN: [u8; 4] = [0xf8, 0x51, 0xa4, 0x40];
    pub const CANDIDATES: [u8; 4] = [0x34, 0x77, 0xee, 0x2e];
    pub const VOTERS: [u8; 4] = [0xa3, 0xec, 0x13, 0x8d];
    pub const VOTE: [u8; 4] = [0x01, 0x21, 0xb9, 0x3f];
    pub const ADD_CANDIDATE: [u8; 4] = [0x46, 0x2e, 0x91, 0xec];
    pub const REGISTER_VOTER: [u8; 4] = [0x38, 0xdb, 0x6d, 0xd3];
    pub const START_VOTING: [u8; 4] = [0x1e, 0xc6, 0xb6, 0x0a];
    pub const END_VOTING: [u8; 4] = [0xc3, 0x40, 0x3d, 0xdf];
    /// `Error(string)`, the standard revert payload.
    pub const ERROR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];
}

// ── Encoding ────────────────────────────────────────────────────────────

pub fn uint_word(value: u64) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

pub fn address_word(address: &VoterAddress) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 20..].copy_from_slice(&address.to_bytes());
    word
}

/// Call data for a function without arguments.
pub fn call(selector: [u8; 4]) -> Vec<u8> {
    selector.to_vec()
}

pub fn call_uint(selector: [u8; 4], value: u64) -> Vec<u8> {
    let mut data = selector.to_vec();
    data.extend_from_slice(&uint_word(value));
    data
}

pub fn call_address(selector: [u8; 4], address: &VoterAddress) -> Vec<u8> {
    let mut data = selector.to_vec();
    data.extend_from_slice(&address_word(address));
    data
}

/// Call data for a function whose only argument is a `string`.
pub fn call_string(selector: [u8; 4], value: &str) -> Vec<u8> {
    let bytes = value.as_bytes();
    let mut data = selector.to_vec();
    data.extend_from_slice(&uint_word(WORD as u64));
    data.extend_from_slice(&uint_word(bytes.len() as u64));
    data.extend_from_slice(bytes);
    let padding = (WORD - bytes.len() % WORD) % WORD;
    data.extend(std::iter::repeat(0u8).take(padding));
    data
}

// ── Decoding ────────────────────────────────────────────────────────────

fn word(data: &[u8], index: usize) -> Result<&[u8], ContractError> {
    let start = index.saturating_mul(WORD);
    let end = start.saturating_add(WORD);
    data.get(start..end).ok_or_else(|| {
        ContractError::Decode(format!(
            "expected at least {} bytes, got {}",
            end,
            data.len()
        ))
    })
}

/// Decode word `index` as an unsigned integer that must fit in `u64`.
pub fn decode_uint(data: &[u8], index: usize) -> Result<u64, ContractError> {
    let w = word(data, index)?;
    if w[..WORD - 8].iter().any(|b| *b != 0) {
        return Err(ContractError::Decode(format!(
            "uint256 at word {index} does not fit in 64 bits"
        )));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&w[WORD - 8..]);
    Ok(u64::from_be_bytes(buf))
}

pub fn decode_bool(data: &[u8], index: usize) -> Result<bool, ContractError> {
    match decode_uint(data, index)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(ContractError::Decode(format!("invalid bool value {other}"))),
    }
}

pub fn decode_address(data: &[u8], index: usize) -> Result<VoterAddress, ContractError> {
    let w = word(data, index)?;
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&w[WORD - 20..]);
    Ok(VoterAddress::from_bytes(bytes))
}

/// Decode a dynamic `string` whose head (the byte offset) is at word `index`.
pub fn decode_string(data: &[u8], index: usize) -> Result<String, ContractError> {
    let offset = decode_uint(data, index)? as usize;
    if offset % WORD != 0 {
        return Err(ContractError::Decode(format!(
            "string offset {offset} is not word aligned"
        )));
    }
    let len = decode_uint(data, offset / WORD)? as usize;
    let start = offset.saturating_add(WORD);
    let bytes = data.get(start..start.saturating_add(len)).ok_or_else(|| {
        ContractError::Decode(format!("string of length {len} overruns response"))
    })?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| ContractError::Decode(format!("string is not UTF-8: {e}")))
}

/// Extract the message from an `Error(string)` revert payload.
pub fn decode_revert(data: &[u8]) -> Option<String> {
    let body = data.strip_prefix(&selector::ERROR[..])?;
    decode_string(body, 0).ok()
}

// ── Hex ─────────────────────────────────────────────────────────────────

pub fn to_hex_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn from_hex_data(s: &str) -> Result<Vec<u8>, ContractError> {
    let body = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(body).map_err(|e| ContractError::Decode(format!("invalid hex data: {e}")))
}

/// Parse a JSON-RPC hex quantity (`"0x1a"`).
pub fn parse_quantity(s: &str) -> Result<u64, ContractError> {
    let body = s
        .strip_prefix("0x")
        .ok_or_else(|| ContractError::Decode(format!("quantity without 0x prefix: {s}")))?;
    if body.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(body, 16)
        .map_err(|e| ContractError::Decode(format!("invalid quantity {s}: {e}")))
}

pub fn quantity(value: u64) -> String {
    format!("0x{value:x}")
}
