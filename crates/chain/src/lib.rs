//! On-chain submission boundary: claim payload encoding and the reader/signer
//! collaborators a submission is driven through.

use std::{fmt, str::FromStr};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::{
    domain::{Gameplay, TxHash, WalletAddress},
    protocol::VerifyPayload,
};
use thiserror::Error;

pub mod abi;
pub mod ids;

use abi::Token;

pub const VERIFICATION_FUNCTION_NAME: &str = "core.register_external_verification";
pub const VERIFICATION_PARAMETERS: &str = "bytes32,bytes32,bytes,int,bytes32[],bytes";
pub const ADD_INPUT_SIGNATURE: &str = "addInput(address,bytes)";

pub fn verification_signature() -> String {
    format!("{VERIFICATION_FUNCTION_NAME}({VERIFICATION_PARAMETERS})")
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AbiError {
    #[error("field {field} is not valid hex: {reason}")]
    InvalidHex { field: &'static str, reason: String },
    #[error("field {field} must be {expected} bytes, got {actual}")]
    WrongLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
}

pub fn decode_hex(field: &'static str, value: &str) -> Result<Vec<u8>, AbiError> {
    let raw = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(raw).map_err(|e| AbiError::InvalidHex {
        field,
        reason: e.to_string(),
    })
}

pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn decode_word(field: &'static str, value: &str) -> Result<[u8; 32], AbiError> {
    let bytes = decode_hex(field, value)?;
    let actual = bytes.len();
    bytes.try_into().map_err(|_| AbiError::WrongLength {
        field,
        expected: 32,
        actual,
    })
}

/// 20-byte EVM account or contract address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; 20]);

impl FromStr for Address {
    type Err = AbiError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let bytes = decode_hex("address", value)?;
        let actual = bytes.len();
        let bytes: [u8; 20] = bytes.try_into().map_err(|_| AbiError::WrongLength {
            field: "address",
            expected: 20,
            actual,
        })?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = AbiError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Where claims go: the world contract receiving `addInput` for an app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainTarget {
    pub chain_id: u64,
    pub world_address: Address,
    pub app_address: Address,
}

/// Contract-call view of a gameplay record, with defaults applied for the
/// optional fields.
pub fn verify_payload(gameplay: &Gameplay) -> VerifyPayload {
    let outcard_hash = gameplay.outcard.hash.trim_start_matches("0x");
    VerifyPayload {
        rule_id: ids::format_rule_id_to_bytes(gameplay.rule_id.as_str()),
        outcard_hash: format!("0x{outcard_hash}"),
        tape: to_hex(&gameplay.log),
        claimed_score: gameplay.claimed_score(),
        tapes: gameplay.tapes.clone().unwrap_or_default(),
        in_card: gameplay
            .in_card
            .as_deref()
            .map(to_hex)
            .unwrap_or_else(|| "0x".to_string()),
    }
}

/// `selector ∥ abi(rule_id, outcard_hash, tape, claimed_score, tapes, in_card)`.
pub fn encode_verification(payload: &VerifyPayload) -> Result<Vec<u8>, AbiError> {
    let tapes = payload
        .tapes
        .iter()
        .map(|tape| decode_word("tapes", tape))
        .collect::<Result<Vec<_>, _>>()?;

    let tokens = [
        Token::FixedBytes32(decode_word("rule_id", &payload.rule_id)?),
        Token::FixedBytes32(decode_word("outcard_hash", &payload.outcard_hash)?),
        Token::Bytes(decode_hex("tape", &payload.tape)?),
        Token::Int(i128::from(payload.claimed_score)),
        Token::FixedBytes32Array(tapes),
        Token::Bytes(decode_hex("in_card", &payload.in_card)?),
    ];
    Ok(abi::encode_call(&verification_signature(), &tokens))
}

/// The `addInput(app, payload)` call made against the world contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddInputCall {
    pub world_address: Address,
    pub app_address: Address,
    pub payload: Vec<u8>,
}

impl AddInputCall {
    pub fn for_gameplay(target: &ChainTarget, gameplay: &Gameplay) -> Result<Self, AbiError> {
        let payload = encode_verification(&verify_payload(gameplay))?;
        Ok(Self {
            world_address: target.world_address,
            app_address: target.app_address,
            payload,
        })
    }

    pub fn calldata(&self) -> Vec<u8> {
        abi::encode_call(
            ADD_INPUT_SIGNATURE,
            &[
                Token::Address(self.app_address.0),
                Token::Bytes(self.payload.clone()),
            ],
        )
    }
}

/// A simulated call, ready to be signed and broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTransaction {
    pub from: WalletAddress,
    pub to: Address,
    pub data: Vec<u8>,
    pub value: u128,
    pub gas: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub status: ReceiptStatus,
}

/// Read side of the chain: simulation and receipt tracking.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn simulate_add_input(
        &self,
        account: &WalletAddress,
        call: &AddInputCall,
    ) -> Result<PreparedTransaction>;
    async fn wait_for_receipt(&self, tx_hash: &TxHash) -> Result<TransactionReceipt>;
}

/// Connected wallet able to sign and broadcast a prepared transaction.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn address(&self) -> WalletAddress;
    fn chain_id(&self) -> u64;
    async fn write_contract(&self, request: PreparedTransaction) -> Result<TxHash>;
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
