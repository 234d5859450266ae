//! Fakes for the emulator, frame grabber, chain and wallet collaborators.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chain::{
    AddInputCall, ChainReader, PreparedTransaction, ReceiptStatus, TransactionReceipt,
    WalletSigner,
};
use shared::domain::{TxHash, WalletAddress};
use tokio::sync::Semaphore;

use crate::{CapturedFrame, Emulator, FrameSource};

pub const PLAYER: &str = "0x1234567890123456789012345678901234567890";
pub const RULE_ID: &str = "1111111111111111111111111111111111111111";
pub const CHAIN_ID: u64 = 84532;

#[derive(Debug, Clone, PartialEq)]
pub enum EmulatorCall {
    Start,
    Stop,
    Speed(f64),
}

#[derive(Clone, Default)]
pub struct RecordingEmulator {
    pub calls: Arc<Mutex<Vec<EmulatorCall>>>,
}

impl Emulator for RecordingEmulator {
    fn start(&mut self) {
        self.calls.lock().expect("calls").push(EmulatorCall::Start);
    }

    fn stop(&mut self) {
        self.calls.lock().expect("calls").push(EmulatorCall::Stop);
    }

    fn set_speed(&mut self, multiplier: f64) {
        self.calls
            .lock()
            .expect("calls")
            .push(EmulatorCall::Speed(multiplier));
    }
}

/// Returns a capture whose bytes are the capture counter.
#[derive(Clone, Default)]
pub struct CountingFrames {
    pub captures: Arc<Mutex<u32>>,
}

impl FrameSource for CountingFrames {
    fn capture(&mut self) -> Option<CapturedFrame> {
        let mut captures = self.captures.lock().expect("captures");
        *captures += 1;
        Some(CapturedFrame {
            mime_type: "image/png".into(),
            bytes: captures.to_be_bytes().to_vec(),
        })
    }
}

pub struct FakeSigner {
    pub address: WalletAddress,
    pub chain_id: u64,
    pub reject: bool,
    pub broadcasts: Arc<Mutex<Vec<PreparedTransaction>>>,
}

impl FakeSigner {
    pub fn new() -> Self {
        Self {
            address: WalletAddress::new(PLAYER),
            chain_id: CHAIN_ID,
            reject: false,
            broadcasts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl WalletSigner for FakeSigner {
    fn address(&self) -> WalletAddress {
        self.address.clone()
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn write_contract(&self, request: PreparedTransaction) -> Result<TxHash> {
        if self.reject {
            return Err(anyhow!("user rejected the request"));
        }
        let mut broadcasts = self.broadcasts.lock().expect("broadcasts");
        broadcasts.push(request);
        Ok(TxHash::new(format!("0x{:064x}", broadcasts.len())))
    }
}

pub struct FakeChain {
    pub simulations: Arc<Mutex<Vec<(WalletAddress, AddInputCall)>>>,
    pub gate: Option<Arc<Semaphore>>,
    pub simulation_error: Option<String>,
    pub receipt_status: ReceiptStatus,
    pub never_confirms: bool,
}

impl FakeChain {
    pub fn new() -> Self {
        Self {
            simulations: Arc::new(Mutex::new(Vec::new())),
            gate: None,
            simulation_error: None,
            receipt_status: ReceiptStatus::Success,
            never_confirms: false,
        }
    }

    /// Simulation blocks until a permit is added to the returned semaphore.
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let mut chain = Self::new();
        chain.gate = Some(gate.clone());
        (chain, gate)
    }
}

#[async_trait]
impl ChainReader for FakeChain {
    async fn simulate_add_input(
        &self,
        account: &WalletAddress,
        call: &AddInputCall,
    ) -> Result<PreparedTransaction> {
        self.simulations
            .lock()
            .expect("simulations")
            .push((account.clone(), call.clone()));
        if let Some(gate) = &self.gate {
            gate.acquire().await?.forget();
        }
        if let Some(err) = &self.simulation_error {
            return Err(anyhow!(err.clone()));
        }
        Ok(PreparedTransaction {
            from: account.clone(),
            to: call.world_address,
            data: call.calldata(),
            value: 0,
            gas: Some(100_000),
        })
    }

    async fn wait_for_receipt(&self, tx_hash: &TxHash) -> Result<TransactionReceipt> {
        if self.never_confirms {
            std::future::pending::<()>().await;
        }
        Ok(TransactionReceipt {
            tx_hash: tx_hash.clone(),
            block_number: 7,
            status: self.receipt_status,
        })
    }
}
