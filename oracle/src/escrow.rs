//! In-memory reference escrow contract.
//!
//! Implements the contract side of the payout protocol exactly as the
//! chain deployment does: recompute the typed digest, verify the
//! signature against the registered oracle key, enforce the
//! completed-debate guard, then transfer. Used by tests and by dev
//! deployments that run without a chain.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use clashcast_types::{Address, DebateId, PublicKey, Signature, TokenAmount};

use crate::chain::{DebateInfo, EscrowChain, TxReceipt};
use crate::error::ChainError;
use crate::keys::verify_digest;
use crate::typed_data::{payout_digest, PayoutDomain};

struct DebateSlot {
    info: DebateInfo,
    paid_out: TokenAmount,
}

/// The reference escrow: holds debates, verifies payout authorizations.
pub struct InMemoryEscrow {
    /// Oracle public key registered at deployment.
    oracle_key: PublicKey,
    domain: PayoutDomain,
    debates: Mutex<HashMap<u64, DebateSlot>>,
    next_debate: AtomicU64,
    next_tx: AtomicU64,
}

impl InMemoryEscrow {
    pub fn new(oracle_key: PublicKey, domain: PayoutDomain) -> Self {
        Self {
            oracle_key,
            domain,
            debates: Mutex::new(HashMap::new()),
            next_debate: AtomicU64::new(0),
            next_tx: AtomicU64::new(0),
        }
    }

    /// Create a debate pool. Mirrors the contract's create call.
    pub fn create_debate(&self, entry_fee: TokenAmount) -> DebateId {
        let id = DebateId(self.next_debate.fetch_add(1, Ordering::Relaxed) + 1);
        let mut debates = self.debates.lock().expect("escrow lock poisoned");
        debates.insert(
            id.0,
            DebateSlot {
                info: DebateInfo {
                    id,
                    entry_fee,
                    participant_count: 0,
                    is_active: true,
                    is_completed: false,
                    winner: None,
                },
                paid_out: TokenAmount::ZERO,
            },
        );
        id
    }

    /// Register one paid entry into a debate pool. Mirrors the
    /// contract's join call (payment handling itself is out of scope).
    pub fn join_debate(&self, id: DebateId) -> Result<(), ChainError> {
        let mut debates = self.debates.lock().expect("escrow lock poisoned");
        let slot = debates
            .get_mut(&id.0)
            .ok_or(ChainError::DebateNotFound(id.0))?;
        if slot.info.is_completed {
            return Err(ChainError::DebateCompleted(id.0));
        }
        slot.info.participant_count += 1;
        Ok(())
    }

    /// Amount transferred out of a debate so far (test observability).
    pub fn paid_out(&self, id: DebateId) -> Option<TokenAmount> {
        let debates = self.debates.lock().expect("escrow lock poisoned");
        debates.get(&id.0).map(|s| s.paid_out)
    }
}

#[async_trait]
impl EscrowChain for InMemoryEscrow {
    async fn debate_info(&self, id: DebateId) -> Result<DebateInfo, ChainError> {
        let debates = self.debates.lock().expect("escrow lock poisoned");
        debates
            .get(&id.0)
            .map(|s| s.info.clone())
            .ok_or(ChainError::DebateNotFound(id.0))
    }

    async fn is_completed(&self, id: DebateId) -> Result<bool, ChainError> {
        let debates = self.debates.lock().expect("escrow lock poisoned");
        debates
            .get(&id.0)
            .map(|s| s.info.is_completed)
            .ok_or(ChainError::DebateNotFound(id.0))
    }

    async fn distribute_winner(
        &self,
        id: DebateId,
        winner: &Address,
        amount: TokenAmount,
        signature: &Signature,
    ) -> Result<TxReceipt, ChainError> {
        let mut debates = self.debates.lock().expect("escrow lock poisoned");
        let slot = debates
            .get_mut(&id.0)
            .ok_or(ChainError::DebateNotFound(id.0))?;

        // Completed guard first: a resubmission must revert before any
        // signature work, exactly like the deployed contract.
        if slot.info.is_completed {
            return Err(ChainError::DebateCompleted(id.0));
        }

        let digest = payout_digest(&self.domain, id, winner, amount);
        if !verify_digest(&digest, signature, &self.oracle_key) {
            return Err(ChainError::InvalidSignature);
        }

        if amount.is_zero() {
            return Err(ChainError::InvalidAmount("zero payout".into()));
        }
        let total = slot
            .info
            .total_collected()
            .ok_or_else(|| ChainError::InvalidAmount("pool overflow".into()))?;
        if amount > total {
            return Err(ChainError::InvalidAmount(format!(
                "amount {amount} exceeds pool {total}"
            )));
        }

        slot.info.is_completed = true;
        slot.info.is_active = false;
        slot.info.winner = Some(winner.clone());
        slot.paid_out = amount;

        let tx = self.next_tx.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(TxReceipt {
            tx_hash: format!("0xesc{tx:061x}"),
            debate_id: id,
            winner: winner.clone(),
            amount,
        })
    }
}
