//! Settlement flow: judged winner -> authorized on-chain transfer.

use std::sync::Arc;

use tracing::{info, warn};

use clashcast_types::{Address, DebateId, KeyPair, TokenAmount};

use crate::chain::{EscrowChain, TxReceipt};
use crate::error::{ChainError, OracleError};
use crate::keys::sign_digest;
use crate::typed_data::{payout_digest, PayoutDomain};

/// Result of one settlement attempt.
#[derive(Debug)]
pub enum SettleOutcome {
    /// Payout submitted and accepted.
    Paid(TxReceipt),
    /// The debate was already completed; benign, nothing to do.
    AlreadyCompleted,
    /// The pool is empty (zero on-chain participants). The debate is
    /// left open for operator follow-up; submitting a zero-value
    /// payout is never attempted.
    ZeroPrize,
}

/// The payout oracle: holds the signing key pre-registered with the
/// escrow contract and drives the settlement protocol. Custodies no
/// funds: the contract is the final arbiter of every transfer.
pub struct PayoutOracle {
    keypair: KeyPair,
    domain: PayoutDomain,
    chain: Arc<dyn EscrowChain>,
}

impl PayoutOracle {
    pub fn new(keypair: KeyPair, domain: PayoutDomain, chain: Arc<dyn EscrowChain>) -> Self {
        Self {
            keypair,
            domain,
            chain,
        }
    }

    /// Settle a judged winner for an on-chain debate.
    ///
    /// Idempotent from the caller's view: the completion check before
    /// submission and the contract's completed-debate guard after it
    /// both resolve to [`SettleOutcome::AlreadyCompleted`]. Transient
    /// chain failures surface as errors for the sweep to retry on its
    /// next interval.
    pub async fn settle(
        &self,
        debate_id: DebateId,
        winner: &Address,
        expected_participants: u64,
    ) -> Result<SettleOutcome, OracleError> {
        if self.chain.is_completed(debate_id).await? {
            info!(%debate_id, "debate already completed on chain, skipping payout");
            return Ok(SettleOutcome::AlreadyCompleted);
        }

        let debate = self.chain.debate_info(debate_id).await?;

        if debate.participant_count != expected_participants {
            // The sets are allowed to diverge (payments can arrive via
            // another rail); the chain stays authoritative for funds.
            warn!(
                %debate_id,
                on_chain = debate.participant_count,
                off_chain = expected_participants,
                "participant count mismatch between chain and battle record"
            );
        }

        let total = debate.total_collected().ok_or(OracleError::PrizeOverflow)?;
        let prize = total.prize_share();
        if prize.is_zero() {
            warn!(
                %debate_id,
                participants = debate.participant_count,
                "zero-value pool, leaving debate uncompleted for operator follow-up"
            );
            return Ok(SettleOutcome::ZeroPrize);
        }

        let digest = payout_digest(&self.domain, debate_id, winner, prize);
        let signature = sign_digest(&digest, &self.keypair.private);

        match self
            .chain
            .distribute_winner(debate_id, winner, prize, &signature)
            .await
        {
            Ok(receipt) => {
                info!(
                    %debate_id,
                    winner = %winner,
                    amount = %prize,
                    tx = %receipt.tx_hash,
                    "payout submitted"
                );
                Ok(SettleOutcome::Paid(receipt))
            }
            // Lost a race with another oracle instance; the funds went
            // out exactly once, which is all that matters.
            Err(ChainError::DebateCompleted(_)) => {
                info!(%debate_id, "payout raced with a completed debate, treating as no-op");
                Ok(SettleOutcome::AlreadyCompleted)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escrow::InMemoryEscrow;
    use crate::keys::keypair_from_seed;

    fn setup(participants: u64) -> (PayoutOracle, Arc<InMemoryEscrow>, DebateId) {
        let oracle_keys = keypair_from_seed(&[3u8; 32]);
        let domain = PayoutDomain::new(8453, Address::from_bytes([0xEC; 20]));
        let escrow = Arc::new(InMemoryEscrow::new(oracle_keys.public, domain.clone()));
        let id = escrow.create_debate(TokenAmount::from_tokens(1));
        for _ in 0..participants {
            escrow.join_debate(id).unwrap();
        }
        let oracle = PayoutOracle::new(oracle_keys, domain, escrow.clone());
        (oracle, escrow, id)
    }

    #[tokio::test]
    async fn settles_eighty_percent_of_pool() {
        let (oracle, escrow, id) = setup(5);
        let winner = Address::from_bytes([0xAB; 20]);

        let outcome = oracle.settle(id, &winner, 5).await.unwrap();
        match outcome {
            SettleOutcome::Paid(receipt) => {
                assert_eq!(receipt.amount, TokenAmount::from_tokens(4));
            }
            other => panic!("expected Paid, got {other:?}"),
        }
        assert_eq!(escrow.paid_out(id), Some(TokenAmount::from_tokens(4)));
    }

    #[tokio::test]
    async fn second_settle_is_benign() {
        let (oracle, _escrow, id) = setup(3);
        let winner = Address::from_bytes([0xAB; 20]);

        assert!(matches!(
            oracle.settle(id, &winner, 3).await.unwrap(),
            SettleOutcome::Paid(_)
        ));
        assert!(matches!(
            oracle.settle(id, &winner, 3).await.unwrap(),
            SettleOutcome::AlreadyCompleted
        ));
    }

    #[tokio::test]
    async fn zero_participants_never_submits() {
        let (oracle, escrow, id) = setup(0);
        let winner = Address::from_bytes([0xAB; 20]);

        assert!(matches!(
            oracle.settle(id, &winner, 0).await.unwrap(),
            SettleOutcome::ZeroPrize
        ));
        // Deliberately left open.
        assert!(!escrow.is_completed(id).await.unwrap());
        assert_eq!(escrow.paid_out(id), Some(TokenAmount::ZERO));
    }

    #[tokio::test]
    async fn participant_mismatch_still_pays_by_chain_count() {
        let (oracle, _escrow, id) = setup(5);
        let winner = Address::from_bytes([0xAB; 20]);

        // Off-chain thinks 2 joined; the chain says 5 and wins.
        let outcome = oracle.settle(id, &winner, 2).await.unwrap();
        match outcome {
            SettleOutcome::Paid(receipt) => {
                assert_eq!(receipt.amount, TokenAmount::from_tokens(4));
            }
            other => panic!("expected Paid, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_debate_surfaces_chain_error() {
        let (oracle, _escrow, _id) = setup(1);
        let winner = Address::from_bytes([0xAB; 20]);
        let err = oracle.settle(DebateId(777), &winner, 1).await.unwrap_err();
        assert!(matches!(
            err,
            OracleError::Chain(ChainError::DebateNotFound(777))
        ));
    }
}
