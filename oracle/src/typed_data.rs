//! Typed-data digest construction for payout authorization.
//!
//! The digest layout follows the structured-signing convention the
//! escrow contract verifies: a domain separator binding name, version,
//! chain id, and verifying-contract address, combined with a typed
//! struct hash over (debateId, winner, amount). Every field is encoded
//! as a 32-byte word, so any mismatch between oracle and contract
//! configuration produces a different digest and the submit reverts.

use clashcast_types::{Address, DebateId, TokenAmount};
use sha3::{Digest, Keccak256};

/// Type string of the domain separator.
const DOMAIN_TYPE: &[u8] =
    b"Domain(string name,string version,uint256 chainId,address verifyingContract)";
/// Type string of the payout struct.
const PAYOUT_TYPE: &[u8] = b"DistributeWinner(uint256 debateId,address winner,uint256 amount)";

/// The signing domain. Must match the contract's registered values
/// field for field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayoutDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl PayoutDomain {
    /// Production defaults for the ClashCast escrow deployment.
    pub fn new(chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            name: "ClashCast Escrow".to_string(),
            version: "1".to_string(),
            chain_id,
            verifying_contract,
        }
    }

    /// Keccak-256 domain separator.
    pub fn separator(&self) -> [u8; 32] {
        let mut hasher = Keccak256::new();
        hasher.update(keccak(DOMAIN_TYPE));
        hasher.update(keccak(self.name.as_bytes()));
        hasher.update(keccak(self.version.as_bytes()));
        hasher.update(u256_word(self.chain_id as u128));
        hasher.update(address_word(&self.verifying_contract));
        finalize(hasher)
    }
}

/// The digest the oracle signs and the contract verifies:
/// `keccak(0x19 || 0x01 || domain_separator || struct_hash)`.
pub fn payout_digest(
    domain: &PayoutDomain,
    debate_id: DebateId,
    winner: &Address,
    amount: TokenAmount,
) -> [u8; 32] {
    let mut struct_hasher = Keccak256::new();
    struct_hasher.update(keccak(PAYOUT_TYPE));
    struct_hasher.update(u256_word(debate_id.0 as u128));
    struct_hasher.update(address_word(winner));
    struct_hasher.update(u256_word(amount.raw()));
    let struct_hash = finalize(struct_hasher);

    let mut hasher = Keccak256::new();
    hasher.update([0x19, 0x01]);
    hasher.update(domain.separator());
    hasher.update(struct_hash);
    finalize(hasher)
}

fn keccak(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(bytes);
    finalize(hasher)
}

fn finalize(hasher: Keccak256) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// A u128 as a big-endian 32-byte word.
fn u256_word(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// A 20-byte address left-padded to a 32-byte word.
fn address_word(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(&address.to_bytes());
    word
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain() -> PayoutDomain {
        PayoutDomain::new(8453, Address::from_bytes([0xEC; 20]))
    }

    fn winner() -> Address {
        Address::from_bytes([0xAB; 20])
    }

    #[test]
    fn digest_is_deterministic() {
        let d1 = payout_digest(&domain(), DebateId(7), &winner(), TokenAmount::from_tokens(4));
        let d2 = payout_digest(&domain(), DebateId(7), &winner(), TokenAmount::from_tokens(4));
        assert_eq!(d1, d2);
    }

    #[test]
    fn every_field_binds_the_digest() {
        let base = payout_digest(&domain(), DebateId(7), &winner(), TokenAmount::from_tokens(4));

        let other_debate =
            payout_digest(&domain(), DebateId(8), &winner(), TokenAmount::from_tokens(4));
        assert_ne!(base, other_debate);

        let other_winner = payout_digest(
            &domain(),
            DebateId(7),
            &Address::from_bytes([0xCD; 20]),
            TokenAmount::from_tokens(4),
        );
        assert_ne!(base, other_winner);

        let other_amount =
            payout_digest(&domain(), DebateId(7), &winner(), TokenAmount::from_tokens(5));
        assert_ne!(base, other_amount);
    }

    #[test]
    fn domain_mismatch_changes_digest() {
        let base = payout_digest(&domain(), DebateId(7), &winner(), TokenAmount::from_tokens(4));

        let mut wrong_chain = domain();
        wrong_chain.chain_id = 1;
        assert_ne!(
            base,
            payout_digest(&wrong_chain, DebateId(7), &winner(), TokenAmount::from_tokens(4))
        );

        let mut wrong_contract = domain();
        wrong_contract.verifying_contract = Address::from_bytes([0x11; 20]);
        assert_ne!(
            base,
            payout_digest(
                &wrong_contract,
                DebateId(7),
                &winner(),
                TokenAmount::from_tokens(4)
            )
        );

        let mut wrong_version = domain();
        wrong_version.version = "2".into();
        assert_ne!(
            base,
            payout_digest(
                &wrong_version,
                DebateId(7),
                &winner(),
                TokenAmount::from_tokens(4)
            )
        );
    }
}
