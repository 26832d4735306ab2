//! Trust-minimized payout authorization.
//!
//! The oracle never custodies funds. It signs a typed, domain-separated
//! digest binding (debate id, winner address, prize amount) and submits
//! it to the escrow contract, which independently recomputes the digest,
//! verifies the signature against its registered oracle key, and only
//! then transfers the prize. The contract's completed-debate guard is
//! the final arbiter against duplicate payouts.

pub mod chain;
pub mod error;
pub mod escrow;
pub mod keys;
pub mod payout;
pub mod typed_data;

pub use chain::{DebateInfo, EscrowChain, HttpEscrowChain, TxReceipt};
pub use error::{ChainError, OracleError};
pub use escrow::InMemoryEscrow;
pub use keys::{derive_address, generate_keypair, keypair_from_seed, sign_digest, verify_digest};
pub use payout::{PayoutOracle, SettleOutcome};
pub use typed_data::{payout_digest, PayoutDomain};
