//! Fundamental types shared across the ClashCast workspace.
//!
//! Everything here is plain data: strongly typed ids, the settlement
//! address and amount types, timestamps, key material newtypes, and the
//! two core enums (`Side`, `BattleStatus`). No I/O, no async.

pub mod address;
pub mod amount;
pub mod error;
pub mod ids;
pub mod keys;
pub mod side;
pub mod time;

pub use address::Address;
pub use amount::TokenAmount;
pub use error::TypeError;
pub use ids::{BattleId, CastId, DebateId, UserId};
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use side::{BattleStatus, Side};
pub use time::{Clock, SystemClock, Timestamp};
