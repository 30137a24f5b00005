use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Numeric aliases
// =============================================================================

/// Ledger block height.
pub type BlockNumber = u64;

/// Staking era index.
pub type EraIndex = u32;

/// Token amount in the ledger's smallest unit.
pub type Balance = u128;

// =============================================================================
// Newtype Wrappers - Identity
// =============================================================================

/// An on-chain account address (SS58 or hex encoded, kept verbatim).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Hash of a proxied call, as announced to the proxy subsystem.
///
/// Compared case-insensitively on the hex digits: `0xAB..` and `0xab..`
/// name the same call.
#[derive(Clone, Debug, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallHash(pub String);

impl CallHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for CallHash {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl fmt::Display for CallHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hash of the block in which a submitted extrinsic was finalized.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockHash(pub String);

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Newtype Wrappers - Rates
// =============================================================================

/// A commission rate as an exact fraction in parts per billion.
///
/// `Commission(1_000_000_000)` is 100 %. Stored as an integer so threshold
/// checks never suffer from floating point rounding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Commission(pub u32);

impl Commission {
    pub const ACCURACY: u32 = 1_000_000_000;

    pub fn from_parts(parts: u32) -> Self {
        Self(parts.min(Self::ACCURACY))
    }

    /// Whole percent, clamped to 100.
    pub fn from_percent(percent: u32) -> Self {
        Self::from_parts(percent.min(100) * (Self::ACCURACY / 100))
    }

    /// Fractional percent such as `12.5`, rounded to the nearest part.
    /// Negative and NaN inputs map to zero.
    pub fn from_percent_f64(percent: f64) -> Self {
        if percent.is_nan() || percent <= 0.0 {
            return Self(0);
        }
        let parts = (percent.min(100.0) / 100.0 * Self::ACCURACY as f64).round();
        Self::from_parts(parts as u32)
    }

    pub fn parts(&self) -> u32 {
        self.0
    }

    pub fn as_percent(&self) -> f64 {
        self.0 as f64 * 100.0 / Self::ACCURACY as f64
    }
}

impl fmt::Display for Commission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.as_percent())
    }
}

// =============================================================================
// Newtype Wrappers - Temporal
// =============================================================================

/// Unix timestamp in seconds since epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp())
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.0, 0).unwrap_or_default()
    }
}

// =============================================================================
// Domain Structs
// =============================================================================

/// Identity of a queued action: the block it was announced at plus the
/// controller that announced it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionKey {
    pub announced_block: BlockNumber,
    pub controller: Address,
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.controller, self.announced_block)
    }
}

/// A nomination that was announced through a time-delay proxy and is
/// waiting for its delay window to pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayedAction {
    pub announced_block: BlockNumber,
    pub principal: Address,
    pub controller: Address,
    pub targets: Vec<Address>,
    pub action_hash: CallHash,
}

impl DelayedAction {
    pub fn key(&self) -> ActionKey {
        ActionKey {
            announced_block: self.announced_block,
            controller: self.controller.clone(),
        }
    }

    /// First block at which the action may be executed.
    pub fn ready_at(&self, delay_blocks: BlockNumber) -> BlockNumber {
        self.announced_block.saturating_add(delay_blocks)
    }
}

/// An outstanding announcement held by the ledger's proxy subsystem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub call_hash: CallHash,
    pub real: Address,
    #[serde(default)]
    pub height: BlockNumber,
}

/// Result of submitting a nomination through the proxy.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub submitted: bool,
    pub finalized_block_hash: Option<BlockHash>,
}

impl Submission {
    pub fn finalized(hash: BlockHash) -> Self {
        Self {
            submitted: true,
            finalized_block_hash: Some(hash),
        }
    }

    pub fn not_submitted() -> Self {
        Self::default()
    }
}

/// Audit record of an executed nomination.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub controller: Address,
    pub era: EraIndex,
    pub targets: Vec<Address>,
    pub bonded: Balance,
    pub finalized_block_hash: Option<BlockHash>,
    pub executed_at: Timestamp,
}
