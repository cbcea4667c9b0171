//! # Accrual Constants
//!
//! Fixed-point scale and time constants shared with the on-chain staking
//! program. Values must match the program exactly or displayed accruals drift
//! from what a claim would pay out.

/// Fixed-point scale applied to per-token accumulators (1e9)
pub const SCALE: u128 = 1_000_000_000;

/// 365 days
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Basis points denominator (10,000 = 100%)
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Decimals of the ledger's native asset (lamports per SOL = 1e9)
pub const NATIVE_DECIMALS: u8 = 9;

/// Lamports kept back from a native reflection vault when clamping the
/// displayed reflection: rent-exempt minimum (~0.002 SOL) plus 0.001 SOL.
pub const DEFAULT_NATIVE_VAULT_BUFFER: u128 = 3_000_000;

/// On-chain `rate_mode` byte for fixed-APY pools. Any other value is a
/// dynamic pool.
pub const RATE_MODE_FIXED_APY: u8 = 0;
