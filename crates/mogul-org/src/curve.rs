//! Bonding curve math.
//!
//! Pure functions over 18-decimal fixed-point [`U256`] amounts. Every result
//! is floored so the organisation never mints or pays out more than the
//! exact curve value.

use crate::error::CurveError;
use mogul_types::U256;
use serde::{Deserialize, Serialize};

/// 10^36, the square of the fixed-point scale.
const WAD_SQUARED: U256 = U256::from_limbs([0xb34b9f1000000000, 0x00c097ce7bc90715, 0, 0]);

/// Which buy formula the organisation uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveVersion {
    /// `supply * (sqrt(1 + deposit / invested) - 1)`
    SqrtRatio,
    /// `sqrt(supply^2 + 2 * deposit * pre_minted) - supply`
    Algebraic,
}

impl CurveVersion {
    pub fn name(&self) -> &'static str {
        match self {
            CurveVersion::SqrtRatio => "sqrt_ratio",
            CurveVersion::Algebraic => "algebraic",
        }
    }
}

fn mul(a: &U256, b: &U256, op: &'static str) -> Result<U256, CurveError> {
    a.checked_mul(b).ok_or(CurveError::Overflow(op))
}

fn add(a: &U256, b: &U256, op: &'static str) -> Result<U256, CurveError> {
    a.checked_add(b).ok_or(CurveError::Overflow(op))
}

fn mul_div(a: &U256, b: &U256, c: &U256, op: &'static str) -> Result<U256, CurveError> {
    if c.is_zero() {
        return Err(CurveError::DivisionByZero(op));
    }
    a.mul_div(b, c).ok_or(CurveError::Overflow(op))
}

/// Curve coefficient of the algebraic form: `supply^2 / (2 * invested)`.
///
/// For the canonical unlock (supply minted 2:1 against the deposit) this is
/// the pre-minted supply itself.
pub fn pre_minted(supply: &U256, invested: &U256) -> Result<U256, CurveError> {
    let twice_invested = add(invested, invested, "pre_minted")?;
    mul_div(supply, supply, &twice_invested, "pre_minted")
}

/// Tokens minted for `deposit` given the current supply and total invested.
pub fn buy(
    version: CurveVersion,
    supply: &U256,
    invested: &U256,
    deposit: &U256,
) -> Result<U256, CurveError> {
    if deposit.is_zero() {
        return Ok(U256::ZERO);
    }
    if invested.is_zero() {
        return Err(CurveError::DivisionByZero("buy"));
    }

    match version {
        CurveVersion::SqrtRatio => {
            let total = add(invested, deposit, "buy")?;
            let ratio = mul_div(&total, &WAD_SQUARED, invested, "buy")?;
            // ratio >= 10^36, so root >= WAD
            let root = ratio.isqrt();
            let growth = root.checked_sub(&U256::WAD).unwrap_or(U256::ZERO);
            mul_div(supply, &growth, &U256::WAD, "buy")
        }
        CurveVersion::Algebraic => {
            let coefficient = pre_minted(supply, invested)?;
            let supply_sq = mul(supply, supply, "buy")?;
            let twice_deposit = add(deposit, deposit, "buy")?;
            let term = mul(&twice_deposit, &coefficient, "buy")?;
            let root = add(&supply_sq, &term, "buy")?.isqrt();
            Ok(root.checked_sub(supply).unwrap_or(U256::ZERO))
        }
    }
}

/// Reserve paid out for burning `burn` tokens:
/// `reserve * (1 - (1 - burn / supply)^2)`, evaluated as
/// `reserve * burn * (2 * supply - burn) / supply^2`.
pub fn sell(supply: &U256, reserve: &U256, burn: &U256) -> Result<U256, CurveError> {
    if burn > supply {
        return Err(CurveError::BurnExceedsSupply {
            burn: *burn,
            supply: *supply,
        });
    }
    if burn.is_zero() {
        return Ok(U256::ZERO);
    }
    if burn == supply {
        return Ok(*reserve);
    }

    let twice_supply = add(supply, supply, "sell")?;
    let remaining_factor = twice_supply.checked_sub(burn).ok_or(CurveError::Overflow("sell"))?;
    let numerator = mul(burn, &remaining_factor, "sell")?;
    let denominator = mul(supply, supply, "sell")?;
    mul_div(reserve, &numerator, &denominator, "sell")
}

/// Top-up needed to close: `max(0, supply^2 / initial_supply / 2 - reserve)`.
pub fn close_penalty(
    supply: &U256,
    initial_supply: &U256,
    reserve: &U256,
) -> Result<U256, CurveError> {
    let twice_initial = add(initial_supply, initial_supply, "close_penalty")?;
    let required = mul_div(supply, supply, &twice_initial, "close_penalty")?;
    Ok(required.saturating_sub(reserve))
}

/// Reward tokens owed for `minted` governance tokens.
pub fn reward(minted: &U256, multiplier: u64) -> Result<U256, CurveError> {
    mul(minted, &U256::from(multiplier), "reward")
}

/// Vote weight for a token balance: `isqrt(balance * multiplier)`.
pub fn vote_weight(balance: &U256, multiplier: u64) -> Result<U256, CurveError> {
    Ok(mul(balance, &U256::from(multiplier), "vote_weight")?.isqrt())
}

/// Split `amount` into `(reserve_share, bank_share)` by `ratio_percent`.
pub fn split(amount: &U256, ratio_percent: u8) -> Result<(U256, U256), CurveError> {
    if ratio_percent > 100 {
        return Err(CurveError::InvalidRatio(ratio_percent));
    }
    let reserve_share = mul_div(
        amount,
        &U256::from(ratio_percent as u64),
        &U256::from(100u64),
        "split",
    )?;
    let bank_share = amount
        .checked_sub(&reserve_share)
        .ok_or(CurveError::Overflow("split"))?;
    Ok((reserve_share, bank_share))
}
