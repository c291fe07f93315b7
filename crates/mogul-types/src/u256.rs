use crate::error::TypesError;
use num_bigint::BigUint;
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};
use std::str::FromStr;

/// 256-bit unsigned integer for token and reserve amounts.
///
/// Four little-endian u64 limbs. Amounts are fixed point with 18 decimals:
/// one whole token or one whole unit of the stable asset is [`U256::WAD`]
/// base units.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct U256([u64; 4]);

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.iter().rev().cmp(other.0.iter().rev())
    }
}

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl U256 {
    pub const ZERO: Self = Self([0; 4]);
    pub const ONE: Self = Self::from_u64(1);
    pub const MAX: Self = Self([u64::MAX; 4]);

    /// One whole unit in base units (10^18).
    pub const WAD: Self = Self::from_u64(1_000_000_000_000_000_000);

    /// Limbs in little-endian order.
    pub const fn from_limbs(limbs: [u64; 4]) -> Self {
        Self(limbs)
    }

    pub const fn from_u64(value: u64) -> Self {
        Self([value, 0, 0, 0])
    }

    pub const fn from_u128(value: u128) -> Self {
        Self([value as u64, (value >> 64) as u64, 0, 0])
    }

    /// `whole` units expressed in base units (`whole * 10^18`).
    pub const fn from_whole(whole: u64) -> Self {
        // u64::MAX * 10^18 < 2^128
        Self::from_u128(whole as u128 * 1_000_000_000_000_000_000)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 4]
    }

    pub fn checked_add(&self, rhs: &Self) -> Option<Self> {
        let mut out = [0u64; 4];
        let mut carry = false;
        for (i, limb) in out.iter_mut().enumerate() {
            let (sum, c1) = self.0[i].overflowing_add(rhs.0[i]);
            let (sum, c2) = sum.overflowing_add(carry as u64);
            *limb = sum;
            carry = c1 || c2;
        }
        (!carry).then_some(Self(out))
    }

    /// Wrapped difference and whether it borrowed past the top limb.
    fn borrowing_sub(&self, rhs: &Self) -> (Self, bool) {
        let mut out = [0u64; 4];
        let mut borrow = false;
        for (i, limb) in out.iter_mut().enumerate() {
            let (diff, b1) = self.0[i].overflowing_sub(rhs.0[i]);
            let (diff, b2) = diff.overflowing_sub(borrow as u64);
            *limb = diff;
            borrow = b1 || b2;
        }
        (Self(out), borrow)
    }

    pub fn checked_sub(&self, rhs: &Self) -> Option<Self> {
        match self.borrowing_sub(rhs) {
            (diff, false) => Some(diff),
            (_, true) => None,
        }
    }

    /// Schoolbook product; anything that lands above limb 3 is an overflow.
    pub fn checked_mul(&self, rhs: &Self) -> Option<Self> {
        let mut out = [0u64; 4];
        for i in 0..4 {
            if self.0[i] == 0 {
                continue;
            }
            let mut carry: u128 = 0;
            for j in 0..4 {
                let product = self.0[i] as u128 * rhs.0[j] as u128;
                if i + j >= 4 {
                    if product != 0 || carry != 0 {
                        return None;
                    }
                    continue;
                }
                // (2^64-1)^2 + 2(2^64-1) == 2^128-1
                let acc = product + out[i + j] as u128 + carry;
                out[i + j] = acc as u64;
                carry = acc >> 64;
            }
            if carry != 0 {
                return None;
            }
        }
        Some(Self(out))
    }

    /// Floor division.
    pub fn checked_div(&self, rhs: &Self) -> Option<Self> {
        self.div_rem(rhs).map(|(quotient, _)| quotient)
    }

    /// Restoring long division, one bit per step.
    fn div_rem(&self, rhs: &Self) -> Option<(Self, Self)> {
        if rhs.is_zero() {
            return None;
        }
        if self < rhs {
            return Some((Self::ZERO, *self));
        }

        let mut quotient = Self::ZERO;
        let mut remainder = Self::ZERO;
        for i in (0..self.bit_len()).rev() {
            let overflowed = remainder.0[3] >> 63 == 1;
            remainder = remainder.shl1();
            remainder.0[0] |= (self.0[(i / 64) as usize] >> (i % 64)) & 1;
            if overflowed || remainder >= *rhs {
                remainder = remainder.borrowing_sub(rhs).0;
                quotient.0[(i / 64) as usize] |= 1 << (i % 64);
            }
        }
        Some((quotient, remainder))
    }

    /// `self * mul / div`, floored, through a 512-bit intermediate when the
    /// product does not fit. `None` on a zero divisor or a quotient wider
    /// than 256 bits.
    pub fn mul_div(&self, mul: &Self, div: &Self) -> Option<Self> {
        if div.is_zero() {
            return None;
        }
        match self.checked_mul(mul) {
            Some(product) => product.checked_div(div),
            None => Self::from_big(&(self.to_big() * mul.to_big() / div.to_big())),
        }
    }

    pub fn saturating_add(&self, rhs: &Self) -> Self {
        self.checked_add(rhs).unwrap_or(Self::MAX)
    }

    pub fn saturating_sub(&self, rhs: &Self) -> Self {
        self.checked_sub(rhs).unwrap_or(Self::ZERO)
    }

    /// Position of the highest set bit plus one.
    pub fn bit_len(&self) -> u32 {
        match self.0.iter().rposition(|limb| *limb != 0) {
            Some(i) => (i as u32 + 1) * 64 - self.0[i].leading_zeros(),
            None => 0,
        }
    }

    /// `floor(sqrt(self))`.
    ///
    /// Newton's iteration from `2^ceil(bits/2)`, which is never below the
    /// root, so the sequence falls until it stops improving.
    pub fn isqrt(&self) -> Self {
        if self.is_zero() {
            return Self::ZERO;
        }
        let shift = (self.bit_len() + 1) / 2;
        let mut x = Self::ZERO;
        x.0[(shift / 64) as usize] = 1 << (shift % 64);

        loop {
            let quotient = self.checked_div(&x).unwrap_or(Self::ZERO);
            let next = x.saturating_add(&quotient).shr1();
            if next >= x {
                return x;
            }
            x = next;
        }
    }

    fn shl1(&self) -> Self {
        let l = &self.0;
        Self([l[0] << 1, l[1] << 1 | l[0] >> 63, l[2] << 1 | l[1] >> 63, l[3] << 1 | l[2] >> 63])
    }

    fn shr1(&self) -> Self {
        let l = &self.0;
        Self([l[0] >> 1 | l[1] << 63, l[1] >> 1 | l[2] << 63, l[2] >> 1 | l[3] << 63, l[3] >> 1])
    }

    fn to_big(self) -> BigUint {
        BigUint::from_slice(&[
            self.0[0] as u32,
            (self.0[0] >> 32) as u32,
            self.0[1] as u32,
            (self.0[1] >> 32) as u32,
            self.0[2] as u32,
            (self.0[2] >> 32) as u32,
            self.0[3] as u32,
            (self.0[3] >> 32) as u32,
        ])
    }

    fn from_big(value: &BigUint) -> Option<Self> {
        let digits = value.to_u64_digits();
        if digits.len() > 4 {
            return None;
        }
        let mut limbs = [0u64; 4];
        limbs[..digits.len()].copy_from_slice(&digits);
        Some(Self(limbs))
    }

    fn parse_radix(digits: &str, radix: u32, original: &str) -> Result<Self, TypesError> {
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return Err(TypesError::InvalidAmount(original.to_string()));
        }
        let value = BigUint::parse_bytes(digits.as_bytes(), radix)
            .ok_or_else(|| TypesError::InvalidAmount(original.to_string()))?;
        Self::from_big(&value).ok_or(TypesError::U256Overflow)
    }
}

impl From<u64> for U256 {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<u128> for U256 {
    fn from(value: u128) -> Self {
        Self::from_u128(value)
    }
}

impl TryFrom<U256> for u128 {
    type Error = TypesError;

    fn try_from(value: U256) -> Result<Self, Self::Error> {
        match value.0 {
            [lo, hi, 0, 0] => Ok((hi as u128) << 64 | lo as u128),
            _ => Err(TypesError::U256Overflow),
        }
    }
}

/// Decimal, in base units.
impl fmt::Display for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_big().to_str_radix(10))
    }
}

impl fmt::Debug for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U256({})", self)
    }
}

/// Decimal digits, or hex with a `0x` prefix.
impl FromStr for U256 {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex_digits) => Self::parse_radix(hex_digits, 16, s),
            None => Self::parse_radix(s, 10, s),
        }
    }
}

// Operators saturate (division by zero gives zero). Ledger code uses the
// checked forms; these are for tests and quotes.

impl Add for U256 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.saturating_add(&rhs)
    }
}

impl Sub for U256 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.saturating_sub(&rhs)
    }
}

impl Mul for U256 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.checked_mul(&rhs).unwrap_or(Self::MAX)
    }
}

impl Div for U256 {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        self.checked_div(&rhs).unwrap_or(Self::ZERO)
    }
}
