//! Fixed-point decimal values
//!
//! Sensors report integers along with a number of decimal places, so a
//! reading of `314` with `2` decimals means `3.14`. [`Value`] keeps both,
//! so no precision is lost until converted with [`Value::to_f64`].
use std::{cmp::Ordering, fmt, ops};

/// A fixed-point decimal value. The [`Default`] value is zero.
#[derive(Clone, Copy, Default)]
pub struct Value {
    value: i32,
    decimals: u16,
}

impl Value {
    /// Convert an integer to a [`Value`]
    pub const fn from_int(i: i32) -> Self {
        Self {
            value: i,
            decimals: 0,
        }
    }

    /// Convert to an integer, truncating any fractional part.
    pub fn to_int(self) -> i32 {
        let mut v = self.value;
        for _ in 0..self.decimals {
            v /= 10;
        }
        v
    }

    /// Convert to a float
    pub fn to_f64(self) -> f64 {
        f64::from(self.value) / 10f64.powi(i32::from(self.decimals))
    }

    /// Multiply the value by `10^n`
    pub fn shift10(self, n: i16) -> Self {
        if n < 0 {
            return Self {
                value: self.value,
                decimals: self.decimals.saturating_add(n.unsigned_abs()),
            };
        }
        let n = n as u16;
        if n <= self.decimals {
            return Self {
                value: self.value,
                decimals: self.decimals - n,
            };
        }
        let mut value = self.value;
        for _ in self.decimals..n {
            value = value.wrapping_mul(10);
        }
        Self { value, decimals: 0 }
    }

    /// Bring both values to the same number of decimals.
    fn normalize(mut self, mut other: Self) -> (Self, Self) {
        while self.decimals > other.decimals {
            other.value = other.value.wrapping_mul(10);
            other.decimals += 1;
        }
        while self.decimals < other.decimals {
            self.value = self.value.wrapping_mul(10);
            self.decimals += 1;
        }
        (self, other)
    }
}

impl ops::Add for Value {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let (a, b) = self.normalize(rhs);
        Self {
            value: a.value.wrapping_add(b.value),
            decimals: a.decimals,
        }
    }
}

impl ops::Sub for Value {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        let (a, b) = self.normalize(rhs);
        Self {
            value: a.value.wrapping_sub(b.value),
            decimals: a.decimals,
        }
    }
}

impl ops::Neg for Value {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            value: self.value.wrapping_neg(),
            decimals: self.decimals,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = self.normalize(*other);
        a.value == b.value
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = self.normalize(*other);
        a.value.cmp(&b.value)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::from_int(i)
    }
}

impl fmt::Display for Value {
    /// Formats like the equivalent [`f64`], honoring precision and width.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_f64(), f)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("value", &self.value)
            .field("decimals", &self.decimals)
            .finish()
    }
}
