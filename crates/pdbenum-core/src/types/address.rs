//! Memory address type.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Strongly typed virtual address inside the target process
///
/// This wrapper around `u64` keeps module bases and symbol addresses from being
/// mixed up with sizes, flags and the other `u32`/`u64` values the backend
/// hands back. Addresses are always 64-bit, even when the host (and therefore
/// the backend variant) is 32-bit.
///
/// The zero address doubles as the backend's "no module" sentinel, which is
/// why [`Address::is_null`] exists.
///
/// ## Example
///
/// ```rust
/// use pdbenum_core::types::Address;
///
/// let base = Address::from(0x7ff8_1000_0000);
/// assert!(base.contains(0x1000, Address::from(0x7ff8_1000_0800)));
/// assert_eq!(base.to_string(), "0x7FF810000000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(u64);

impl Address
{
    /// The null address (0x0), used by the backend to mean "no module"
    pub const ZERO: Self = Address(0);

    /// Create a new address from a `u64` value
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Whether this is the null address
    pub const fn is_null(self) -> bool
    {
        self.0 == 0
    }

    /// Whether `address` lies in `[self, self + size)`
    pub fn contains(self, size: u32, address: Address) -> bool
    {
        address.0 >= self.0 && address.0 - self.0 < u64::from(size)
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:X}", self.0)
    }
}

/// Parses `0x`-prefixed hexadecimal or plain decimal.
impl FromStr for Address
{
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        let trimmed = s.trim();
        let value = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16)?,
            None => trimmed.parse::<u64>()?,
        };
        Ok(Address(value))
    }
}
