//! Output flag names and the per-backend flag table
//!
//! The numeric value behind each flag belongs to the engine library and can
//! differ between versions, so the values live in a [`FlagTable`] supplied by
//! the backend instead of in this enum.

use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

/// Named output flag understood by the engine
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum OutputFlag {
    /// No flags
    Default,
    /// Resolve addresses to host names
    ReverseDns,
    /// Print port numbers as service names
    Service,
    /// Omit stateful data such as counters and quotas
    Stateless,
    /// Annotate objects with `# handle N`
    Handle,
    /// Emit JSON instead of text
    Json,
    /// Echo added objects back, including their handles
    Echo,
    /// Print UID/GID as user and group names
    Guid,
    NumericProto,
    NumericPrio,
    NumericSymbol,
    NumericTime,
    /// Union of the four numeric flags
    NumericAll,
    /// Omit set and map contents
    Terse,
}

impl OutputFlag {
    /// Returns `true` for flags that stand for a union of other flags
    pub const fn is_composite(self) -> bool {
        matches!(self, OutputFlag::NumericAll)
    }
}

/// Numeric value of every [`OutputFlag`] as reported by one engine library.
///
/// Built once per process by a backend and never mutated afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagTable {
    pub reverse_dns: u32,
    pub service: u32,
    pub stateless: u32,
    pub handle: u32,
    pub json: u32,
    pub echo: u32,
    pub guid: u32,
    pub numeric_proto: u32,
    pub numeric_prio: u32,
    pub numeric_symbol: u32,
    pub numeric_time: u32,
    pub numeric_all: u32,
    pub terse: u32,
}

impl FlagTable {
    /// Returns the bit value of a single flag
    pub const fn value(&self, flag: OutputFlag) -> u32 {
        match flag {
            OutputFlag::Default => 0,
            OutputFlag::ReverseDns => self.reverse_dns,
            OutputFlag::Service => self.service,
            OutputFlag::Stateless => self.stateless,
            OutputFlag::Handle => self.handle,
            OutputFlag::Json => self.json,
            OutputFlag::Echo => self.echo,
            OutputFlag::Guid => self.guid,
            OutputFlag::NumericProto => self.numeric_proto,
            OutputFlag::NumericPrio => self.numeric_prio,
            OutputFlag::NumericSymbol => self.numeric_symbol,
            OutputFlag::NumericTime => self.numeric_time,
            OutputFlag::NumericAll => self.numeric_all,
            OutputFlag::Terse => self.terse,
        }
    }

    /// Bitwise union of the given flags
    pub fn combine<'a>(&self, flags: impl IntoIterator<Item = &'a OutputFlag>) -> u32 {
        flags.into_iter().fold(0, |acc, f| acc | self.value(*f))
    }

    /// Names of the flags set in `bits`.
    ///
    /// Composite flags are reported instead of their parts when all parts
    /// are present. Bits unknown to the table are ignored.
    pub fn decode(&self, bits: u32) -> Vec<OutputFlag> {
        let mut remaining = bits;
        let mut names = Vec::new();

        for flag in OutputFlag::iter().filter(|f| f.is_composite()) {
            let value = self.value(flag);
            if value != 0 && remaining & value == value {
                names.push(flag);
                remaining &= !value;
            }
        }

        for flag in OutputFlag::iter().filter(|f| !f.is_composite()) {
            let value = self.value(flag);
            if value != 0 && remaining & value == value {
                names.push(flag);
            }
        }

        names
    }

    /// All flags with their values, in declaration order
    pub fn entries(&self) -> Vec<(OutputFlag, u32)> {
        OutputFlag::iter().map(|f| (f, self.value(f))).collect()
    }
}

/// Parses a flag given either by name (`handle`, `numeric-all`) or as a raw
/// integer.
///
/// # Errors
///
/// Returns `Error::Validation` for unknown names and for integers that are
/// negative or do not fit in 32 bits.
pub fn parse_flag(input: &str, table: &FlagTable) -> Result<u32> {
    let input = input.trim();

    if let Ok(flag) = input.parse::<OutputFlag>() {
        return Ok(table.value(flag));
    }

    match input.parse::<i128>() {
        Ok(n) => to_flag_bits(n),
        Err(_) => Err(Error::validation(
            "flags",
            format!("unknown output flag '{input}'"),
        )),
    }
}

/// Converts any integer-like value into flag bits.
///
/// # Errors
///
/// Returns `Error::Validation` if the value is not a non-negative 32-bit integer.
pub fn to_flag_bits<T>(value: T) -> Result<u32>
where
    T: TryInto<u32> + Copy + std::fmt::Display,
{
    value.try_into().map_err(|_| {
        Error::validation(
            "flags",
            format!("{value} is not a non-negative 32-bit integer"),
        )
    })
}
