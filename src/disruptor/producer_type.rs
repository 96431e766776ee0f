//! Which sequencer a ring buffer is built on

use crate::disruptor::{DisruptorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Producer threading model of a ring buffer
///
/// Serialized in lower case, so configuration files spell it `"single"` or
/// `"multi"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProducerType {
    /// Only one thread ever claims and publishes sequences
    ///
    /// The cursor is advanced with plain ordered stores, which is only correct
    /// when publishing is confined to a single thread.
    Single,

    /// Any number of threads may claim and publish concurrently
    #[default]
    Multi,
}

impl ProducerType {
    #[must_use]
    pub const fn is_single(self) -> bool {
        matches!(self, ProducerType::Single)
    }

    #[must_use]
    pub const fn is_multi(self) -> bool {
        !self.is_single()
    }
}

impl fmt::Display for ProducerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProducerType::Single => "Single",
            ProducerType::Multi => "Multi",
        })
    }
}

impl FromStr for ProducerType {
    type Err = DisruptorError;

    /// Accepts `single` or `multi` in any case
    ///
    /// ```
    /// use lapring::disruptor::ProducerType;
    ///
    /// assert_eq!("single".parse::<ProducerType>().unwrap(), ProducerType::Single);
    /// assert_eq!("MULTI".parse::<ProducerType>().unwrap(), ProducerType::Multi);
    /// assert!("many".parse::<ProducerType>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("single") {
            Ok(ProducerType::Single)
        } else if s.eq_ignore_ascii_case("multi") {
            Ok(ProducerType::Multi)
        } else {
            Err(DisruptorError::InvalidConfig(format!(
                "unknown producer type {s:?}, expected \"single\" or \"multi\""
            )))
        }
    }
}
