//! Lifetime tags attached to every data spec.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How and when a data item is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Lifetime {
    /// Regular per-interval payload.
    #[default]
    Timeframe,
    /// Calibration object fetched from the condition backend.
    Condition,
    /// Periodic tick produced by the clock node.
    Timer,
    /// Enumerated counter produced by the clock node.
    Enumeration,
    Signal,
    /// Data that may or may not arrive for a given interval.
    Sporadic,
    Transient,
    #[serde(rename = "qa")]
    QA,
    OutOfBand,
    Optional,
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Lifetime::Timeframe => "timeframe",
            Lifetime::Condition => "condition",
            Lifetime::Timer => "timer",
            Lifetime::Enumeration => "enumeration",
            Lifetime::Signal => "signal",
            Lifetime::Sporadic => "sporadic",
            Lifetime::Transient => "transient",
            Lifetime::QA => "qa",
            Lifetime::OutOfBand => "out-of-band",
            Lifetime::Optional => "optional",
        };
        f.write_str(s)
    }
}
