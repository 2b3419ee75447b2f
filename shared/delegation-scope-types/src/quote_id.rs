use alloc::string::{String, ToString};
use core::{fmt, str::FromStr};

/// Trading venue a quote was built for. Each venue owns its own quote cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Venue {
    /// Aggregated DEX swaps.
    Swap,
    /// Bonding-curve launchpad trades.
    BondingCurve,
    /// Perpetual positions.
    Perp,
}

impl Venue {
    pub const ALL: [Venue; 3] = [Venue::Swap, Venue::BondingCurve, Venue::Perp];

    /// Literal prefix carried by every wire-form id of this venue.
    ///
    /// These strings are a stable external contract; no prefix may be a prefix of another.
    pub const fn prefix(self) -> &'static str {
        match self {
            Venue::Swap => "swap_",
            Venue::BondingCurve => "curve_",
            Venue::Perp => "perp_",
        }
    }

    /// Dense index, used to pick the per-venue cache.
    pub const fn slot(self) -> usize {
        match self {
            Venue::Swap => 0,
            Venue::BondingCurve => 1,
            Venue::Perp => 2,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Venue::Swap => "swap",
            Venue::BondingCurve => "bonding-curve",
            Venue::Perp => "perp",
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors when parsing a wire-form quote id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuoteIdError {
    /// No known venue prefix.
    UnknownVenue(String),
    /// Prefix present but nothing after it.
    EmptyLocalId(Venue),
}

impl fmt::Display for QuoteIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteIdError::UnknownVenue(raw) => {
                write!(f, "quote id `{raw}` has no known venue prefix")
            }
            QuoteIdError::EmptyLocalId(venue) => {
                write!(f, "quote id for venue {venue} has an empty local id")
            }
        }
    }
}

/// Venue-tagged quote id.
///
/// Internally routing goes through `venue`; the prefixed string form only exists at the
/// boundary (`Display` / `FromStr`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuoteId {
    venue: Venue,
    local_id: String,
}

impl QuoteId {
    pub fn new(venue: Venue, local_id: impl Into<String>) -> Self {
        Self {
            venue,
            local_id: local_id.into(),
        }
    }

    pub fn venue(&self) -> Venue {
        self.venue
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    /// Parse the prefixed wire form, e.g. `curve_18c2f0a90001`.
    pub fn parse(raw: &str) -> Result<Self, QuoteIdError> {
        for venue in Venue::ALL {
            if let Some(local) = raw.strip_prefix(venue.prefix()) {
                if local.is_empty() {
                    return Err(QuoteIdError::EmptyLocalId(venue));
                }
                return Ok(Self::new(venue, local));
            }
        }
        Err(QuoteIdError::UnknownVenue(raw.to_string()))
    }
}

impl fmt::Display for QuoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.venue.prefix(), self.local_id)
    }
}

impl FromStr for QuoteId {
    type Err = QuoteIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
