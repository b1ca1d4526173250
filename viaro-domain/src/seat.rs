use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A seat position within a vehicle, e.g. "A1" or "B12".
///
/// Ordering is row letter first, then seat number numerically, so "A10"
/// sorts after "A9" rather than after "A1". This is the canonical display
/// order for every seat listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeatLabel {
    pub row: char,
    pub number: u32,
}

impl SeatLabel {
    pub fn new(row: char, number: u32) -> Self {
        Self { row, number }
    }
}

impl fmt::Display for SeatLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.number)
    }
}

impl FromStr for SeatLabel {
    type Err = ParseSeatLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let row = chars
            .next()
            .ok_or_else(|| ParseSeatLabelError(s.to_string()))?;
        if !row.is_ascii_uppercase() {
            return Err(ParseSeatLabelError(s.to_string()));
        }
        let number: u32 = chars
            .as_str()
            .parse()
            .map_err(|_| ParseSeatLabelError(s.to_string()))?;
        if number == 0 {
            return Err(ParseSeatLabelError(s.to_string()));
        }
        Ok(Self { row, number })
    }
}

impl TryFrom<String> for SeatLabel {
    type Error = ParseSeatLabelError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SeatLabel> for String {
    fn from(label: SeatLabel) -> Self {
        label.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid seat label: {0:?}")]
pub struct ParseSeatLabelError(pub String);

/// A physical seat owned by a vehicle. Labels are generated once at
/// provisioning time and are unique per vehicle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub label: SeatLabel,
}

impl Seat {
    pub fn new(vehicle_id: Uuid, label: SeatLabel) -> Self {
        Self {
            id: Uuid::new_v4(),
            vehicle_id,
            label,
        }
    }
}
