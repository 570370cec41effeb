//! Workspace capacity summaries

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusClass {
    Available,
    Warning,
    Full,
}

impl StatusClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusClass::Available => "available",
            StatusClass::Warning => "warning",
            StatusClass::Full => "full",
        }
    }
}

impl std::fmt::Display for StatusClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capacity {
    pub available: u32,
    pub percentage: u32,
    pub status: StatusClass,
}

const WARNING_PERCENT: u32 = 80;

/// Summarise how much of `capacity` is taken by `assigned`.
///
/// A zero capacity with anything assigned counts as 100%.
pub fn calculate_capacity(capacity: u32, assigned: u32) -> Capacity {
    let percentage = if capacity == 0 {
        if assigned > 0 {
            100
        } else {
            0
        }
    } else {
        ((u64::from(assigned) * 100 + u64::from(capacity) / 2) / u64::from(capacity)) as u32
    };

    let status = if percentage >= 100 {
        StatusClass::Full
    } else if percentage >= WARNING_PERCENT {
        StatusClass::Warning
    } else {
        StatusClass::Available
    };

    Capacity {
        available: capacity.saturating_sub(assigned),
        percentage,
        status,
    }
}
