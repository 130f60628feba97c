use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Letter {
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "F")]
    F,
}

/// Percentage floor for each letter, highest first. Anything below the last
/// band (including NaN) is an F.
const BANDS: [(f64, Letter); 6] = [
    (80.0, Letter::APlus),
    (70.0, Letter::A),
    (60.0, Letter::AMinus),
    (50.0, Letter::B),
    (40.0, Letter::C),
    (33.0, Letter::D),
];

impl Letter {
    pub fn as_str(self) -> &'static str {
        match self {
            Letter::APlus => "A+",
            Letter::A => "A",
            Letter::AMinus => "A-",
            Letter::B => "B",
            Letter::C => "C",
            Letter::D => "D",
            Letter::F => "F",
        }
    }

    pub fn gpa_points(self) -> f64 {
        match self {
            Letter::APlus => 5.0,
            Letter::A => 4.0,
            Letter::AMinus => 3.5,
            Letter::B => 3.0,
            Letter::C => 2.0,
            Letter::D => 1.0,
            Letter::F => 0.0,
        }
    }
}

impl std::fmt::Display for Letter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Letter grade for `obtained` out of `full`.
///
/// `full == 0` is not rejected: the percentage is NaN (or infinite for a
/// nonzero `obtained`), NaN fails every band and grades as F.
pub fn grade(obtained: f64, full: f64) -> Letter {
    let pct = obtained / full * 100.0;
    BANDS
        .iter()
        .find(|(floor, _)| pct >= *floor)
        .map(|(_, letter)| *letter)
        .unwrap_or(Letter::F)
}

/// Display percentage rounded to two decimals; `None` when undefined.
pub fn percentage(obtained: f64, full: f64) -> Option<f64> {
    let pct = obtained / full * 100.0;
    if pct.is_finite() {
        Some((pct * 100.0).round() / 100.0)
    } else {
        None
    }
}
