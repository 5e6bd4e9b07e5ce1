//! Size and time literals (`12px`, `50%`, `1.5em`, `250ms`, `2s`).

use std::fmt;
use std::str::FromStr;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind} literal '{input}'")]
pub struct UnitError {
    pub kind: &'static str,
    pub input: String,
}

impl UnitError {
    fn new(kind: &'static str, input: &str) -> Self {
        Self {
            kind,
            input: input.to_owned(),
        }
    }
}

/// A length relative to nothing (`px`), to a reference length (`%`) or to the font size (`em`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeUnit {
    Px(f64),
    Percent(f64),
    Em(f64),
}

impl SizeUnit {
    pub fn parse(s: &str) -> Result<Self, UnitError> {
        let t = s.trim();
        let (num, ctor): (&str, fn(f64) -> Self) = if let Some(n) = t.strip_suffix("px") {
            (n, Self::Px)
        } else if let Some(n) = t.strip_suffix('%') {
            (n, Self::Percent)
        } else if let Some(n) = t.strip_suffix("em") {
            (n, Self::Em)
        } else {
            (t, Self::Px)
        };
        let v = parse_number(num).ok_or_else(|| UnitError::new("size", s))?;
        Ok(ctor(v))
    }

    /// Resolve to pixels. `reference` backs percentages, `font_size` backs `em`.
    pub fn pixels(self, reference: f64, font_size: f64) -> f64 {
        match self {
            Self::Px(v) => v,
            Self::Percent(v) => reference * v / 100.0,
            Self::Em(v) => font_size * v,
        }
    }
}

impl FromStr for SizeUnit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SizeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Px(v) => write!(f, "{v}px"),
            Self::Percent(v) => write!(f, "{v}%"),
            Self::Em(v) => write!(f, "{v}em"),
        }
    }
}

/// A duration. Bare numbers are milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct TimeUnit {
    millis: f64,
}

impl TimeUnit {
    pub fn from_millis(millis: f64) -> Self {
        Self { millis }
    }

    pub fn from_secs(secs: f64) -> Self {
        Self {
            millis: secs * 1000.0,
        }
    }

    pub fn parse(s: &str) -> Result<Self, UnitError> {
        let t = s.trim();
        let (num, scale) = if let Some(n) = t.strip_suffix("ms") {
            (n, 1.0)
        } else if let Some(n) = t.strip_suffix('s') {
            (n, 1000.0)
        } else if let Some(n) = t.strip_suffix('m') {
            (n, 60_000.0)
        } else if let Some(n) = t.strip_suffix('h') {
            (n, 3_600_000.0)
        } else {
            (t, 1.0)
        };
        let v = parse_number(num).ok_or_else(|| UnitError::new("time", s))?;
        if v < 0.0 {
            return Err(UnitError::new("time", s));
        }
        Ok(Self { millis: v * scale })
    }

    pub fn as_millis(self) -> f64 {
        self.millis
    }

    pub fn as_secs_f64(self) -> f64 {
        self.millis / 1000.0
    }
}

impl FromStr for TimeUnit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.millis)
    }
}

fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}
