//! Font descriptions in the `"Family [Style...] Size"` form used by the config file.

use std::fmt;

/// Font used when nothing is configured
pub const DEFAULT_FONT: &str = "Monospace 8";

/// Size assumed for descriptions without one
const DEFAULT_SIZE: f64 = 8.0;

/// Font sizes never shrink below this many points
pub const MINIMUM_SIZE: f64 = 6.0;

/// Larger sizes are clamped to this many points
pub const MAXIMUM_SIZE: f64 = 256.0;

/// A parsed font description
#[derive(Debug, Clone, PartialEq)]
pub struct FontDescription {
    /// Family and style words, e.g. `"DejaVu Sans Mono Bold"`
    pub family: String,
    /// Size in points
    pub size: f64,
}

impl Default for FontDescription {
    fn default() -> Self {
        Self {
            family: "Monospace".to_string(),
            size: DEFAULT_SIZE,
        }
    }
}

impl FontDescription {
    /// Parse a description, falling back to the default font when the size is unusable
    pub fn parse(s: &str) -> Self {
        Self::try_parse(s).unwrap_or_default()
    }

    /// Parse a description. The last word is the size if it is numeric, otherwise the
    /// whole string is the family. A numeric size that is not finite and positive is
    /// rejected; sizes above [`MAXIMUM_SIZE`] are clamped.
    pub fn try_parse(s: &str) -> Option<Self> {
        let trimmed = s.trim().trim_end_matches(',');
        if let Some((family, last)) = trimmed.rsplit_once(char::is_whitespace) {
            if let Ok(size) = last.trim_end_matches("px").parse::<f64>() {
                if !size.is_finite() || size <= 0.0 {
                    return None;
                }
                return Some(Self {
                    family: family.trim_end().trim_end_matches(',').to_string(),
                    size: size.min(MAXIMUM_SIZE),
                });
            }
        }

        if trimmed.is_empty() {
            return Some(Self::default());
        }
        Some(Self {
            family: trimmed.to_string(),
            size: DEFAULT_SIZE,
        })
    }

    /// One point larger
    pub fn larger(&self) -> Self {
        Self {
            family: self.family.clone(),
            size: (self.size + 1.0).min(MAXIMUM_SIZE),
        }
    }

    /// One point smaller, or `None` when that would go below the minimum size
    pub fn smaller(&self) -> Option<Self> {
        let size = self.size - 1.0;
        if size < MINIMUM_SIZE {
            return None;
        }
        Some(Self {
            family: self.family.clone(),
            size,
        })
    }
}

impl fmt::Display for FontDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.family, self.size)
    }
}
