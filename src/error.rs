//! Processing faults raised inside an entity's phase method.
//!
//! A fault never leaves the pipeline: the scheduler catches it at the phase
//! boundary, logs it and skips the entity for that tick.

use std::fmt::{self, Display};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// A raster does not have the configured frame dimensions
    DimensionMismatch {
        what: &'static str,
        expected: (u32, u32),
        found: (u32, u32),
    },
    /// An operation produced a raster with no pixels
    EmptyRaster { what: &'static str },
}

impl Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::DimensionMismatch {
                what,
                expected,
                found,
            } => write!(
                f,
                "{what}: expected {}x{}, found {}x{}",
                expected.0, expected.1, found.0, found.1
            ),
            Fault::EmptyRaster { what } => write!(f, "{what}: raster is empty"),
        }
    }
}

impl std::error::Error for Fault {}

/// Check that a raster matches `expected` (width, height)
pub fn ensure_dimensions(
    what: &'static str,
    expected: (u32, u32),
    found: (u32, u32),
) -> Result<(), Fault> {
    if expected == found {
        Ok(())
    } else {
        Err(Fault::DimensionMismatch {
            what,
            expected,
            found,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_check() {
        assert!(ensure_dimensions("frame", (800, 600), (800, 600)).is_ok());
        let err = ensure_dimensions("mask", (800, 600), (640, 480)).unwrap_err();
        assert_eq!(err.to_string(), "mask: expected 800x600, found 640x480");
    }
}
