//! Orientation code to canvas rotation mapping.
//!
//! Canvas rotation follows the 2D context convention: y grows downward, so a
//! positive angle turns the content clockwise on screen.
//!
//! ```text
//! code        rotation
//! -1, 1, 2    0
//! 3, 4        -180
//! 5, 6        90
//! 7, 8        -90
//! other       0
//! ```
//!
//! Mirrored orientations (2, 4, 5, 7) share the rotation of their unmirrored
//! neighbour; no flip is applied.

use serde::{Deserialize, Serialize};

use crate::decode::OrientationCode;

/// Rotation applied to the canvas before drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    None,
    /// +90 degrees.
    Clockwise90,
    /// -90 degrees.
    CounterClockwise90,
    /// -180 degrees.
    HalfTurn,
}

impl Rotation {
    /// Total mapping from integer orientation codes.
    pub fn from_code(code: i32) -> Self {
        match code {
            -1 | 1 | 2 => Rotation::None,
            3 | 4 => Rotation::HalfTurn,
            5 | 6 => Rotation::Clockwise90,
            7 | 8 => Rotation::CounterClockwise90,
            _ => Rotation::None,
        }
    }

    pub fn degrees(self) -> i32 {
        match self {
            Rotation::None => 0,
            Rotation::Clockwise90 => 90,
            Rotation::CounterClockwise90 => -90,
            Rotation::HalfTurn => -180,
        }
    }

    pub fn radians(self) -> f64 {
        (self.degrees() as f64).to_radians()
    }

    /// Whether the drawn content ends up with width and height exchanged.
    pub fn is_quarter_turn(self) -> bool {
        matches!(self, Rotation::Clockwise90 | Rotation::CounterClockwise90)
    }
}

impl From<OrientationCode> for Rotation {
    fn from(code: OrientationCode) -> Self {
        Rotation::from_code(code.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::Orientation;
    use proptest::prelude::*;

    #[test]
    fn test_table() {
        for code in [-1, 1, 2] {
            assert_eq!(Rotation::from_code(code).degrees(), 0);
        }
        for code in [3, 4] {
            assert_eq!(Rotation::from_code(code).degrees(), -180);
        }
        for code in [5, 6] {
            assert_eq!(Rotation::from_code(code).degrees(), 90);
        }
        for code in [7, 8] {
            assert_eq!(Rotation::from_code(code).degrees(), -90);
        }
        assert_eq!(Rotation::from_code(-2), Rotation::None);
        assert_eq!(Rotation::from_code(0), Rotation::None);
        assert_eq!(Rotation::from_code(9), Rotation::None);
    }

    #[test]
    fn test_from_orientation_code() {
        assert_eq!(Rotation::from(OrientationCode::NotJpeg), Rotation::None);
        assert_eq!(Rotation::from(OrientationCode::Undefined), Rotation::None);
        assert_eq!(
            Rotation::from(OrientationCode::Tagged(Orientation::Rotate90CW)),
            Rotation::Clockwise90
        );
        assert_eq!(
            Rotation::from(OrientationCode::Tagged(Orientation::Rotate270CW)),
            Rotation::CounterClockwise90
        );
    }

    #[test]
    fn test_radians() {
        assert_eq!(Rotation::None.radians(), 0.0);
        assert!((Rotation::Clockwise90.radians() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!((Rotation::HalfTurn.radians() + std::f64::consts::PI).abs() < 1e-12);
    }

    proptest! {
        /// Every integer resolves to one of the four angles, and anything
        /// outside the recognised codes resolves to zero.
        #[test]
        fn prop_mapping_is_total(code in any::<i32>()) {
            let degrees = Rotation::from_code(code).degrees();
            prop_assert!([0, 90, -90, -180].contains(&degrees));
            if !(-1..=8).contains(&code) || code == 0 {
                prop_assert_eq!(degrees, 0);
            }
        }
    }
}
