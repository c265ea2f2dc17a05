//! Canvas compositing: orientation-corrected square frames.
//!
//! # Coordinate System
//!
//! - Origin is the top-left corner of the frame, y grows downward
//! - Positive rotation angles are clockwise on screen
//! - The frame is always square, sized to the bitmap's longer side

mod canvas;
mod rotation;

pub use canvas::{composite, composite_rotated, CanvasFrame, ComposeError, FrameLayout, Rect};
pub use rotation::Rotation;
