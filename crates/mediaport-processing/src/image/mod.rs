//! Image operations used by the transcoder.

pub mod resize;

pub use resize::ImageResize;
