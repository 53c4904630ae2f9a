pub mod calib;
pub mod geometry;
pub mod pointer;
pub mod projection;
pub mod smoothing;
pub mod system;
pub mod tracking;
