//! Per-band series and their smooth, non-overshooting rendering.

pub mod chart;
pub mod monotone;
pub mod series;

pub use chart::{Chart, ChartKind, PathCommand, PlotArea, Trace, YRange};
pub use monotone::{monotone_segments, CubicSegment, Point};
pub use series::CurveSeries;
