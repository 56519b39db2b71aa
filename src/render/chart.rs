use std::fmt::Write;

use serde::Serialize;

use super::monotone::{monotone_segments, Point};
use super::series::CurveSeries;
use crate::error::{CallerError, Result};

pub const MAX_SERIES: usize = 5;

const PALETTE: [&str; MAX_SERIES] = ["#1f77b4", "#d62728", "#2ca02c", "#ff7f0e", "#9467bd"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    /// Gain in dB.
    Gain,
    /// Output level in dB SPL.
    Output,
}

impl ChartKind {
    pub fn y_range(self) -> YRange {
        match self {
            ChartKind::Gain => YRange { min: -10.0, max: 80.0 },
            ChartKind::Output => YRange { min: 20.0, max: 140.0 },
        }
    }
}

/// Pixel rectangle the data is mapped into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlotArea {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for PlotArea {
    fn default() -> Self {
        Self {
            left: 40.0,
            top: 10.0,
            width: 560.0,
            height: 300.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum PathCommand {
    MoveTo { to: Point },
    CubicTo { c1: Point, c2: Point, to: Point },
    /// An isolated point with no neighbours to connect to.
    Marker { at: Point },
}

/// Pixel-space drawing of one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    pub series: String,
    pub color: &'static str,
    pub commands: Vec<PathCommand>,
}

#[derive(Debug)]
pub struct Chart {
    kind: ChartKind,
    area: PlotArea,
    series: Vec<CurveSeries>,
}

impl Chart {
    /// 1 to 5 series, all on the same band grid.
    pub fn new(kind: ChartKind, area: PlotArea, series: Vec<CurveSeries>) -> Result<Self> {
        if series.is_empty() || series.len() > MAX_SERIES {
            return Err(CallerError::Validation(format!(
                "A chart takes 1 to {} series, got {}",
                MAX_SERIES,
                series.len()
            )));
        }
        if series.iter().any(|s| s.grid != series[0].grid) {
            return Err(CallerError::Validation("Series on one chart must share a band grid".to_string()));
        }
        Ok(Self { kind, area, series })
    }

    pub fn kind(&self) -> ChartKind {
        self.kind
    }

    fn to_pixels(&self, p: Point) -> Point {
        let bands = self.series[0].grid.len();
        let YRange { min, max } = self.kind.y_range();
        let x_step = if bands > 1 { self.area.width / (bands - 1) as f64 } else { 0.0 };
        Point {
            x: self.area.left + p.x * x_step,
            y: self.area.top + (max - p.y) / (max - min) * self.area.height,
        }
    }

    /// Interpolation happens in band-index space; the result is mapped to
    /// pixels afterwards.
    pub fn traces(&self) -> Vec<Trace> {
        self.series
            .iter()
            .zip(PALETTE)
            .map(|(series, color)| {
                let mut commands = Vec::new();
                for run in series.runs() {
                    let points: Vec<Point> = run.into_iter().map(Point::from).collect();
                    if let [only] = points.as_slice() {
                        commands.push(PathCommand::Marker { at: self.to_pixels(*only) });
                        continue;
                    }
                    commands.push(PathCommand::MoveTo { to: self.to_pixels(points[0]) });
                    for seg in monotone_segments(&points) {
                        let seg = seg.map(|p| self.to_pixels(p));
                        commands.push(PathCommand::CubicTo { c1: seg.c1, c2: seg.c2, to: seg.to });
                    }
                }
                Trace {
                    series: series.name.clone(),
                    color,
                    commands,
                }
            })
            .collect()
    }

    pub fn to_svg(&self) -> String {
        let a = self.area;
        let (w, h) = (a.left * 2.0 + a.width, a.top * 2.0 + a.height);
        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}">"#
        );
        let _ = writeln!(
            svg,
            r##"  <rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="none" stroke="#999"/>"##,
            a.left, a.top, a.width, a.height
        );
        for trace in self.traces() {
            let mut d = String::new();
            let mut markers = Vec::new();
            for cmd in &trace.commands {
                match cmd {
                    PathCommand::MoveTo { to } => {
                        let _ = write!(d, "M{:.2} {:.2} ", to.x, to.y);
                    }
                    PathCommand::CubicTo { c1, c2, to } => {
                        let _ = write!(d, "C{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} ", c1.x, c1.y, c2.x, c2.y, to.x, to.y);
                    }
                    PathCommand::Marker { at } => markers.push(*at),
                }
            }
            if !d.is_empty() {
                let _ = writeln!(
                    svg,
                    r#"  <path data-series="{}" d="{}" fill="none" stroke="{}" stroke-width="2"/>"#,
                    trace.series,
                    d.trim_end(),
                    trace.color
                );
            }
            for m in markers {
                let _ = writeln!(
                    svg,
                    r#"  <circle data-series="{}" cx="{:.2}" cy="{:.2}" r="3" fill="{}"/>"#,
                    trace.series, m.x, m.y, trace.color
                );
            }
        }
        svg.push_str("</svg>\n");
        svg
    }
}
