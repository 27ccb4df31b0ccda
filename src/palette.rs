//! Time-of-day palette resolution.
//!
//! A day is split into named sections, each owning three key colors. Resolving
//! an hour picks the section containing it and blends its colors toward the
//! following section by how far the hour has progressed through the span.

use serde::{Deserialize, Serialize};

use crate::{
    color::{Color, blend_colors},
    descriptor::{GradientDescriptor, GradientKind},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaletteSection {
    #[serde(default)]
    pub name: String,
    /// Inclusive start hour in `0.0..24.0`.
    pub start: f64,
    /// Exclusive end hour. `start > end` wraps past midnight.
    pub end: f64,
    pub top: Color,
    pub mid: Color,
    pub bottom: Color,
}

impl PaletteSection {
    pub fn wraps(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, hour: f64) -> bool {
        if self.wraps() {
            hour >= self.start || hour < self.end
        } else {
            hour >= self.start && hour < self.end
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteBlend {
    pub top: Color,
    pub mid: Color,
    pub bottom: Color,
}

impl PaletteBlend {
    /// Vertical three-stop gradient, top to bottom.
    pub fn to_descriptor(&self) -> GradientDescriptor {
        GradientDescriptor::build(
            &[self.top.clone(), self.mid.clone(), self.bottom.clone()],
            GradientKind::Linear,
            "to bottom",
        )
    }
}

/// Blended colors for `hour`, or `None` when `sections` is empty.
///
/// Falls back to the first section when no interval contains `hour`.
pub fn resolve(sections: &[PaletteSection], hour: f64) -> Option<PaletteBlend> {
    let idx = sections
        .iter()
        .position(|s| s.contains(hour))
        .unwrap_or(0);
    let section = sections.get(idx)?;
    let next = &sections[(idx + 1) % sections.len()];

    let t = progress(section, next, hour).clamp(0.0, 1.0);
    tracing::trace!(section = %section.name, next = %next.name, t, "palette resolved");

    Some(PaletteBlend {
        top: blend_colors(&section.top, &next.top, t),
        mid: blend_colors(&section.mid, &next.mid, t),
        bottom: blend_colors(&section.bottom, &next.bottom, t),
    })
}

fn progress(section: &PaletteSection, next: &PaletteSection, hour: f64) -> f64 {
    if !section.wraps() {
        return inv_lerp(section.start, section.end, hour);
    }
    let span = 24.0 - section.start + next.end;
    if span == 0.0 {
        return 0.0;
    }
    let since_start = if hour >= section.start {
        hour - section.start
    } else {
        hour + 24.0 - section.start
    };
    since_start / span
}

pub fn clamp(v: f64, min: f64, max: f64) -> f64 {
    v.max(min).min(max)
}

pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Position of `v` between `a` and `b`; `0.0` when the endpoints coincide.
pub fn inv_lerp(a: f64, b: f64, v: f64) -> f64 {
    if a == b {
        return 0.0;
    }
    (v - a) / (b - a)
}

/// Maps `v` from one range onto another, clamped. NaN maps to `out_min`.
pub fn map_range(v: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    if v.is_nan() {
        return out_min;
    }
    lerp(out_min, out_max, clamp(inv_lerp(in_min, in_max, v), 0.0, 1.0))
}
