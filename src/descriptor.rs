use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    color::Color,
    error::{GradientError, GradientResult},
};

pub const DEFAULT_DIRECTION: &str = "to right";

/// Stop used when a descriptor is built from an empty color list.
const DEGENERATE_STOP: &str = "#00000000";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradientKind {
    #[default]
    Linear,
    Radial,
}

/// Canonical `(kind, direction, colors)` paint.
///
/// Two descriptors are equal iff their CSS serializations are equal, so a radial
/// descriptor ignores its direction for comparison purposes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GradientDescriptor {
    kind: GradientKind,
    direction: String,
    colors: Vec<Color>,
}

impl GradientDescriptor {
    /// Builds a descriptor. Total: an empty color list yields a single
    /// transparent stop.
    pub fn build(colors: &[Color], kind: GradientKind, direction: &str) -> Self {
        let colors = if colors.is_empty() {
            vec![Color::new(DEGENERATE_STOP)]
        } else {
            colors.to_vec()
        };
        Self {
            kind,
            direction: direction.to_string(),
            colors,
        }
    }

    pub fn kind(&self) -> GradientKind {
        self.kind
    }

    pub fn direction(&self) -> &str {
        &self.direction
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn to_css(&self) -> String {
        self.to_string()
    }

    /// Same kind and direction, different stops.
    pub fn with_colors(&self, colors: &[Color]) -> Self {
        Self::build(colors, self.kind, &self.direction)
    }
}

impl PartialEq for GradientDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for GradientDescriptor {}

impl fmt::Display for GradientDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stops = self
            .colors
            .iter()
            .map(Color::as_str)
            .collect::<Vec<_>>()
            .join(",");
        match self.kind {
            GradientKind::Linear => write!(f, "linear-gradient({}, {stops})", self.direction),
            GradientKind::Radial => write!(f, "radial-gradient(circle, {stops})"),
        }
    }
}

impl FromStr for GradientDescriptor {
    type Err = GradientError;

    fn from_str(s: &str) -> GradientResult<Self> {
        let s = s.trim();
        let (kind, body) = if let Some(rest) = s.strip_prefix("linear-gradient(") {
            (GradientKind::Linear, rest)
        } else if let Some(rest) = s.strip_prefix("radial-gradient(") {
            (GradientKind::Radial, rest)
        } else {
            return Err(GradientError::config(format!(
                "\"{s}\" is not a linear-gradient(..) or radial-gradient(..)"
            )));
        };
        let body = body
            .strip_suffix(')')
            .ok_or_else(|| GradientError::config(format!("\"{s}\" is missing ')'")))?;

        let mut args = split_top_level(body).into_iter().peekable();
        let mut direction = DEFAULT_DIRECTION.to_string();
        match kind {
            GradientKind::Linear => {
                if let Some(first) = args.peek()
                    && is_direction(first)
                {
                    direction = first.to_string();
                    args.next();
                }
            }
            GradientKind::Radial => {
                if args.peek().is_some_and(|a| a.starts_with("circle") || a.starts_with("ellipse")) {
                    args.next();
                }
            }
        }

        let colors = args.map(Color::new).collect::<Vec<_>>();
        Ok(Self::build(&colors, kind, &direction))
    }
}

fn is_direction(arg: &str) -> bool {
    arg.starts_with("to ")
        || ["deg", "turn", "rad", "grad"]
            .iter()
            .any(|unit| arg.ends_with(unit) && arg[..arg.len() - unit.len()].parse::<f64>().is_ok())
}

/// Splits on commas that are not nested inside parentheses.
fn split_top_level(body: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut cur = String::new();
    for ch in body.chars() {
        match ch {
            '(' => {
                depth += 1;
                cur.push(ch);
            }
            ')' => {
                depth -= 1;
                cur.push(ch);
            }
            ',' if depth == 0 => {
                out.push(cur.trim().to_string());
                cur.clear();
            }
            _ => cur.push(ch),
        }
    }
    if !cur.trim().is_empty() {
        out.push(cur.trim().to_string());
    }
    out
}
