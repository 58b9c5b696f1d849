//! Background descriptions and their CSS-like textual form.
//!
//! Backgrounds are written the way a stylesheet would write them:
//!
//! - `transparent` / `none`
//! - `#rrggbb`, `#rgb`, `#rrggbbaa` or a color keyword
//! - `linear-gradient(to right, #2193b0, #6dd5ed)`
//! - `url(photos/beach.jpg)`
//!
//! plus the preset names listed in [`PRESETS`].

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::color::Color;
use crate::error::{Error, Result};

/// A user-selected backdrop for a cutout.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum BackgroundSpec {
    /// Keep the cutout transparent; checkerboards are a display concern only.
    #[default]
    None,
    /// A single flat color.
    SolidColor(Color),
    /// A linear gradient.
    Gradient(Gradient),
    /// A raster image stretched to the cutout's dimensions.
    Image(ImageSource),
}

impl BackgroundSpec {
    /// Whether this spec leaves the cutout's alpha untouched.
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Where a background image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// A URL string as typed by the user (`http(s)://`, `file://`, or a bare path).
    Url(String),
    /// A path on the local filesystem.
    Path(PathBuf),
    /// Encoded image bytes already in memory.
    Bytes(Vec<u8>),
}

impl ImageSource {
    /// Whether fetching this source would require network access.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        match self {
            Self::Url(url) => {
                let lower = url.to_ascii_lowercase();
                lower.starts_with("http://") || lower.starts_with("https://")
            }
            Self::Path(_) | Self::Bytes(_) => false,
        }
    }
}

/// One color stop of a gradient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    /// Stop color.
    pub color: Color,
    /// Position along the gradient line, `0.0..=1.0`.
    pub position: f32,
}

impl GradientStop {
    /// A stop at `position`.
    #[must_use]
    pub const fn new(color: Color, position: f32) -> Self {
        Self { color, position }
    }
}

/// Direction of the gradient line.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Direction {
    /// Left edge to right edge.
    ToRight,
    /// Right edge to left edge.
    ToLeft,
    /// Top edge to bottom edge.
    #[default]
    ToBottom,
    /// Bottom edge to top edge.
    ToTop,
    /// Top-left corner to bottom-right corner.
    ToBottomRight,
    /// Top-right corner to bottom-left corner.
    ToBottomLeft,
    /// Bottom-left corner to top-right corner.
    ToTopRight,
    /// Bottom-right corner to top-left corner.
    ToTopLeft,
    /// Angle in degrees, `0` pointing up and increasing clockwise.
    Angle(f32),
}

impl Direction {
    /// Unit-free direction vector in image coordinates (y grows downwards).
    #[must_use]
    pub fn vector(self) -> (f32, f32) {
        match self {
            Self::ToRight => (1.0, 0.0),
            Self::ToLeft => (-1.0, 0.0),
            Self::ToBottom => (0.0, 1.0),
            Self::ToTop => (0.0, -1.0),
            Self::ToBottomRight => (1.0, 1.0),
            Self::ToBottomLeft => (-1.0, 1.0),
            Self::ToTopRight => (1.0, -1.0),
            Self::ToTopLeft => (-1.0, -1.0),
            Self::Angle(deg) => {
                let rad = deg.to_radians();
                (rad.sin(), -rad.cos())
            }
        }
    }

    fn parse(input: &str) -> Option<Self> {
        if let Some(deg) = input.trim().strip_suffix("deg") {
            return deg.trim().parse::<f32>().ok().map(Self::Angle);
        }
        let words: Vec<&str> = input.split_whitespace().collect();
        let dir = match words.as_slice() {
            ["to", "right"] => Self::ToRight,
            ["to", "left"] => Self::ToLeft,
            ["to", "bottom"] => Self::ToBottom,
            ["to", "top"] => Self::ToTop,
            ["to", "bottom", "right"] | ["to", "right", "bottom"] => Self::ToBottomRight,
            ["to", "bottom", "left"] | ["to", "left", "bottom"] => Self::ToBottomLeft,
            ["to", "top", "right"] | ["to", "right", "top"] => Self::ToTopRight,
            ["to", "top", "left"] | ["to", "left", "top"] => Self::ToTopLeft,
            _ => return None,
        };
        Some(dir)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToRight => f.write_str("to right"),
            Self::ToLeft => f.write_str("to left"),
            Self::ToBottom => f.write_str("to bottom"),
            Self::ToTop => f.write_str("to top"),
            Self::ToBottomRight => f.write_str("to bottom right"),
            Self::ToBottomLeft => f.write_str("to bottom left"),
            Self::ToTopRight => f.write_str("to top right"),
            Self::ToTopLeft => f.write_str("to top left"),
            Self::Angle(deg) => write!(f, "{deg}deg"),
        }
    }
}

/// A linear gradient: ordered color stops laid along a direction.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    stops: Vec<GradientStop>,
    direction: Direction,
}

impl Gradient {
    /// Build a gradient, validating the stops.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBackground`] if `stops` is empty, a position lies
    /// outside `[0, 1]`, or positions decrease.
    pub fn new(stops: Vec<GradientStop>, direction: Direction) -> Result<Self> {
        let describe = || format!("{} stops {direction}", stops.len());
        if stops.is_empty() {
            return Err(Error::invalid_background(&describe(), "gradient needs at least one stop"));
        }
        for pair in stops.windows(2) {
            if pair[1].position < pair[0].position {
                return Err(Error::invalid_background(
                    &describe(),
                    "stop positions must be non-decreasing",
                ));
            }
        }
        if stops
            .iter()
            .any(|s| !(0.0..=1.0).contains(&s.position))
        {
            return Err(Error::invalid_background(
                &describe(),
                "stop positions must lie in [0, 1]",
            ));
        }
        Ok(Self { stops, direction })
    }

    /// Two-stop gradient from `from` at 0 to `to` at 1.
    #[must_use]
    pub fn linear(from: Color, to: Color, direction: Direction) -> Self {
        Self {
            stops: vec![GradientStop::new(from, 0.0), GradientStop::new(to, 1.0)],
            direction,
        }
    }

    /// The color stops in order.
    #[must_use]
    pub fn stops(&self) -> &[GradientStop] {
        &self.stops
    }

    /// The gradient direction.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether every stop is fully opaque.
    #[must_use]
    pub fn is_opaque(&self) -> bool {
        self.stops.iter().all(|s| s.color.is_opaque())
    }

    /// Color at parameter `t` along the gradient line.
    #[must_use]
    pub fn color_at(&self, t: f32) -> Color {
        let first = self.stops[0];
        if t <= first.position {
            return first.color;
        }
        for pair in self.stops.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.position {
                let span = b.position - a.position;
                if span <= f32::EPSILON {
                    return b.color;
                }
                return a.color.lerp(b.color, (t - a.position) / span);
            }
        }
        self.stops.last().map_or(first.color, |s| s.color)
    }
}

/// A named background offered out of the box.
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    /// Lookup name, as accepted by [`BackgroundSpec::from_str`].
    pub name: &'static str,
    /// Background string the name expands to.
    pub value: &'static str,
}

/// Built-in colors and gradients.
pub const PRESETS: &[Preset] = &[
    Preset { name: "transparent", value: "transparent" },
    Preset { name: "white", value: "#ffffff" },
    Preset { name: "black", value: "#000000" },
    Preset { name: "red", value: "#ff0000" },
    Preset { name: "green", value: "#00ff00" },
    Preset { name: "blue", value: "#0000ff" },
    Preset { name: "blue-ocean", value: "linear-gradient(to right, #2193b0, #6dd5ed)" },
    Preset { name: "purple-dream", value: "linear-gradient(to right, #8e2de2, #4a00e0)" },
    Preset { name: "sunset", value: "linear-gradient(to right, #f12711, #f5af19)" },
    Preset { name: "northern-lights", value: "linear-gradient(to right, #4facfe, #00f2fe)" },
];

/// Look up a preset by name (case-insensitive).
#[must_use]
pub fn preset(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

impl FromStr for BackgroundSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::invalid_background(s, "empty background"));
        }
        if s.eq_ignore_ascii_case("none") || s.eq_ignore_ascii_case("transparent") {
            return Ok(Self::None);
        }
        if let Some(p) = preset(s) {
            return p.value.parse();
        }
        if let Some(body) = strip_call(s, "url") {
            let url = body.trim().trim_matches(|c| c == '"' || c == '\'').trim();
            if url.is_empty() {
                return Err(Error::invalid_background(s, "empty url()"));
            }
            return Ok(Self::Image(ImageSource::Url(url.to_string())));
        }
        if let Some(body) = strip_call(s, "linear-gradient") {
            return parse_gradient(s, body).map(Self::Gradient);
        }
        s.parse::<Color>().map(Self::SolidColor)
    }
}

impl fmt::Display for BackgroundSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("transparent"),
            Self::SolidColor(c) => write!(f, "{c}"),
            Self::Gradient(g) => {
                write!(f, "linear-gradient({}", g.direction)?;
                for stop in &g.stops {
                    write!(f, ", {} {}%", stop.color, format_percent(stop.position))?;
                }
                f.write_str(")")
            }
            Self::Image(ImageSource::Url(url)) => write!(f, "url({url})"),
            Self::Image(ImageSource::Path(p)) => write!(f, "url({})", p.display()),
            Self::Image(ImageSource::Bytes(b)) => write!(f, "<image: {} bytes>", b.len()),
        }
    }
}

/// `name(body)` -> `body`, matching the name case-insensitively.
fn strip_call<'a>(s: &'a str, name: &str) -> Option<&'a str> {
    let open = s.find('(')?;
    if !s[..open].trim().eq_ignore_ascii_case(name) {
        return None;
    }
    s[open + 1..].strip_suffix(')')
}

fn parse_gradient(input: &str, body: &str) -> Result<Gradient> {
    let mut args = body.split(',').map(str::trim).peekable();

    let direction = match args.peek().and_then(|first| Direction::parse(first)) {
        Some(dir) => {
            args.next();
            dir
        }
        None => Direction::default(),
    };

    let mut colors = Vec::new();
    let mut positions = Vec::new();
    for arg in args {
        let (color, pos) = match arg.rsplit_once(char::is_whitespace) {
            Some((c, p)) if p.ends_with('%') => {
                let pos = parse_percent(p.trim_end_matches('%'))
                    .ok_or_else(|| Error::invalid_background(input, format!("bad stop `{arg}`")))?;
                (c.trim(), Some(pos))
            }
            _ => (arg, None),
        };
        colors.push(color.parse::<Color>()?);
        positions.push(pos);
    }

    if colors.is_empty() {
        return Err(Error::invalid_background(input, "gradient needs at least one color"));
    }

    let positions = distribute_positions(&positions);
    let stops = colors
        .into_iter()
        .zip(positions)
        .map(|(color, position)| GradientStop::new(color, position))
        .collect();

    Gradient::new(stops, direction).map_err(|e| match e {
        Error::InvalidBackground { reason, .. } => Error::invalid_background(input, reason),
        other => other,
    })
}

/// `"33.5"` -> `0.335`. Goes through `f64` so that [`format_percent`] output
/// parses back to the identical `f32`.
#[allow(clippy::cast_possible_truncation)]
fn parse_percent(s: &str) -> Option<f32> {
    let pct: f64 = s.trim().parse().ok()?;
    Some((pct / 100.0) as f32)
}

/// Shortest percentage text that [`parse_percent`] maps back to `position`.
fn format_percent(position: f32) -> String {
    let pct = f64::from(position) * 100.0;
    (0..=6)
        .map(|prec| format!("{pct:.prec$}"))
        .find(|text| parse_percent(text) == Some(position))
        .unwrap_or_else(|| pct.to_string())
}

/// Fill in missing stop positions: the ends default to 0 and 1, interior
/// gaps are spread evenly between their known neighbours.
fn distribute_positions(explicit: &[Option<f32>]) -> Vec<f32> {
    let n = explicit.len();
    let mut out: Vec<Option<f32>> = explicit.to_vec();
    if n == 1 {
        return vec![out[0].unwrap_or(0.0)];
    }
    if out[0].is_none() {
        out[0] = Some(0.0);
    }
    if out[n - 1].is_none() {
        out[n - 1] = Some(1.0);
    }

    let mut last_known = 0;
    for i in 1..n {
        if let Some(end) = out[i] {
            let start = out[last_known].unwrap_or(0.0);
            let gap = i - last_known;
            for (k, slot) in out[last_known + 1..i].iter_mut().enumerate() {
                #[allow(clippy::cast_precision_loss)]
                let frac = (k + 1) as f32 / gap as f32;
                *slot = Some(start + (end - start) * frac);
            }
            last_known = i;
        }
    }

    out.into_iter().map(|p| p.unwrap_or(0.0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_transparent_and_colors() {
        assert_eq!("transparent".parse::<BackgroundSpec>().unwrap(), BackgroundSpec::None);
        assert_eq!("None".parse::<BackgroundSpec>().unwrap(), BackgroundSpec::None);
        assert_eq!(
            "#ff0000".parse::<BackgroundSpec>().unwrap(),
            BackgroundSpec::SolidColor(Color::rgb(255, 0, 0))
        );
        assert_eq!(
            "white".parse::<BackgroundSpec>().unwrap(),
            BackgroundSpec::SolidColor(Color::WHITE)
        );
    }

    #[test]
    fn parses_gradient_with_direction() {
        let spec: BackgroundSpec = "linear-gradient(to right, #f12711, #f5af19)".parse().unwrap();
        let BackgroundSpec::Gradient(g) = spec else {
            panic!("expected gradient");
        };
        assert_eq!(g.direction(), Direction::ToRight);
        assert_eq!(g.stops().len(), 2);
        assert_eq!(g.stops()[0].color, Color::rgb(0xf1, 0x27, 0x11));
        assert!((g.stops()[0].position - 0.0).abs() < 1e-6);
        assert!((g.stops()[1].position - 1.0).abs() < 1e-6);
    }

    #[test]
    fn gradient_without_direction_defaults_to_bottom() {
        let spec: BackgroundSpec = "linear-gradient(red, blue)".parse().unwrap();
        let BackgroundSpec::Gradient(g) = spec else {
            panic!("expected gradient");
        };
        assert_eq!(g.direction(), Direction::ToBottom);
    }

    #[test]
    fn gradient_positions_are_distributed() {
        let spec: BackgroundSpec =
            "linear-gradient(90deg, red, white, black 80%, blue)".parse().unwrap();
        let BackgroundSpec::Gradient(g) = spec else {
            panic!("expected gradient");
        };
        assert_eq!(g.direction(), Direction::Angle(90.0));
        let pos: Vec<f32> = g.stops().iter().map(|s| s.position).collect();
        assert!((pos[0] - 0.0).abs() < 1e-6);
        assert!((pos[1] - 0.4).abs() < 1e-6);
        assert!((pos[2] - 0.8).abs() < 1e-6);
        assert!((pos[3] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn gradient_rejects_decreasing_stops() {
        let err = "linear-gradient(to right, red 60%, blue 20%)"
            .parse::<BackgroundSpec>()
            .unwrap_err();
        assert!(err.to_string().contains("non-decreasing"));
    }

    #[test]
    fn gradient_new_validates() {
        assert!(Gradient::new(vec![], Direction::ToRight).is_err());
        assert!(Gradient::new(
            vec![GradientStop::new(Color::BLACK, 1.5)],
            Direction::ToRight
        )
        .is_err());
    }

    #[test]
    fn parses_url_forms() {
        let spec: BackgroundSpec = "url('https://example.com/a.jpg')".parse().unwrap();
        let BackgroundSpec::Image(src) = spec else {
            panic!("expected image");
        };
        assert!(src.is_remote());

        let spec: BackgroundSpec = "url(backgrounds/office.png)".parse().unwrap();
        assert_eq!(
            spec,
            BackgroundSpec::Image(ImageSource::Url("backgrounds/office.png".into()))
        );
        assert!("url()".parse::<BackgroundSpec>().is_err());
    }

    #[test]
    fn every_preset_parses() {
        for p in PRESETS {
            let spec: BackgroundSpec = p.name.parse().unwrap();
            assert_eq!(spec, p.value.parse::<BackgroundSpec>().unwrap(), "{}", p.name);
        }
        assert!(preset("Sunset").is_some());
    }

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<BackgroundSpec>().is_err());
        assert!("radial-gradient(red, blue)".parse::<BackgroundSpec>().is_err());
        assert!("linear-gradient(to right, notacolor)".parse::<BackgroundSpec>().is_err());
    }

    #[test]
    fn color_at_clamps_outside_stops() {
        let g = Gradient::new(
            vec![
                GradientStop::new(Color::rgb(255, 0, 0), 0.25),
                GradientStop::new(Color::rgb(0, 0, 255), 0.75),
            ],
            Direction::ToRight,
        )
        .unwrap();
        assert_eq!(g.color_at(0.0), Color::rgb(255, 0, 0));
        assert_eq!(g.color_at(1.0), Color::rgb(0, 0, 255));
        assert_eq!(g.color_at(0.5), Color::rgb(128, 0, 128));
    }

    #[test]
    fn display_is_parseable() {
        let spec: BackgroundSpec = "linear-gradient(to top left, #000000, #ffffff 50%, #ff0000)"
            .parse()
            .unwrap();
        let again: BackgroundSpec = spec.to_string().parse().unwrap();
        assert_eq!(spec, again);
    }

    #[test]
    fn display_is_exact_for_distributed_stops() {
        for input in [
            "linear-gradient(to right, red, white, black, blue)",
            "linear-gradient(red, white, black, blue, green, #123456, #abcdef)",
            "linear-gradient(45deg, red 12.5%, white, blue 90%)",
        ] {
            let spec: BackgroundSpec = input.parse().unwrap();
            let text = spec.to_string();
            assert_eq!(text.parse::<BackgroundSpec>().unwrap(), spec, "{text}");
        }
        let spec: BackgroundSpec = "linear-gradient(red, white, blue)".parse().unwrap();
        assert_eq!(
            spec.to_string(),
            "linear-gradient(to bottom, #ff0000 0%, #ffffff 50%, #0000ff 100%)"
        );
    }

    #[test]
    fn opacity_follows_stops() {
        assert!(Gradient::linear(Color::WHITE, Color::BLACK, Direction::ToTop).is_opaque());
        assert!(!Gradient::linear(Color::WHITE, Color::TRANSPARENT, Direction::ToTop).is_opaque());
    }
}
