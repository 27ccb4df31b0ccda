//! CPU reference host.
//!
//! [`RasterSurface`] keeps a base paint and a layer stack, animates layer
//! opacity like a browser's `transition: opacity` would, and rasterizes the
//! whole thing to an RGBA image on demand. [`Stage`] is a named collection of
//! surfaces sharing one millisecond clock.

use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    rc::Rc,
    time::Duration,
};

use image::{GrayImage, RgbaImage, imageops::FilterType};
use kurbo::{Point, Vec2};

use crate::{
    color::Color,
    composite::{layer_over_in_place, premultiply, unpremultiply},
    descriptor::{GradientDescriptor, GradientKind},
    ease::Ease,
    error::{GradientError, GradientResult},
    surface::{LayerClip, LayerId, LayerSpec, Surface, SurfaceHost},
};

/// Shared millisecond clock driving opacity transitions.
#[derive(Clone, Debug, Default)]
pub struct StageClock(Rc<Cell<u64>>);

impl StageClock {
    pub fn now_ms(&self) -> u64 {
        self.0.get()
    }

    pub fn set(&self, ms: u64) {
        self.0.set(ms);
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Fade {
    from: f32,
    to: f32,
    start_ms: u64,
    duration_ms: u64,
}

impl Fade {
    fn settled(opacity: f32) -> Self {
        Self {
            from: opacity,
            to: opacity,
            start_ms: 0,
            duration_ms: 0,
        }
    }

    fn value_at(&self, now_ms: u64, ease: Ease) -> f32 {
        if self.duration_ms == 0 || now_ms >= self.start_ms + self.duration_ms {
            return self.to;
        }
        let t = now_ms.saturating_sub(self.start_ms) as f64 / self.duration_ms as f64;
        let k = ease.apply(t) as f32;
        self.from + (self.to - self.from) * k
    }
}

#[derive(Clone, Debug)]
struct RasterLayer {
    id: LayerId,
    paint: GradientDescriptor,
    clip: LayerClip,
    z: i32,
    order: u64,
    transition: Duration,
    fade: Fade,
}

/// Read-only view of a layer at the current stage time.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerSnapshot {
    pub id: LayerId,
    pub paint: GradientDescriptor,
    pub clip: LayerClip,
    pub z: i32,
    pub opacity: f32,
    pub target_opacity: f32,
    pub transition: Duration,
}

#[derive(Debug)]
struct SurfaceState {
    attached: bool,
    background: Option<GradientDescriptor>,
    layers: Vec<RasterLayer>,
    next_layer: u64,
    next_order: u64,
    text_mask: Option<GrayImage>,
    ease: Ease,
}

impl Default for SurfaceState {
    fn default() -> Self {
        Self {
            attached: true,
            background: None,
            layers: Vec::new(),
            next_layer: 1,
            next_order: 0,
            text_mask: None,
            ease: Ease::EaseInOut,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RasterSurface {
    state: Rc<RefCell<SurfaceState>>,
    clock: StageClock,
}

impl RasterSurface {
    pub fn new(clock: StageClock) -> Self {
        Self {
            state: Rc::default(),
            clock,
        }
    }

    pub fn clock(&self) -> &StageClock {
        &self.clock
    }

    pub fn set_time(&self, ms: u64) {
        self.clock.set(ms);
    }

    pub fn set_ease(&self, ease: Ease) {
        self.state.borrow_mut().ease = ease;
    }

    /// Grayscale coverage used by [`LayerClip::Text`] layers; scaled to the
    /// render size when the dimensions differ.
    pub fn set_text_mask(&self, mask: GrayImage) {
        self.state.borrow_mut().text_mask = Some(mask);
    }

    /// Marks the host element as gone.
    pub fn detach(&self) {
        self.state.borrow_mut().attached = false;
    }

    pub fn layer_count(&self) -> usize {
        self.state.borrow().layers.len()
    }

    pub fn layers(&self) -> Vec<LayerSnapshot> {
        let now = self.clock.now_ms();
        let state = self.state.borrow();
        let mut layers = state.layers.clone();
        layers.sort_by_key(|l| (l.z, l.order));
        layers
            .iter()
            .map(|l| snapshot(l, now, state.ease))
            .collect()
    }

    pub fn layer(&self, id: LayerId) -> Option<LayerSnapshot> {
        let now = self.clock.now_ms();
        let state = self.state.borrow();
        state
            .layers
            .iter()
            .find(|l| l.id == id)
            .map(|l| snapshot(l, now, state.ease))
    }

    /// Rasterizes the base paint and every layer at the current stage time.
    pub fn render(&self, width: u32, height: u32) -> GradientResult<RgbaImage> {
        if width == 0 || height == 0 {
            return Err(GradientError::config("render size must be non-zero"));
        }
        let now = self.clock.now_ms();
        let state = self.state.borrow();

        let mut buf = match &state.background {
            Some(paint) => rasterize(paint, width, height),
            None => vec![0u8; width as usize * height as usize * 4],
        };

        let text_mask = state.text_mask.as_ref().map(|mask| {
            if mask.dimensions() == (width, height) {
                mask.as_raw().clone()
            } else {
                image::imageops::resize(mask, width, height, FilterType::Nearest).into_raw()
            }
        });

        let mut layers: Vec<&RasterLayer> = state.layers.iter().collect();
        layers.sort_by_key(|l| (l.z, l.order));
        for layer in layers {
            let opacity = layer.fade.value_at(now, state.ease);
            if opacity <= 0.0 {
                continue;
            }
            let mask = match layer.clip {
                LayerClip::Fill => None,
                LayerClip::Text => match &text_mask {
                    Some(m) => Some(m.as_slice()),
                    None => continue,
                },
            };
            let src = rasterize(&layer.paint, width, height);
            layer_over_in_place(&mut buf, &src, opacity, mask)?;
        }

        for px in buf.chunks_exact_mut(4) {
            let out = unpremultiply([px[0], px[1], px[2], px[3]]);
            px.copy_from_slice(&out);
        }
        RgbaImage::from_raw(width, height, buf)
            .ok_or_else(|| GradientError::config("render buffer size mismatch"))
    }

    fn with_layer(&mut self, id: LayerId, f: impl FnOnce(&mut RasterLayer, u64, Ease)) {
        let now = self.clock.now_ms();
        let mut state = self.state.borrow_mut();
        let ease = state.ease;
        if let Some(layer) = state.layers.iter_mut().find(|l| l.id == id) {
            f(layer, now, ease);
        }
    }
}

fn snapshot(l: &RasterLayer, now: u64, ease: Ease) -> LayerSnapshot {
    LayerSnapshot {
        id: l.id,
        paint: l.paint.clone(),
        clip: l.clip,
        z: l.z,
        opacity: l.fade.value_at(now, ease),
        target_opacity: l.fade.to,
        transition: l.transition,
    }
}

impl Surface for RasterSurface {
    fn is_attached(&self) -> bool {
        self.state.borrow().attached
    }

    fn background(&self) -> Option<GradientDescriptor> {
        self.state.borrow().background.clone()
    }

    fn set_background(&mut self, paint: Option<&GradientDescriptor>) {
        self.state.borrow_mut().background = paint.cloned();
    }

    fn insert_layer(&mut self, spec: LayerSpec) -> LayerId {
        let mut state = self.state.borrow_mut();
        let id = LayerId(state.next_layer);
        state.next_layer += 1;
        let order = state.next_order;
        state.next_order += 1;
        state.layers.push(RasterLayer {
            id,
            paint: spec.paint,
            clip: spec.clip,
            z: spec.z,
            order,
            transition: spec.transition,
            fade: Fade::settled(spec.opacity.clamp(0.0, 1.0)),
        });
        id
    }

    fn set_layer_paint(&mut self, id: LayerId, paint: &GradientDescriptor) {
        self.with_layer(id, |layer, _, _| layer.paint = paint.clone());
    }

    fn set_layer_opacity(&mut self, id: LayerId, opacity: f32) {
        self.with_layer(id, |layer, now, ease| {
            let current = layer.fade.value_at(now, ease);
            layer.fade = Fade {
                from: current,
                to: opacity.clamp(0.0, 1.0),
                start_ms: now,
                duration_ms: u64::try_from(layer.transition.as_millis()).unwrap_or(u64::MAX),
            };
        });
    }

    fn set_layer_transition(&mut self, id: LayerId, duration: Duration) {
        self.with_layer(id, |layer, _, _| layer.transition = duration);
    }

    fn raise_layer(&mut self, id: LayerId) {
        let mut state = self.state.borrow_mut();
        let Some(clip) = state.layers.iter().find(|l| l.id == id).map(|l| l.clip) else {
            return;
        };
        let top_z = state
            .layers
            .iter()
            .filter(|l| l.clip == clip)
            .map(|l| l.z)
            .max()
            .unwrap_or(0);
        let order = state.next_order;
        state.next_order += 1;
        if let Some(layer) = state.layers.iter_mut().find(|l| l.id == id) {
            layer.z = top_z;
            layer.order = order;
        }
    }

    fn remove_layer(&mut self, id: LayerId) {
        self.state.borrow_mut().layers.retain(|l| l.id != id);
    }
}

/// Named surfaces sharing one clock.
#[derive(Debug, Default)]
pub struct Stage {
    clock: StageClock,
    surfaces: BTreeMap<String, RasterSurface>,
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates (or replaces) the surface called `name`.
    pub fn add(&mut self, name: &str) -> RasterSurface {
        let surface = RasterSurface::new(self.clock.clone());
        if let Some(old) = self.surfaces.insert(name.to_string(), surface.clone()) {
            old.detach();
        }
        surface
    }

    pub fn get(&self, name: &str) -> Option<RasterSurface> {
        self.surfaces.get(name).cloned()
    }

    pub fn remove(&mut self, name: &str) {
        if let Some(surface) = self.surfaces.remove(name) {
            surface.detach();
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn set_time(&self, ms: u64) {
        self.clock.set(ms);
    }
}

impl SurfaceHost for Stage {
    type Surface = RasterSurface;

    /// Accepts `name` or `#name`.
    fn resolve(&self, selector: &str) -> Option<RasterSurface> {
        let name = selector.trim();
        let name = name.strip_prefix('#').unwrap_or(name);
        self.surfaces
            .get(name)
            .filter(|s| s.is_attached())
            .cloned()
    }
}

struct Stop {
    pos: f64,
    color: [u8; 4],
}

fn stops_for(paint: &GradientDescriptor) -> Vec<Stop> {
    let colors = paint.colors();
    let n = colors.len();
    colors
        .iter()
        .enumerate()
        .map(|(i, c)| Stop {
            pos: if n <= 1 { 0.0 } else { i as f64 / (n - 1) as f64 },
            color: premultiply(rgba_or_white(c)),
        })
        .collect()
}

fn rgba_or_white(c: &Color) -> [u8; 4] {
    c.to_rgba8().unwrap_or_else(|err| {
        tracing::warn!(%err, "painting unparseable stop as white");
        [255, 255, 255, 255]
    })
}

fn sample(stops: &[Stop], t: f64) -> [u8; 4] {
    let (Some(first), Some(last)) = (stops.first(), stops.last()) else {
        return [0, 0, 0, 0];
    };
    if t <= first.pos {
        return first.color;
    }
    if t >= last.pos {
        return last.color;
    }
    for pair in stops.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if t <= b.pos {
            let span = b.pos - a.pos;
            let k = if span <= 0.0 { 1.0 } else { (t - a.pos) / span };
            let mut out = [0u8; 4];
            for i in 0..4 {
                let v = f64::from(a.color[i]) + (f64::from(b.color[i]) - f64::from(a.color[i])) * k;
                out[i] = v.round().clamp(0.0, 255.0) as u8;
            }
            return out;
        }
    }
    last.color
}

/// Unit vector of a CSS linear-gradient direction in screen space (y down).
fn direction_vector(direction: &str, width: f64, height: f64) -> Vec2 {
    let d = direction.trim().to_ascii_lowercase();
    if let Some(sides) = d.strip_prefix("to ") {
        let mut sx = 0.0;
        let mut sy = 0.0;
        for word in sides.split_whitespace() {
            match word {
                "left" => sx = -1.0,
                "right" => sx = 1.0,
                "top" => sy = -1.0,
                "bottom" => sy = 1.0,
                _ => {}
            }
        }
        let v = match (sx != 0.0, sy != 0.0) {
            // Corner: perpendicular to the diagonal joining the two other corners.
            (true, true) => Vec2::new(sx * height, sy * width),
            (true, false) | (false, true) => Vec2::new(sx, sy),
            (false, false) => Vec2::new(0.0, 1.0),
        };
        return v.normalize();
    }

    let degrees = parse_angle_degrees(&d).unwrap_or(180.0);
    let rad = degrees.to_radians();
    Vec2::new(rad.sin(), -rad.cos())
}

fn parse_angle_degrees(s: &str) -> Option<f64> {
    if let Some(v) = s.strip_suffix("deg") {
        return v.trim().parse().ok();
    }
    if let Some(v) = s.strip_suffix("grad") {
        return v.trim().parse::<f64>().ok().map(|g| g * 0.9);
    }
    if let Some(v) = s.strip_suffix("rad") {
        return v.trim().parse::<f64>().ok().map(f64::to_degrees);
    }
    if let Some(v) = s.strip_suffix("turn") {
        return v.trim().parse::<f64>().ok().map(|t| t * 360.0);
    }
    None
}

fn rasterize(paint: &GradientDescriptor, width: u32, height: u32) -> Vec<u8> {
    let stops = stops_for(paint);
    let (w, h) = (f64::from(width), f64::from(height));
    let center = Point::new(w / 2.0, h / 2.0);

    let position: Box<dyn Fn(Point) -> f64> = match paint.kind() {
        GradientKind::Linear => {
            let dir = direction_vector(paint.direction(), w, h);
            let length = (w * dir.x).abs() + (h * dir.y).abs();
            Box::new(move |p: Point| {
                if length <= 0.0 {
                    0.0
                } else {
                    (p - center).dot(dir) / length + 0.5
                }
            })
        }
        GradientKind::Radial => {
            let radius = center.distance(Point::ORIGIN);
            Box::new(move |p: Point| {
                if radius <= 0.0 {
                    0.0
                } else {
                    p.distance(center) / radius
                }
            })
        }
    };

    let mut buf = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            let p = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            buf.extend_from_slice(&sample(&stops, position(p)));
        }
    }
    buf
}
