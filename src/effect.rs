//! Temporary color flourishes layered over the steady-state gradient.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    color::Color,
    component::Task,
    descriptor::GradientDescriptor,
    surface::{LayerClip, LayerId, LayerSpec, Surface},
    timer::{TimerId, Timers},
    transition::{TEXT_BUFFER_Z, TransitionEngine},
};

pub(crate) const EFFECT_Z: i32 = 1;
/// Above both text buffers.
pub(crate) const TEXT_EFFECT_Z: i32 = TEXT_BUFFER_Z + 2;

/// Named hues an effect can append to the current colors.
pub const HUE_PRESETS: [(&str, &str); 4] = [
    ("white", "#ffffff"),
    ("black", "#000000"),
    ("gold", "#ffe864ff"),
    ("silver", "#d4d4d4ff"),
];

/// Preset name, or a `#rgb`/`#rrggbb` literal. Anything else is white.
pub fn resolve_hue(hue: &str) -> Color {
    if let Some((_, hex)) = HUE_PRESETS.iter().find(|(name, _)| *name == hue) {
        return Color::new(*hex);
    }
    let literal = hue
        .strip_prefix('#')
        .is_some_and(|d| matches!(d.len(), 3 | 6) && d.chars().all(|c| c.is_ascii_hexdigit()));
    if literal {
        return Color::new(hue);
    }
    tracing::warn!(hue, "unrecognized effect hue, using white");
    Color::white()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectOptions {
    /// Exact effect colors. When absent the hue is appended to the current colors.
    pub apply_colors: Option<Vec<Color>>,
    /// Defaults to the instance's transition duration.
    pub duration_ms: Option<u64>,
    #[serde(rename = "loop")]
    pub looping: bool,
    pub hue: String,
}

impl Default for EffectOptions {
    fn default() -> Self {
        Self {
            apply_colors: None,
            duration_ms: None,
            looping: true,
            hue: "white".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EffectState {
    #[default]
    Idle,
    Running,
    Looping,
}

/// Runs effects on a layer of its own: full-bleed over the base paint, or
/// glyph-clipped above the text buffers. Transitions never see it.
#[derive(Debug, Default)]
pub struct EffectEngine {
    state: EffectState,
    layer: Option<(LayerId, LayerClip)>,
    paint: Option<GradientDescriptor>,
    duration: Duration,
    fade_in: Option<TimerId>,
    fade_out: Option<TimerId>,
    finish: Option<TimerId>,
    cycle: Option<TimerId>,
}

impl EffectEngine {
    pub fn state(&self) -> EffectState {
        self.state
    }

    pub fn layer(&self) -> Option<LayerId> {
        self.layer.map(|(id, _)| id)
    }

    pub fn loop_timer(&self) -> Option<TimerId> {
        self.cycle
    }

    pub(crate) fn trigger<S: Surface>(
        &mut self,
        surface: &mut S,
        timers: &mut Timers<Task>,
        paint: GradientDescriptor,
        duration: Duration,
        looping: bool,
        text_clip: bool,
    ) {
        if !text_clip && !looping && self.state != EffectState::Idle {
            tracing::debug!(state = ?self.state, "effect already running, one-shot ignored");
            return;
        }

        // A new trigger replaces whatever cycle is pending.
        self.cancel_timers(timers);

        let clip = if text_clip { LayerClip::Text } else { LayerClip::Fill };
        if let Some((id, old)) = self.layer
            && old != clip
        {
            surface.remove_layer(id);
            self.layer = None;
        }
        self.paint = Some(paint);
        self.duration = duration;
        self.run_cycle(surface, timers, clip);

        let period = duration.saturating_mul(2);
        if looping {
            self.cycle = Some(timers.set_interval(period, Task::EffectCycle));
            self.state = EffectState::Looping;
        } else {
            self.finish = Some(timers.set_timeout(period, Task::EffectFinish));
            self.state = EffectState::Running;
        }
        tracing::debug!(state = ?self.state, ?duration, ?clip, "effect started");
    }

    fn run_cycle<S: Surface>(&mut self, surface: &mut S, timers: &mut Timers<Task>, clip: LayerClip) {
        let Some(paint) = self.paint.as_ref() else {
            return;
        };
        match self.layer {
            Some((id, _)) => {
                surface.set_layer_paint(id, paint);
                surface.set_layer_transition(id, self.duration);
                surface.raise_layer(id);
            }
            None => {
                let id = surface.insert_layer(LayerSpec {
                    paint: paint.clone(),
                    opacity: 0.0,
                    transition: self.duration,
                    z: match clip {
                        LayerClip::Fill => EFFECT_Z,
                        LayerClip::Text => TEXT_EFFECT_Z,
                    },
                    clip,
                });
                self.layer = Some((id, clip));
            }
        }

        timers.cancel_slot(&mut self.fade_in);
        timers.cancel_slot(&mut self.fade_out);
        self.fade_in = Some(timers.request_frame(Task::EffectFadeIn));
        self.fade_out = Some(timers.set_timeout(self.duration, Task::EffectFadeOut));
    }

    pub(crate) fn fade_in<S: Surface>(&mut self, surface: &mut S, fired: TimerId) {
        if self.fade_in != Some(fired) {
            return;
        }
        self.fade_in = None;
        if let Some(id) = self.layer() {
            surface.set_layer_opacity(id, 1.0);
        }
    }

    pub(crate) fn fade_out<S: Surface>(&mut self, surface: &mut S, fired: TimerId) {
        if self.fade_out != Some(fired) {
            return;
        }
        self.fade_out = None;
        if let Some(id) = self.layer() {
            surface.set_layer_opacity(id, 0.0);
        }
    }

    pub(crate) fn cycle<S: Surface>(&mut self, surface: &mut S, timers: &mut Timers<Task>, fired: TimerId) {
        if self.cycle == Some(fired)
            && let Some((_, clip)) = self.layer
        {
            self.run_cycle(surface, timers, clip);
        }
    }

    /// Ends a one-shot effect and puts the steady-state gradient back.
    pub(crate) fn finish<S: Surface>(
        &mut self,
        surface: &mut S,
        transitions: &TransitionEngine,
        steady: &GradientDescriptor,
        fired: TimerId,
    ) {
        if self.finish != Some(fired) {
            return;
        }
        self.finish = None;
        if let Some((id, clip)) = self.layer.take() {
            surface.remove_layer(id);
            // An in-flight crossfade commits the base itself; text buffers were never touched.
            if clip == LayerClip::Fill && !transitions.in_flight() {
                surface.set_background(Some(steady));
            }
        }
        self.state = EffectState::Idle;
        tracing::debug!("effect finished");
    }

    /// Cancels pending effect work and fades the effect out. Idempotent.
    pub(crate) fn stop<S: Surface>(&mut self, surface: &mut S, timers: &mut Timers<Task>) {
        self.cancel_timers(timers);
        if self.state != EffectState::Idle
            && let Some(id) = self.layer()
        {
            surface.set_layer_opacity(id, 0.0);
        }
        self.state = EffectState::Idle;
    }

    pub(crate) fn dispose<S: Surface>(&mut self, surface: &mut S, timers: &mut Timers<Task>) {
        self.stop(surface, timers);
        if let Some((id, _)) = self.layer.take() {
            surface.remove_layer(id);
        }
        self.paint = None;
    }

    /// Re-stacks the effect above a layer a transition just raised.
    pub(crate) fn keep_on_top<S: Surface>(&self, surface: &mut S) {
        if let Some(id) = self.layer() {
            surface.raise_layer(id);
        }
    }

    fn cancel_timers(&mut self, timers: &mut Timers<Task>) {
        timers.cancel_slot(&mut self.fade_in);
        timers.cancel_slot(&mut self.fade_out);
        timers.cancel_slot(&mut self.finish);
        timers.cancel_slot(&mut self.cycle);
    }
}
