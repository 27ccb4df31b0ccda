//! The public gradient object.
//!
//! [`DynamicGradient`] owns one host surface and every timer it ever starts.
//! Deferred work only runs when the host drives it through
//! [`advance`](DynamicGradient::advance) (fixed delays) and
//! [`render_frame`](DynamicGradient::render_frame) (next-paint callbacks).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    clock::{Clock, SystemClock},
    color::Color,
    descriptor::{DEFAULT_DIRECTION, GradientDescriptor, GradientKind},
    effect::{EffectEngine, EffectOptions, EffectState, resolve_hue},
    error::{GradientError, GradientResult},
    schedule::{ScheduleEngine, ScheduleEntry},
    surface::{LayerId, Surface, SurfaceHost},
    timer::{TimerId, Timers},
    transition::{TextClipBuffers, TransitionEngine},
};

pub const DEFAULT_COLORS: [&str; 2] = ["#1e3c72", "#2a5298"];
pub const DEFAULT_TRANSITION_MS: u64 = 1500;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientOptions {
    pub kind: GradientKind,
    pub direction: String,
    pub colors: Vec<Color>,
    pub transition_duration_ms: u64,
    pub text_clip: bool,
    pub schedule: Vec<ScheduleEntry>,
}

impl Default for GradientOptions {
    fn default() -> Self {
        Self {
            kind: GradientKind::Linear,
            direction: DEFAULT_DIRECTION.to_string(),
            colors: DEFAULT_COLORS.iter().map(|c| Color::from(*c)).collect(),
            transition_duration_ms: DEFAULT_TRANSITION_MS,
            text_clip: false,
            schedule: Vec::new(),
        }
    }
}

/// Partial gradient change; absent fields keep their current value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientUpdate {
    pub colors: Option<Vec<Color>>,
    pub kind: Option<GradientKind>,
    pub direction: Option<String>,
}

impl GradientUpdate {
    pub fn colors(colors: &[&str]) -> Self {
        Self {
            colors: Some(colors.iter().map(|c| Color::from(*c)).collect()),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: GradientKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_direction(mut self, direction: impl Into<String>) -> Self {
        self.direction = Some(direction.into());
        self
    }
}

impl From<ScheduleEntry> for GradientUpdate {
    fn from(entry: ScheduleEntry) -> Self {
        Self {
            colors: Some(entry.colors),
            kind: entry.kind,
            direction: entry.direction,
        }
    }
}

/// Deferred continuations. Each engine keeps the id of every task it parks and
/// ignores a firing id it no longer holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Task {
    RevealCrossfade,
    CommitCrossfade,
    RevealText,
    CommitText,
    EffectFadeIn,
    EffectFadeOut,
    EffectCycle,
    EffectFinish,
    PollSchedule,
}

pub struct DynamicGradient<S: Surface, C: Clock = SystemClock> {
    surface: S,
    clock: C,
    current: GradientDescriptor,
    transition_duration: Duration,
    text_clip: bool,
    timers: Timers<Task>,
    transitions: TransitionEngine,
    effects: EffectEngine,
    schedule: ScheduleEngine,
    disposed: bool,
}

impl<S: Surface> DynamicGradient<S, SystemClock> {
    /// Builds an instance on `target`, scheduled against local wall-clock time.
    pub fn init(target: S, options: GradientOptions) -> GradientResult<Self> {
        Self::init_with_clock(target, options, SystemClock)
    }
}

impl<S: Surface, C: Clock> DynamicGradient<S, C> {
    /// Resolves `selector` on `host`, failing with
    /// [`GradientError::TargetNotFound`] when it names no live surface.
    pub fn init_in<H>(host: &H, selector: &str, options: GradientOptions, clock: C) -> GradientResult<Self>
    where
        H: SurfaceHost<Surface = S>,
    {
        let target = host
            .resolve(selector)
            .ok_or_else(|| GradientError::target_not_found(selector))?;
        Self::init_with_clock(target, options, clock)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(text_clip = options.text_clip))]
    pub fn init_with_clock(target: S, options: GradientOptions, clock: C) -> GradientResult<Self> {
        if !target.is_attached() {
            return Err(GradientError::target_not_found("surface is not attached"));
        }

        let current = GradientDescriptor::build(&options.colors, options.kind, &options.direction);
        let mut this = Self {
            surface: target,
            clock,
            current,
            transition_duration: Duration::from_millis(options.transition_duration_ms),
            text_clip: options.text_clip,
            timers: Timers::new(),
            transitions: TransitionEngine::default(),
            effects: EffectEngine::default(),
            schedule: ScheduleEngine::default(),
            disposed: false,
        };

        if this.text_clip {
            this.surface.set_background(None);
        }
        this.transitions.apply_now(
            &mut this.surface,
            &mut this.timers,
            &this.current,
            this.transition_duration,
            this.text_clip,
        );

        if !options.schedule.is_empty() {
            this.schedule(&options.schedule);
        }
        Ok(this)
    }

    fn usable(&self, op: &str) -> bool {
        if self.disposed {
            tracing::warn!(op, "ignored on a disposed gradient");
        }
        !self.disposed
    }

    /// Crossfades to the updated gradient; a no-op when nothing changes.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn set_gradient(&mut self, update: GradientUpdate) {
        if !self.usable("set_gradient") {
            return;
        }
        let colors = update.colors.unwrap_or_else(|| self.current.colors().to_vec());
        let kind = update.kind.unwrap_or(self.current.kind());
        let direction = update
            .direction
            .unwrap_or_else(|| self.current.direction().to_string());
        let target = GradientDescriptor::build(&colors, kind, &direction);
        if target == self.current {
            return;
        }
        self.transitions.begin(
            &mut self.surface,
            &mut self.timers,
            &target,
            self.transition_duration,
            self.text_clip,
        );
        self.effects.keep_on_top(&mut self.surface);
        self.current = target;
    }

    /// Replaces the schedule, applies the active entry now and polls every minute.
    #[tracing::instrument(level = "debug", skip_all, fields(entries = entries.len()))]
    pub fn schedule(&mut self, entries: &[ScheduleEntry]) {
        if !self.usable("schedule") {
            return;
        }
        self.schedule.replace(entries, &mut self.timers);
        self.check_schedule();
    }

    /// Applies the active schedule entry if it changed since the last check.
    pub fn check_schedule(&mut self) {
        if !self.usable("check_schedule") {
            return;
        }
        let now = self.clock.time_of_day();
        if let Some(entry) = self.schedule.due(now) {
            self.set_gradient(entry.into());
        }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn trigger_effect(&mut self, options: EffectOptions) {
        if !self.usable("trigger_effect") {
            return;
        }
        let duration = options
            .duration_ms
            .map_or(self.transition_duration, Duration::from_millis);
        let paint = match &options.apply_colors {
            Some(colors) => self.current.with_colors(colors),
            None => {
                let mut colors = self.current.colors().to_vec();
                colors.push(resolve_hue(&options.hue));
                self.current.with_colors(&colors)
            }
        };
        self.effects.trigger(
            &mut self.surface,
            &mut self.timers,
            paint,
            duration,
            options.looping,
            self.text_clip,
        );
    }

    /// Fades to `colors` like an effect but keeps them as the new steady state.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn persist_effect(&mut self, colors: &[Color], duration: Option<Duration>) {
        if !self.usable("persist_effect") {
            return;
        }
        let target = self.current.with_colors(colors);
        if target == self.current {
            return;
        }
        self.transitions.begin(
            &mut self.surface,
            &mut self.timers,
            &target,
            duration.unwrap_or(self.transition_duration),
            self.text_clip,
        );
        self.effects.keep_on_top(&mut self.surface);
        self.current = target;
    }

    /// Ends any running or looping effect. Safe to call at any time.
    pub fn stop_effects(&mut self) {
        if self.disposed {
            return;
        }
        self.effects.stop(&mut self.surface, &mut self.timers);
    }

    /// Switches between filling the surface and filling only its text.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn set_text_clip(&mut self, enabled: bool) {
        if !self.usable("set_text_clip") || enabled == self.text_clip {
            return;
        }
        self.effects.dispose(&mut self.surface, &mut self.timers);
        if enabled {
            self.transitions
                .drop_overlay(&mut self.surface, &mut self.timers);
            self.surface.set_background(None);
        } else {
            self.transitions.hide_text(&mut self.surface, &mut self.timers);
        }
        self.text_clip = enabled;
        self.transitions.apply_now(
            &mut self.surface,
            &mut self.timers,
            &self.current,
            self.transition_duration,
            enabled,
        );
    }

    /// Cancels every timer and removes every layer this instance created.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.effects.dispose(&mut self.surface, &mut self.timers);
        self.transitions.dispose(&mut self.surface, &mut self.timers);
        self.schedule.cancel(&mut self.timers);
        self.timers.clear();
        self.disposed = true;
        tracing::debug!("gradient disposed");
    }

    /// Runs every timer due at or before `now_ms`, in due order.
    pub fn advance(&mut self, now_ms: u64) {
        self.advance_with(now_ms, |_| {});
    }

    /// Like [`advance`](Self::advance), but calls `on_due` with each task's due
    /// time right before it runs so the host clock can follow.
    pub fn advance_with(&mut self, now_ms: u64, mut on_due: impl FnMut(u64)) {
        while let Some((id, task)) = self.timers.pop_due(now_ms) {
            on_due(self.timers.now_ms());
            self.dispatch(id, task);
        }
    }

    /// Runs the next-paint callbacks queued so far.
    pub fn render_frame(&mut self) {
        for (id, task) in self.timers.take_frame() {
            self.dispatch(id, task);
        }
    }

    /// `advance` then `render_frame`.
    pub fn pump(&mut self, now_ms: u64) {
        self.advance(now_ms);
        self.render_frame();
    }

    fn dispatch(&mut self, id: TimerId, task: Task) {
        if self.disposed {
            return;
        }
        tracing::trace!(?task, ?id, at = self.timers.now_ms(), "task fired");
        match task {
            Task::RevealCrossfade => self.transitions.reveal(&mut self.surface, id),
            Task::CommitCrossfade => self.transitions.commit(&mut self.surface, id),
            Task::RevealText => self.transitions.reveal_text(&mut self.surface, id),
            Task::CommitText => {
                self.transitions
                    .commit_text(&mut self.surface, &mut self.timers, id)
            }
            Task::EffectFadeIn => self.effects.fade_in(&mut self.surface, id),
            Task::EffectFadeOut => self.effects.fade_out(&mut self.surface, id),
            Task::EffectCycle => self.effects.cycle(&mut self.surface, &mut self.timers, id),
            Task::EffectFinish => {
                self.effects
                    .finish(&mut self.surface, &self.transitions, &self.current, id)
            }
            Task::PollSchedule => self.check_schedule(),
        }
    }

    pub fn current(&self) -> &GradientDescriptor {
        &self.current
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn transition_duration(&self) -> Duration {
        self.transition_duration
    }

    pub fn text_clip(&self) -> bool {
        self.text_clip
    }

    pub fn effect_state(&self) -> EffectState {
        self.effects.state()
    }

    /// The layer the current or last effect paints on.
    pub fn effect_layer(&self) -> Option<LayerId> {
        self.effects.layer()
    }

    pub fn effect_loop_timer(&self) -> Option<TimerId> {
        self.effects.loop_timer()
    }

    pub fn transition_in_flight(&self) -> bool {
        self.transitions.in_flight()
    }

    pub fn text_buffers(&self) -> Option<&TextClipBuffers> {
        self.transitions.text_buffers()
    }

    pub fn schedule_entries(&self) -> &[ScheduleEntry] {
        self.schedule.entries()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    pub fn pending_intervals(&self) -> usize {
        self.timers.pending_intervals()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl<S: Surface, C: Clock> Drop for DynamicGradient<S, C> {
    fn drop(&mut self) {
        self.dispose();
    }
}
