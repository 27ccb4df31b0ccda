//! Crossfades from the committed gradient to a new one.
//!
//! Fill mode stacks a throwaway overlay above the base paint, fades it in and
//! commits its paint to the base once the fade is over. Text mode keeps two
//! glyph-clipped buffers for the lifetime of the instance and alternates
//! between them, so a new gradient always fades in on the hidden buffer.

use std::time::Duration;

use crate::{
    component::Task,
    descriptor::GradientDescriptor,
    surface::{LayerClip, LayerId, LayerSpec, Surface},
    timer::{TimerId, Timers},
};

pub(crate) const OVERLAY_Z: i32 = 0;
pub(crate) const TEXT_BUFFER_Z: i32 = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Buffer {
    A,
    B,
}

impl Buffer {
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

/// The two alternating glyph-clipped layers of text mode.
#[derive(Debug)]
pub struct TextClipBuffers {
    a: LayerId,
    b: LayerId,
    visible: Option<Buffer>,
    duration: Duration,
}

impl TextClipBuffers {
    fn allocate<S: Surface>(surface: &mut S, paint: &GradientDescriptor, duration: Duration) -> Self {
        let mut make = |z: i32| {
            surface.insert_layer(LayerSpec {
                paint: paint.clone(),
                opacity: 0.0,
                transition: duration,
                z,
                clip: LayerClip::Text,
            })
        };
        let a = make(TEXT_BUFFER_Z);
        let b = make(TEXT_BUFFER_Z + 1);
        Self {
            a,
            b,
            visible: None,
            duration,
        }
    }

    pub fn layer(&self, which: Buffer) -> LayerId {
        match which {
            Buffer::A => self.a,
            Buffer::B => self.b,
        }
    }

    pub fn visible(&self) -> Option<Buffer> {
        self.visible
    }

    pub fn hidden(&self) -> Buffer {
        self.visible.map_or(Buffer::A, Buffer::other)
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    fn adopt_duration<S: Surface>(&mut self, surface: &mut S, duration: Duration) {
        if self.duration == duration {
            return;
        }
        surface.set_layer_transition(self.a, duration);
        surface.set_layer_transition(self.b, duration);
        self.duration = duration;
    }

    /// Paints `which` and snaps it to transparent, ready to fade in on top.
    fn prime<S: Surface>(&self, surface: &mut S, which: Buffer, paint: &GradientDescriptor) {
        let id = self.layer(which);
        surface.set_layer_paint(id, paint);
        surface.raise_layer(id);
        surface.set_layer_transition(id, Duration::ZERO);
        surface.set_layer_opacity(id, 0.0);
        surface.set_layer_transition(id, self.duration);
    }

    fn remove<S: Surface>(&self, surface: &mut S) {
        surface.remove_layer(self.a);
        surface.remove_layer(self.b);
    }
}

#[derive(Debug)]
struct Crossfade {
    layer: LayerId,
    target: GradientDescriptor,
    reveal: Option<TimerId>,
    commit: Option<TimerId>,
}

#[derive(Debug)]
struct TextCrossfade {
    incoming: Buffer,
    reveal: Option<TimerId>,
    commit: Option<TimerId>,
}

#[derive(Debug, Default)]
pub struct TransitionEngine {
    overlay: Option<Crossfade>,
    text: Option<TextClipBuffers>,
    text_fade: Option<TextCrossfade>,
}

impl TransitionEngine {
    pub fn in_flight(&self) -> bool {
        self.overlay.is_some() || self.text_fade.is_some()
    }

    pub fn overlay_layer(&self) -> Option<LayerId> {
        self.overlay.as_ref().map(|c| c.layer)
    }

    pub fn text_buffers(&self) -> Option<&TextClipBuffers> {
        self.text.as_ref()
    }

    /// Allocates the text buffers on first use; later calls only adopt a new
    /// transition duration.
    fn ensure_text_buffers<S: Surface>(
        &mut self,
        surface: &mut S,
        paint: &GradientDescriptor,
        duration: Duration,
    ) -> &mut TextClipBuffers {
        let buffers = self
            .text
            .get_or_insert_with(|| TextClipBuffers::allocate(surface, paint, duration));
        buffers.adopt_duration(surface, duration);
        buffers
    }

    /// Starts a crossfade to `target` lasting `duration`.
    pub(crate) fn begin<S: Surface>(
        &mut self,
        surface: &mut S,
        timers: &mut Timers<Task>,
        target: &GradientDescriptor,
        duration: Duration,
        text_clip: bool,
    ) {
        if text_clip {
            self.begin_text(surface, timers, target, duration);
            return;
        }

        // A superseded overlay never commits; the new fade starts from the base.
        self.drop_overlay(surface, timers);

        let layer = surface.insert_layer(LayerSpec {
            paint: target.clone(),
            opacity: 0.0,
            transition: duration,
            z: OVERLAY_Z,
            clip: LayerClip::Fill,
        });
        let reveal = timers.request_frame(Task::RevealCrossfade);
        let commit = timers.set_timeout(duration, Task::CommitCrossfade);
        tracing::debug!(to = %target, ?duration, ?layer, "crossfade started");
        self.overlay = Some(Crossfade {
            layer,
            target: target.clone(),
            reveal: Some(reveal),
            commit: Some(commit),
        });
    }

    fn begin_text<S: Surface>(
        &mut self,
        surface: &mut S,
        timers: &mut Timers<Task>,
        target: &GradientDescriptor,
        duration: Duration,
    ) {
        let resumed = self.text_fade.take().map(|mut fade| {
            timers.cancel_slot(&mut fade.reveal);
            timers.cancel_slot(&mut fade.commit);
            fade.incoming
        });

        let buffers = self.ensure_text_buffers(surface, target, duration);
        let incoming = match resumed {
            // Keep fading the same buffer; only its paint changes.
            Some(which) => {
                surface.set_layer_paint(buffers.layer(which), target);
                which
            }
            None => {
                let which = buffers.hidden();
                buffers.prime(surface, which, target);
                which
            }
        };

        let reveal = timers.request_frame(Task::RevealText);
        let commit = timers.set_timeout(duration, Task::CommitText);
        tracing::debug!(to = %target, ?duration, ?incoming, "text crossfade started");
        self.text_fade = Some(TextCrossfade {
            incoming,
            reveal: Some(reveal),
            commit: Some(commit),
        });
    }

    /// Shows `target` immediately, cancelling any crossfade in flight.
    pub(crate) fn apply_now<S: Surface>(
        &mut self,
        surface: &mut S,
        timers: &mut Timers<Task>,
        target: &GradientDescriptor,
        duration: Duration,
        text_clip: bool,
    ) {
        if !text_clip {
            self.drop_overlay(surface, timers);
            surface.set_background(Some(target));
            return;
        }

        self.drop_text_fade(timers);
        let buffers = self.ensure_text_buffers(surface, target, duration);
        let shown = buffers.hidden();
        let (on, off) = (buffers.layer(shown), buffers.layer(shown.other()));
        surface.set_layer_paint(on, target);
        surface.raise_layer(on);
        for id in [on, off] {
            surface.set_layer_transition(id, Duration::ZERO);
        }
        surface.set_layer_opacity(on, 1.0);
        surface.set_layer_opacity(off, 0.0);
        for id in [on, off] {
            surface.set_layer_transition(id, buffers.duration);
        }
        buffers.visible = Some(shown);
    }

    /// Fades both text buffers out, e.g. when leaving text mode.
    pub(crate) fn hide_text<S: Surface>(&mut self, surface: &mut S, timers: &mut Timers<Task>) {
        self.drop_text_fade(timers);
        if let Some(buffers) = self.text.as_mut() {
            surface.set_layer_opacity(buffers.a, 0.0);
            surface.set_layer_opacity(buffers.b, 0.0);
            buffers.visible = None;
        }
    }

    pub(crate) fn reveal<S: Surface>(&mut self, surface: &mut S, fired: TimerId) {
        if let Some(fade) = self.overlay.as_mut()
            && fade.reveal == Some(fired)
        {
            fade.reveal = None;
            surface.set_layer_opacity(fade.layer, 1.0);
        }
    }

    pub(crate) fn commit<S: Surface>(&mut self, surface: &mut S, fired: TimerId) {
        if self.overlay.as_ref().and_then(|f| f.commit) != Some(fired) {
            return;
        }
        if let Some(fade) = self.overlay.take() {
            surface.set_background(Some(&fade.target));
            surface.remove_layer(fade.layer);
            tracing::debug!(to = %fade.target, "crossfade committed");
        }
    }

    pub(crate) fn reveal_text<S: Surface>(&mut self, surface: &mut S, fired: TimerId) {
        let (Some(fade), Some(buffers)) = (self.text_fade.as_mut(), self.text.as_ref()) else {
            return;
        };
        if fade.reveal != Some(fired) {
            return;
        }
        fade.reveal = None;
        surface.set_layer_opacity(buffers.layer(fade.incoming), 1.0);
    }

    pub(crate) fn commit_text<S: Surface>(
        &mut self,
        surface: &mut S,
        timers: &mut Timers<Task>,
        fired: TimerId,
    ) {
        if self.text_fade.as_ref().and_then(|f| f.commit) != Some(fired) {
            return;
        }
        let (Some(mut fade), Some(buffers)) = (self.text_fade.take(), self.text.as_mut()) else {
            return;
        };
        // No frame ran since the fade began; show the incoming buffer now.
        if let Some(reveal) = fade.reveal.take() {
            timers.cancel(reveal);
            surface.set_layer_opacity(buffers.layer(fade.incoming), 1.0);
        }
        surface.set_layer_opacity(buffers.layer(fade.incoming.other()), 0.0);
        buffers.visible = Some(fade.incoming);
        tracing::debug!(visible = ?fade.incoming, "text crossfade committed");
    }

    pub(crate) fn drop_overlay<S: Surface>(&mut self, surface: &mut S, timers: &mut Timers<Task>) {
        if let Some(mut fade) = self.overlay.take() {
            timers.cancel_slot(&mut fade.reveal);
            timers.cancel_slot(&mut fade.commit);
            surface.remove_layer(fade.layer);
            tracing::debug!(layer = ?fade.layer, "superseded crossfade removed");
        }
    }

    fn drop_text_fade(&mut self, timers: &mut Timers<Task>) {
        if let Some(mut fade) = self.text_fade.take() {
            timers.cancel_slot(&mut fade.reveal);
            timers.cancel_slot(&mut fade.commit);
        }
    }

    /// Cancels everything and removes every layer this engine created.
    pub(crate) fn dispose<S: Surface>(&mut self, surface: &mut S, timers: &mut Timers<Task>) {
        self.drop_overlay(surface, timers);
        self.drop_text_fade(timers);
        if let Some(buffers) = self.text.take() {
            buffers.remove(surface);
        }
    }
}
