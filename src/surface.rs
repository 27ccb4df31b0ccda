//! Host rendering surface contract.
//!
//! The engine never draws. It drives a host surface that owns a base background
//! paint plus stacked child layers, each with its own opacity and a native
//! opacity transition. Implementations are handles: cloning one refers to the
//! same underlying surface.

use std::time::Duration;

use crate::descriptor::GradientDescriptor;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerId(pub u64);

/// How a layer's paint is shaped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LayerClip {
    /// Fills the whole surface.
    #[default]
    Fill,
    /// Clipped to the glyphs of the surface's text.
    Text,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayerSpec {
    pub paint: GradientDescriptor,
    pub opacity: f32,
    pub transition: Duration,
    pub z: i32,
    pub clip: LayerClip,
}

pub trait Surface {
    /// False once the host element is gone.
    fn is_attached(&self) -> bool;

    fn background(&self) -> Option<GradientDescriptor>;

    fn set_background(&mut self, paint: Option<&GradientDescriptor>);

    fn insert_layer(&mut self, spec: LayerSpec) -> LayerId;

    fn set_layer_paint(&mut self, id: LayerId, paint: &GradientDescriptor);

    /// Moves the layer's opacity to `opacity`, animated over its transition
    /// duration by the host.
    fn set_layer_opacity(&mut self, id: LayerId, opacity: f32);

    fn set_layer_transition(&mut self, id: LayerId, duration: Duration);

    /// Puts the layer above every other layer sharing its clip.
    fn raise_layer(&mut self, id: LayerId);

    /// Removing an unknown layer is a no-op.
    fn remove_layer(&mut self, id: LayerId);
}

/// Resolves selectors to live surfaces.
pub trait SurfaceHost {
    type Surface: Surface;

    fn resolve(&self, selector: &str) -> Option<Self::Surface>;
}
