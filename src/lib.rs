#![forbid(unsafe_code)]

pub mod clock;
pub mod color;
pub mod component;
pub mod composite;
pub mod descriptor;
pub mod ease;
pub mod effect;
pub mod error;
pub mod palette;
pub mod raster;
pub mod schedule;
pub mod surface;
pub mod timer;
pub mod transition;

pub use clock::{Clock, FixedClock, SystemClock, TimeOfDay};
pub use color::{Color, Rgb, blend};
pub use component::{DynamicGradient, GradientOptions, GradientUpdate};
pub use descriptor::{GradientDescriptor, GradientKind};
pub use ease::Ease;
pub use effect::{EffectOptions, EffectState, HUE_PRESETS, resolve_hue};
pub use error::{GradientError, GradientResult};
pub use palette::{PaletteBlend, PaletteSection};
pub use raster::{LayerSnapshot, RasterSurface, Stage};
pub use schedule::ScheduleEntry;
pub use surface::{LayerClip, LayerId, LayerSpec, Surface, SurfaceHost};
pub use timer::TimerId;
pub use transition::{Buffer, TextClipBuffers};
