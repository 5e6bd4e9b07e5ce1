#![forbid(unsafe_code)]
//! Declarative image templating.
//!
//! A markup document describes a still image or an animation. Attributes can be bound to
//! expressions over render variables, and an optional setup script computes more variables per
//! frame. [`Engine`] loads the document, generates a [`RenderSession`] once and renders it to a
//! PNG or an animated GIF.

pub mod binder;
pub mod color;
pub mod config;
pub mod document;
pub mod elements;
pub mod engine;
pub mod error;
pub mod expression;
pub mod frame;
pub mod markup;
pub mod orchestrator;
pub mod resources;
pub mod scope;
pub mod script;
pub mod session;
pub mod surface;
pub mod units;
pub mod value;

pub use color::Color;
pub use config::{EngineConfig, ErrorPolicy, PolicyAction};
pub use document::{Document, Node};
pub use engine::{Engine, RenderOptions};
pub use error::{DocumentRef, ErrorKind, RenderError, RenderResult};
pub use orchestrator::{
    CancelToken, FrameProgress, FrameStore, LoggingObserver, RenderObserver, Rendered, Renderer,
};
pub use session::{RenderSession, SessionMetrics};
pub use units::{SizeUnit, TimeUnit};
pub use value::{Value, Variables};
