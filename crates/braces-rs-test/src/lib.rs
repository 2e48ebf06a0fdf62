//! # braces-rs-test
//!
//! Testing utilities for braces-rs. Provides a request factory, an in-memory
//! store standing in for the persistence layer, a renderer that records what
//! it was asked to render, and streaming resources that count their releases.

pub mod renderer;
pub mod request_factory;
pub mod resource;
pub mod store;

pub use renderer::RecordingRenderer;
pub use request_factory::RequestFactory;
pub use resource::{ReleaseProbe, TrackedResource};
pub use store::InMemoryStore;
