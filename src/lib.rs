//! masktag — manual pixel-mask tagging for 2D images.
//!
//! A single-user desktop tool for hand-painting binary label masks over a
//! directory of images with a pressure-sensitive tablet. Masks are stored as
//! PNG-encoded `.mask` sidecar files next to their source images; per-image
//! bookkeeping lives in an `items.json` manifest at the project root.

#![allow(clippy::too_many_arguments)]

pub mod app;
pub mod canvas;
pub mod cli;
pub mod components;
pub mod io;
pub mod logger;
pub mod mask;
pub mod project;
pub mod settings;
