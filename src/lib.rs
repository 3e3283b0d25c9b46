//! Pulsedeck library - procedural techno generator and spectral features

pub mod audio;
pub mod cli;
pub mod controller;
pub mod error;
pub mod offline;
pub mod params;
pub mod rendering;
pub mod visuals;
pub mod vj;
