//! # Rawmix Library
//!
//! This library provides the core mixing and interleaving functionality for raw PCM audio.
//! It includes modules for sample formats, stream queues, time alignment, summation, and more.

pub mod adder;
pub mod align;
pub mod clock;
pub mod config;
pub mod error;
pub mod format;
pub mod interleave;
pub mod mixer;
pub mod queue;
