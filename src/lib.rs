//! Headless MP3 player with an audio-reactive corona visualizer.
//!
//! The pipeline per tick is: [`audio::tap`] captures a byte spectrum from the
//! playing [`player::Transport`], [`audio::smoother`] shapes it, and
//! [`render::radial`] draws it around the player. [`session`] owns the tick
//! loop; [`manifest`] produces and loads the track list.

pub mod audio;
pub mod encode;
pub mod manifest;
pub mod player;
pub mod render;
pub mod session;
pub mod visualizer;
