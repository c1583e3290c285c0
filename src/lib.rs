//! Terminal world map: click a country to see and hear a song from it,
//! or quiz yourself on where the countries are.

pub mod app;
pub mod braille;
pub mod catalog;
pub mod config;
pub mod error;
pub mod map;
pub mod player;
pub mod quiz;
pub mod resolver;
pub mod search;
pub mod songs;
pub mod ui;
