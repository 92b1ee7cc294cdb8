pub mod app;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod html;
pub mod listing;
pub mod output;

#[cfg(test)]
mod tests;
