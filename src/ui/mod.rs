//! UI Module - egui integration and AppController
//!
//! `AppController` owns all state and is driven from the egui frame loop in
//! `AppUI`. Widgets and timers are split out so they can be tested without a
//! window.

pub mod app;
pub mod controller;
pub mod threading;
pub mod widgets;

pub use app::{AppUI, UIState, APP_TITLE};
pub use controller::AppController;
pub use threading::{PeriodicTask, TimerSet};
