pub mod app;
pub mod dashboard;

pub use app::{AfterLoad, App, View};
