pub mod models_controller;

pub use models_controller::handle;
