pub mod publication_controller;
pub mod share_controller;

pub use publication_controller::handle as handle_publication;
pub use share_controller::handle as handle_share;
