pub mod actions;
pub mod controllers;
pub mod models;
pub mod review;
pub mod share;

pub use actions::PublicationAction;
pub use models::{Publication, PublicationStatus, PublicationsState, ResourceAction};
pub use review::{PublicationReview, ReviewError, review_publication};
pub use share::{ShareAction, ShareState};
