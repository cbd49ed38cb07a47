pub mod form;
pub mod health;
pub mod pages;
pub mod uploads;

pub use health::{health_check, metrics_endpoint, readiness_check};
pub use pages::{search_assistant, walking_assistant};
pub use uploads::{upload_audio, upload_image, upload_walking_image};
