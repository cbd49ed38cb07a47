pub mod assistant;
pub mod image;
pub mod metrics;
pub mod providers;
pub mod storage;

pub use self::assistant::{AssistantClient, Capability};
pub use self::image::{decode_image, DecodedImage};
pub use self::metrics::{get_metrics, init_metrics};
pub use self::storage::{LocalUploadStore, StoredUpload, UploadStore, UploadSweeper};
