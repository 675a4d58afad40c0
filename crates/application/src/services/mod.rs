mod admin_service;
mod media_service;
mod router;

pub use admin_service::{AdminService, AdminServiceDependencies, BroadcastCommandOutcome};
pub use media_service::{AudioOutcome, MediaOutcome, MediaService, MediaServiceDependencies};
pub use router::{Route, UpdateRouter};
