pub mod endpoint;
pub mod event;
pub mod replay;

pub use endpoint::{CreateEndpointRequest, Endpoint, EndpointStatus};
pub use event::Event;
pub use replay::{InvalidTargetUrl, ReplayEventRequest, ReplayOutcome, validate_target_url};
