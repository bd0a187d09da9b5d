// ABOUTME: Session module — registry, connection handles, and the lifecycle supervisor.
// ABOUTME: Everything with real invariants lives here; HTTP and bootstrap are thin callers.

pub mod handle;
pub mod lifecycle;
pub mod policy;
pub mod registry;
pub mod state;

pub use handle::ConnectionHandle;
pub use lifecycle::{Lifecycle, LifecycleParams};
pub use policy::{CloseDecision, decide_on_close};
pub use registry::{SessionRegistry, SessionSummary};
pub use state::LifecycleState;
