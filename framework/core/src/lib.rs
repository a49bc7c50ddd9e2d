pub mod backend;
pub mod configuration;
pub mod context;
pub mod deployment;
pub mod external;
pub mod probe;
pub mod scenario;
pub mod topology;

/// Type-erased error used at trait seams where the concrete failure comes
/// from a backend or dependency implementation.
pub type DynError = Box<dyn std::error::Error + Send + Sync>;
