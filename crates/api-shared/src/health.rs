use crate::dto::HealthRes;

/// Simple health service shared by the REST server and its clients.
///
/// Reports liveness only; queue state is never consulted.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Static method to check health without creating an instance.
    ///
    /// # Returns
    /// A `HealthRes` indicating the service is healthy.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "Queue service is alive".into(),
        }
    }
}
