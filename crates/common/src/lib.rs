mod analytics;
mod domain;
mod kafka;
mod postgres;
mod redis;
mod telemetry;

pub use analytics::*;
pub use domain::*;
pub use kafka::*;
pub use postgres::*;
pub use self::redis::*;
pub use telemetry::*;

// Re-export mocks when the testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use domain::MockAnalyticsSink;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockApiKeyStore;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockEventProducer;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockIdentityCache;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockRecordStream;
