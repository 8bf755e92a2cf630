pub mod dispatcher;
pub mod metrics;
pub mod providers;

pub use dispatcher::NotificationDispatcher;
pub use metrics::{get_metrics, init_metrics, record_dispatch, record_provider_call};
pub use providers::{
    build_http_client, FcmProvider, MockPushProvider, ProviderError, ProviderResponse,
    PushMessage, PushProvider, ServiceAccountKey, ServiceAccountTokenSource, StaticTokenSource,
    TokenSource,
};
