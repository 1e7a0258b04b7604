pub mod cascade;
pub mod config;
pub mod lead;
pub mod metrics;

pub use cascade::{
    AdvanceTierResult, Cascade, CascadeEntry, CascadeStatus, FinalizeResult, Motivo,
    OpenCascadeResult,
};
pub use config::{
    Config, DatabaseConfig, LoggingConfig, NotificationConfig, RetryConfig, SweeperConfig,
    TierConfig,
};
pub use lead::{Agent, Cliente, ClienteStatus, Lead, LeadStatus};
pub use metrics::{AgentResolutions, DateRange, MetricsReport, MotivoStats};
