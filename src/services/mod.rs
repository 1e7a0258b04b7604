//! Service layer: the cascade engine's business logic.

pub mod assignment_policy;
pub mod cascade_controller;
pub mod expiry_sweeper;
pub mod metrics_aggregator;
pub mod notification_dispatcher;
pub mod trigger_adapter;

pub use assignment_policy::{AssignmentPolicy, TieredAssignmentPolicy};
pub use cascade_controller::{
    AdvanceOutcome, CascadeController, CascadeHistory, FinalizeOutcome, StartOutcome,
};
pub use expiry_sweeper::{
    ExpirySweeper, StopReason, SweepReport, SweeperEvent, SweeperHandle, SweeperStatus,
};
pub use metrics_aggregator::{aggregate, MetricsAggregator};
pub use notification_dispatcher::{DispatchStats, NotificationDispatcher, NotificationRequest};
pub use trigger_adapter::{BusinessEvent, TriggerAdapter, TriggerOutcome};
