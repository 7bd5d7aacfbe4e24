//! Flow definitions: configuration, schedule, metrics, identity.

mod model;

pub use self::model::{
    ExecutionMetrics, FlowConfiguration, FlowType, IntegrationFlow, RetryPolicy, ScheduleSettings,
};
