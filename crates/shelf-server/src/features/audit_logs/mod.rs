pub mod queries;
pub mod routes;

pub use queries::{
    ActorHistoryError, ActorHistoryQuery, EntityHistoryError, EntityHistoryQuery,
    GetAuditLogError, GetAuditLogQuery, ListAuditLogsError, ListAuditLogsQuery,
};

pub use routes::audit_logs_routes;
