pub mod by_actor;
pub mod by_entity;
pub mod get;
pub mod list;

pub use by_actor::{ActorHistoryError, ActorHistoryQuery};
pub use by_entity::{EntityHistoryError, EntityHistoryQuery};
pub use get::{GetAuditLogError, GetAuditLogQuery};
pub use list::{ListAuditLogsError, ListAuditLogsQuery};
