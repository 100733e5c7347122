pub mod config;
pub mod error;
pub mod graph;
pub mod identity;
pub mod obligations;
pub mod pap;
pub mod pdp;
pub mod persistence;
pub mod prohibitions;
pub mod storage;
pub mod store;

pub use config::NgacConfig;
pub use error::{NgacError, Result};
pub use graph::{Direction, NodeType, PolicyGraph, PolicyNode};
pub use identity::{ClientIdentity, Role, StaticIdentity};
pub use obligations::{EventPattern, Obligation, Obligations};
pub use pap::PolicyAdministrationPoint;
pub use pdp::{bind_user, AccessDecisionPoint, CallerBinding, Decider};
pub use persistence::PolicyStoreAdapter;
pub use prohibitions::{ContainerCondition, Prohibition, Prohibitions};
pub use storage::{FileRecords, InMemoryRecords, RecordStore};
pub use store::PolicyStore;
