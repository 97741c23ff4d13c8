pub mod cluster_store;
pub mod process_supervisor;

pub use cluster_store::{ClusterStore, ExistPredicate};
pub use process_supervisor::ProcessSupervisor;

#[cfg(test)]
pub use process_supervisor::MockProcessSupervisor;
