//! Background tasks kept internal to the crate.
//!
//! The replication worker carries fire-and-forget cloud writes for the
//! hybrid storage provider.

mod replication;

pub(crate) use replication::ReplicationWorker;
