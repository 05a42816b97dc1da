pub mod manager;
pub mod pool;
pub mod registry;
pub mod txn;
pub mod txn_policy;
