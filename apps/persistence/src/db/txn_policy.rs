use std::sync::OnceLock;

/// What `with_txn` does with a unit of work whose closure returned `Ok`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnPolicy {
    /// Commit on success (production default).
    CommitOnOk,
    /// Roll back on success; test binaries use this to keep stores pristine.
    RollbackOnOk,
}

static POLICY: OnceLock<TxnPolicy> = OnceLock::new();

/// Current process policy; `CommitOnOk` until something sets it.
pub fn current() -> TxnPolicy {
    POLICY.get().copied().unwrap_or(TxnPolicy::CommitOnOk)
}

/// Set the process policy once. Returns `false` if a policy was already set
/// (the first one wins).
pub fn set_txn_policy(policy: TxnPolicy) -> bool {
    POLICY.set(policy).is_ok()
}
