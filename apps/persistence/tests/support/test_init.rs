/// Runs once per test binary that includes it: successful `with_txn` units of
/// work roll back instead of committing.
#[ctor::ctor]
fn init_test_txn_policy() {
    persistence::db::txn_policy::set_txn_policy(
        persistence::db::txn_policy::TxnPolicy::RollbackOnOk,
    );
}
