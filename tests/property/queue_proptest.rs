//! Property-based tests for queue ordering

use eventsync::client::local_db::LocalDatabase;
use eventsync::client::offline::{ActionMethod, ActionPayload, PendingQueue};
use proptest::prelude::*;

fn method_strategy() -> impl Strategy<Value = ActionMethod> {
    prop_oneof![
        Just(ActionMethod::Post),
        Just(ActionMethod::Put),
        Just(ActionMethod::Delete),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_listing_is_stable_and_ordered(
        actions in prop::collection::vec((method_strategy(), "[a-z]{1,6}(/[0-9]{1,4})?"), 1..10),
        rewrite_every in 1usize..4,
    ) {
        let (ids, first, second) = tokio_test::block_on(async {
            let queue = PendingQueue::new(LocalDatabase::in_memory().await.unwrap());
            let mut ids = Vec::new();
            for (method, path) in &actions {
                ids.push(queue.enqueue(*method, path, None).await.unwrap());
            }
            for id in ids.iter().step_by(rewrite_every) {
                queue
                    .rewrite(*id, &ActionPayload::new(format!("/rewritten/{}", id), None))
                    .await
                    .unwrap();
            }
            let first = queue.list_ordered().await.unwrap();
            let second = queue.list_ordered().await.unwrap();
            (ids, first, second)
        });

        let listed: Vec<i64> = first.iter().map(|a| a.id).collect();
        prop_assert_eq!(&listed, &ids);
        prop_assert_eq!(first, second);
    }
}
