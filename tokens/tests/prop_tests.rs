use std::collections::HashSet;
use std::sync::Arc;

use bat_nullables::NullTokenStore;
use bat_tokens::{TokenGenerator, TokenPool};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn generate_returns_exactly_count_distinct_tokens(count in 0usize..64) {
        let batch = TokenGenerator::with_os_rng().generate(count, "BAT0.05").unwrap();
        prop_assert_eq!(batch.len(), count);
        let ids: HashSet<_> = batch.iter().map(|(b, _)| b.token_id.clone()).collect();
        prop_assert_eq!(ids.len(), count);
        let points: HashSet<_> = batch.iter().map(|(b, _)| b.blinded_value.clone()).collect();
        prop_assert_eq!(points.len(), count);
    }

    #[test]
    fn empty_pool_never_yields(takes in 1usize..8) {
        let pool = TokenPool::new(Arc::new(NullTokenStore::new()));
        for _ in 0..takes {
            prop_assert!(pool.take().is_err());
        }
        prop_assert_eq!(pool.in_flight_count(), 0);
    }
}
