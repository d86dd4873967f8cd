use bat_crypto::IssuerSecretKey;
use bat_issuers::{IssuerError, IssuerRegistry};
use bat_types::{Issuer, IssuerSet, Timestamp};
use proptest::prelude::*;
use rand::rngs::OsRng;

fn issuer(name: String, from: u64, len: u64) -> Issuer {
    let key = IssuerSecretKey::generate(&mut OsRng).unwrap().public_key();
    Issuer::new(name, key.to_base64(), Timestamp::new(from), Timestamp::new(from + len))
}

proptest! {
    /// However an update is malformed, lookups are unchanged afterwards.
    #[test]
    fn rejected_update_is_invisible(
        names in proptest::collection::vec("BAT0\\.[1-9]", 1..4),
        corrupt in 0usize..4,
    ) {
        let registry = IssuerRegistry::new();
        let baseline: IssuerSet = vec![issuer("BAT5".into(), 0, 1000)].into_iter().collect();
        registry.update(baseline).unwrap();
        let before = registry.snapshot();

        let mut list: Vec<Issuer> = names
            .into_iter()
            .enumerate()
            .map(|(i, n)| issuer(n, (i as u64) * 10_000, 10))
            .collect();
        let idx = corrupt % list.len();
        list[idx].public_key.clear();

        let result = registry.update(list.into_iter().collect());
        prop_assert!(matches!(result, Err(IssuerError::InvalidCatalog(_))));
        prop_assert_eq!(&*registry.snapshot(), &*before);
        prop_assert!(registry.lookup("BAT5").is_some());
    }
}
