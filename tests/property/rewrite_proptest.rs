//! Property-based tests for placeholder rewriting

use eventsync::client::offline::{ActionPayload, TranslationTable};
use proptest::prelude::*;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

fn table(users: &[(i64, i64)], registrations: &[(i64, i64)]) -> TranslationTable {
    TranslationTable {
        users: users.iter().copied().collect::<HashMap<_, _>>(),
        registrations: registrations.iter().copied().collect::<HashMap<_, _>>(),
    }
}

proptest! {
    #[test]
    fn prop_sent_body_never_carries_local_ids(
        placeholder in 1_000_000_000_000i64..2_000_000_000_000,
        local_id in 1_000_000_000_000i64..2_000_000_000_000,
        real in 1i64..100_000,
        event in 1i64..1000,
    ) {
        let tables = table(&[(placeholder, real)], &[]);
        let mut body = Map::new();
        body.insert("localId".into(), json!(local_id));
        body.insert("idUsuarioLocal".into(), json!(placeholder));
        body.insert("id_evento".into(), json!(event));

        let sent = tables.rewrite(&ActionPayload::new("/inscricoes", Some(body)), true);
        let sent = sent.body.unwrap();

        prop_assert!(!sent.contains_key("localId"));
        prop_assert!(!sent.contains_key("idUsuarioLocal"));
        prop_assert_eq!(sent.get("id_usuario"), Some(&json!(real)));
    }

    #[test]
    fn prop_path_rewrite_keeps_suffix(
        placeholder in 1_000_000_000_000i64..2_000_000_000_000,
        real in 1i64..100_000,
        suffix in "(/[a-z]{1,10}){0,3}",
    ) {
        let tables = table(&[], &[(placeholder, real)]);
        let payload = ActionPayload::new(format!("/inscricoes/{}{}", placeholder, suffix), None);

        let rewritten = tables.rewrite(&payload, true);
        prop_assert_eq!(rewritten.url, format!("/inscricoes/{}{}", real, suffix));
    }

    #[test]
    fn prop_empty_table_only_drops_local_id(
        fields in prop::collection::btree_map("[a-z_]{1,12}", any::<i64>(), 0..6),
    ) {
        let body: Map<String, Value> = fields
            .iter()
            .map(|(k, v)| (k.clone(), json!(v)))
            .collect();
        let payload = ActionPayload::new("/usuarios/1", Some(body.clone()));

        let kept = TranslationTable::default().rewrite(&payload, false);
        prop_assert_eq!(kept, payload.clone());

        let mut expected = body;
        expected.remove("localId");
        let sent = TranslationTable::default().rewrite(&payload, true);
        prop_assert_eq!(sent.body, Some(expected));
    }
}
