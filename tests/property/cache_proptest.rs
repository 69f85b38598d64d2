//! Property-based tests for the cache's versioning invariants

use crate::common::{small_registry, tag};
use plenum::cache::{ElementCache, UpdateKind};
use plenum::element::Element;
use proptest::prelude::*;

/// One random mutation step: set a tag's name or delete the tag.
#[derive(Debug, Clone)]
enum Step {
    Set { id: i64, name: String },
    Delete { id: i64 },
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        (1..8i64, "[a-z]{1,8}").prop_map(|(id, name)| Step::Set { id, name }),
        (1..8i64).prop_map(|id| Step::Delete { id }),
    ]
}

fn element_for(step: &Step) -> Element {
    match step {
        Step::Set { id, name } => tag(*id, name),
        Step::Delete { id } => Element::deleted("core/tag", *id),
    }
}

proptest! {
    #[test]
    fn test_each_batch_bumps_version_by_exactly_one(
        steps in proptest::collection::vec(step_strategy(), 1..20),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let cache = ElementCache::new(small_registry());
            for (i, step) in steps.iter().enumerate() {
                let version = cache
                    .update(vec![element_for(step)], UpdateKind::Visible)
                    .await
                    .unwrap();
                prop_assert_eq!(version, i as u64 + 1);
            }
            prop_assert_eq!(cache.get_current_version().await, steps.len() as u64);
            Ok(())
        })?;
    }

    #[test]
    fn test_catch_up_from_any_version_reaches_current_state(
        steps in proptest::collection::vec(step_strategy(), 1..20),
        from in 0..20u64,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let cache = ElementCache::new(small_registry());
            for step in &steps {
                cache.update(vec![element_for(step)], UpdateKind::Visible).await.unwrap();
            }

            let current = cache.get_all_full_data().await;
            let changed = cache.get_changed_since(from.min(steps.len() as u64)).await;

            // Every changed payload must be the element's current state.
            for (collection, payloads) in &changed.changed {
                for payload in payloads {
                    let id = payload["id"].as_i64().unwrap();
                    let live = current[collection]
                        .iter()
                        .find(|d| d["id"].as_i64() == Some(id));
                    prop_assert_eq!(live, Some(payload));
                }
            }
            // Every deleted id must really be gone.
            for element_id in &changed.deleted {
                let (collection, id) = element_id.rsplit_once(':').unwrap();
                let id: i64 = id.parse().unwrap();
                let live = current
                    .get(collection)
                    .map(|v| v.iter().any(|d| d["id"].as_i64() == Some(id)))
                    .unwrap_or(false);
                prop_assert!(!live);
            }
            Ok(())
        })?;
    }

    #[test]
    fn test_catch_up_from_current_version_is_empty(
        steps in proptest::collection::vec(step_strategy(), 1..10),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let cache = ElementCache::new(small_registry());
            for step in &steps {
                cache.update(vec![element_for(step)], UpdateKind::Visible).await.unwrap();
            }
            let version = cache.get_current_version().await;
            let changed = cache.get_changed_since(version).await;
            prop_assert!(changed.changed.is_empty());
            prop_assert!(changed.deleted.is_empty());
            prop_assert_eq!(changed.version, version);
            Ok(())
        })?;
    }
}
