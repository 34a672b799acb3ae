//! Change-feed reconciliation and rebuild scheduling against a session.
//!
//! These run on a paused clock so the debounce window is deterministic.

mod support;

use itemgraph::store::StoreEvent;
use std::sync::atomic::Ordering;
use std::time::Duration;
use support::{equipment_root, owned, script_standard_item, session, FakeResolver, FakeStore, RecordingGate};
use tokio::time::sleep;

#[tokio::test(start_paused = true)]
async fn change_bursts_coalesce_into_one_rebuild() -> anyhow::Result<()> {
    let resolver = FakeResolver::new();
    let store = FakeStore::new();
    let gate = RecordingGate::accepting();
    script_standard_item(&resolver, &store);

    let session = session(&resolver, &store, &gate);
    assert!(session.load_item(equipment_root(), None, "Coat", None).await?);
    assert_eq!(resolver.build_count(), 1);

    // A new material lands in the store: the path is owned but unknown to
    // the tree, so each event asks for a rebuild.
    let a = owned("model/c0101e6180_top.mdl");
    let m2 = owned("material/mt_c0101e6180_top_b.mtrl");
    store.insert(&m2);
    resolver.set_materials(&a, &[&owned("material/mt_c0101e6180_top_a.mtrl"), &m2]);

    for version in 0..4 {
        session
            .on_store_event(StoreEvent::FileChanged {
                path: m2.clone(),
                version,
            })
            .await;
        sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(resolver.build_count(), 1);

    sleep(Duration::from_millis(400)).await;
    assert_eq!(resolver.build_count(), 2);
    assert!(session.materials().await.contains_key(&m2));

    session.close().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn vanished_entry_is_point_removed_without_rebuild() -> anyhow::Result<()> {
    let resolver = FakeResolver::new();
    let store = FakeStore::new();
    let gate = RecordingGate::accepting();
    script_standard_item(&resolver, &store);

    let t2 = owned("texture/c0101e6180_top_b.tex");
    let session = session(&resolver, &store, &gate);
    assert!(session.load_item(equipment_root(), None, "Coat", None).await?);

    store.remove(&t2);
    session
        .on_store_event(StoreEvent::FileChanged {
            path: t2.clone(),
            version: 9,
        })
        .await;

    assert!(!session.textures().await.contains_key(&t2));

    sleep(Duration::from_millis(600)).await;
    assert_eq!(resolver.build_count(), 1);

    session.close().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn surviving_entry_change_is_a_noop() -> anyhow::Result<()> {
    let resolver = FakeResolver::new();
    let store = FakeStore::new();
    let gate = RecordingGate::accepting();
    script_standard_item(&resolver, &store);

    let t1 = owned("texture/c0101e6180_top_a.tex");
    let session = session(&resolver, &store, &gate);
    assert!(session.load_item(equipment_root(), None, "Coat", None).await?);
    let selection = session.selection().await;

    session
        .on_store_event(StoreEvent::FileChanged {
            path: t1.clone(),
            version: 3,
        })
        .await;
    sleep(Duration::from_millis(600)).await;

    assert_eq!(resolver.build_count(), 1);
    assert_eq!(session.selection().await, selection);
    assert!(session.textures().await.contains_key(&t1));

    session.close().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn events_outside_the_root_are_ignored() -> anyhow::Result<()> {
    let resolver = FakeResolver::new();
    let store = FakeStore::new();
    let gate = RecordingGate::accepting();
    script_standard_item(&resolver, &store);

    let session = session(&resolver, &store, &gate);
    assert!(session.load_item(equipment_root(), None, "Coat", None).await?);

    session
        .on_store_event(StoreEvent::FileChanged {
            path: "chara/weapon/w0101/model/w0101.mdl".to_string(),
            version: 1,
        })
        .await;
    sleep(Duration::from_millis(600)).await;

    assert_eq!(resolver.build_count(), 1);

    session.close().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn commit_event_schedules_a_debounced_rebuild() -> anyhow::Result<()> {
    let resolver = FakeResolver::new();
    let store = FakeStore::new();
    let gate = RecordingGate::accepting();
    script_standard_item(&resolver, &store);

    let session = session(&resolver, &store, &gate);
    assert!(session.load_item(equipment_root(), None, "Coat", None).await?);

    session.on_store_event(StoreEvent::TransactionCommitted).await;
    session.on_store_event(StoreEvent::TransactionCommitted).await;
    sleep(Duration::from_millis(400)).await;

    assert_eq!(resolver.build_count(), 2);

    session.close().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn selection_falls_back_when_rebuild_drops_the_viewed_model() -> anyhow::Result<()> {
    let resolver = FakeResolver::new();
    let store = FakeStore::new();
    let gate = RecordingGate::accepting();
    script_standard_item(&resolver, &store);

    let a = owned("model/c0101e6180_top.mdl");
    let b = owned("model/c0201e6180_top.mdl");
    let m2 = owned("material/mt_c0201e6180_top_a.mtrl");
    let session = session(&resolver, &store, &gate);
    assert!(
        session
            .load_item(equipment_root(), None, "Coat", Some(&a))
            .await?
    );
    assert_eq!(session.selection().await.model, a);

    // Model a disappears; model b gains a material.
    resolver.set_models(&[&b]);
    resolver.set_materials(&b, &[&m2]);
    let added = owned("material/new.mtrl");
    store.insert(&added);
    session
        .on_store_event(StoreEvent::FileChanged {
            path: added,
            version: 2,
        })
        .await;
    sleep(Duration::from_millis(400)).await;

    // The remembered model no longer exists: index 0 at the model level,
    // and the material level derives from that fallback.
    let selection = session.selection().await;
    assert_eq!(selection.model, b);
    assert_eq!(selection.material, m2);

    session.close().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn loading_another_item_cancels_pending_rebuild() -> anyhow::Result<()> {
    let resolver = FakeResolver::new();
    let store = FakeStore::new();
    let gate = RecordingGate::accepting();
    script_standard_item(&resolver, &store);

    let session = session(&resolver, &store, &gate);
    assert!(session.load_item(equipment_root(), None, "Coat", None).await?);

    let unknown = owned("material/new.mtrl");
    store.insert(&unknown);
    session
        .on_store_event(StoreEvent::FileChanged {
            path: unknown,
            version: 1,
        })
        .await;

    // Before the quiet window elapses, a different item takes over.
    let c = "chara/equipment/e0002/model/c0101e0002_top.mdl".to_string();
    resolver.set_models(&[&c]);
    let other = itemgraph::resolver::ItemRoot {
        id: "e0002".to_string(),
        prefix: "chara/equipment/e0002/".to_string(),
        base_name: "c0101e0002_top".to_string(),
        ..equipment_root()
    };
    assert!(session.load_item(other, None, "Other", None).await?);
    assert_eq!(resolver.build_count(), 2);

    sleep(Duration::from_millis(800)).await;
    // The old session's pending rebuild never ran.
    assert_eq!(resolver.build_count(), 2);
    assert_eq!(session.selection().await.model, c);

    session.close().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failed_rebuild_keeps_previous_tree() -> anyhow::Result<()> {
    let resolver = FakeResolver::new();
    let store = FakeStore::new();
    let gate = RecordingGate::accepting();
    script_standard_item(&resolver, &store);

    let session = session(&resolver, &store, &gate);
    assert!(session.load_item(equipment_root(), None, "Coat", None).await?);
    let selection = session.selection().await;
    let models = session.models().await;

    resolver.fail_models.store(true, Ordering::SeqCst);
    let unknown = owned("material/new.mtrl");
    store.insert(&unknown);
    session
        .on_store_event(StoreEvent::FileChanged {
            path: unknown,
            version: 1,
        })
        .await;
    sleep(Duration::from_millis(600)).await;

    // The build was attempted and failed; the previous tree stays
    // authoritative until a retry succeeds.
    assert_eq!(resolver.build_count(), 2);
    assert_eq!(session.selection().await, selection);
    assert_eq!(session.models().await, models);

    resolver.fail_models.store(false, Ordering::SeqCst);
    session
        .on_store_event(StoreEvent::FileChanged {
            path: owned("material/new.mtrl"),
            version: 2,
        })
        .await;
    sleep(Duration::from_millis(600)).await;
    assert_eq!(resolver.build_count(), 3);

    session.close().await;
    Ok(())
}
