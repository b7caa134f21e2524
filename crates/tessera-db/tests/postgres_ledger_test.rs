//! PostgreSQL ledger and avatar pointer tests.
//!
//! Run with: `cargo test -p tessera-db --test postgres_ledger_test -- --ignored`

mod helpers;

use chrono::{Duration, Utc};
use helpers::{new_record, setup_test_db};
use serde_json::json;
use tessera_core::models::{MediaCollection, OwnerRef};
use tessera_core::AppError;
use tessera_db::{AvatarPointers, MediaLedger, PgAvatarPointers, PgMediaLedger};

#[tokio::test]
#[ignore] // Requires Docker for the Postgres container
async fn test_live_for_orders_by_position_and_keeps_metadata() {
    let db = setup_test_db().await;
    let ledger = PgMediaLedger::new(db.pool.clone());
    let owner = OwnerRef::provider(7);

    for (path, order) in [("p/3.jpg", 3), ("p/1.jpg", 1), ("p/2.jpg", 2)] {
        let mut record = new_record(owner, MediaCollection::Portfolio, path, order);
        record.metadata.insert("width".to_string(), json!(640));
        ledger.create(record).await.unwrap();
    }

    let live = ledger
        .live_for(owner, MediaCollection::Portfolio)
        .await
        .unwrap();

    let orders: Vec<i32> = live.iter().map(|r| r.order).collect();
    assert_eq!(orders, vec![1, 2, 3]);
    assert_eq!(live[0].owner(), owner);
    assert_eq!(live[0].size_bytes, 1024);
    assert_eq!(live[0].metadata.get("width"), Some(&json!(640)));
}

#[tokio::test]
#[ignore] // Requires Docker for the Postgres container
async fn test_next_order_counts_trashed_rows() {
    let db = setup_test_db().await;
    let ledger = PgMediaLedger::new(db.pool.clone());
    let owner = OwnerRef::service(5000);

    assert_eq!(
        ledger
            .next_order(owner, MediaCollection::ServiceGallery)
            .await
            .unwrap(),
        1
    );

    ledger
        .create(new_record(owner, MediaCollection::ServiceGallery, "g/1.jpg", 1))
        .await
        .unwrap();
    let second = ledger
        .create(new_record(owner, MediaCollection::ServiceGallery, "g/2.jpg", 2))
        .await
        .unwrap();
    assert!(ledger.soft_delete(second.id).await.unwrap());

    assert_eq!(
        ledger
            .next_order(owner, MediaCollection::ServiceGallery)
            .await
            .unwrap(),
        3
    );
    // Other collections of the same owner are counted separately.
    assert_eq!(
        ledger
            .next_order(owner, MediaCollection::ServiceMain)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
#[ignore] // Requires Docker for the Postgres container
async fn test_replace_single_displaces_live_and_trashed_rows() {
    let db = setup_test_db().await;
    let ledger = PgMediaLedger::new(db.pool.clone());
    let owner = OwnerRef::user(42);

    let first = ledger
        .replace_single(new_record(owner, MediaCollection::Avatar, "avatars/042/42/avatar.jpg", 0))
        .await
        .unwrap();
    assert!(first.displaced.is_empty());
    assert!(ledger.soft_delete(first.record.id).await.unwrap());

    let second = ledger
        .replace_single(new_record(owner, MediaCollection::Avatar, "avatars/042/42/avatar.png", 0))
        .await
        .unwrap();
    assert_eq!(second.displaced.len(), 1);
    assert_eq!(second.displaced[0].id, first.record.id);
    assert!(second.displaced[0].is_trashed());

    let third = ledger
        .replace_single(new_record(owner, MediaCollection::Avatar, "avatars/042/42/avatar.png", 0))
        .await
        .unwrap();
    assert_eq!(third.displaced.len(), 1);
    assert_eq!(third.displaced[0].id, second.record.id);
    assert!(third.displaced[0].is_live());

    let all = ledger.all_for_owner(owner).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, third.record.id);
}

#[tokio::test]
#[ignore] // Requires Docker for the Postgres container
async fn test_replace_single_rejects_multi_photo_collections() {
    let db = setup_test_db().await;
    let ledger = PgMediaLedger::new(db.pool.clone());

    let err = ledger
        .replace_single(new_record(
            OwnerRef::review(1),
            MediaCollection::Review,
            "reviews/001/1/a.jpg",
            1,
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
#[ignore] // Requires Docker for the Postgres container
async fn test_second_live_single_slot_record_is_a_conflict() {
    let db = setup_test_db().await;
    let ledger = PgMediaLedger::new(db.pool.clone());
    let owner = OwnerRef::user(9);

    ledger
        .create(new_record(owner, MediaCollection::Avatar, "avatars/009/9/avatar.jpg", 0))
        .await
        .unwrap();

    let err = ledger
        .create(new_record(owner, MediaCollection::Avatar, "avatars/009/9/avatar.png", 0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let live = ledger
        .live_for(owner, MediaCollection::Avatar)
        .await
        .unwrap();
    assert_eq!(live.len(), 1);
}

#[tokio::test]
#[ignore] // Requires Docker for the Postgres container
async fn test_live_path_is_unique_until_soft_deleted() {
    let db = setup_test_db().await;
    let ledger = PgMediaLedger::new(db.pool.clone());
    let owner = OwnerRef::provider(3);
    let path = "providers/003/3/portfolio/a.jpg";

    let first = ledger
        .create(new_record(owner, MediaCollection::Portfolio, path, 1))
        .await
        .unwrap();

    let err = ledger
        .create(new_record(owner, MediaCollection::Portfolio, path, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    ledger.soft_delete(first.id).await.unwrap();
    let reused = ledger
        .create(new_record(owner, MediaCollection::Portfolio, path, 2))
        .await
        .unwrap();
    assert_eq!(
        ledger.find_live_by_path(path).await.unwrap().unwrap().id,
        reused.id
    );
}

#[tokio::test]
#[ignore] // Requires Docker for the Postgres container
async fn test_restore_into_occupied_slot_is_a_conflict() {
    let db = setup_test_db().await;
    let ledger = PgMediaLedger::new(db.pool.clone());
    let owner = OwnerRef::service(12);

    let old = ledger
        .create(new_record(owner, MediaCollection::ServiceMain, "services/012/12/main.jpg", 0))
        .await
        .unwrap();
    ledger.soft_delete(old.id).await.unwrap();
    ledger
        .create(new_record(owner, MediaCollection::ServiceMain, "services/012/12/main.png", 0))
        .await
        .unwrap();

    let err = ledger.restore(old.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert!(ledger.find(old.id).await.unwrap().unwrap().is_trashed());
}

#[tokio::test]
#[ignore] // Requires Docker for the Postgres container
async fn test_soft_delete_and_restore() {
    let db = setup_test_db().await;
    let ledger = PgMediaLedger::new(db.pool.clone());
    let owner = OwnerRef::review(4);

    let a = ledger
        .create(new_record(owner, MediaCollection::Review, "reviews/004/4/a.jpg", 1))
        .await
        .unwrap();
    ledger
        .create(new_record(owner, MediaCollection::Review, "reviews/004/4/b.jpg", 2))
        .await
        .unwrap();

    let trashed = ledger
        .soft_delete_collection(owner, MediaCollection::Review)
        .await
        .unwrap();
    assert_eq!(trashed.len(), 2);
    assert!(ledger
        .live_for(owner, MediaCollection::Review)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        ledger
            .trashed_for(owner, MediaCollection::Review)
            .await
            .unwrap()
            .len(),
        2
    );

    let restored = ledger.restore(a.id).await.unwrap().unwrap();
    assert!(restored.is_live());
    // Restoring a live record changes nothing.
    assert!(ledger.restore(a.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore] // Requires Docker for the Postgres container
async fn test_list_trashed_before_pages_by_id() {
    let db = setup_test_db().await;
    let ledger = PgMediaLedger::new(db.pool.clone());
    let owner = OwnerRef::review(9);

    let mut ids = Vec::new();
    for i in 0..5 {
        let record = ledger
            .create(new_record(
                owner,
                MediaCollection::Review,
                &format!("reviews/009/9/{}.jpg", i),
                i + 1,
            ))
            .await
            .unwrap();
        ids.push(record.id);
    }
    for id in &ids[..4] {
        ledger.soft_delete(*id).await.unwrap();
    }

    let past = Utc::now() - Duration::hours(1);
    assert!(ledger
        .list_trashed_before(past, 0, 10)
        .await
        .unwrap()
        .is_empty());

    let cutoff = Utc::now() + Duration::hours(1);
    let first = ledger.list_trashed_before(cutoff, 0, 3).await.unwrap();
    let first_ids: Vec<i64> = first.iter().map(|r| r.id).collect();
    assert_eq!(first_ids, ids[..3].to_vec());

    let second = ledger
        .list_trashed_before(cutoff, first[2].id, 3)
        .await
        .unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].id, ids[3]);
}

#[tokio::test]
#[ignore] // Requires Docker for the Postgres container
async fn test_purge_and_owner_hard_delete() {
    let db = setup_test_db().await;
    let ledger = PgMediaLedger::new(db.pool.clone());
    let owner = OwnerRef::provider(11);
    let neighbour = OwnerRef::provider(1011);

    let live = ledger
        .create(new_record(owner, MediaCollection::Portfolio, "providers/011/11/portfolio/a.jpg", 1))
        .await
        .unwrap();
    let trashed = ledger
        .create(new_record(owner, MediaCollection::Portfolio, "providers/011/11/portfolio/b.jpg", 2))
        .await
        .unwrap();
    ledger.soft_delete(trashed.id).await.unwrap();
    ledger
        .create(new_record(
            neighbour,
            MediaCollection::Portfolio,
            "providers/011/1011/portfolio/c.jpg",
            1,
        ))
        .await
        .unwrap();

    // Only trashed rows are purged.
    assert!(!ledger.purge_trashed(live.id).await.unwrap());
    assert!(ledger.purge_trashed(trashed.id).await.unwrap());
    assert!(ledger.find(trashed.id).await.unwrap().is_none());

    assert_eq!(ledger.hard_delete_owner(owner).await.unwrap(), 1);
    assert!(ledger.all_for_owner(owner).await.unwrap().is_empty());
    assert_eq!(ledger.all_for_owner(neighbour).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore] // Requires Docker for the Postgres container
async fn test_update_path_moves_live_record() {
    let db = setup_test_db().await;
    let ledger = PgMediaLedger::new(db.pool.clone());

    let record = ledger
        .create(new_record(OwnerRef::user(42), MediaCollection::Avatar, "avatars/42/photo.jpg", 0))
        .await
        .unwrap();

    assert!(ledger
        .update_path(record.id, "avatars/042/42/photo.jpg")
        .await
        .unwrap());
    assert!(ledger
        .find_live_by_path("avatars/42/photo.jpg")
        .await
        .unwrap()
        .is_none());
    assert_eq!(
        ledger
            .find_live_by_path("avatars/042/42/photo.jpg")
            .await
            .unwrap()
            .unwrap()
            .id,
        record.id
    );
    assert!(!ledger.update_path(record.id + 1000, "x.jpg").await.unwrap());
}

#[tokio::test]
#[ignore] // Requires Docker for the Postgres container
async fn test_avatar_pointers_on_users_table() {
    let db = setup_test_db().await;
    let avatars = PgAvatarPointers::new(db.pool.clone());

    sqlx::query("INSERT INTO users (id, avatar) VALUES (1, NULL), (2, 'avatars/2/old.jpg'), (3, '')")
        .execute(&db.pool)
        .await
        .unwrap();

    assert_eq!(avatars.avatar(1).await.unwrap(), None);
    assert!(avatars
        .set_avatar(1, Some("avatars/001/1/avatar.jpg"))
        .await
        .unwrap());
    assert_eq!(
        avatars.avatar(1).await.unwrap().as_deref(),
        Some("avatars/001/1/avatar.jpg")
    );

    assert!(!avatars.set_avatar(99, Some("x.jpg")).await.unwrap());

    assert_eq!(
        avatars.all_avatars().await.unwrap(),
        vec![
            (1, "avatars/001/1/avatar.jpg".to_string()),
            (2, "avatars/2/old.jpg".to_string()),
        ]
    );

    assert!(avatars.set_avatar(2, None).await.unwrap());
    assert_eq!(avatars.avatar(2).await.unwrap(), None);
}
