//! PostgreSQL repository tests.
//!
//! These need a reachable server in `DATABASE_URL` and are ignored by
//! default: `cargo test -p filetree-database -- --ignored`.

use sqlx::PgPool;

use filetree_core::ErrorKind;
use filetree_core::types::id::OwnerId;
use filetree_core::types::pagination::PageRequest;
use filetree_database::{NodeRepository, PgNodeRepository};
use filetree_entity::node::nested_set::verify;
use filetree_entity::node::{NewNode, SiblingRule, SubtreePlan};

async fn assert_consistent(repo: &PgNodeRepository, owner_id: OwnerId) {
    let nodes = repo.all_nodes(owner_id).await.unwrap();
    assert_eq!(verify(&nodes), Ok(()));
}

#[ignore = "requires DATABASE_URL"]
#[sqlx::test(migrations = "../../migrations")]
async fn resolve_root_is_idempotent_under_race(pool: PgPool) {
    let repo = PgNodeRepository::new(pool);
    let owner_id = OwnerId::new();
    let (a, b) = tokio::join!(repo.resolve_root(owner_id), repo.resolve_root(owner_id));
    assert_eq!(a.unwrap().id, b.unwrap().id);
    assert_eq!(repo.count(owner_id).await.unwrap(), 1);
}

#[ignore = "requires DATABASE_URL"]
#[sqlx::test(migrations = "../../migrations")]
async fn insert_and_delete_keep_intervals_contiguous(pool: PgPool) {
    let repo = PgNodeRepository::new(pool);
    let owner_id = OwnerId::new();
    let root = repo.resolve_root(owner_id).await.unwrap();

    let docs = repo
        .insert_child(owner_id, root.id, NewNode::folder("Docs"))
        .await
        .unwrap();
    let taxes = repo
        .insert_child(owner_id, docs.id, NewNode::folder("Taxes"))
        .await
        .unwrap();
    repo.insert_child(
        owner_id,
        taxes.id,
        NewNode::file("2024.pdf", "files/x/1.pdf", "application/pdf", 9),
    )
    .await
    .unwrap();
    let music = repo
        .insert_child(owner_id, root.id, NewNode::folder("Music"))
        .await
        .unwrap();
    assert_consistent(&repo, owner_id).await;

    let ancestors = repo.ancestors(&taxes).await.unwrap();
    assert_eq!(
        ancestors.iter().map(|n| n.id).collect::<Vec<_>>(),
        vec![root.id, docs.id]
    );

    let removed = repo.delete_subtree(owner_id, docs.id).await.unwrap();
    assert_eq!(removed.len(), 3);
    let music = repo.find_by_id(owner_id, music.id).await.unwrap().unwrap();
    assert_eq!((music.lft, music.rgt), (2, 3));
    assert!(repo.find_by_path(owner_id, "docs/taxes").await.unwrap().is_none());
    assert_consistent(&repo, owner_id).await;
}

#[ignore = "requires DATABASE_URL"]
#[sqlx::test(migrations = "../../migrations")]
async fn insert_subtree_and_listing(pool: PgPool) {
    let repo = PgNodeRepository::new(pool);
    let owner_id = OwnerId::new();
    let root = repo.resolve_root(owner_id).await.unwrap();

    let mut builder = SubtreePlan::builder();
    let a = builder.push(None, NewNode::folder("a")).unwrap();
    let b = builder.push(Some(a), NewNode::folder("b")).unwrap();
    builder
        .push(Some(b), NewNode::file("x.txt", "files/x/2.txt", "text/plain", 5))
        .unwrap();
    builder
        .push(None, NewNode::file("a", "files/x/3", "text/plain", 1))
        .unwrap();
    let created = repo
        .insert_subtree(owner_id, root.id, &builder.build())
        .await
        .unwrap();

    assert_eq!(created[2].path, "a/b/x-txt");
    assert_eq!(created[3].path, "a-2");
    assert_consistent(&repo, owner_id).await;

    let page = repo
        .list_children(owner_id, root.id, &PageRequest::new(1, 20))
        .await
        .unwrap();
    assert_eq!(page.total_items, 2);
    assert!(page.items[0].is_folder);
}

#[ignore = "requires DATABASE_URL"]
#[sqlx::test(migrations = "../../migrations")]
async fn deleting_root_is_refused(pool: PgPool) {
    let repo = PgNodeRepository::new(pool);
    let owner_id = OwnerId::new();
    let root = repo.resolve_root(owner_id).await.unwrap();
    let err = repo.delete_subtree(owner_id, root.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);
}

#[ignore = "requires DATABASE_URL"]
#[sqlx::test(migrations = "../../migrations")]
async fn health_check_sees_the_migrated_schema(pool: PgPool) {
    let repo = PgNodeRepository::new(pool);
    assert!(repo.health_check().await.unwrap());
}

#[ignore = "requires DATABASE_URL"]
#[sqlx::test(migrations = "../../migrations")]
async fn racing_same_name_folders_admit_one(pool: PgPool) {
    let repo = PgNodeRepository::new(pool);
    let owner_id = OwnerId::new();
    let root = repo.resolve_root(owner_id).await.unwrap();
    let folder = || NewNode::folder("docs").with_sibling_rule(SiblingRule::UniqueFolder);

    let (a, b) = tokio::join!(
        repo.insert_child(owner_id, root.id, folder()),
        repo.insert_child(owner_id, root.id, folder())
    );
    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    let err = a.err().or(b.err()).unwrap();
    assert_eq!(err.kind, ErrorKind::InvalidInput);
    assert_eq!(repo.count(owner_id).await.unwrap(), 2);
    assert_consistent(&repo, owner_id).await;
}
