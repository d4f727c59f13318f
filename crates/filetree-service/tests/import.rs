//! Tree import engine behaviour over the in-memory backends.

mod common;

use std::sync::Arc;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use filetree_core::ErrorKind;
use filetree_core::config::{AppConfig, ImportMode};
use filetree_core::traits::BlobStore;
use filetree_service::{CreateFolderRequest, FilePayload, ImportOptions, TreeDescription};

use common::{FlakyBlobStore, Harness, config_with_mode, text_file};

fn nested_tree() -> TreeDescription {
    TreeDescription::new().with_folder(
        "a",
        TreeDescription::new().with_folder(
            "b",
            TreeDescription::new().with_file(
                FilePayload::new("report.pdf", Bytes::from_static(b"%PDF-1.7"))
                    .with_mime("application/pdf"),
            ),
        ),
    )
}

#[tokio::test]
async fn imported_tree_round_trips_through_listing() {
    for mode in [ImportMode::Atomic, ImportMode::Incremental] {
        let (harness, blobs) = Harness::new();
        let report = harness
            .services
            .import
            .import_tree(&harness.ctx, None, nested_tree(), ImportOptions::new(mode))
            .await
            .unwrap();
        assert_eq!((report.folders, report.files, report.bytes), (2, 1, 8));

        let hierarchy = &harness.services.hierarchy;
        let a = hierarchy
            .list_folder(&harness.ctx, Some("a"), None, None)
            .await
            .unwrap();
        assert_eq!(a.items.items.len(), 1);
        assert_eq!(a.items.items[0].name, "b");
        assert!(a.items.items[0].is_folder);

        let b = hierarchy
            .list_folder(&harness.ctx, Some("a/b"), None, None)
            .await
            .unwrap();
        let file = &b.items.items[0];
        assert_eq!(file.name, "report.pdf");
        assert_eq!(file.mime.as_deref(), Some("application/pdf"));
        assert_eq!(file.size, Some(8));
        assert!(!file.is_folder);

        let node = hierarchy.get_node(&harness.ctx, file.id).await.unwrap();
        let storage_path = node.storage_path.unwrap();
        assert!(storage_path.starts_with(&format!("files/{}/", harness.ctx.owner_id)));
        assert_eq!(
            blobs.get(&storage_path).await.unwrap(),
            Bytes::from_static(b"%PDF-1.7")
        );
        harness.assert_consistent().await;
    }
}

#[tokio::test]
async fn siblings_are_created_in_description_order() {
    let (harness, _) = Harness::new();
    let tree = TreeDescription::new()
        .with_file(text_file("zeta.txt", "z"))
        .with_folder("alpha", TreeDescription::new())
        .with_file(text_file("beta.txt", "b"));
    let report = harness
        .services
        .import
        .import_tree(&harness.ctx, None, tree, ImportOptions::new(ImportMode::Incremental))
        .await
        .unwrap();
    let names: Vec<&str> = report.created.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["zeta.txt", "alpha", "beta.txt"]);

    let view = harness
        .services
        .hierarchy
        .folder_tree(&harness.ctx, None)
        .await
        .unwrap();
    let by_index: Vec<&str> = view.root.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(by_index, vec!["zeta.txt", "alpha", "beta.txt"]);
}

#[tokio::test]
async fn atomic_import_leaves_nothing_when_a_blob_put_fails() {
    let blobs = Arc::new(FlakyBlobStore::new().failing_put_after(2));
    let harness = Harness::with_blobs(blobs.clone(), AppConfig::default());
    let tree = TreeDescription::new().with_folder(
        "photos",
        TreeDescription::new()
            .with_file(text_file("1.jpg", "1"))
            .with_file(text_file("2.jpg", "2"))
            .with_file(text_file("3.jpg", "3")),
    );

    let err = harness
        .services
        .import
        .import_tree(&harness.ctx, None, tree, ImportOptions::new(ImportMode::Atomic))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Storage);
    assert!(err.is_retryable());
    assert_eq!(harness.count().await, 1);
    assert_eq!(blobs.stored(), 0);
}

#[tokio::test]
async fn incremental_import_keeps_committed_nodes_on_failure() {
    let blobs = Arc::new(FlakyBlobStore::new().failing_put_after(1));
    let harness = Harness::with_blobs(blobs.clone(), config_with_mode(ImportMode::Incremental));
    let tree = TreeDescription::new().with_folder(
        "photos",
        TreeDescription::new()
            .with_file(text_file("1.jpg", "1"))
            .with_file(text_file("2.jpg", "2")),
    );

    let options = harness.services.import.default_options();
    assert_eq!(options.mode, ImportMode::Incremental);
    let err = harness
        .services
        .import
        .import_tree(&harness.ctx, None, tree, options)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Storage);

    // Root, "photos", and "1.jpg" were committed before the failure.
    assert_eq!(harness.count().await, 3);
    assert_eq!(blobs.stored(), 1);
    harness.assert_consistent().await;
}

#[tokio::test]
async fn cancelled_atomic_import_commits_nothing() {
    let token = CancellationToken::new();
    let blobs = Arc::new(FlakyBlobStore::new().cancelling_on_put(1, token.clone()));
    let harness = Harness::with_blobs(blobs.clone(), AppConfig::default());
    let tree = TreeDescription::new()
        .with_file(text_file("a.txt", "a"))
        .with_file(text_file("b.txt", "b"));

    let err = harness
        .services
        .import
        .import_tree(
            &harness.ctx,
            None,
            tree,
            ImportOptions::new(ImportMode::Atomic).with_cancel(token),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cancelled);
    assert_eq!(harness.count().await, 1);
    assert_eq!(blobs.stored(), 0);
}

#[tokio::test]
async fn cancelled_incremental_import_keeps_what_was_inserted() {
    let token = CancellationToken::new();
    let blobs = Arc::new(FlakyBlobStore::new().cancelling_on_put(1, token.clone()));
    let harness = Harness::with_blobs(blobs.clone(), AppConfig::default());
    let tree = TreeDescription::new()
        .with_file(text_file("a.txt", "a"))
        .with_file(text_file("b.txt", "b"))
        .with_file(text_file("c.txt", "c"));

    let err = harness
        .services
        .import
        .import_tree(
            &harness.ctx,
            None,
            tree,
            ImportOptions::new(ImportMode::Incremental).with_cancel(token),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cancelled);
    // The first file was already being stored when the token fired.
    assert_eq!(harness.count().await, 2);
    assert_eq!(blobs.stored(), 1);
    harness.assert_consistent().await;
}

#[tokio::test]
async fn top_level_name_collisions_are_rejected() {
    let (harness, blobs) = Harness::new();
    harness
        .services
        .hierarchy
        .create_folder(&harness.ctx, CreateFolderRequest::new("a", None))
        .await
        .unwrap();

    let err = harness
        .services
        .import
        .import_tree(&harness.ctx, None, nested_tree(), ImportOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);
    assert_eq!(harness.count().await, 2);
    assert!(blobs.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_uploads_of_one_name_keep_a_single_file() {
    for mode in [ImportMode::Atomic, ImportMode::Incremental] {
        let (harness, blobs) = Harness::new();
        let import = Arc::clone(&harness.services.import);
        harness
            .services
            .hierarchy
            .get_or_create_root(&harness.ctx)
            .await
            .unwrap();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let import = Arc::clone(&import);
                let ctx = harness.ctx.clone();
                tokio::spawn(async move {
                    import
                        .save_files(&ctx, None, vec![text_file("report.txt", "q3")], ImportOptions::new(mode))
                        .await
                })
            })
            .collect();

        let mut saved = 0;
        for result in futures::future::join_all(handles).await {
            match result.unwrap() {
                Ok(_) => saved += 1,
                Err(e) => assert_eq!(e.kind, ErrorKind::InvalidInput),
            }
        }
        assert_eq!(saved, 1, "{mode:?}");
        assert_eq!(harness.count().await, 2);
        assert_eq!(blobs.len(), 1, "{mode:?}");
        harness.assert_consistent().await;
    }
}

#[tokio::test]
async fn empty_and_oversized_uploads_are_rejected() {
    let (harness, _) = Harness::new();
    let err = harness
        .services
        .import
        .import_tree(&harness.ctx, None, TreeDescription::new(), ImportOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);

    let mut config = AppConfig::default();
    config.storage.max_upload_size_bytes = 4;
    let small = Harness::with_blobs(Arc::new(FlakyBlobStore::new()), config);
    let err = small
        .services
        .import
        .save_files(
            &small.ctx,
            None,
            vec![text_file("big.txt", "12345")],
            ImportOptions::default(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);
}

#[tokio::test]
async fn import_target_must_be_an_existing_folder() {
    let (harness, _) = Harness::new();
    harness
        .services
        .import
        .save_files(
            &harness.ctx,
            None,
            vec![text_file("notes.txt", "n")],
            ImportOptions::default(),
        )
        .await
        .unwrap();

    let err = harness
        .services
        .import
        .import_tree(&harness.ctx, Some("notes-txt"), nested_tree(), ImportOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);

    let err = harness
        .services
        .import
        .import_tree(&harness.ctx, Some("missing"), nested_tree(), ImportOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn save_files_into_nested_folder() {
    let (harness, _) = Harness::new();
    harness
        .services
        .hierarchy
        .create_folder(&harness.ctx, CreateFolderRequest::new("inbox", None))
        .await
        .unwrap();

    let report = harness
        .services
        .import
        .save_files(
            &harness.ctx,
            Some("inbox"),
            vec![text_file("a.txt", "a"), text_file("b.png", "b")],
            ImportOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(report.files, 2);
    assert_eq!(report.parent.path, "inbox");
    assert_eq!(report.created[1].mime.as_deref(), Some("image/png"));
    assert_eq!(report.created[1].path, "inbox/b-png");
}

#[tokio::test]
async fn relative_paths_import_as_nested_folders() {
    let (harness, blobs) = Harness::new();
    let tree = TreeDescription::from_relative_paths([
        ("site/css/main.css".to_string(), text_file("main.css", "body{}")),
        ("site/index.html".to_string(), text_file("index.html", "<html>")),
        ("site/css/print.css".to_string(), text_file("print.css", "")),
    ])
    .unwrap();

    let report = harness
        .services
        .import
        .import_tree(&harness.ctx, None, tree, ImportOptions::default())
        .await
        .unwrap();
    assert_eq!((report.folders, report.files), (2, 3));
    assert_eq!(blobs.len(), 3);

    let css = harness
        .services
        .hierarchy
        .list_folder(&harness.ctx, Some("site/css"), None, None)
        .await
        .unwrap();
    let names: Vec<&str> = css.items.items.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["print.css", "main.css"]);
    let chain: Vec<&str> = css.ancestors.iter().map(|n| n.path.as_str()).collect();
    assert_eq!(chain, vec!["", "site", "site/css"]);
    harness.assert_consistent().await;
}
