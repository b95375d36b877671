//! Folder reconciliation and file refresh

mod common;

use common::{path, Harness};
use skyfold_core::domain::{ItemId, ItemStatus, PageToken};
use skyfold_core::ports::RemoteError;
use skyfold_sync::SyncError;

#[tokio::test]
async fn test_listing_populates_metadata() {
    let h = Harness::new().await;
    h.remote.add_folder("/docs");
    h.remote.add_file("/notes.txt", b"hi");

    let page = h.adapter.enumerate(ItemId::ROOT, None).await.unwrap();
    assert!(page.next_page.is_none());
    assert_eq!(page.items.len(), 2);

    let notes = h
        .ctx
        .metadata
        .get_by_path(&path("/notes.txt"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(notes.size, Some(2));
    assert_eq!(notes.parent_id, ItemId::ROOT);
    assert_eq!(notes.status, ItemStatus::Uploaded);
    assert!(!notes.is_placeholder);
    assert!(h.ctx.enumerations.get_enumeration(ItemId::ROOT).await.unwrap().is_none());
}

#[tokio::test]
async fn test_re_enumeration_keeps_identity() {
    let h = Harness::new().await;
    h.remote.add_file("/a.txt", b"one");
    let id = h.id_at("/a.txt").await;

    h.remote.add_file("/a.txt", b"three");
    h.adapter.enumerate_all(ItemId::ROOT).await.unwrap();

    let item = h.ctx.metadata.get(id).await.unwrap().unwrap();
    assert_eq!(item.size, Some(5));
    assert_eq!(h.ctx.metadata.list_children(ItemId::ROOT).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_sweep_runs_only_after_last_page() {
    let h = Harness::with_options(2, 2, 4).await;
    h.remote.add_folder("/f");
    for name in ["a", "b", "c", "d", "e", "z"] {
        h.remote.add_file(&format!("/f/{name}.txt"), name.as_bytes());
    }
    let folder = h.id_at("/f").await;
    assert_eq!(h.names(folder).await.len(), 6);
    let gone = h.id_at("/f/z.txt").await;
    h.remote.remove("/f/z.txt");

    let first = h.adapter.enumerate(folder, None).await.unwrap();
    let token = first.next_page.unwrap();
    assert!(h.ctx.metadata.get(gone).await.unwrap().is_some());

    let second = h.adapter.enumerate(folder, Some(token)).await.unwrap();
    let token = second.next_page.unwrap();
    assert!(h.ctx.metadata.get(gone).await.unwrap().is_some());

    let last = h.adapter.enumerate(folder, Some(token)).await.unwrap();
    assert!(last.next_page.is_none());
    assert!(h.ctx.metadata.get(gone).await.unwrap().is_none());
    assert_eq!(
        h.ctx.metadata.list_children(folder).await.unwrap().len(),
        5
    );
}

#[tokio::test]
async fn test_sweep_removes_vanished_subtree() {
    let h = Harness::new().await;
    h.remote.add_folder("/old");
    h.remote.add_file("/old/inner.txt", b"x");
    let folder = h.id_at("/old").await;
    let inner = h.id_at("/old/inner.txt").await;
    let local = h.adapter.materialize(inner).await.unwrap();

    h.remote.remove("/old");
    assert!(h.names(ItemId::ROOT).await.is_empty());

    assert!(h.ctx.metadata.get(folder).await.unwrap().is_none());
    assert!(h.ctx.metadata.get(inner).await.unwrap().is_none());
    assert!(h.ctx.cached_files.get(inner).await.unwrap().is_none());
    assert!(!local.exists());
}

#[tokio::test]
async fn test_rename_racing_enumeration_shows_new_location() {
    let h = Harness::new().await;
    h.remote.add_folder("/b");
    h.remote.add_file("/a.txt", b"abc");
    let folder = h.id_at("/b").await;
    let file = h.id_at("/a.txt").await;
    let gate = h.remote.hold("move");

    let scheduled = h.adapter.move_item(file, folder, None).await.unwrap();

    // The remote still lists /a.txt while the move is held.
    assert_eq!(h.names(ItemId::ROOT).await, vec!["b"]);
    assert_eq!(h.names(folder).await, vec!["a.txt"]);
    let at_old = h.ctx.metadata.get_by_path(&path("/a.txt")).await.unwrap();
    assert!(at_old.is_none());
    let item = h.ctx.metadata.get(file).await.unwrap().unwrap();
    assert_eq!(item.remote_path, path("/b/a.txt"));

    gate.open();
    let view = scheduled.completion.await.unwrap();
    assert_eq!(view.item.id, file);
    assert_eq!(view.item.status, ItemStatus::Uploaded);

    assert_eq!(h.names(folder).await, vec!["a.txt"]);
    assert_eq!(h.names(ItemId::ROOT).await, vec!["b"]);
    assert_eq!(h.ctx.metadata.list_children(folder).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_pending_deletion_hides_listed_entry() {
    let h = Harness::new().await;
    h.remote.add_file("/a.txt", b"abc");
    h.remote.add_file("/keep.txt", b"k");
    let file = h.id_at("/a.txt").await;
    let gate = h.remote.hold("delete");

    let completion = h.adapter.delete_item(file).await.unwrap().unwrap();
    assert_eq!(h.names(ItemId::ROOT).await, vec!["keep.txt"]);
    assert!(h.ctx.metadata.get(file).await.unwrap().is_some());

    gate.open();
    completion.await.unwrap();
    assert!(h.ctx.metadata.get(file).await.unwrap().is_none());
    assert_eq!(h.names(ItemId::ROOT).await, vec!["keep.txt"]);
}

#[tokio::test]
async fn test_pending_upload_survives_sweep() {
    let h = Harness::new().await;
    let gate = h.remote.hold("upload");
    let source = h.host_file("new.txt", b"fresh");

    let scheduled = h
        .adapter
        .import_document(&source, ItemId::ROOT, None)
        .await
        .unwrap();
    let id = scheduled.view.item.id;

    assert_eq!(h.names(ItemId::ROOT).await, vec!["new.txt"]);
    assert!(h.ctx.metadata.get(id).await.unwrap().is_some());

    gate.open();
    scheduled.completion.await.unwrap();
    assert_eq!(h.names(ItemId::ROOT).await, vec!["new.txt"]);
}

#[tokio::test]
async fn test_failed_upload_survives_sweep_with_its_folder() {
    let h = Harness::new().await;
    h.remote.add_folder("/d");
    let folder = h.id_at("/d").await;
    h.remote.add_file("/d/a.txt", b"remote");
    let file = h.id_at("/d/a.txt").await;

    let source = h.host_file("edit.txt", b"local edit");
    h.remote.fail_next("upload", RemoteError::NoInternetConnection);
    let view = h
        .adapter
        .write_document(file, &source)
        .await
        .unwrap()
        .completion
        .await
        .unwrap();
    assert_eq!(view.item.status, ItemStatus::UploadError);

    // The whole folder disappears remotely; local edits below it are kept.
    h.remote.remove("/d");
    h.adapter.enumerate_all(ItemId::ROOT).await.unwrap();
    assert!(h.ctx.metadata.get(folder).await.unwrap().is_some());
    assert!(h.ctx.metadata.get(file).await.unwrap().is_some());
    assert!(h.ctx.cached_files.get(file).await.unwrap().is_some());
}

#[tokio::test]
async fn test_file_refresh_preserves_upload_error() {
    let h = Harness::new().await;
    h.remote.add_file("/a.txt", b"remote");
    let file = h.id_at("/a.txt").await;
    let source = h.host_file("a.txt", b"local");
    h.remote.fail_next("upload", RemoteError::QuotaInsufficient);
    h.adapter
        .write_document(file, &source)
        .await
        .unwrap()
        .completion
        .await
        .unwrap();

    let page = h.adapter.enumerate(file, None).await.unwrap();
    assert_eq!(page.items.len(), 1);
    let view = &page.items[0];
    assert_eq!(view.item.status, ItemStatus::UploadError);
    assert_eq!(view.upload_error, Some(RemoteError::QuotaInsufficient));
    assert!(view.local_path.is_some());
    assert!(h.ctx.cached_files.get(file).await.unwrap().is_some());
}

#[tokio::test]
async fn test_file_refresh_skipped_while_move_pending() {
    let h = Harness::new().await;
    h.remote.add_file("/a.txt", b"abc");
    let file = h.id_at("/a.txt").await;
    h.remote.fail_next("move", RemoteError::NoInternetConnection);
    let moved = h
        .adapter
        .move_item(file, ItemId::ROOT, Some("b.txt"))
        .await
        .unwrap()
        .completion
        .await;
    assert!(moved.is_err());

    let before = h.remote.count_calls("metadata");
    let page = h.adapter.enumerate(file, None).await.unwrap();
    assert_eq!(page.items[0].item.remote_path, path("/b.txt"));
    assert_eq!(h.remote.count_calls("metadata"), before);
}

#[tokio::test]
async fn test_failed_enumeration_removes_record() {
    let h = Harness::new().await;
    h.remote.fail_next("listing", RemoteError::Unauthorized);

    let err = h.adapter.enumerate(ItemId::ROOT, None).await.unwrap_err();
    assert_eq!(err.remote(), Some(RemoteError::Unauthorized));
    assert!(h.ctx.enumerations.get_enumeration(ItemId::ROOT).await.unwrap().is_none());
}

#[tokio::test]
async fn test_failed_enumeration_mutates_nothing() {
    let h = Harness::new().await;
    h.remote.add_file("/a.txt", b"abc");
    let file = h.id_at("/a.txt").await;
    h.remote.remove("/a.txt");
    h.remote.fail_next("listing", RemoteError::NoInternetConnection);

    assert!(h.adapter.enumerate(ItemId::ROOT, None).await.is_err());
    let item = h.ctx.metadata.get(file).await.unwrap().unwrap();
    assert!(!item.is_maybe_outdated);
}

#[tokio::test]
async fn test_invalid_page_token_is_reported() {
    let h = Harness::new().await;
    let err = h
        .adapter
        .enumerate(ItemId::ROOT, Some(PageToken::new("not-a-number")))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Remote(RemoteError::PageTokenInvalid)));
}

#[tokio::test]
async fn test_enumerating_unknown_item_fails() {
    let h = Harness::new().await;
    let err = h.adapter.enumerate(ItemId::new(4242), None).await.unwrap_err();
    assert!(matches!(err, SyncError::MissingItem(id) if id == ItemId::new(4242)));
}
