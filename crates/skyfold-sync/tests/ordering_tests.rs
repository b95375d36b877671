//! Concurrent host operations on the same item

mod common;

use common::{eventually, path, Harness};
use skyfold_core::domain::{ItemId, ItemStatus};

fn transfer_calls(h: &Harness) -> Vec<String> {
    h.remote
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("upload") || c.starts_with("move"))
        .collect()
}

// ============================================================================
// Enumeration
// ============================================================================

#[tokio::test]
async fn test_concurrent_listings_of_one_folder_both_succeed() {
    let h = Harness::new().await;
    h.remote.add_folder("/docs");
    h.remote.add_file("/a.txt", b"a");

    let (first, second) = tokio::join!(
        h.adapter.enumerate(ItemId::ROOT, None),
        h.adapter.enumerate(ItemId::ROOT, None)
    );
    assert_eq!(first.unwrap().items.len(), 2);
    assert_eq!(second.unwrap().items.len(), 2);
    assert_eq!(h.ctx.metadata.list_children(ItemId::ROOT).await.unwrap().len(), 2);
    assert!(h.ctx.enumerations.get_enumeration(ItemId::ROOT).await.unwrap().is_none());
}

#[tokio::test]
async fn test_path_lookup_racing_listing() {
    let h = Harness::new().await;
    h.remote.add_folder("/docs");
    h.remote.add_file("/docs/x.txt", b"x");

    let x_path = path("/docs/x.txt");
    let (listed, resolved) = tokio::join!(
        h.adapter.enumerate_all(ItemId::ROOT),
        h.adapter.item_id_for_path(&x_path)
    );
    assert_eq!(listed.unwrap().len(), 1);
    let id = resolved.unwrap().unwrap();
    let item = h.ctx.metadata.get(id).await.unwrap().unwrap();
    assert_eq!(item.remote_path, path("/docs/x.txt"));
}

#[tokio::test]
async fn test_concurrent_materialize_of_stale_copy() {
    let h = Harness::new().await;
    h.remote.add_file("/a.txt", b"first");
    let file = h.id_at("/a.txt").await;
    h.adapter.materialize(file).await.unwrap();
    h.remote.add_file("/a.txt", b"second");

    let (a, b) = tokio::join!(h.adapter.materialize(file), h.adapter.materialize(file));
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a, b);
    assert_eq!(std::fs::read(&a).unwrap(), b"second");
    assert!(h.ctx.enumerations.get_enumeration(file).await.unwrap().is_none());
}

// ============================================================================
// Writes and moves
// ============================================================================

#[tokio::test]
async fn test_writes_to_one_file_upload_in_submission_order() {
    let h = Harness::new().await;
    h.remote.add_file("/a.txt", b"v0");
    let file = h.id_at("/a.txt").await;
    let gate = h.remote.hold("upload");

    let first = h
        .adapter
        .write_document(file, &h.host_file("v1.txt", b"v1"))
        .await
        .unwrap();
    eventually(|| h.remote.count_calls("upload") == 1).await;
    let second = h
        .adapter
        .write_document(file, &h.host_file("v2.txt", b"v2"))
        .await
        .unwrap();

    gate.open();
    first.completion.await.unwrap();
    let view = second.completion.await.unwrap();
    assert_eq!(view.item.status, ItemStatus::Uploaded);
    assert_eq!(h.remote.contents("/a.txt").as_deref(), Some(&b"v2"[..]));
    assert!(h.ctx.uploads.get_upload(file).await.unwrap().is_none());
}

#[tokio::test]
async fn test_write_queued_before_move_uploads_to_old_location() {
    let h = Harness::with_options(100, 1, 4).await;
    h.remote.add_folder("/b");
    h.remote.add_file("/a.txt", b"old");
    let folder = h.id_at("/b").await;
    let file = h.id_at("/a.txt").await;

    // Fill the single upload slot so the write waits in the queue.
    let gate = h.remote.hold("upload");
    let blocker = h
        .adapter
        .import_document(&h.host_file("other.txt", b"x"), ItemId::ROOT, None)
        .await
        .unwrap();
    eventually(|| h.remote.count_calls("upload") == 1).await;

    let written = h
        .adapter
        .write_document(file, &h.host_file("a.txt", b"new bytes"))
        .await
        .unwrap();
    let moved = h.adapter.move_item(file, folder, None).await.unwrap();
    assert_eq!(moved.view.item.remote_path, path("/b/a.txt"));

    gate.open();
    blocker.completion.await.unwrap();
    written.completion.await.unwrap();
    let view = moved.completion.await.unwrap();

    assert_eq!(
        transfer_calls(&h),
        vec!["upload /other.txt", "upload /a.txt", "move /a.txt"]
    );
    assert_eq!(view.item.remote_path, path("/b/a.txt"));
    assert_eq!(view.item.status, ItemStatus::Uploaded);
    assert_eq!(h.remote.contents("/b/a.txt").as_deref(), Some(&b"new bytes"[..]));
    assert!(!h.remote.exists("/a.txt"));
    assert!(h.ctx.reparents.get_reparent(file).await.unwrap().is_none());
    assert!(h.ctx.uploads.get_upload(file).await.unwrap().is_none());
}

#[tokio::test]
async fn test_write_inside_folder_being_renamed() {
    let h = Harness::with_options(100, 1, 4).await;
    h.remote.add_folder("/d");
    h.remote.add_file("/d/a.txt", b"old");
    let folder = h.id_at("/d").await;
    let file = h.id_at("/d/a.txt").await;

    let gate = h.remote.hold("upload");
    let blocker = h
        .adapter
        .import_document(&h.host_file("other.txt", b"x"), ItemId::ROOT, None)
        .await
        .unwrap();
    eventually(|| h.remote.count_calls("upload") == 1).await;

    let written = h
        .adapter
        .write_document(file, &h.host_file("a.txt", b"edited"))
        .await
        .unwrap();
    let renamed = h
        .adapter
        .move_item(folder, ItemId::ROOT, Some("e"))
        .await
        .unwrap();

    gate.open();
    blocker.completion.await.unwrap();
    written.completion.await.unwrap();
    renamed.completion.await.unwrap();

    assert_eq!(
        transfer_calls(&h),
        vec!["upload /other.txt", "upload /d/a.txt", "move /d"]
    );
    assert_eq!(h.remote.contents("/e/a.txt").as_deref(), Some(&b"edited"[..]));
    assert!(!h.remote.exists("/d"));
    let item = h.ctx.metadata.get(file).await.unwrap().unwrap();
    assert_eq!(item.remote_path, path("/e/a.txt"));
    assert_eq!(item.status, ItemStatus::Uploaded);
}
