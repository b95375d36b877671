//! Online name-collision resolution
//!
//! When the remote store reports `ItemAlreadyExists` for an upload, a folder
//! creation or a move, the local item is renamed to a collision-free sibling
//! name (`stem (XXXXX).ext`) and the operation is retried exactly once. A
//! second collision is returned to the caller.

use std::future::Future;

use skyfold_core::domain::{collision_free_name, Item};
use skyfold_core::ports::RemoteError;

use crate::error::SyncError;
use crate::executors::ExecutorContext;

/// Renames an item to a collision-free name within its current parent
///
/// # Returns
/// The renamed item, or `None` if the generated name is taken locally too
pub async fn rename_after_collision(
    ctx: &ExecutorContext,
    item: &Item,
) -> Result<Option<Item>, SyncError> {
    let new_name = collision_free_name(&item.name, item.is_folder());
    let new_path = item.remote_path.with_file_name(&new_name)?;
    let renamed = ctx
        .metadata
        .move_item(item.id, item.parent_id, &new_name, &new_path)
        .await?;

    if let Some(ref renamed) = renamed {
        tracing::info!(
            item_id = %item.id,
            from = %item.remote_path,
            to = %renamed.remote_path,
            "Renamed item after remote name collision"
        );
    }
    Ok(renamed)
}

/// Runs `op` for `item`; on a remote name collision renames the item and runs
/// `op` once more with the renamed item
///
/// # Returns
/// The item the successful attempt ran with, and the attempt's output
pub async fn with_collision_retry<T, F, Fut>(
    ctx: &ExecutorContext,
    item: Item,
    mut op: F,
) -> Result<(Item, T), SyncError>
where
    F: FnMut(Item) -> Fut,
    Fut: Future<Output = Result<T, SyncError>>,
{
    match op(item.clone()).await {
        Err(SyncError::Remote(RemoteError::ItemAlreadyExists)) => {
            let Some(renamed) = rename_after_collision(ctx, &item).await? else {
                return Err(RemoteError::ItemAlreadyExists.into());
            };
            let output = op(renamed.clone()).await?;
            Ok((renamed, output))
        }
        other => other.map(|output| (item, output)),
    }
}
