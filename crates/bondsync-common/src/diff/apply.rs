use serde_json::Value;

use crate::protocol::error::{BondsyncError, Result};
use crate::protocol::patch::{display_path, PatchOp, PathSegment};

/// Applies `patches` to `target` in order.
///
/// Stops at the first operation whose path does not fit the document; the
/// operations before it stay applied.
pub fn apply(target: &mut Value, patches: &[PatchOp]) -> Result<()> {
    for op in patches {
        apply_one(target, op)?;
    }
    Ok(())
}

fn apply_one(target: &mut Value, op: &PatchOp) -> Result<()> {
    let Some((last, parent_path)) = op.path().split_last() else {
        return match op {
            PatchOp::Add { value, .. } | PatchOp::Replace { value, .. } => {
                *target = value.clone();
                Ok(())
            }
            PatchOp::Remove { .. } => Err(BondsyncError::Patch(
                "cannot remove the document root".to_string(),
            )),
        };
    };

    let parent = resolve_mut(target, parent_path)?;
    match (parent, last) {
        (Value::Object(map), PathSegment::Key(key)) => match op {
            PatchOp::Add { value, .. } => {
                map.insert(key.clone(), value.clone());
                Ok(())
            }
            PatchOp::Remove { .. } => map
                .shift_remove(key)
                .map(|_| ())
                .ok_or_else(|| missing(op.path())),
            PatchOp::Replace { value, .. } => {
                let slot = map.get_mut(key).ok_or_else(|| missing(op.path()))?;
                *slot = value.clone();
                Ok(())
            }
        },
        (Value::Array(items), PathSegment::Index(index)) => {
            let index = *index;
            match op {
                PatchOp::Add { value, .. } if index <= items.len() => {
                    items.insert(index, value.clone());
                    Ok(())
                }
                PatchOp::Remove { .. } if index < items.len() => {
                    items.remove(index);
                    Ok(())
                }
                PatchOp::Replace { value, .. } if index < items.len() => {
                    items[index] = value.clone();
                    Ok(())
                }
                _ => Err(BondsyncError::Patch(format!(
                    "index out of bounds at {}",
                    display_path(op.path())
                ))),
            }
        }
        _ => Err(BondsyncError::Patch(format!(
            "path {} does not match the document shape",
            display_path(op.path())
        ))),
    }
}

fn resolve_mut<'a>(mut current: &'a mut Value, path: &[PathSegment]) -> Result<&'a mut Value> {
    for (depth, segment) in path.iter().enumerate() {
        let next = match (current, segment) {
            (Value::Object(map), PathSegment::Key(key)) => map.get_mut(key),
            (Value::Array(items), PathSegment::Index(index)) => items.get_mut(*index),
            _ => None,
        };
        current = next.ok_or_else(|| missing(&path[..=depth]))?;
    }
    Ok(current)
}

fn missing(path: &[PathSegment]) -> BondsyncError {
    BondsyncError::Patch(format!("nothing at {}", display_path(path)))
}
