//! Structural diff between two JSON-like trees
//!
//! [`diff`] turns two values into an ordered list of [`PatchOp`]s that
//! [`apply`] replays to rebuild the second value from the first. The differ
//! knows nothing about documents; it only sees maps, arrays and scalars.
//!
//! # Ordering
//!
//! Output order is a pre-order walk and depends only on the two inputs:
//!
//! - **Maps**: keys of `before` in their stored order (recurse if the key is
//!   still present, otherwise `remove`), then keys only in `after` in their
//!   stored order (`add`)
//! - **Arrays**: positions shared by both are diffed pairwise, then extra
//!   positions of `after` are added front to back, then extra positions of
//!   `before` are removed back to front
//! - **Anything else**: a single `replace` when the values differ
//!
//! Removing array tails from the back keeps every emitted index valid while
//! the patch is applied in order.

mod apply;


pub use apply::apply;

use serde_json::Value;

use crate::protocol::patch::{PatchOp, PathSegment};

/// Computes the patch that turns `before` into `after`.
///
/// Identical inputs produce an empty patch.
pub fn diff(before: &Value, after: &Value) -> Vec<PatchOp> {
    let mut patches = Vec::new();
    let mut path = Vec::new();
    diff_into(before, after, &mut path, &mut patches);
    patches
}

fn diff_into(
    before: &Value,
    after: &Value,
    path: &mut Vec<PathSegment>,
    patches: &mut Vec<PatchOp>,
) {
    match (before, after) {
        (Value::Object(old), Value::Object(new)) => {
            for (key, old_value) in old {
                path.push(PathSegment::Key(key.clone()));
                match new.get(key) {
                    Some(new_value) => diff_into(old_value, new_value, path, patches),
                    None => patches.push(PatchOp::Remove { path: path.clone() }),
                }
                path.pop();
            }
            for (key, new_value) in new {
                if !old.contains_key(key) {
                    patches.push(PatchOp::Add {
                        path: child_path(path, PathSegment::Key(key.clone())),
                        value: new_value.clone(),
                    });
                }
            }
        }
        (Value::Array(old), Value::Array(new)) => {
            let shared = old.len().min(new.len());
            for index in 0..shared {
                path.push(PathSegment::Index(index));
                diff_into(&old[index], &new[index], path, patches);
                path.pop();
            }
            for (index, new_value) in new.iter().enumerate().skip(shared) {
                patches.push(PatchOp::Add {
                    path: child_path(path, PathSegment::Index(index)),
                    value: new_value.clone(),
                });
            }
            for index in (shared..old.len()).rev() {
                patches.push(PatchOp::Remove {
                    path: child_path(path, PathSegment::Index(index)),
                });
            }
        }
        _ if before == after => {}
        _ => patches.push(PatchOp::Replace {
            path: path.clone(),
            value: after.clone(),
        }),
    }
}

fn child_path(parent: &[PathSegment], segment: PathSegment) -> Vec<PathSegment> {
    let mut path = Vec::with_capacity(parent.len() + 1);
    path.extend_from_slice(parent);
    path.push(segment);
    path
}
