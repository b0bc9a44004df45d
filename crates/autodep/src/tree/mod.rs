//! Directory snapshots and the ordered patches between them.
//!
//! A listing is a sorted, de-duplicated sequence of [`FileEntry`] values.
//! [`Snapshot::diff`] turns two successive listings into a [`PatchOp`]
//! sequence that can be applied front to back: removals deepest-first, then
//! additions and changes shallowest-first.

mod entry;
mod listing;
mod patch;

pub use entry::{
    ChangeToken, EntryKind, FileEntry, compare_paths, normalize_entries, path_extension,
};
pub use listing::{ListOptions, TokenMode, list_tree};
pub use patch::{PatchOp, PendingPatch, Snapshot, compute_patch};
