//! Rename detection by content equality.
//!
//! An orphan (server-known file absent locally) whose `version_id` equals a
//! local unit's `version_id` under a different `file_id` is a move. Reporting
//! it lets the server carry existing translations over to the new path.

use std::collections::HashMap;

use locsync_core::types::{ContentUnit, FileMove, OrphanedFile, VersionId};

/// Match local units against orphans.
///
/// Each orphan is consumed at most once; when several local units share the
/// same content, the first one in `local_units` order takes the orphan. Of
/// several orphans sharing a version, only the first is a candidate.
pub fn detect_moves<'a>(
    local_units: impl IntoIterator<Item = &'a ContentUnit>,
    orphaned_files: &[OrphanedFile],
) -> Vec<FileMove> {
    let mut by_version: HashMap<&VersionId, &OrphanedFile> = HashMap::new();
    for orphan in orphaned_files {
        by_version.entry(&orphan.version_id).or_insert(orphan);
    }

    let mut moves = Vec::new();
    for unit in local_units {
        let Some(orphan) = by_version.get(&unit.version_id).copied() else {
            continue;
        };
        if orphan.file_id == unit.file_id {
            continue;
        }
        tracing::debug!(from = %orphan.file_name, to = %unit.file_name, "detected file move");
        moves.push(FileMove {
            old_file_id: orphan.file_id.clone(),
            new_file_id: unit.file_id.clone(),
            new_file_name: unit.file_name.clone(),
        });
        by_version.remove(&unit.version_id);
    }
    moves
}
