//! Work directories: finding them, counting what they hold, and moving
//! legacy-named ones to their canonical names.

mod completion;
mod index;
mod migrate;
mod resolver;

pub use completion::{
    count_dead_links, count_finished_files, file_exists_and_nonempty, is_countable_name,
    record_dead_link, Completion,
};
pub use index::FolderIndex;
pub use migrate::{migrate_dir, MigrationOutcome};
pub use resolver::{ResolvedState, WorkDir, WorkDirResolver};
