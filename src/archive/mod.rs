mod cabin;
mod cursor;
mod entry;
mod index;
mod mapped;
mod reader;
mod stream;
mod trailer;

pub use cabin::Archive;
pub use cursor::AllocationCursor;
pub use entry::{validate_path, DirectoryEntry, ENTRY_FIXED_SIZE, MAX_PATH_LENGTH};
pub use index::ArchiveIndex;
pub use mapped::{MappedView, MappedViewMut};
pub use reader::DirectoryReader;
pub use stream::{EntryReader, EntryWriter};
pub use trailer::{Trailer, TRAILER_SIZE};
