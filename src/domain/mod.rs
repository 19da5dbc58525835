pub mod entry;

pub use self::entry::{Entry, EntryDraft};
