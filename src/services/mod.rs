pub mod assembler;
pub mod sync;

pub use self::assembler::EntryAssembler;
pub use self::sync::SyncService;
