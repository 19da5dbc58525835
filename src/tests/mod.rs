pub mod api_entries_router;
pub mod integration_entries_assembler;
