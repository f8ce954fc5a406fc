pub mod program_store;
