pub mod memory_system;
