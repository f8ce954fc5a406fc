pub mod driver;
pub mod execution_state;
