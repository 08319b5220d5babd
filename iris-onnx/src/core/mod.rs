pub mod unified_error;
