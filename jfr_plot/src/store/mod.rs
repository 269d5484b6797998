pub mod store_definitions;
pub mod store_interop;
mod store_lowlevel;
pub mod store_types;
