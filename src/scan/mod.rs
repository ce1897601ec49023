pub mod threshold;

pub use threshold::Scanizer;
