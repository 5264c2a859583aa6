pub mod scale;
pub mod trigger;
