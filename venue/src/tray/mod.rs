pub mod indicator;
pub mod status;
