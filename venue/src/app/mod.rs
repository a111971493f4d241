pub mod controller;
pub mod options;
pub mod render;
pub mod run;
pub mod state;
