pub mod app;
pub mod components;
pub mod headless;
pub mod status;
