pub mod dex;
pub mod models;
pub mod view;
