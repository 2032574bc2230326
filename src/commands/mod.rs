pub mod settings;
pub mod translate;
