mod app;

pub use app::Settings;
