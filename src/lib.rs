pub mod activation;
pub mod app;
pub mod capture;
pub mod config;
pub mod history;
pub mod hotkey;
pub mod input;
pub mod magnifier;
pub mod overlay;
pub mod raster;
pub mod screenshot;
pub mod selection;
pub mod selection_logic;
pub mod session;
pub mod signals;
pub mod window;
