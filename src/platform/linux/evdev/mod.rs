//! evdev keyboard monitor.

mod hook;

pub use hook::LinuxEvdevHook;
