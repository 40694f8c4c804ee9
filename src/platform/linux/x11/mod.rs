//! X11 injection backend: XTest extension.

mod injector;

pub use injector::LinuxX11Injector;
