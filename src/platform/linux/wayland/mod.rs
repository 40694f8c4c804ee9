//! Wayland injection backend: xdg-desktop-portal RemoteDesktop.

mod injector;

pub use injector::LinuxWaylandInjector;
