pub mod systemd;

pub use systemd::SystemdSupervisor;
