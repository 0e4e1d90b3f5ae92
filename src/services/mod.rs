pub mod rebuild_monitor;
