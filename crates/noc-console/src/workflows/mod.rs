pub mod console;
pub mod noc;
pub mod notice;
pub mod registry;
