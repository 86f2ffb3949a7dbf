pub mod check;
pub mod init_config;
pub mod markers;
pub mod run;
pub mod serve;
