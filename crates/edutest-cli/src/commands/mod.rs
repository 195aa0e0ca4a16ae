pub mod generate;
pub mod init;
pub mod preview;
pub mod take;
pub mod validate;
