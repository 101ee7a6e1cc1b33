pub mod compare;
pub mod config;
pub mod discover;
pub mod images;
pub mod lock;
pub mod shares;
pub mod status;
pub mod transfer;
