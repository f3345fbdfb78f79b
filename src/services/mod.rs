pub mod archive;
pub mod photo_service;
pub mod storage;
