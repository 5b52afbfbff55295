pub mod db_storage;
pub mod file_storage;
pub mod storage;
