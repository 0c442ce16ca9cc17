pub mod health;
pub mod settings;
#[cfg(feature = "storage-local")]
pub mod storage;
pub mod uploads;
