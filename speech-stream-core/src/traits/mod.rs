pub mod capture_device;
pub mod recognition;
pub mod uplink_delegate;
