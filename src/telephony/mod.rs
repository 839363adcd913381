// Telephony Module - Cellular call monitoring

pub mod monitor;

pub use monitor::{PermissionProbe, SharedPermission, StaticPermission, TelephonyCallMonitor};
