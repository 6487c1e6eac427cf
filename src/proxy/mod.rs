//! Forwarding wrappers over the native driver and cursor surfaces.

mod driver_proxy;
mod result_proxy;

pub use driver_proxy::DriverProxy;
pub use result_proxy::ResultProxy;
