pub mod capture;
pub mod lifecycle;
pub mod live;
pub(crate) mod shared;
