pub mod adapter;
pub mod blob;
pub mod digest;
pub mod host;
pub mod local_blob;
pub mod naming;
pub mod sanitize;
