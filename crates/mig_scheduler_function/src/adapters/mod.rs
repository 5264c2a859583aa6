pub mod compute;
pub mod gce;
