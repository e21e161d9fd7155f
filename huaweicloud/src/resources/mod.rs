pub(crate) mod common;
pub mod compute_eip_associate;
pub mod vpc;
pub mod vpc_subnet;

pub use compute_eip_associate::ComputeEipAssociateResource;
pub use vpc::VpcResource;
pub use vpc_subnet::VpcSubnetResource;
