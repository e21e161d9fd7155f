//! ECS service API (v2.1 compute)

use crate::api::{error::ApiError, Client};
use crate::config::Service;
use serde::Deserialize;

pub struct EcsApi<'a> {
    client: &'a Client,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InterfaceAttachment {
    pub port_id: String,
    #[serde(default)]
    pub net_id: String,
    #[serde(default)]
    pub port_state: String,
    #[serde(default)]
    pub fixed_ips: Vec<FixedIp>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FixedIp {
    pub ip_address: String,
    #[serde(default)]
    pub subnet_id: String,
}

impl InterfaceAttachment {
    pub fn has_address(&self, address: &str) -> bool {
        self.fixed_ips.iter().any(|ip| ip.ip_address == address)
    }

    /// First IPv4 address on the port, used when no fixed IP is requested
    pub fn first_ipv4(&self) -> Option<&str> {
        self.fixed_ips
            .iter()
            .map(|ip| ip.ip_address.as_str())
            .find(|ip| !ip.contains(':'))
    }
}

#[derive(Deserialize)]
struct InterfaceList {
    #[serde(rename = "interfaceAttachments", default)]
    interface_attachments: Vec<InterfaceAttachment>,
}

impl<'a> EcsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /v2.1/{project_id}/servers/{server_id}/os-interface
    pub async fn list_interfaces(
        &self,
        server_id: &str,
    ) -> Result<Vec<InterfaceAttachment>, ApiError> {
        let url = self
            .client
            .url(Service::Ecs, &format!("/servers/{}/os-interface", server_id));
        let list: InterfaceList = self.client.get(&url).await?;
        Ok(list.interface_attachments)
    }
}
