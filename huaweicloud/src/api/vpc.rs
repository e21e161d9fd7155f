//! VPC service API: VPCs, subnets and elastic public IPs (v1)

use crate::api::common::ApiQueryParams;
use crate::api::{error::ApiError, Client};
use crate::config::Service;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub struct VpcApi<'a> {
    client: &'a Client,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Vpc {
    pub id: String,
    pub name: String,
    pub cidr: String,
    #[serde(default)]
    pub description: String,
    pub status: String,
    #[serde(default)]
    pub enterprise_project_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateVpcRequest {
    pub name: String,
    pub cidr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enterprise_project_id: Option<String>,
}

/// Only the fields that changed are serialized
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateVpcRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Subnet {
    pub id: String,
    pub name: String,
    pub cidr: String,
    pub gateway_ip: String,
    pub vpc_id: String,
    pub status: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub dhcp_enable: bool,
    #[serde(default)]
    pub primary_dns: Option<String>,
    #[serde(default)]
    pub secondary_dns: Option<String>,
    #[serde(default)]
    pub availability_zone: Option<String>,
    #[serde(default)]
    pub ipv6_enable: bool,
    #[serde(default)]
    pub cidr_v6: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateSubnetRequest {
    pub name: String,
    pub cidr: String,
    pub gateway_ip: String,
    pub vpc_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub dhcp_enable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_dns: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_dns: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    #[serde(flatten)]
    pub extension: Option<SubnetExtension>,
}

/// Optional feature sets layered onto a subnet create call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SubnetExtension {
    Ipv6 { ipv6_enable: bool },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateSubnetRequest {
    /// The API requires the name on every update
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhcp_enable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_dns: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_dns: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PublicIp {
    pub id: String,
    pub status: String,
    pub public_ip_address: String,
    #[serde(default)]
    pub port_id: Option<String>,
    #[serde(default)]
    pub private_ip_address: Option<String>,
}

#[derive(Serialize)]
struct PortBinding<'a> {
    /// `None` serializes as null, which unbinds
    port_id: Option<&'a str>,
}

/// HuaweiCloud wraps request bodies in a single key named after the object
fn wrap<'a, T>(key: &'static str, body: &'a T) -> BTreeMap<&'static str, &'a T> {
    BTreeMap::from([(key, body)])
}

#[derive(Deserialize)]
struct VpcEnvelope {
    vpc: Vpc,
}

#[derive(Deserialize)]
struct SubnetEnvelope {
    subnet: Subnet,
}

#[derive(Deserialize)]
struct PublicIpEnvelope {
    publicip: PublicIp,
}

#[derive(Deserialize)]
struct PublicIpList {
    #[serde(default)]
    publicips: Vec<PublicIp>,
}

impl<'a> VpcApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn url(&self, path: &str) -> String {
        self.client.url(Service::Vpc, path)
    }

    /// POST /v1/{project_id}/vpcs
    pub async fn create_vpc(&self, request: &CreateVpcRequest) -> Result<Vpc, ApiError> {
        let envelope: VpcEnvelope = self
            .client
            .post(&self.url("/vpcs"), &wrap("vpc", request))
            .await?;
        Ok(envelope.vpc)
    }

    /// GET /v1/{project_id}/vpcs/{vpc_id}
    pub async fn get_vpc(&self, id: &str) -> Result<Vpc, ApiError> {
        let envelope: VpcEnvelope = self.client.get(&self.url(&format!("/vpcs/{}", id))).await?;
        Ok(envelope.vpc)
    }

    /// PUT /v1/{project_id}/vpcs/{vpc_id}
    pub async fn update_vpc(&self, id: &str, request: &UpdateVpcRequest) -> Result<Vpc, ApiError> {
        let envelope: VpcEnvelope = self
            .client
            .put(&self.url(&format!("/vpcs/{}", id)), &wrap("vpc", request))
            .await?;
        Ok(envelope.vpc)
    }

    /// DELETE /v1/{project_id}/vpcs/{vpc_id}
    pub async fn delete_vpc(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&self.url(&format!("/vpcs/{}", id))).await
    }

    /// POST /v1/{project_id}/subnets
    pub async fn create_subnet(&self, request: &CreateSubnetRequest) -> Result<Subnet, ApiError> {
        let envelope: SubnetEnvelope = self
            .client
            .post(&self.url("/subnets"), &wrap("subnet", request))
            .await?;
        Ok(envelope.subnet)
    }

    /// GET /v1/{project_id}/subnets/{subnet_id}
    pub async fn get_subnet(&self, id: &str) -> Result<Subnet, ApiError> {
        let envelope: SubnetEnvelope = self
            .client
            .get(&self.url(&format!("/subnets/{}", id)))
            .await?;
        Ok(envelope.subnet)
    }

    /// PUT /v1/{project_id}/vpcs/{vpc_id}/subnets/{subnet_id}
    ///
    /// The response only echoes id and status, so nothing is returned.
    pub async fn update_subnet(
        &self,
        vpc_id: &str,
        id: &str,
        request: &UpdateSubnetRequest,
    ) -> Result<(), ApiError> {
        let _: serde_json::Value = self
            .client
            .put(
                &self.url(&format!("/vpcs/{}/subnets/{}", vpc_id, id)),
                &wrap("subnet", request),
            )
            .await?;
        Ok(())
    }

    /// DELETE /v1/{project_id}/vpcs/{vpc_id}/subnets/{subnet_id}
    pub async fn delete_subnet(&self, vpc_id: &str, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&self.url(&format!("/vpcs/{}/subnets/{}", vpc_id, id)))
            .await
    }

    /// GET /v1/{project_id}/publicips?public_ip_address=...
    pub async fn find_public_ip(&self, address: &str) -> Result<PublicIp, ApiError> {
        let params = ApiQueryParams::new().add("public_ip_address", address);
        let path = format!("/publicips{}", params.to_query_string());
        let list: PublicIpList = self.client.get(&self.url(&path)).await?;

        list.publicips
            .into_iter()
            .find(|ip| ip.public_ip_address == address)
            .ok_or_else(|| ApiError::NotFound {
                path: format!("/publicips?public_ip_address={}", address),
                details: None,
            })
    }

    /// GET /v1/{project_id}/publicips/{publicip_id}
    pub async fn get_public_ip(&self, id: &str) -> Result<PublicIp, ApiError> {
        let envelope: PublicIpEnvelope = self
            .client
            .get(&self.url(&format!("/publicips/{}", id)))
            .await?;
        Ok(envelope.publicip)
    }

    /// PUT /v1/{project_id}/publicips/{publicip_id} with a port to bind,
    /// or `None` to unbind
    pub async fn set_public_ip_port(
        &self,
        id: &str,
        port_id: Option<&str>,
    ) -> Result<PublicIp, ApiError> {
        let envelope: PublicIpEnvelope = self
            .client
            .put(
                &self.url(&format!("/publicips/{}", id)),
                &wrap("publicip", &PortBinding { port_id }),
            )
            .await?;
        Ok(envelope.publicip)
    }
}
