//! Instance identity bootstrap
//!
//! Resolved once at startup from the EC2 instance identity document. Failure
//! here is fatal: the agent cannot publish health without knowing which
//! instance it runs on.

use aws_config::imds;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// IMDS path of the instance identity document
pub const IDENTITY_DOCUMENT_PATH: &str = "/latest/dynamic/instance-identity/document";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Instance metadata request failed: {0}")]
    Imds(String),

    #[error("Malformed instance identity document: {0}")]
    Document(#[from] serde_json::Error),

    #[error("Instance identity document has empty {0}")]
    EmptyField(&'static str),
}

/// Which instance to report health for, and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceIdentity {
    pub instance_id: String,
    pub region: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityDocument {
    instance_id: String,
    region: String,
}

impl InstanceIdentity {
    /// Parse the JSON instance identity document
    pub fn from_document(document: &str) -> Result<Self, IdentityError> {
        let doc: IdentityDocument = serde_json::from_str(document)?;

        if doc.instance_id.is_empty() {
            return Err(IdentityError::EmptyField("instanceId"));
        }
        if doc.region.is_empty() {
            return Err(IdentityError::EmptyField("region"));
        }

        Ok(InstanceIdentity {
            instance_id: doc.instance_id,
            region: doc.region,
        })
    }
}

/// Fetch the identity document from IMDS (v2, token based)
pub async fn fetch_from_imds(timeout: Duration) -> Result<InstanceIdentity, IdentityError> {
    info!("Contacting EC2 metadata service");

    let client = imds::Client::builder()
        .connect_timeout(timeout)
        .read_timeout(timeout)
        .build();

    let document = client
        .get(IDENTITY_DOCUMENT_PATH)
        .await
        .map_err(|e| IdentityError::Imds(e.to_string()))?;

    InstanceIdentity::from_document(document.as_ref())
}

/// Resolve the identity, preferring explicit overrides
///
/// IMDS is only contacted when `instance_id` is not given. A `region` override
/// replaces the region from the document.
pub async fn resolve_identity(
    instance_id: Option<String>,
    region: Option<String>,
    timeout: Duration,
) -> Result<InstanceIdentity, IdentityError> {
    let identity = match (instance_id, region) {
        (Some(instance_id), Some(region)) => InstanceIdentity {
            instance_id,
            region,
        },
        (Some(instance_id), None) => InstanceIdentity {
            instance_id,
            region: fetch_from_imds(timeout).await?.region,
        },
        (None, region) => {
            let mut identity = fetch_from_imds(timeout).await?;
            if let Some(region) = region {
                identity.region = region;
            }
            identity
        }
    };

    info!(
        instance_id = %identity.instance_id,
        region = %identity.region,
        "Resolved instance identity"
    );
    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
  "accountId" : "123456789012",
  "architecture" : "x86_64",
  "availabilityZone" : "eu-west-1b",
  "imageId" : "ami-0abcdef1234567890",
  "instanceId" : "i-0123456789abcdef0",
  "instanceType" : "m5.large",
  "privateIp" : "10.0.0.12",
  "region" : "eu-west-1",
  "version" : "2017-09-30"
}"#;

    #[test]
    fn test_parse_identity_document() {
        let identity = InstanceIdentity::from_document(DOCUMENT).expect("parse document");

        assert_eq!(identity.instance_id, "i-0123456789abcdef0");
        assert_eq!(identity.region, "eu-west-1");
    }

    #[test]
    fn test_malformed_document_is_error() {
        let err = InstanceIdentity::from_document("<html>").unwrap_err();
        assert!(matches!(err, IdentityError::Document(_)));
    }

    #[test]
    fn test_empty_instance_id_is_error() {
        let err = InstanceIdentity::from_document(r#"{"instanceId": "", "region": "us-east-1"}"#)
            .unwrap_err();
        assert!(matches!(err, IdentityError::EmptyField("instanceId")));
    }

    #[tokio::test]
    async fn test_overrides_skip_imds() {
        let identity = resolve_identity(
            Some("i-override".to_string()),
            Some("us-west-2".to_string()),
            Duration::from_millis(1),
        )
        .await
        .expect("overrides resolve without IMDS");

        assert_eq!(
            identity,
            InstanceIdentity {
                instance_id: "i-override".to_string(),
                region: "us-west-2".to_string(),
            }
        );
    }
}
