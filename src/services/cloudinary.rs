use reqwest::multipart;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::config::CloudinaryConfig;
use crate::errors::{AppError, Result};

/// Cloudinary storage class for an uploaded asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Image,
    Video,
    Raw,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Image => "image",
            ResourceType::Video => "video",
            ResourceType::Raw => "raw",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadedAsset {
    pub url: String,
    pub public_id: String,
    pub resource_type: ResourceType,
    pub bytes: usize,
}

#[derive(Clone)]
pub struct CloudinaryService {
    cloud_name: String,
    api_key: String,
    api_secret: String,
    client: reqwest::Client,
}

impl CloudinaryService {
    pub fn new(config: &CloudinaryConfig) -> Self {
        Self {
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            client: reqwest::Client::new(),
        }
    }

    /// Signed upload of raw bytes into `folder`.
    pub async fn upload(
        &self,
        data: Vec<u8>,
        file_name: &str,
        content_type: &str,
        resource_type: ResourceType,
        folder: &str,
        public_id: Option<&str>,
    ) -> Result<UploadedAsset> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let size = data.len();

        let mut params: Vec<(&str, String)> = vec![
            ("folder", folder.to_string()),
            ("timestamp", timestamp.clone()),
        ];
        if let Some(pid) = public_id {
            params.push(("public_id", pid.to_string()));
        }
        let signature = sign(&params, &self.api_secret);

        let upload_url = format!(
            "https://api.cloudinary.com/v1_1/{}/{}/upload",
            self.cloud_name,
            resource_type.as_str()
        );

        let mut form = multipart::Form::new()
            .text("api_key", self.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256")
            .part(
                "file",
                multipart::Part::bytes(data)
                    .file_name(file_name.to_string())
                    .mime_str(content_type)
                    .map_err(|e| AppError::cloudinary(e.to_string()))?,
            );
        for (key, value) in params {
            form = form.text(key, value);
        }

        let response = self
            .client
            .post(&upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::cloudinary(format!("Upload failed: {}", e)))?;

        let result: Value = response
            .json()
            .await
            .map_err(|e| AppError::cloudinary(format!("Failed to parse response: {}", e)))?;

        if let Some(error) = result.get("error") {
            let error_msg = error["message"]
                .as_str()
                .unwrap_or("Unknown Cloudinary error");
            return Err(AppError::cloudinary(error_msg.to_string()));
        }

        let url = result["secure_url"]
            .as_str()
            .ok_or_else(|| AppError::cloudinary("No secure URL in response"))?
            .to_string();

        let public_id = result["public_id"]
            .as_str()
            .ok_or_else(|| AppError::cloudinary("No public ID in response"))?
            .to_string();

        tracing::info!("☁️ Uploaded {} asset {}", resource_type.as_str(), public_id);

        Ok(UploadedAsset {
            url,
            public_id,
            resource_type,
            bytes: size,
        })
    }

    pub async fn delete(&self, public_id: &str, resource_type: ResourceType) -> Result<()> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let params = vec![
            ("public_id", public_id.to_string()),
            ("timestamp", timestamp.clone()),
        ];
        let signature = sign(&params, &self.api_secret);

        let delete_url = format!(
            "https://api.cloudinary.com/v1_1/{}/{}/destroy",
            self.cloud_name,
            resource_type.as_str()
        );

        let form = [
            ("public_id", public_id),
            ("api_key", self.api_key.as_str()),
            ("timestamp", timestamp.as_str()),
            ("signature", signature.as_str()),
            ("signature_algorithm", "sha256"),
        ];

        let result: Value = self
            .client
            .post(&delete_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::cloudinary(format!("Delete failed: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::cloudinary(format!("Failed to parse response: {}", e)))?;

        if result["result"] != "ok" {
            return Err(AppError::cloudinary(format!(
                "Failed to delete asset: {}",
                result["result"]
            )));
        }

        Ok(())
    }
}

/// Cloudinary request signature: sorted `key=value` pairs joined by `&`, secret appended.
fn sign(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    format!("{:x}", Sha256::digest(format!("{}{}", to_sign, api_secret)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_sorts_params() {
        let a = sign(
            &[("timestamp", "1".to_string()), ("folder", "courses".to_string())],
            "secret",
        );
        let b = sign(
            &[("folder", "courses".to_string()), ("timestamp", "1".to_string())],
            "secret",
        );
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, sign(&[("folder", "courses".to_string())], "secret"));
    }
}
