//! Resource program - the static S3 website handed to the engine
//!
//! Expressed as a Pulumi YAML project so the engine can run it without a
//! language host: a website bucket, an `index.html` object and a public-read
//! bucket policy. The bucket's website endpoint is exported as `websiteUrl`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::DeployError;

/// Stack output holding the site URL
pub const WEBSITE_URL_OUTPUT: &str = "websiteUrl";

const BUCKET: &str = "s3-website-bucket";

const INDEX_CONTENT: &str = r#"<html><head>
	<title>Hello S3</title><meta charset="UTF-8">
</head>
<body><p>Hello, world!</p><p>Made with ❤️ with <a href="https://pulumi.com">Pulumi</a></p>
</body></html>
"#;

/// `Pulumi.yaml` document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub name: String,
    pub runtime: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub resources: BTreeMap<String, ResourceSpec>,
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: serde_yaml::Value,
}

/// An engine program, opaque to everything but the engine
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    project: ProjectFile,
}

impl Program {
    /// The static website program
    pub fn s3_website(project_name: &str) -> Result<Self, DeployError> {
        let bucket_id = format!("${{{}.id}}", BUCKET);
        let mut resources = BTreeMap::new();

        resources.insert(
            BUCKET.to_string(),
            ResourceSpec {
                kind: "aws:s3:Bucket".to_string(),
                properties: serde_yaml::to_value(json!({
                    "website": { "indexDocument": "index.html" }
                }))?,
            },
        );
        resources.insert(
            "index".to_string(),
            ResourceSpec {
                kind: "aws:s3:BucketObject".to_string(),
                properties: serde_yaml::to_value(json!({
                    "bucket": bucket_id,
                    "content": INDEX_CONTENT,
                    "key": "index.html",
                    "contentType": "text/html; charset=utf-8",
                }))?,
            },
        );
        resources.insert(
            "bucketPolicy".to_string(),
            ResourceSpec {
                kind: "aws:s3:BucketPolicy".to_string(),
                properties: serde_yaml::to_value(json!({
                    "bucket": bucket_id,
                    "policy": {
                        "fn::toJSON": {
                            "Version": "2012-10-17",
                            "Statement": [{
                                "Effect": "Allow",
                                "Principal": "*",
                                "Action": ["s3:GetObject"],
                                "Resource": [format!("arn:aws:s3:::{}/*", bucket_id)],
                            }],
                        }
                    },
                }))?,
            },
        );

        let mut outputs = BTreeMap::new();
        outputs.insert(
            WEBSITE_URL_OUTPUT.to_string(),
            format!("${{{}.websiteEndpoint}}", BUCKET),
        );

        Ok(Self {
            project: ProjectFile {
                name: project_name.to_string(),
                runtime: "yaml".to_string(),
                description: Some("Static website hosted on S3".to_string()),
                resources,
                outputs,
            },
        })
    }

    pub fn project_name(&self) -> &str {
        &self.project.name
    }

    pub fn project(&self) -> &ProjectFile {
        &self.project
    }

    /// Render as `Pulumi.yaml` text
    pub fn to_yaml(&self) -> Result<String, DeployError> {
        Ok(serde_yaml::to_string(&self.project)?)
    }
}
