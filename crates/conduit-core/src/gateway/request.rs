//! Operation requests
//!
//! One type per gateway operation. Every request can name a `provider` to
//! override configuration for that call. Required string fields default to
//! empty when deserialized so that a missing field surfaces as a
//! [`Error::Validation`] from [`OperationRequest::validate`] rather than as
//! a parse error.

use crate::error::{Error, Result};
use crate::traits::{Address, EmailMessage, Signer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Default result limit for search queries
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Behavior shared by every request type
pub trait OperationRequest: Serialize {
    /// Provider named by the caller for this call only
    fn provider_override(&self) -> Option<&str>;

    /// Check required fields before any provider is involved
    fn validate(&self) -> Result<()>;

    /// Request fields as recorded in the audit log, before masking
    fn audit_fields(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => {
                map.remove("provider");
                map
            }
            _ => Map::new(),
        }
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("'{}' is required", field)));
    }
    Ok(())
}

fn require_path(field: &str, value: &std::path::Path) -> Result<()> {
    if value.as_os_str().is_empty() {
        return Err(Error::validation(format!("'{}' is required", field)));
    }
    Ok(())
}

macro_rules! provider_override {
    () => {
        fn provider_override(&self) -> Option<&str> {
            self.provider.as_deref().filter(|p| !p.trim().is_empty())
        }
    };
}

/// Send an email
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailRequest {
    /// Provider override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Recipient address
    #[serde(default)]
    pub to: String,
    /// Subject line
    #[serde(default)]
    pub subject: String,
    /// Body
    #[serde(default)]
    pub content: String,
    /// Sender address
    #[serde(default, alias = "from_email", skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Carbon-copy recipients
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<String>,
    /// Blind carbon-copy recipients
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bcc: Vec<String>,
    /// Local files to attach
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<PathBuf>,
}

impl EmailRequest {
    /// Create a request with the required fields
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// Pin the call to one provider
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// The message handed to the provider
    pub fn message(&self) -> EmailMessage {
        EmailMessage {
            to: self.to.clone(),
            subject: self.subject.clone(),
            content: self.content.clone(),
            from: self.from.clone(),
            cc: self.cc.clone(),
            bcc: self.bcc.clone(),
            attachments: self.attachments.clone(),
        }
    }
}

impl OperationRequest for EmailRequest {
    provider_override!();

    fn validate(&self) -> Result<()> {
        require("to", &self.to)?;
        require("subject", &self.subject)?;
        require("content", &self.content)
    }
}

/// Look up an email's delivery status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailStatusRequest {
    /// Provider override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Message identifier returned by `send_email`
    #[serde(default)]
    pub message_id: String,
}

impl OperationRequest for EmailStatusRequest {
    provider_override!();

    fn validate(&self) -> Result<()> {
        require("message_id", &self.message_id)
    }
}

/// Upload a local file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadRequest {
    /// Provider override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Local file to upload
    #[serde(default, alias = "file_path")]
    pub file: PathBuf,
    /// Target bucket
    #[serde(default)]
    pub bucket: String,
    /// Object name, defaults to the file name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_name: Option<String>,
}

impl UploadRequest {
    /// The object name that will be used
    pub fn effective_object_name(&self) -> String {
        self.object_name.clone().unwrap_or_else(|| {
            self.file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
    }
}

impl OperationRequest for UploadRequest {
    provider_override!();

    fn validate(&self) -> Result<()> {
        require_path("file", &self.file)?;
        require("bucket", &self.bucket)?;
        if self.effective_object_name().is_empty() {
            return Err(Error::validation("'object_name' is required when 'file' has no file name"));
        }
        Ok(())
    }
}

/// Download an object to a local path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// Provider override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Object to fetch
    #[serde(default)]
    pub object_name: String,
    /// Source bucket
    #[serde(default)]
    pub bucket: String,
    /// Local destination path
    #[serde(default)]
    pub destination: PathBuf,
}

impl OperationRequest for DownloadRequest {
    provider_override!();

    fn validate(&self) -> Result<()> {
        require("object_name", &self.object_name)?;
        require("bucket", &self.bucket)?;
        require_path("destination", &self.destination)
    }
}

/// Delete an object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteRequest {
    /// Provider override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Object to delete
    #[serde(default)]
    pub object_name: String,
    /// Bucket holding it
    #[serde(default)]
    pub bucket: String,
}

impl OperationRequest for DeleteRequest {
    provider_override!();

    fn validate(&self) -> Result<()> {
        require("object_name", &self.object_name)?;
        require("bucket", &self.bucket)
    }
}

/// List objects in a bucket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListRequest {
    /// Provider override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Bucket to list
    #[serde(default)]
    pub bucket: String,
    /// Only names starting with this prefix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

impl OperationRequest for ListRequest {
    provider_override!();

    fn validate(&self) -> Result<()> {
        require("bucket", &self.bucket)
    }
}

/// Create an e-signature envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeRequest {
    /// Provider override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Document to sign
    #[serde(default, alias = "document_path")]
    pub document: PathBuf,
    /// People who must sign
    #[serde(default)]
    pub signers: Vec<Signer>,
    /// Envelope subject
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl OperationRequest for EnvelopeRequest {
    provider_override!();

    fn validate(&self) -> Result<()> {
        require_path("document", &self.document)?;
        if self.signers.is_empty() {
            return Err(Error::validation("at least one signer is required"));
        }
        for (i, signer) in self.signers.iter().enumerate() {
            require(&format!("signers[{}].email", i), &signer.email)?;
            require(&format!("signers[{}].name", i), &signer.name)?;
        }
        Ok(())
    }
}

/// Look up an envelope's status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeStatusRequest {
    /// Provider override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Envelope identifier
    #[serde(default)]
    pub envelope_id: String,
}

impl OperationRequest for EnvelopeStatusRequest {
    provider_override!();

    fn validate(&self) -> Result<()> {
        require("envelope_id", &self.envelope_id)
    }
}

/// Void an envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoidEnvelopeRequest {
    /// Provider override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Envelope identifier
    #[serde(default)]
    pub envelope_id: String,
    /// Reason shown to signers
    #[serde(default)]
    pub reason: String,
}

impl OperationRequest for VoidEnvelopeRequest {
    provider_override!();

    fn validate(&self) -> Result<()> {
        require("envelope_id", &self.envelope_id)?;
        require("reason", &self.reason)
    }
}

/// Run a search query
///
/// An empty `query` matches every document in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Provider override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Query text
    #[serde(default)]
    pub query: String,
    /// Index to search
    #[serde(default)]
    pub index: String,
    /// Exact-match field filters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Map<String, Value>>,
    /// Maximum number of results
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            provider: None,
            query: String::new(),
            index: String::new(),
            filters: None,
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl SearchRequest {
    /// Create a query against `index`
    pub fn new(query: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            index: index.into(),
            ..Self::default()
        }
    }
}

impl OperationRequest for SearchRequest {
    provider_override!();

    fn validate(&self) -> Result<()> {
        require("index", &self.index)?;
        if self.limit == 0 {
            return Err(Error::validation("'limit' must be greater than zero"));
        }
        Ok(())
    }
}

/// Index a document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexRequest {
    /// Provider override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Document identifier
    #[serde(default, alias = "doc_id")]
    pub id: String,
    /// Document body
    #[serde(default)]
    pub document: Value,
    /// Target index
    #[serde(default)]
    pub index: String,
}

impl OperationRequest for IndexRequest {
    provider_override!();

    fn validate(&self) -> Result<()> {
        require("id", &self.id)?;
        require("index", &self.index)?;
        if !self.document.is_object() {
            return Err(Error::validation("'document' must be a mapping"));
        }
        Ok(())
    }
}

/// Send a printed letter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LetterRequest {
    /// Provider override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Recipient
    #[serde(default)]
    pub to_address: Address,
    /// Sender
    #[serde(default)]
    pub from_address: Address,
    /// Letter body (HTML or a template reference)
    #[serde(default)]
    pub content: String,
    /// Print in color
    #[serde(default)]
    pub color: bool,
}

impl OperationRequest for LetterRequest {
    provider_override!();

    fn validate(&self) -> Result<()> {
        for (field, address) in [("to_address", &self.to_address), ("from_address", &self.from_address)] {
            require(&format!("{}.name", field), &address.name)?;
            require(&format!("{}.address_line1", field), &address.address_line1)?;
        }
        require("content", &self.content)
    }
}

/// Look up a letter's status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LetterStatusRequest {
    /// Provider override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Letter identifier
    #[serde(default)]
    pub letter_id: String,
}

impl OperationRequest for LetterStatusRequest {
    provider_override!();

    fn validate(&self) -> Result<()> {
        require("letter_id", &self.letter_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_email_validation() {
        assert!(EmailRequest::new("user@test.com", "Hi", "Hello").validate().is_ok());

        let missing: EmailRequest = serde_json::from_value(json!({"to": "user@test.com"})).unwrap();
        let err = missing.validate().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("subject"));
    }

    #[test]
    fn test_audit_fields_drop_provider() {
        let request = EmailRequest::new("a@b.c", "s", "c").with_provider("dummy");
        let fields = request.audit_fields();
        assert!(!fields.contains_key("provider"));
        assert_eq!(fields["to"], "a@b.c");
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let request = EmailRequest::new("a@b.c", "s", "c").with_provider("  ");
        assert_eq!(request.provider_override(), None);
    }

    #[test]
    fn test_upload_object_name_defaults_to_file_name() {
        let request = UploadRequest {
            file: PathBuf::from("/tmp/report.pdf"),
            bucket: "docs".into(),
            ..UploadRequest::default()
        };
        assert_eq!(request.effective_object_name(), "report.pdf");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_search_defaults() {
        let request: SearchRequest = serde_json::from_value(json!({"index": "docs"})).unwrap();
        assert_eq!(request.limit, DEFAULT_SEARCH_LIMIT);
        assert!(request.validate().is_ok());

        let zero = SearchRequest { limit: 0, ..SearchRequest::new("q", "docs") };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_missing_letter_address_is_validation_error() {
        let request: LetterRequest = serde_json::from_value(json!({
            "to_address": {"name": "Jane Doe", "address_line1": "1 Main St"},
            "content": "<p>Hello</p>"
        }))
        .unwrap();
        assert_eq!(request.from_address.country, "US");

        let err = request.validate().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("from_address.name"));
    }

    #[test]
    fn test_envelope_requires_signers() {
        let request = EnvelopeRequest {
            document: PathBuf::from("contract.pdf"),
            ..EnvelopeRequest::default()
        };
        assert!(request.validate().is_err());
    }
}
