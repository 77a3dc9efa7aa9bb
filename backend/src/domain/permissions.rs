//! Roles, permission rules and the manifest built from them.
//!
//! A role owns a flat list of `(method, endpoint)` rules. At login the
//! rules are grouped by method into a [`PermissionManifest`] whose JSON form
//! is an array of single-key objects:
//!
//! ```json
//! [{"GET": ["/a", "/b"]}, {"POST": ["/a"]}]
//! ```

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use super::{Error, PermissionRuleId, RoleId};

/// Validation errors for role and rule payloads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermissionValidationError {
    /// Role name was blank.
    #[error("role name must not be empty")]
    EmptyRoleName,
    /// Method was blank.
    #[error("http method must not be empty")]
    EmptyMethod,
    /// Method contained something other than ASCII letters.
    #[error("http method '{0}' must contain only ASCII letters")]
    InvalidMethod(String),
    /// Endpoint was blank.
    #[error("endpoint must not be empty")]
    EmptyEndpoint,
}

impl From<PermissionValidationError> for Error {
    fn from(error: PermissionValidationError) -> Self {
        Error::invalid_request(error.to_string())
    }
}

/// Stored role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    /// Primary key.
    pub id: RoleId,
    /// Display name.
    pub name: String,
}

/// Trim and check a role name.
pub fn normalise_role_name(raw: &str) -> Result<String, PermissionValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PermissionValidationError::EmptyRoleName);
    }
    Ok(trimmed.to_owned())
}

/// HTTP verb of a permission rule, upper case.
///
/// # Examples
/// ```
/// use personnel::domain::permissions::HttpMethod;
///
/// let method = HttpMethod::new(" get ").unwrap();
/// assert_eq!(method.as_str(), "GET");
/// assert!(HttpMethod::new("G3T").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HttpMethod(String);

impl HttpMethod {
    /// Trim, validate and upper-case a raw verb.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, PermissionValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(PermissionValidationError::EmptyMethod);
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(PermissionValidationError::InvalidMethod(trimmed.to_owned()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Borrow the verb.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for String {
    fn from(value: HttpMethod) -> Self {
        value.0
    }
}

impl TryFrom<String> for HttpMethod {
    type Error = PermissionValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// One allowed `(method, endpoint)` pair of a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRule {
    /// Primary key.
    pub id: PermissionRuleId,
    /// Owning role.
    pub role_id: RoleId,
    /// HTTP verb.
    pub method: HttpMethod,
    /// Request path.
    pub endpoint: String,
}

/// Payload for granting a rule to a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRuleDraft {
    /// Role receiving the rule.
    pub role_id: RoleId,
    /// HTTP verb.
    pub method: HttpMethod,
    /// Request path, trimmed.
    pub endpoint: String,
}

impl PermissionRuleDraft {
    /// Validate a rule payload.
    pub fn new(
        role_id: RoleId,
        method: impl AsRef<str>,
        endpoint: impl AsRef<str>,
    ) -> Result<Self, PermissionValidationError> {
        let method = HttpMethod::new(method)?;
        let endpoint = endpoint.as_ref().trim();
        if endpoint.is_empty() {
            return Err(PermissionValidationError::EmptyEndpoint);
        }
        Ok(Self {
            role_id,
            method,
            endpoint: endpoint.to_owned(),
        })
    }
}

/// Endpoints allowed for one method.
///
/// Serialises as `{"<METHOD>": [endpoints...]}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// HTTP verb.
    pub method: HttpMethod,
    /// Endpoints in first-seen order, duplicates kept.
    pub endpoints: Vec<String>,
}

impl Serialize for ManifestEntry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.method.as_str(), &self.endpoints)?;
        map.end()
    }
}

/// Grouped permissions of a role, one entry per method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PermissionManifest(Vec<ManifestEntry>);

impl PermissionManifest {
    /// Group rules by method.
    ///
    /// Methods appear in the order they are first seen; endpoints keep rule
    /// order within their method. Identical rules are not collapsed.
    ///
    /// # Examples
    /// ```
    /// use personnel::domain::permissions::{HttpMethod, PermissionManifest};
    ///
    /// let manifest = PermissionManifest::from_pairs([
    ///     (HttpMethod::new("GET").unwrap(), "/a"),
    ///     (HttpMethod::new("POST").unwrap(), "/a"),
    ///     (HttpMethod::new("GET").unwrap(), "/b"),
    /// ]);
    /// let json = serde_json::to_string(&manifest).unwrap();
    /// assert_eq!(json, r#"[{"GET":["/a","/b"]},{"POST":["/a"]}]"#);
    /// ```
    pub fn from_pairs<E>(pairs: impl IntoIterator<Item = (HttpMethod, E)>) -> Self
    where
        E: Into<String>,
    {
        let mut entries: Vec<ManifestEntry> = Vec::new();
        for (method, endpoint) in pairs {
            let endpoint = endpoint.into();
            match entries.iter_mut().find(|entry| entry.method == method) {
                Some(entry) => entry.endpoints.push(endpoint),
                None => entries.push(ManifestEntry {
                    method,
                    endpoints: vec![endpoint],
                }),
            }
        }
        Self(entries)
    }

    /// Group stored rules, see [`PermissionManifest::from_pairs`].
    pub fn from_rules(rules: &[PermissionRule]) -> Self {
        Self::from_pairs(
            rules
                .iter()
                .map(|rule| (rule.method.clone(), rule.endpoint.clone())),
        )
    }

    /// Entries in method first-seen order.
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.0
    }

    /// Endpoints allowed for `method`.
    pub fn endpoints_for(&self, method: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|entry| entry.method.as_str().eq_ignore_ascii_case(method))
            .map(|entry| entry.endpoints.as_slice())
    }

    /// Number of distinct methods.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` when the role has no rules.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
