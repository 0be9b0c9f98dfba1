use std::fmt;
use std::str::FromStr;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bucket used for entities that only exist client-side and were never persisted.
pub const LOCAL_BUCKET: &str = "local";

/// Bucket holding published (organisation-wide) entities.
pub const PUBLIC_BUCKET: &str = "public";

/// Separator between an entity name and its published version.
const VERSION_SEPARATOR: &str = "__v";

/// How a literal separator inside a name is written, so it never reads as a version.
const ESCAPED_SEPARATOR: &str = "_%5Fv";

/// Characters left untouched when encoding a path segment (RFC 3986 unreserved).
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    #[error("Entity id is empty")]
    Empty,

    #[error("Unknown resource kind `{0}`")]
    UnknownKind(String),

    #[error("Entity id `{0}` has no bucket")]
    MissingBucket(String),

    #[error("Entity id `{0}` has no name")]
    MissingName(String),

    #[error("Entity id `{0}` contains an invalid segment")]
    InvalidSegment(String),
}

/// Resource family an id belongs to. The kind is the first path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKind {
    Conversations,
    Prompts,
    Files,
    Applications,
}

impl ApiKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiKind::Conversations => "conversations",
            ApiKind::Prompts => "prompts",
            ApiKind::Files => "files",
            ApiKind::Applications => "applications",
        }
    }

    pub fn parse(value: &str) -> Result<Self, IdParseError> {
        match value {
            "conversations" => Ok(ApiKind::Conversations),
            "prompts" => Ok(ApiKind::Prompts),
            "files" => Ok(ApiKind::Files),
            "applications" => Ok(ApiKind::Applications),
            other => Err(IdParseError::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for ApiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who owns an entity, relative to the signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locality {
    /// Exists only in client state; not yet written to the backend.
    Local,
    /// Persisted in the user's own bucket.
    Own,
    /// Lives in another user's bucket and was shared with us.
    SharedWithMe,
    /// Published to the organisation-wide bucket.
    Public,
}

impl Locality {
    pub fn is_external(&self) -> bool {
        matches!(self, Locality::SharedWithMe | Locality::Public)
    }
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

fn decode_segment(raw: &str, whole: &str) -> Result<String, IdParseError> {
    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| IdParseError::InvalidSegment(whole.to_string()))?;
    if decoded.is_empty() {
        return Err(IdParseError::InvalidSegment(whole.to_string()));
    }
    Ok(decoded.into_owned())
}

/// A folder location: `{kind}/{bucket}/{segment}/{segment}...`.
///
/// The bucket root is a `FolderPath` with no segments. Every entity and
/// sub-folder id starts with the path of the folder that contains it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FolderPath {
    kind: ApiKind,
    bucket: String,
    segments: Vec<String>,
}

impl FolderPath {
    pub fn root(kind: ApiKind, bucket: impl Into<String>) -> Self {
        Self {
            kind,
            bucket: bucket.into(),
            segments: Vec::new(),
        }
    }

    /// Root of the client-only bucket for `kind`.
    pub fn local_root(kind: ApiKind) -> Self {
        Self::root(kind, LOCAL_BUCKET)
    }

    pub fn new(kind: ApiKind, bucket: impl Into<String>, segments: Vec<String>) -> Self {
        Self {
            kind,
            bucket: bucket.into(),
            segments,
        }
    }

    pub fn kind(&self) -> ApiKind {
        self.kind
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Display name of the folder (last segment). `None` for a bucket root.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn parent(&self) -> Option<FolderPath> {
        if self.segments.is_empty() {
            return None;
        }
        let mut parent = self.clone();
        parent.segments.pop();
        Some(parent)
    }

    pub fn child(&self, name: impl Into<String>) -> FolderPath {
        let mut child = self.clone();
        child.segments.push(name.into());
        child
    }

    /// Same location under a different name (last segment replaced).
    pub fn renamed(&self, name: impl Into<String>) -> FolderPath {
        let mut renamed = self.clone();
        if let Some(last) = renamed.segments.last_mut() {
            *last = name.into();
        }
        renamed
    }

    /// True when `other` is inside this folder at any depth (strict).
    pub fn is_ancestor_of(&self, other: &FolderPath) -> bool {
        self.kind == other.kind
            && self.bucket == other.bucket
            && other.segments.len() > self.segments.len()
            && other.segments.starts_with(&self.segments)
    }

    /// True when `other` equals this folder or is inside it.
    pub fn contains(&self, other: &FolderPath) -> bool {
        self == other || self.is_ancestor_of(other)
    }

    /// Replace the `from` prefix with `to`. Returns `None` when `from` does not contain self.
    pub fn rebase(&self, from: &FolderPath, to: &FolderPath) -> Option<FolderPath> {
        if !from.contains(self) {
            return None;
        }
        let mut segments = to.segments.clone();
        segments.extend_from_slice(&self.segments[from.segments.len()..]);
        Some(FolderPath {
            kind: to.kind,
            bucket: to.bucket.clone(),
            segments,
        })
    }

    pub fn with_bucket(&self, bucket: impl Into<String>) -> FolderPath {
        FolderPath {
            kind: self.kind,
            bucket: bucket.into(),
            segments: self.segments.clone(),
        }
    }

    pub fn locality(&self, user_bucket: &str) -> Locality {
        locality_of(&self.bucket, user_bucket)
    }

    pub fn is_local(&self) -> bool {
        self.bucket == LOCAL_BUCKET
    }

    pub fn encode(&self) -> String {
        let mut out = format!("{}/{}", self.kind.as_str(), encode_segment(&self.bucket));
        for segment in &self.segments {
            out.push('/');
            out.push_str(&encode_segment(segment));
        }
        out
    }

    pub fn decode(value: &str) -> Result<Self, IdParseError> {
        let trimmed = value.trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(IdParseError::Empty);
        }
        let mut parts = trimmed.split('/');
        let kind = ApiKind::parse(parts.next().unwrap_or_default())?;
        let bucket = parts
            .next()
            .ok_or_else(|| IdParseError::MissingBucket(value.to_string()))
            .and_then(|raw| decode_segment(raw, value))?;
        let segments = parts
            .map(|raw| decode_segment(raw, value))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            kind,
            bucket,
            segments,
        })
    }
}

impl fmt::Display for FolderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for FolderPath {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl TryFrom<String> for FolderPath {
    type Error = IdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::decode(&value)
    }
}

impl From<FolderPath> for String {
    fn from(value: FolderPath) -> Self {
        value.encode()
    }
}

fn locality_of(bucket: &str, user_bucket: &str) -> Locality {
    if bucket == LOCAL_BUCKET {
        Locality::Local
    } else if bucket == PUBLIC_BUCKET {
        Locality::Public
    } else if bucket == user_bucket {
        Locality::Own
    } else {
        Locality::SharedWithMe
    }
}

/// Composite identifier of a conversation, prompt, file or application:
/// `{kind}/{bucket}/{folder...}/{name}[__v{version}]`.
///
/// The backend uses the encoded id as the storage key, so renaming or moving an
/// entity always produces a new id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId {
    folder: FolderPath,
    name: String,
    version: Option<String>,
}

impl EntityId {
    pub fn new(folder: FolderPath, name: impl Into<String>) -> Self {
        Self {
            folder,
            name: name.into(),
            version: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn folder(&self) -> &FolderPath {
        &self.folder
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn kind(&self) -> ApiKind {
        self.folder.kind
    }

    pub fn bucket(&self) -> &str {
        &self.folder.bucket
    }

    pub fn locality(&self, user_bucket: &str) -> Locality {
        self.folder.locality(user_bucket)
    }

    pub fn is_local(&self) -> bool {
        self.folder.is_local()
    }

    pub fn with_name(&self, name: impl Into<String>) -> EntityId {
        EntityId {
            folder: self.folder.clone(),
            name: name.into(),
            version: self.version.clone(),
        }
    }

    pub fn with_folder(&self, folder: FolderPath) -> EntityId {
        EntityId {
            folder,
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }

    /// Move the id from a local bucket into the user's bucket, keeping its path.
    pub fn promoted(&self, user_bucket: &str) -> EntityId {
        if !self.is_local() {
            return self.clone();
        }
        self.with_folder(self.folder.with_bucket(user_bucket))
    }

    /// Re-root the id when one of its ancestor folders was renamed or moved.
    pub fn rebase(&self, from: &FolderPath, to: &FolderPath) -> Option<EntityId> {
        self.folder
            .rebase(from, to)
            .map(|folder| self.with_folder(folder))
    }

    /// The id shared by every published version of the same entity.
    pub fn version_group(&self) -> EntityId {
        EntityId {
            folder: self.folder.clone(),
            name: self.name.clone(),
            version: None,
        }
    }

    pub fn encode(&self) -> String {
        let mut last = encode_segment(&self.name).replace(VERSION_SEPARATOR, ESCAPED_SEPARATOR);
        if let Some(version) = &self.version {
            last.push_str(VERSION_SEPARATOR);
            last.push_str(&encode_segment(version));
        }
        format!("{}/{}", self.folder.encode(), last)
    }

    pub fn decode(value: &str) -> Result<Self, IdParseError> {
        if value.is_empty() {
            return Err(IdParseError::Empty);
        }
        let (folder_part, last) = value
            .rsplit_once('/')
            .ok_or_else(|| IdParseError::MissingName(value.to_string()))?;
        let folder = FolderPath::decode(folder_part)?;
        if folder.bucket.is_empty() || folder_part.split('/').count() < 2 {
            return Err(IdParseError::MissingName(value.to_string()));
        }
        let (raw_name, version) = split_version(last);
        let name = decode_segment(raw_name, value)?;
        let version = version
            .map(|raw| decode_segment(raw, value))
            .transpose()?;
        Ok(Self {
            folder,
            name,
            version,
        })
    }
}

/// Only treat the suffix as a version when it looks like one (`1`, `1.0.2`).
fn split_version(last: &str) -> (&str, Option<&str>) {
    if let Some((name, version)) = last.rsplit_once(VERSION_SEPARATOR) {
        let looks_like_version = !name.is_empty()
            && version.starts_with(|c: char| c.is_ascii_digit())
            && version.chars().all(|c| c.is_ascii_digit() || c == '.');
        if looks_like_version {
            return (name, Some(version));
        }
    }
    (last, None)
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for EntityId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl TryFrom<String> for EntityId {
    type Error = IdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::decode(&value)
    }
}

impl From<EntityId> for String {
    fn from(value: EntityId) -> Self {
        value.encode()
    }
}
