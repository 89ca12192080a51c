use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::core::error::{NebulaError, NebulaResult};

/// Represents a fully parsed Maven coordinate.
///
/// Supported formats:
///   `groupId:artifactId:version`
///   `groupId:artifactId:version:classifier`
///   `groupId:artifactId:version:classifier@extension`
///   `groupId:artifactId:version@extension`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MavenArtifact {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
    /// File extension. Defaults to `"jar"`, may be compound (`"jar.pack.xz"`).
    pub extension: String,
}

impl MavenArtifact {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
        classifier: Option<&str>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            classifier: classifier.filter(|c| !c.is_empty()).map(str::to_string),
            extension: extension.into(),
        }
    }

    /// Parse a maven identifier; the extension defaults to `jar`.
    ///
    /// ```
    /// use nebula_lib::core::maven::MavenArtifact;
    /// let a = MavenArtifact::parse("net.minecraftforge:forge:1.16.5-36.2.39:installer").unwrap();
    /// assert_eq!(a.to_string(), "net.minecraftforge:forge:1.16.5-36.2.39:installer@jar");
    /// ```
    pub fn parse(coord: &str) -> NebulaResult<Self> {
        let (coord_part, extension_override) = match coord.rfind('@') {
            Some(idx) => (&coord[..idx], Some(&coord[idx + 1..])),
            None => (coord, None),
        };

        let parts: Vec<&str> = coord_part.split(':').collect();
        if parts.iter().take(3).any(|p| p.is_empty()) {
            return Err(NebulaError::InvalidMavenCoordinate(coord.to_string()));
        }
        let extension = extension_override.unwrap_or("jar");

        match parts.len() {
            3 => Ok(Self::new(parts[0], parts[1], parts[2], None, extension)),
            4 => Ok(Self::new(
                parts[0],
                parts[1],
                parts[2],
                Some(parts[3]),
                extension,
            )),
            _ => Err(NebulaError::InvalidMavenCoordinate(coord.to_string())),
        }
    }

    /// Reverse of [`MavenArtifact::local_path`]: recover the coordinate from a
    /// repository-relative path.
    pub fn from_path(path: &Path) -> NebulaResult<Self> {
        let invalid = || NebulaError::InvalidMavenCoordinate(path.display().to_string());

        let segments = path
            .components()
            .map(|c| match c {
                Component::Normal(s) => s.to_str().ok_or_else(invalid),
                _ => Err(invalid()),
            })
            .collect::<NebulaResult<Vec<&str>>>()?;

        // group (>= 1 segment) / artifact / version / filename
        if segments.len() < 4 {
            return Err(invalid());
        }
        let n = segments.len();
        let (filename, version, artifact_id) = (segments[n - 1], segments[n - 2], segments[n - 3]);
        let group_id = segments[..n - 3].join(".");

        let prefix = format!("{}-{}", artifact_id, version);
        let rest = filename.strip_prefix(&prefix).ok_or_else(invalid)?;

        let (classifier, extension) = if let Some(tail) = rest.strip_prefix('-') {
            let (classifier, extension) = tail.split_once('.').ok_or_else(invalid)?;
            (Some(classifier), extension)
        } else if let Some(extension) = rest.strip_prefix('.') {
            (None, extension)
        } else {
            return Err(invalid());
        };

        if extension.is_empty() {
            return Err(invalid());
        }

        Ok(Self::new(group_id, artifact_id, version, classifier, extension))
    }

    /// `net.minecraftforge` → `net/minecraftforge`
    pub fn group_path(&self) -> String {
        self.group_id.replace('.', "/")
    }

    /// `artifactId-version[-classifier].extension`
    pub fn filename(&self) -> String {
        match &self.classifier {
            Some(c) => format!(
                "{}-{}-{}.{}",
                self.artifact_id, self.version, c, self.extension
            ),
            None => format!("{}-{}.{}", self.artifact_id, self.version, self.extension),
        }
    }

    /// Repository-relative path using `/` separators, as used in URLs.
    pub fn path_string(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.group_path(),
            self.artifact_id,
            self.version,
            self.filename()
        )
    }

    /// Location of this artifact in a remote maven repository.
    pub fn url(&self, repo_base: &str) -> String {
        format!("{}/{}", repo_base.trim_end_matches('/'), self.path_string())
    }

    /// Path relative to a repository root, built from the group's segments so
    /// it is valid on every platform.
    pub fn local_path(&self) -> PathBuf {
        self.group_id
            .split('.')
            .fold(PathBuf::new(), |acc, segment| acc.join(segment))
            .join(&self.artifact_id)
            .join(&self.version)
            .join(self.filename())
    }

    /// Return a new artifact with the extension changed (e.g. to `"jar.pack.xz"`).
    pub fn with_extension(&self, extension: &str) -> Self {
        let mut clone = self.clone();
        clone.extension = extension.to_string();
        clone
    }

    /// Return a new artifact with the classifier replaced. An empty classifier
    /// clears it.
    pub fn with_classifier(&self, classifier: &str) -> Self {
        let mut clone = self.clone();
        clone.classifier = Some(classifier)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        clone
    }
}

impl fmt::Display for MavenArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.classifier {
            Some(c) => write!(
                f,
                "{}:{}:{}:{}@{}",
                self.group_id, self.artifact_id, self.version, c, self.extension
            ),
            None => write!(
                f,
                "{}:{}:{}@{}",
                self.group_id, self.artifact_id, self.version, self.extension
            ),
        }
    }
}
