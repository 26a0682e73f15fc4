use crate::err::{self, Error};
#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(default))]
pub struct Config {
    pub store: StoreConfig,
}

#[cfg(feature = "serde1")]
impl Config {
    /// Read a JSON config file. Missing fields take their default values.
    pub fn from_json_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Error> {
        use snafu::ResultExt;
        let path = path.as_ref().display().to_string();
        let text = std::fs::read_to_string(&path).context(err::ConfigRead { path: path.clone() })?;
        serde_json::from_str(&text).map_err(|e| Error::ConfigParse {
            path,
            reason: e.to_string(),
        })
    }
}

/// Static description of where uploads go. Only used to address objects and format display
/// URLs; credentials are resolved by the SDK.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(default))]
pub struct StoreConfig {
    pub bucket: String,
    pub region: String,
    /// Access level uploads are stored under
    pub access_level: AccessLevel,
    /// Identity that `protected` and `private` objects are scoped to, if any
    pub identity_id: Option<String>,
    /// Size in bytes of the chunks a file is read in. Progress is reported once per chunk.
    pub chunk_size: usize,
}
impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bucket: "uploads".to_string(),
            region: "us-east-1".to_string(),
            access_level: AccessLevel::Protected,
            identity_id: None,
            chunk_size: 64 * 1024,
        }
    }
}
impl StoreConfig {
    /// Full object key of `key` stored under `level`: `<level>/[<identity>/]<key>`.
    pub fn object_key(&self, level: AccessLevel, key: &str) -> String {
        match (level, &self.identity_id) {
            (AccessLevel::Public, _) | (_, None) => format!("{}/{}", level, key),
            (_, Some(identity)) => format!("{}/{}/{}", level, identity, key),
        }
    }
    /// Public URL of an object uploaded with key `key` at the configured access level.
    pub fn object_url(&self, key: &str) -> String {
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            self.bucket,
            self.region,
            self.object_key(self.access_level, key)
        )
    }
}

/// Access-control tier of an uploaded object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "lowercase"))]
pub enum AccessLevel {
    /// Readable by everyone
    Public,
    /// Readable by everyone, writable only by the owning identity
    Protected,
    /// Only accessible to the owning identity
    Private,
}
impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Protected => "protected",
            Self::Private => "private",
        }
    }
}
impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
impl FromStr for AccessLevel {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "public" => Ok(Self::Public),
            "protected" => Ok(Self::Protected),
            "private" => Ok(Self::Private),
            _ => err::InvalidArgument {
                name: "access level",
                value: s,
            }
            .fail(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn object_url_uses_access_level() {
        let cfg = StoreConfig {
            bucket: "my-bucket".into(),
            region: "eu-west-1".into(),
            ..Default::default()
        };
        assert_eq!(
            cfg.object_url("a.txt"),
            "https://my-bucket.s3.eu-west-1.amazonaws.com/protected/a.txt"
        );
    }

    #[test]
    fn identity_scopes_non_public_keys() {
        let cfg = StoreConfig {
            identity_id: Some("eu-west-1:abc".into()),
            ..Default::default()
        };
        assert_eq!(
            cfg.object_key(AccessLevel::Private, "b.txt"),
            "private/eu-west-1:abc/b.txt"
        );
        assert_eq!(cfg.object_key(AccessLevel::Public, "b.txt"), "public/b.txt");
    }

    #[test]
    fn parse_access_level() {
        assert_eq!("private".parse::<AccessLevel>().unwrap(), AccessLevel::Private);
        assert!(matches!(
            "secret".parse::<AccessLevel>(),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[cfg(feature = "serde1")]
    #[test]
    fn partial_json_config() {
        let tmp_dir = tempdir::TempDir::new("upload-tracker").unwrap();
        let path = tmp_dir.path().join("config.json");
        std::fs::write(&path, r#"{"store": {"bucket": "photos", "access_level": "public"}}"#)
            .unwrap();
        let cfg = Config::from_json_file(&path).unwrap();
        assert_eq!(cfg.store.bucket, "photos");
        assert_eq!(cfg.store.access_level, AccessLevel::Public);
        assert_eq!(cfg.store.region, "us-east-1");
    }
}
