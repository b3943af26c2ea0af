// Content-derived identifiers for build artifacts.
//
// An identifier is the MD5 digest of a file's bytes written as lowercase
// hex and split into the familiar 8-4-4-4-12 UUID groups. The same bytes
// always produce the same identifier, so a later upload step can find a
// source map again without coordinating with the build. Identifiers read
// back from a cache may be uppercase; they are kept exactly as written.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use md5::{Digest, Md5};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    fn format(digest: &[u8]) -> Self {
        let hex = hex::encode(digest);
        let mut out = String::with_capacity(36);
        let mut offset = 0;
        for (idx, len) in GROUPS.iter().enumerate() {
            if idx > 0 {
                out.push('-');
            }
            out.push_str(&hex[offset..offset + len]);
            offset += len;
        }
        Identifier(out)
    }

    /// Identifier for data already held in memory, such as a script's own
    /// text at runtime.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self::format(Md5::digest(data).as_slice())
    }

    /// Stream a file through MD5. Fails if the file is missing or
    /// unreadable; an empty file hashes like any other.
    pub fn for_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let mut reader = BufReader::new(file);
        let mut hasher = Md5::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let read = reader.read(&mut buf).map_err(|e| Error::io(path, e))?;
            if read == 0 {
                break;
            }
            hasher.update(&buf[..read]);
        }
        let id = Self::format(hasher.finalize().as_slice());
        tracing::debug!(path = %path.display(), %id, "hashed file");
        Ok(id)
    }

    /// Identifier of the running program's own executable.
    pub fn for_current_exe() -> Result<Self> {
        let exe = std::env::current_exe().map_err(|e| Error::io("<current executable>", e))?;
        Self::for_file(&exe)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Identifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let groups: Vec<&str> = s.split('-').collect();
        let well_formed = groups.len() == GROUPS.len()
            && groups.iter().zip(GROUPS).all(|(group, len)| {
                group.len() == len
                    && group
                        .bytes()
                        .all(|b| b.is_ascii_hexdigit())
            });
        if well_formed {
            Ok(Identifier(s.to_string()))
        } else {
            Err(Error::InvalidIdentifier(s.to_string()))
        }
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const EMPTY_MD5: &str = "d41d8cd9-8f00-b204-e980-0998ecf8427e";

    fn assert_pattern(id: &Identifier) {
        assert_eq!(id.as_str().len(), 36);
        assert!(id.as_str().parse::<Identifier>().is_ok(), "bad shape: {id}");
    }

    #[test]
    fn empty_file_hashes_to_md5_of_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.js");
        fs::write(&path, b"").unwrap();

        let id = Identifier::for_file(&path).unwrap();
        assert_eq!(id.as_str(), EMPTY_MD5);
        assert_pattern(&id);
    }

    #[test]
    fn same_content_gives_same_identifier() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("one.js");
        let second = dir.path().join("two.js");
        fs::write(&first, "console.log('hi');\n").unwrap();
        fs::write(&second, "console.log('hi');\n").unwrap();

        let a = Identifier::for_file(&first).unwrap();
        let b = Identifier::for_file(&second).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, Identifier::from_bytes(b"console.log('hi');\n"));
        assert_pattern(&a);
    }

    #[test]
    fn different_content_gives_different_identifier() {
        assert_ne!(Identifier::from_bytes(b"a"), Identifier::from_bytes(b"b"));
    }

    #[test]
    fn large_file_streams_across_buffer_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.js");
        let data = vec![b'x'; 200 * 1024 + 17];
        fs::write(&path, &data).unwrap();

        assert_eq!(
            Identifier::for_file(&path).unwrap(),
            Identifier::from_bytes(&data)
        );
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Identifier::for_file(&dir.path().join("nope.js")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }), "unexpected: {err:?}");
    }

    #[test]
    fn current_exe_matches_hashing_its_path() {
        let exe = std::env::current_exe().unwrap();
        assert_eq!(
            Identifier::for_current_exe().unwrap(),
            Identifier::for_file(&exe).unwrap()
        );
    }

    #[test]
    fn parse_keeps_uppercase_as_written() {
        let id: Identifier = "D41D8CD9-8F00-B204-E980-0998ECF8427E".parse().unwrap();
        assert_eq!(id.as_str(), "D41D8CD9-8F00-B204-E980-0998ECF8427E");
        assert_eq!(Identifier::from_bytes(b"").as_str(), EMPTY_MD5);
    }

    #[test]
    fn parse_rejects_bad_groups() {
        assert!("d41d8cd98f00-b204-e980-0998ecf8427e"
            .parse::<Identifier>()
            .is_err());
        assert!("d41d8cd9-8f00-b204-e980-0998ecf8427g"
            .parse::<Identifier>()
            .is_err());
    }
}
