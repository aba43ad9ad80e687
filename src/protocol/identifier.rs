use std::{fmt, str::FromStr};

pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// A namespaced resource name such as `minecraft:stone`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier {
    namespace: String,
    path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("non [a-z0-9/._-] character in identifier: {0}")]
pub struct InvalidIdentifier(pub String);

impl Identifier {
    pub fn new(namespace: impl Into<String>, path: impl Into<String>) -> Result<Self, InvalidIdentifier> {
        let namespace = namespace.into();
        let path = path.into();
        if !namespace.bytes().all(is_namespace_byte) || !path.bytes().all(is_path_byte) {
            return Err(InvalidIdentifier(format!("{namespace}:{path}")));
        }
        Ok(Self { namespace, path })
    }

    pub fn minecraft(path: impl Into<String>) -> Result<Self, InvalidIdentifier> {
        Self::new(DEFAULT_NAMESPACE, path)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

fn is_namespace_byte(b: u8) -> bool {
    matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' | b'.')
}

fn is_path_byte(b: u8) -> bool {
    is_namespace_byte(b) || b == b'/'
}

impl FromStr for Identifier {
    type Err = InvalidIdentifier;

    /// Parses `namespace:path`; a missing or empty namespace means
    /// `minecraft`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some(("", path)) => Self::minecraft(path),
            Some((namespace, path)) => Self::new(namespace, path),
            None => Self::minecraft(s),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_default_namespace() {
        let id: Identifier = "stone".parse().unwrap();
        assert_eq!(id.to_string(), "minecraft:stone");
        let id: Identifier = ":dirt".parse().unwrap();
        assert_eq!(id.namespace(), "minecraft");
    }

    #[test]
    fn rejects_bad_characters() {
        assert!("Minecraft:stone".parse::<Identifier>().is_err());
        assert!("mod:blocks/ore".parse::<Identifier>().is_ok());
        assert!("mod/x:ore".parse::<Identifier>().is_err());
        assert!("a:b:c".parse::<Identifier>().is_err());
    }
}
