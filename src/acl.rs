//! Access-control lists: the ordered capability/role tokens a guarded
//! route requires.

/// An ACL as supplied by the caller: either a single token or an ordered
/// sequence. A single token is normalized to a one-element slice before it
/// reaches the checker, so checkers only ever see `&[String]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acl {
    Token(String),
    Tokens(Vec<String>),
}

impl Acl {
    /// Normalized view: a single token becomes a one-element slice,
    /// sequences pass through unchanged.
    pub fn as_slice(&self) -> &[String] {
        match self {
            Acl::Token(t) => std::slice::from_ref(t),
            Acl::Tokens(v) => v.as_slice(),
        }
    }
}

impl From<&str> for Acl {
    fn from(token: &str) -> Self {
        Acl::Token(token.to_string())
    }
}

impl From<String> for Acl {
    fn from(token: String) -> Self {
        Acl::Token(token)
    }
}

impl From<Vec<String>> for Acl {
    fn from(tokens: Vec<String>) -> Self {
        Acl::Tokens(tokens)
    }
}

impl From<&[&str]> for Acl {
    fn from(tokens: &[&str]) -> Self {
        Acl::Tokens(tokens.iter().map(|t| t.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Acl {
    fn from(tokens: [&str; N]) -> Self {
        Acl::Tokens(tokens.iter().map(|t| t.to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_token_normalizes_to_one_element() {
        let acl = Acl::from("admin");
        assert_eq!(acl.as_slice(), &["admin".to_string()]);
    }

    #[test]
    fn sequence_passes_through_in_order() {
        let acl = Acl::from(["group1", "group2"]);
        assert_eq!(acl.as_slice(), &["group1".to_string(), "group2".to_string()]);
    }

    #[test]
    fn empty_sequence_stays_empty() {
        let acl = Acl::Tokens(Vec::new());
        assert!(acl.as_slice().is_empty());
    }
}
